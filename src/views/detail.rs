use std::collections::BTreeSet;

use crate::backend::{BatchDetail, Review};
use crate::metrics::filter_reviews;
use crate::resource::Resource;

#[derive(Debug)]
pub struct DetailView {
    pub batch_id: String,
    pub detail: Resource<BatchDetail>,
    pub query: String,
    selection: BTreeSet<String>,
}

impl DetailView {
    pub fn new(batch_id: &str, detail: Resource<BatchDetail>) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            detail,
            query: String::new(),
            selection: BTreeSet::new(),
        }
    }

    pub fn reviews(&self) -> &[Review] {
        self.detail
            .data()
            .map(|d| d.reviews.as_slice())
            .unwrap_or_default()
    }

    /// Rows matching the current search box.
    pub fn visible(&self) -> Vec<&Review> {
        filter_reviews(self.reviews(), &self.query)
    }

    pub fn is_selected(&self, review_id: &str) -> bool {
        self.selection.contains(review_id)
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    /// Flips the checkbox of one row. Ids not in the table are ignored.
    pub fn toggle(&mut self, review_id: &str) {
        if !self.reviews().iter().any(|r| r.id == review_id) {
            return;
        }
        if !self.selection.remove(review_id) {
            self.selection.insert(review_id.to_string());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected rows in table order.
    pub fn selected_reviews(&self) -> Vec<&Review> {
        self.reviews()
            .iter()
            .filter(|r| self.selection.contains(&r.id))
            .collect()
    }

    /// Removes the selected rows from this view only; the backend copy is
    /// untouched. Returns how many rows went away.
    pub fn delete_selected(&mut self) -> usize {
        let selection = std::mem::take(&mut self.selection);
        let Some(detail) = self.detail.data_mut() else {
            return 0;
        };
        let before = detail.reviews.len();
        detail.reviews.retain(|r| !selection.contains(&r.id));
        before - detail.reviews.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Batch;
    use serde_json::json;

    fn view(ids: &[&str]) -> DetailView {
        let reviews = ids
            .iter()
            .map(|id| serde_json::from_value(json!({ "_id": id })).unwrap())
            .collect();
        let batch: Batch = serde_json::from_value(json!({ "_id": "b1", "batch_name": "b1.xml" })).unwrap();
        DetailView::new("b1", Resource::Loaded(BatchDetail { batch, reviews }))
    }

    #[test]
    fn toggle_flips_and_ignores_unknown_ids() {
        let mut v = view(&["r1", "r2"]);
        v.toggle("r1");
        v.toggle("nope");
        assert!(v.is_selected("r1"));
        assert_eq!(v.selection_len(), 1);
        v.toggle("r1");
        assert_eq!(v.selection_len(), 0);
    }

    #[test]
    fn delete_selected_removes_exactly_those_rows() {
        let mut v = view(&["r1", "r2", "r3"]);
        v.toggle("r3");
        v.toggle("r1");
        assert_eq!(v.delete_selected(), 2);
        let left: Vec<_> = v.reviews().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(left, ["r2"]);
        assert_eq!(v.selection_len(), 0);
    }

    #[test]
    fn selected_reviews_keep_table_order() {
        let mut v = view(&["r1", "r2", "r3"]);
        v.toggle("r3");
        v.toggle("r2");
        let ids: Vec<_> = v.selected_reviews().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r2", "r3"]);
    }
}
