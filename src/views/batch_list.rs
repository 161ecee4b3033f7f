use crate::backend::Batch;
use crate::metrics::{filter_batches, BatchStats};
use crate::resource::Resource;

#[derive(Debug, Default)]
pub struct BatchListView {
    pub batches: Resource<Vec<Batch>>,
    pub query: String,
}

impl BatchListView {
    pub fn new(batches: Resource<Vec<Batch>>) -> Self {
        Self {
            batches,
            query: String::new(),
        }
    }

    /// Batches matching the current search box, in backend order.
    pub fn visible(&self) -> Vec<&Batch> {
        self.batches
            .data()
            .map(|b| filter_batches(b, &self.query))
            .unwrap_or_default()
    }

    pub fn stats(&self) -> BatchStats {
        self.batches
            .data()
            .map(|b| BatchStats::compute(b))
            .unwrap_or_default()
    }

    pub fn find(&self, id: &str) -> Option<&Batch> {
        self.batches.data()?.iter().find(|b| b.id == id)
    }

    /// Drops a batch after the backend confirmed its deletion.
    pub fn remove(&mut self, id: &str) -> Option<Batch> {
        let batches = self.batches.data_mut()?;
        let pos = batches.iter().position(|b| b.id == id)?;
        Some(batches.remove(pos))
    }
}
