//! JSON documents offered for download from the batch pages.

use serde::Serialize;

use crate::backend::{Batch, BatchDetail, Review};
use crate::metrics::partition_reviews;

/// A download that could not be produced; the message is shown instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("No reviews found")]
    NoReviews,
    #[error("No genuine reviews found")]
    NoGenuineReviews,
    #[error("No reviews selected")]
    NothingSelected,
}

#[derive(Debug, Serialize)]
pub struct Export<T> {
    pub filename: String,
    pub body: T,
    pub count: usize,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ExportSummary {
    pub total_reviews: usize,
    pub genuine_count: usize,
    pub suspicious_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SeparatedReviews<'a> {
    pub batch: &'a str,
    pub summary: ExportSummary,
    pub genuine_reviews: Vec<&'a Review>,
    pub suspicious_reviews: Vec<&'a Review>,
}

fn batch_label(batch: Option<&Batch>) -> &str {
    batch
        .map(|b| b.batch_name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("Batch")
}

fn file_prefix(batch: Option<&Batch>) -> &str {
    batch.map(Batch::display_name).unwrap_or("batch")
}

/// Every review, split into genuine and suspicious, with a summary block.
pub fn separated<'a>(
    batch: Option<&'a Batch>,
    reviews: &'a [Review],
) -> Result<Export<SeparatedReviews<'a>>, ExportError> {
    if reviews.is_empty() {
        return Err(ExportError::NoReviews);
    }

    let parts = partition_reviews(reviews);
    let summary = ExportSummary {
        total_reviews: reviews.len(),
        genuine_count: parts.genuine.len(),
        suspicious_count: parts.suspicious.len(),
    };

    Ok(Export {
        filename: format!("{}_raw_separated.json", file_prefix(batch)),
        count: reviews.len(),
        body: SeparatedReviews {
            batch: batch_label(batch),
            summary,
            genuine_reviews: parts.genuine,
            suspicious_reviews: parts.suspicious,
        },
    })
}

pub fn authentic_only<'a>(
    batch: Option<&Batch>,
    reviews: &'a [Review],
) -> Result<Export<Vec<&'a Review>>, ExportError> {
    let genuine = partition_reviews(reviews).genuine;
    if genuine.is_empty() {
        return Err(ExportError::NoGenuineReviews);
    }

    Ok(Export {
        filename: format!("{}_authentic.json", file_prefix(batch)),
        count: genuine.len(),
        body: genuine,
    })
}

pub fn selected<'a>(selection: Vec<&'a Review>) -> Result<Export<Vec<&'a Review>>, ExportError> {
    if selection.is_empty() {
        return Err(ExportError::NothingSelected);
    }

    Ok(Export {
        filename: "selected_reviews.json".to_string(),
        count: selection.len(),
        body: selection,
    })
}

/// Full results of one batch, offered from the batch list.
pub fn results(detail: &BatchDetail) -> Export<&BatchDetail> {
    Export {
        filename: format!("{}_results.json", detail.batch.file_stem()),
        count: detail.reviews.len(),
        body: detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reviews() -> Vec<Review> {
        serde_json::from_value(json!([
            { "_id": "r1", "authenticity": { "score": 0.95, "status": "highly_authentic" } },
            { "_id": "r2", "authenticity": { "score": 0.10, "status": "suspicious" } },
            { "_id": "r3", "authenticity": { "score": 0.60, "status": "moderately_authentic" } }
        ]))
        .unwrap()
    }

    fn batch() -> Batch {
        serde_json::from_value(json!({ "_id": "b1", "batch_name": "shop.json" })).unwrap()
    }

    #[test]
    fn separated_export_has_summary_and_partitions() {
        let b = batch();
        let r = reviews();
        let export = separated(Some(&b), &r).unwrap();
        assert_eq!(export.filename, "shop.json_raw_separated.json");

        let value = serde_json::to_value(&export.body).unwrap();
        assert_eq!(value["batch"], "shop.json");
        assert_eq!(
            value["summary"],
            json!({ "total_reviews": 3, "genuine_count": 2, "suspicious_count": 1 })
        );
        assert_eq!(value["genuine_reviews"][1]["_id"], "r3");
        assert_eq!(value["suspicious_reviews"][0]["_id"], "r2");
    }

    #[test]
    fn empty_collection_produces_no_file() {
        assert_eq!(separated(None, &[]).unwrap_err(), ExportError::NoReviews);
        assert_eq!(authentic_only(None, &[]).unwrap_err(), ExportError::NoGenuineReviews);
        assert_eq!(selected(vec![]).unwrap_err(), ExportError::NothingSelected);
    }

    #[test]
    fn authentic_only_skips_suspicious() {
        let r = reviews();
        let export = authentic_only(None, &r).unwrap();
        assert_eq!(export.filename, "batch_authentic.json");
        assert_eq!(export.count, 2);
    }

    #[test]
    fn results_export_uses_filename_stem() {
        let detail = BatchDetail {
            batch: batch(),
            reviews: reviews(),
        };
        assert_eq!(results(&detail).filename, "shop_results.json");
    }
}
