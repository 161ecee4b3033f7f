//! Figures derived from the batch and review collections held in a view.
//!
//! Everything here is pure and recomputed on each render.

use serde::Serialize;

use crate::backend::{Batch, Review};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub total_batches: usize,
    pub pending_batches: usize,
    pub total_reviews_analyzed: u64,
    pub average_genuine_rate: i64,
}

impl BatchStats {
    pub fn compute(batches: &[Batch]) -> Self {
        let average_genuine_rate = if batches.is_empty() {
            0
        } else {
            let sum: f64 = batches.iter().map(|b| b.genuine_percentage).sum();
            (sum / batches.len() as f64).round() as i64
        };

        Self {
            total_batches: batches.len(),
            pending_batches: batches.iter().filter(|b| !b.is_completed()).count(),
            total_reviews_analyzed: batches.iter().map(|b| b.total_reviews).sum(),
            average_genuine_rate,
        }
    }
}

/// Case-insensitive substring match over name, status and upload date.
pub fn filter_batches<'a>(batches: &'a [Batch], query: &str) -> Vec<&'a Batch> {
    let needle = query.trim().to_lowercase();
    batches
        .iter()
        .filter(|b| {
            needle.is_empty()
                || b.batch_name.to_lowercase().contains(&needle)
                || b.status.to_lowercase().contains(&needle)
                || b.upload_date().to_lowercase().contains(&needle)
        })
        .collect()
}

/// Case-insensitive substring match over feedback and username.
pub fn filter_reviews<'a>(reviews: &'a [Review], query: &str) -> Vec<&'a Review> {
    let needle = query.trim().to_lowercase();
    reviews
        .iter()
        .filter(|r| {
            needle.is_empty()
                || r.feedback.to_lowercase().contains(&needle)
                || r.username.to_lowercase().contains(&needle)
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub genuine: Vec<&'a Review>,
    pub suspicious: Vec<&'a Review>,
}

pub fn partition_reviews(reviews: &[Review]) -> Partition<'_> {
    let (genuine, suspicious): (Vec<&Review>, Vec<&Review>) =
        reviews.iter().partition(|r| r.is_genuine());
    Partition {
        genuine,
        suspicious,
    }
}

/// Expected genuine and suspicious review counts for a finished batch.
pub fn genuine_split(batch: &Batch) -> (u64, u64) {
    let total = batch.total_reviews as f64;
    let genuine = (total * batch.genuine_percentage / 100.0).round() as u64;
    let suspicious = (total * batch.suspicious_percentage / 100.0).round() as u64;
    (genuine, suspicious)
}
