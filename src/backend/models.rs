use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub batch_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uploaded_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_reviews: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genuine_percentage: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suspicious_percentage: f64,
}

impl Batch {
    pub fn is_completed(&self) -> bool {
        self.status.to_lowercase() == "completed"
    }

    /// Upload date as `YYYY-MM-DD`, or the raw backend string when it is not a timestamp.
    pub fn upload_date(&self) -> String {
        format_timestamp(&self.uploaded_at, "%Y-%m-%d")
    }

    pub fn upload_time(&self) -> String {
        format_timestamp(&self.uploaded_at, "%Y-%m-%d %H:%M:%S")
    }

    /// Filename without its extension, used to name result downloads.
    pub fn file_stem(&self) -> &str {
        match self.batch_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.batch_name,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.batch_name.is_empty() {
            "batch"
        } else {
            &self.batch_name
        }
    }
}

/// Reads `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn format_timestamp(raw: &str, fmt: &str) -> String {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.format(fmt).to_string();
    }
    if let Ok(ts) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return ts.format(fmt).to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format(fmt).to_string();
    }
    raw.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Sentiment {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AiDetection {
    #[serde(default)]
    pub ai_probability: f64,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SpamDetection {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LinkDetection {
    #[serde(default)]
    pub has_link: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromotionalKeywords {
    #[serde(default)]
    pub is_promotional: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Authenticity {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub feedback: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sentiment: Sentiment,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ai_detection: AiDetection,
    #[serde(default, deserialize_with = "null_as_default")]
    pub spam_detection: SpamDetection,
    #[serde(default, deserialize_with = "null_as_default")]
    pub link_detection: LinkDetection,
    #[serde(default, deserialize_with = "null_as_default")]
    pub promotional_keywords: PromotionalKeywords,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating_sentiment_consistency: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authenticity: Authenticity,
    /// Fields the dashboard does not display but must keep in downloads.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Review {
    /// Genuine iff the authenticity status mentions "authentic".
    pub fn is_genuine(&self) -> bool {
        self.authenticity.status.contains("authentic")
    }

    pub fn tier(&self) -> AuthenticityTier {
        AuthenticityTier::from_status(&self.authenticity.status)
    }

    pub fn tone(&self) -> SentimentTone {
        SentimentTone::from_label(&self.sentiment.label)
    }

    pub fn is_consistent(&self) -> bool {
        self.rating_sentiment_consistency == "consistent"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthenticityTier {
    High,
    Moderate,
    Suspicious,
}

impl AuthenticityTier {
    pub fn from_status(status: &str) -> Self {
        match status {
            "highly_authentic" => Self::High,
            "moderately_authentic" => Self::Moderate,
            _ => Self::Suspicious,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Moderate => "Moderate",
            Self::Suspicious => "Suspicious",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SentimentTone {
    Positive,
    Negative,
    Neutral,
}

impl SentimentTone {
    pub fn from_label(label: &str) -> Self {
        match label {
            "POSITIVE" => Self::Positive,
            "NEGATIVE" => Self::Negative,
            _ => Self::Neutral,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDetail {
    pub batch: Batch,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

/// Body of `POST /reviews`. Reviews are forwarded exactly as uploaded.
#[derive(Debug, Clone, Serialize)]
pub struct NewBatch {
    pub batch_name: String,
    pub reviews: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch(name: &str, uploaded_at: &str) -> Batch {
        Batch {
            id: "1".into(),
            batch_name: name.into(),
            uploaded_at: uploaded_at.into(),
            total_reviews: 0,
            status: "Pending".into(),
            genuine_percentage: 0.0,
            suspicious_percentage: 0.0,
        }
    }

    #[test]
    fn tiers_follow_authenticity_status() {
        assert_eq!(AuthenticityTier::from_status("highly_authentic"), AuthenticityTier::High);
        assert_eq!(
            AuthenticityTier::from_status("moderately_authentic"),
            AuthenticityTier::Moderate
        );
        assert_eq!(AuthenticityTier::from_status("suspicious"), AuthenticityTier::Suspicious);
        assert_eq!(AuthenticityTier::from_status(""), AuthenticityTier::Suspicious);
    }

    #[test]
    fn unknown_sentiment_is_neutral() {
        assert_eq!(SentimentTone::from_label("POSITIVE"), SentimentTone::Positive);
        assert_eq!(SentimentTone::from_label("NEGATIVE"), SentimentTone::Negative);
        assert_eq!(SentimentTone::from_label("MIXED"), SentimentTone::Neutral);
    }

    #[test]
    fn completed_status_is_case_insensitive() {
        let mut b = batch("a.json", "");
        b.status = "COMPLETED".into();
        assert!(b.is_completed());
        b.status = "Pending".into();
        assert!(!b.is_completed());
    }

    #[test]
    fn null_fields_read_as_defaults() {
        let raw = json!({
            "_id": "2",
            "batch_name": "beta.zip",
            "uploaded_at": null,
            "total_reviews": null,
            "status": null,
            "genuine_percentage": null,
            "suspicious_percentage": null
        });
        let batch: Batch = serde_json::from_value(raw).unwrap();
        assert_eq!(batch.genuine_percentage, 0.0);
        assert_eq!(batch.total_reviews, 0);
        assert_eq!(batch.status, "");
        assert_eq!(batch.upload_date(), "");

        let review: Review = serde_json::from_value(json!({
            "_id": "r1",
            "username": null,
            "rating": null,
            "authenticity": null,
            "batch_id": "b1"
        }))
        .unwrap();
        assert_eq!(review.rating, 0.0);
        assert_eq!(review.authenticity, Authenticity::default());
        assert_eq!(review.extra.get("batch_id"), Some(&json!("b1")));
    }

    #[test]
    fn upload_date_formats_iso_timestamps() {
        assert_eq!(batch("a", "2024-01-15T14:32:00.000Z").upload_date(), "2024-01-15");
        assert_eq!(batch("a", "2024-01-15T14:32:00.123").upload_date(), "2024-01-15");
        assert_eq!(batch("a", "yesterday").upload_date(), "yesterday");
    }

    #[test]
    fn file_stem_drops_last_extension() {
        assert_eq!(batch("reviews_batch_01.zip", "").file_stem(), "reviews_batch_01");
        assert_eq!(batch("archive.tar.gz", "").file_stem(), "archive.tar");
        assert_eq!(batch("noext", "").file_stem(), "noext");
        assert_eq!(batch(".hidden", "").file_stem(), ".hidden");
    }

    #[test]
    fn review_keeps_unknown_fields_and_defaults_missing_signals() {
        let raw = json!({
            "_id": "r1",
            "username": "ann",
            "rating": 4,
            "feedback": "fine",
            "batch_id": "b1",
            "authenticity": { "score": 0.91, "status": "highly_authentic" }
        });
        let review: Review = serde_json::from_value(raw).unwrap();
        assert_eq!(review.extra.get("batch_id"), Some(&json!("b1")));
        assert_eq!(review.sentiment, Sentiment::default());
        assert!(review.is_genuine());

        let back = serde_json::to_value(&review).unwrap();
        assert_eq!(back["batch_id"], json!("b1"));
        assert_eq!(back["_id"], json!("r1"));
    }
}
