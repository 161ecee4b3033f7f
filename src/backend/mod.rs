mod models;

pub use models::*;

use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid backend url {url:?}: {message}")]
    InvalidBaseUrl { url: String, message: String },
    #[error("{0:?} is not a batch id")]
    InvalidId(String),
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} answered {status}")]
    Status { endpoint: String, status: StatusCode },
    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl BackendError {
    /// Message shown to the user in place of the failed content.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidBaseUrl { .. } | Self::Transport { .. } => {
                "Could not reach the analysis service"
            }
            Self::InvalidId(_) => "Batch not found",
            Self::Status { status, .. } if *status == StatusCode::NOT_FOUND => "Batch not found",
            Self::Status { .. } | Self::Decode { .. } => "Failed to fetch batch data",
        }
    }
}

/// Thin client for the remote detection service.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let invalid = |message: String| BackendError::InvalidBaseUrl {
            url: base_url.to_string(),
            message,
        };
        let base_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("not a hierarchical url".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| BackendError::Transport {
                endpoint: base_url.to_string(),
                source,
            })?;

        Ok(Self { client, base_url })
    }

    /// `GET /batch`, optionally filtered by processing status on the backend.
    pub async fn list_batches(&self, status: Option<&str>) -> Result<Vec<Batch>, BackendError> {
        let mut request = self.client.get(self.url(&["batch"]));
        if let Some(status) = status {
            request = request.query(&[("status", status)]);
        }
        self.send_json(Method::GET, "/batch", request).await
    }

    pub async fn get_batch(&self, id: &str) -> Result<BatchDetail, BackendError> {
        let url = self.batch_url(id)?;
        let endpoint = url.path().to_string();
        self.send_json(Method::GET, &endpoint, self.client.get(url)).await
    }

    pub async fn delete_batch(&self, id: &str) -> Result<(), BackendError> {
        let url = self.batch_url(id)?;
        let endpoint = url.path().to_string();
        self.send(Method::DELETE, &endpoint, self.client.delete(url)).await?;
        Ok(())
    }

    /// `POST /reviews`. The acknowledgement body is returned as-is.
    pub async fn create_batch(&self, batch: &NewBatch) -> Result<serde_json::Value, BackendError> {
        let request = self.client.post(self.url(&["reviews"])).json(batch);
        let response = self.send(Method::POST, "/reviews", request).await?;
        let text = response.text().await.map_err(|source| BackendError::Transport {
            endpoint: "/reviews".to_string(),
            source,
        })?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| BackendError::Decode {
            endpoint: "/reviews".to_string(),
            message: e.to_string(),
        })
    }

    /// Base url with `segments` appended, each percent-encoded as one segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// `/batch/:id`. Ids are opaque to the dashboard but may never name a
    /// different endpoint.
    fn batch_url(&self, id: &str) -> Result<Url, BackendError> {
        if id.is_empty() || id == "." || id == ".." {
            return Err(BackendError::InvalidId(id.to_string()));
        }
        Ok(self.url(&["batch", id]))
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, BackendError> {
        debug!("{} {}", method, endpoint);

        let response = request.send().await.map_err(|source| {
            warn!("{} {} failed: {}", method, endpoint, source);
            BackendError::Transport {
                endpoint: endpoint.to_string(),
                source,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} {} answered {}", method, endpoint, status);
            return Err(BackendError::Status {
                endpoint: endpoint.to_string(),
                status,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = self.send(method, endpoint, request).await?;
        let text = response.text().await.map_err(|source| BackendError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|e| {
            warn!("Undecodable body from {}: {}", endpoint, e);
            BackendError::Decode {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BackendClient {
        BackendClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn list_batches_passes_status_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/batch"))
            .and(query_param("status", "Pending"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "_id": "7", "batch_name": "q.json", "status": "Pending", "total_reviews": 3 }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let batches = client(&server).list_batches(Some("Pending")).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].id, "7");
        assert_eq!(batches[0].genuine_percentage, 0.0);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/batch"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server).list_batches(None).await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.user_message(), "Failed to fetch batch data");
    }

    #[tokio::test]
    async fn get_batch_reads_batch_and_reviews() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/batch/b1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "batch": { "_id": "b1", "batch_name": "b1.xml", "status": "Completed" },
                "reviews": [
                    { "_id": "r1", "username": "ann", "authenticity": { "score": 0.9, "status": "highly_authentic" } }
                ]
            })))
            .mount(&server)
            .await;

        let detail = client(&server).get_batch("b1").await.unwrap();
        assert_eq!(detail.batch.batch_name, "b1.xml");
        assert_eq!(detail.reviews.len(), 1);
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/batch/b1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).get_batch("b1").await.unwrap_err();
        assert!(matches!(err, BackendError::Decode { .. }));
    }

    #[tokio::test]
    async fn create_batch_posts_name_and_reviews() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reviews"))
            .and(body_json(json!({
                "batch_name": "shop.json",
                "reviews": [{ "username": "ann", "feedback": "ok" }]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "batch_id": "n1" })))
            .expect(1)
            .mount(&server)
            .await;

        let ack = client(&server)
            .create_batch(&NewBatch {
                batch_name: "shop.json".into(),
                reviews: vec![json!({ "username": "ann", "feedback": "ok" })],
            })
            .await
            .unwrap();
        assert_eq!(ack["batch_id"], "n1");
    }

    #[tokio::test]
    async fn delete_batch_reports_missing_batch() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/batch/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server).delete_batch("gone").await.unwrap_err();
        assert_eq!(err.user_message(), "Batch not found");
    }

    #[tokio::test]
    async fn batch_id_stays_inside_batch_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/batch/..%2Freviews"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/reviews"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        client(&server).delete_batch("../reviews").await.unwrap();
    }

    #[tokio::test]
    async fn dot_segment_ids_are_never_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server).get_batch("..").await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidId(_)));
        assert_eq!(err.user_message(), "Batch not found");
    }

    #[test]
    fn base_url_must_be_hierarchical() {
        assert!(BackendClient::new("not a url", Duration::from_secs(1)).is_err());
        assert!(BackendClient::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
    }
}
