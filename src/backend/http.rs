use super::{AssistantBackend, BackendError, Course};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// HTTP implementation of [`AssistantBackend`] — JSON over the backend's
/// three endpoints: `GET /api/courses`, `POST /api/query`,
/// `POST /api/shutdown`.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Read a response body as JSON, surfacing an `error` field from ANY
    /// status as an application error. A non-2xx response without a
    /// readable error payload is a transport failure.
    async fn read_json(response: reqwest::Response) -> Result<Value, BackendError> {
        let status = response.status();
        let body: Result<Value, _> = response.json().await;

        if let Ok(ref value) = body {
            if let Some(error) = value.get("error").and_then(Value::as_str) {
                return Err(BackendError::Application(error.to_string()));
            }
        }

        if !status.is_success() {
            return Err(BackendError::Transport(format!(
                "backend returned status {status}"
            )));
        }

        body.map_err(|e| BackendError::Transport(format!("malformed response body: {e}")))
    }
}

#[async_trait]
impl AssistantBackend for HttpBackend {
    async fn fetch_courses(&self) -> Result<Vec<Course>, BackendError> {
        let response = self.client.get(self.endpoint("/api/courses")).send().await?;
        let body = Self::read_json(response).await?;

        // A missing `courses` field is tolerated as an empty list.
        match body.get("courses") {
            Some(courses) => serde_json::from_value(courses.clone())
                .map_err(|e| BackendError::Transport(format!("malformed course list: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    async fn send_query(&self, query: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.endpoint("/api/query"))
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await?;
        let body = Self::read_json(response).await?;

        body.get("response")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| {
                BackendError::Transport("response payload missing `response` field".to_string())
            })
    }

    async fn request_shutdown(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.endpoint("/api/shutdown"))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::Transport(format!(
                "shutdown request returned status {}",
                response.status()
            )))
        }
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(self.endpoint("/api/courses"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
