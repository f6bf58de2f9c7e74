pub mod http;

pub use http::HttpBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a backend call failed.
///
/// `Application` means the backend answered and reported a logical error in
/// its payload — the text is shown to the user as-is. `Transport` covers
/// everything else: unreachable host, bad status without an error payload,
/// unparsable body, timeout.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend error: {0}")]
    Application(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}

/// A course as supplied by the backend. Read-only; used to pre-fill the
/// query template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
}

/// The assistant backend the chat session talks to.
///
/// Implemented over HTTP by [`HttpBackend`]; tests substitute their own.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Fetch the user's active courses. A missing or empty course list is
    /// an empty `Vec`, not an error.
    async fn fetch_courses(&self) -> Result<Vec<Course>, BackendError>;

    /// Send a chat query and return the assistant's reply body.
    async fn send_query(&self, query: &str) -> Result<String, BackendError>;

    /// Ask the backend process to shut itself down.
    async fn request_shutdown(&self) -> Result<(), BackendError>;

    /// Check whether the backend is reachable.
    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_error_carries_backend_text() {
        let err = BackendError::Application("course not found".into());
        assert_eq!(err.to_string(), "backend error: course not found");
    }

    #[test]
    fn course_deserializes_from_wire_shape() {
        let course: Course = serde_json::from_str(r#"{"id": 42, "name": "Linear Algebra"}"#).unwrap();
        assert_eq!(course.id, 42);
        assert_eq!(course.name, "Linear Algebra");
    }
}
