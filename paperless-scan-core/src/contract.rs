//! # contract: seams between the core and the outside world
//!
//! Two traits isolate the parts of the system that talk to things we do not control:
//!
//! - [`HttpTransport`] performs the raw HTTP exchanges with Paperless-ngx.
//!   [`crate::paperless::PaperlessClient`] owns all request construction and response
//!   interpretation; a transport only moves bytes and reports the status code.
//! - [`MergeStrategy`] concatenates PDF files with an external tool.
//!   [`crate::combine::PageCombiner`] walks an ordered list of strategies until one succeeds.
//!
//! Both traits are annotated for `mockall` so tests can script remote and tool behaviour.
//!
//! The response shapes Paperless-ngx sends back (tag lists, upload acknowledgements) are
//! decoded here into explicit types instead of probing JSON fields ad hoc.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Boxed error returned by transports and merge tools.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Status and body of a completed HTTP exchange. The body is empty if it could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        HttpResponse {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A finished document ready for the intake endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentUpload {
    /// Basename sent as the multipart file name.
    pub file_name: String,
    pub content: Vec<u8>,
    /// Resolved remote tag ids, one `tags` form field each.
    pub tag_ids: Vec<i64>,
}

/// Raw HTTP access to Paperless-ngx.
///
/// Implementations attach the `Authorization: Token <token>` header and the fixed
/// `Accept: application/json; version=6` header to every request.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, token: &str) -> Result<HttpResponse, TransportError>;

    async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: serde_json::Value,
    ) -> Result<HttpResponse, TransportError>;

    /// Sends `document` as the binary `document` field plus one `tags` field per id.
    async fn post_multipart(
        &self,
        url: &str,
        token: &str,
        document: DocumentUpload,
    ) -> Result<HttpResponse, TransportError>;
}

/// One way of concatenating PDFs, in argument order, into `output`.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait MergeStrategy: Send + Sync {
    /// Short tool name used in logs and error messages.
    fn name(&self) -> String;

    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), TransportError>;
}

/// A tag that already exists in Paperless-ngx.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteTag {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// First page of `GET /api/tags/`.
#[derive(Debug, Deserialize)]
pub struct TagList {
    #[serde(default)]
    pub results: Vec<RemoteTag>,
}

impl TagList {
    /// Case-insensitive lookup by name.
    pub fn find(&self, name: &str) -> Option<&RemoteTag> {
        let wanted = name.to_lowercase();
        self.results
            .iter()
            .find(|tag| !tag.name.is_empty() && tag.name.to_lowercase() == wanted)
    }
}

/// Body of a successful `POST /api/tags/`.
#[derive(Debug, Deserialize)]
pub struct CreatedTag {
    pub id: i64,
}

/// Body of `GET /api/documents/`; only the count is of interest.
#[derive(Debug, Deserialize)]
pub struct DocumentCount {
    #[serde(default)]
    pub count: u64,
}

/// Error payload Paperless-ngx returns on rejected requests.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: Option<serde_json::Value>,
    pub error: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Best-effort message: `detail`, then `error`, then the raw body.
    pub fn describe(raw: &str) -> String {
        let parsed = match serde_json::from_str::<ErrorBody>(raw) {
            Ok(parsed) => parsed,
            Err(_) => return raw.to_string(),
        };
        match parsed.detail.or(parsed.error) {
            Some(serde_json::Value::String(message)) => message,
            Some(serde_json::Value::Null) | None => raw.to_string(),
            Some(other) => other.to_string(),
        }
    }
}

/// Acknowledgement from the intake endpoint.
///
/// A 2xx only means the document was accepted for asynchronous consumption; the task id is
/// informational and is never polled.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadAck {
    /// The body was a bare JSON string holding the consumption task UUID.
    BareTaskId(String),
    /// The body was an object carrying a `task_id` field.
    TaskIdField(String),
    Unrecognized,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAck {
    Bare(String),
    WithTaskId { task_id: String },
    Other(serde_json::Value),
}

impl UploadAck {
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<RawAck>(body) {
            Ok(RawAck::Bare(id)) if !id.is_empty() => UploadAck::BareTaskId(id),
            Ok(RawAck::WithTaskId { task_id }) if !task_id.is_empty() => {
                UploadAck::TaskIdField(task_id)
            }
            Ok(RawAck::Bare(_)) | Ok(RawAck::WithTaskId { .. }) | Ok(RawAck::Other(_)) => {
                UploadAck::Unrecognized
            }
            Err(_) => UploadAck::Unrecognized,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            UploadAck::BareTaskId(id) | UploadAck::TaskIdField(id) => Some(id),
            UploadAck::Unrecognized => None,
        }
    }
}

/// Outcome of the connectivity check. Never an `Err`: failures are carried in `error`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStatus {
    pub success: bool,
    pub error: Option<String>,
}

impl ConnectionStatus {
    pub fn ok() -> Self {
        ConnectionStatus {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        ConnectionStatus {
            success: false,
            error: Some(error.into()),
        }
    }
}
