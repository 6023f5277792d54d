//! Error taxonomy shared by the page store, combiner and upload client.
//!
//! Every variant renders as a plain descriptive string; there is no retry model.
//! Callers that want a retry re-invoke the whole operation.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    /// One entry per violated settings rule, reported before any I/O.
    #[error("Configuration error: {}", .0.join(", "))]
    Configuration(Vec<String>),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("No pages to combine")]
    NoPages,

    /// A file name with path components, which would escape the scan directory.
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Output file already exists: {}", .0.display())]
    OutputExists(PathBuf),

    /// Non-2xx response from Paperless-ngx. `message` is empty when nothing could be extracted.
    #[error("Paperless API error: HTTP {status}{}", format_message(.message))]
    RemoteService { status: u16, message: String },

    /// Every merge strategy failed; one entry per attempted tool.
    #[error("Failed to combine pages: {}", .0.join("; "))]
    ToolExecution(Vec<String>),

    #[error("Combined PDF was not created: {}", .0.display())]
    OutputMissing(PathBuf),

    #[error("Transport error: {0}")]
    Transport(String),

    /// A 2xx response whose body did not have the expected shape.
    #[error("Unexpected response from Paperless: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_message(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
