//! Settings snapshot consumed by every component.
//!
//! The core never mutates settings: components hold a [`SettingsProvider`] and take one
//! snapshot per operation, validating it before touching the filesystem or the network.

use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, info};

pub const MIN_RESOLUTION: u32 = 75;
pub const MAX_RESOLUTION: u32 = 1200;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_api_url")]
    pub paperless_api_url: String,
    #[serde(default)]
    pub paperless_api_token: String,
    #[serde(default = "default_output_dir")]
    pub scan_output_dir: PathBuf,
    #[serde(default = "default_resolution")]
    pub scan_resolution: u32,
    #[serde(default = "default_tags")]
    pub default_tags: Vec<String>,
    /// Direct scanner device URL, e.g. `escl:https://192.168.1.20:443`. Unused by the core.
    #[serde(default)]
    pub scanner_device_url: Option<String>,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_resolution() -> u32 {
    300
}

fn default_tags() -> Vec<String> {
    vec!["scanned".to_string(), "automated".to_string()]
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            paperless_api_url: default_api_url(),
            paperless_api_token: String::new(),
            scan_output_dir: default_output_dir(),
            scan_resolution: default_resolution(),
            default_tags: default_tags(),
            scanner_device_url: None,
        }
    }
}

fn http_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^https?://.+").expect("static regex is valid"))
}

impl Settings {
    /// Returns every violated rule as a human-readable message; empty when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.paperless_api_url.is_empty() {
            errors.push("Paperless API URL is required".to_string());
        } else if !http_url_pattern().is_match(&self.paperless_api_url) {
            errors.push("Paperless API URL must be a valid HTTP/HTTPS URL".to_string());
        }

        if self.paperless_api_token.is_empty() {
            errors.push("Paperless API Token is required".to_string());
        }

        if self.scan_output_dir.as_os_str().is_empty() {
            errors.push("Scan output directory is required".to_string());
        }

        if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&self.scan_resolution) {
            errors.push(format!(
                "Scan resolution must be between {MIN_RESOLUTION} and {MAX_RESOLUTION} DPI"
            ));
        }

        errors
    }

    /// Base URL with a single trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.paperless_api_url
            .strip_suffix('/')
            .unwrap_or(&self.paperless_api_url)
    }

    pub fn document_intake_url(&self) -> String {
        format!("{}/api/documents/post_document/", self.base_url())
    }

    pub fn documents_url(&self) -> String {
        format!("{}/api/documents/", self.base_url())
    }

    pub fn tags_url(&self) -> String {
        format!("{}/api/tags/", self.base_url())
    }

    pub fn trace_loaded(&self) {
        info!(
            api_url = %self.paperless_api_url,
            output_dir = %self.scan_output_dir.display(),
            token_set = !self.paperless_api_token.is_empty(),
            default_tags = self.default_tags.len(),
            "Loaded settings"
        );
        debug!(
            resolution = self.scan_resolution,
            scanner = self.scanner_device_url.as_deref().unwrap_or("auto"),
            "Settings detail"
        );
    }
}

/// Read-only source of settings snapshots.
pub trait SettingsProvider: Send + Sync {
    fn get(&self) -> Settings;

    fn validate(&self) -> Vec<String> {
        self.get().validate()
    }

    fn document_intake_url(&self) -> String {
        self.get().document_intake_url()
    }
}

impl SettingsProvider for Settings {
    fn get(&self) -> Settings {
        self.clone()
    }
}
