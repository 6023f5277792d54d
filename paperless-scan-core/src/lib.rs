#![doc = "paperless-scan-core: scan session management and Paperless-ngx upload logic."]

//! This crate holds everything with real failure handling: the page store that watches the scan
//! output directory, the combiner that merges pages with external PDF tools, and the client that
//! submits finished documents to Paperless-ngx.
//!
//! Settings persistence, scanner control and argument parsing live in the `paperless-scan` CLI.
//!
//! # Usage
//! Build one [`settings::Settings`], wrap it in an `Arc`, and hand it to [`pages::PageStore`],
//! [`combine::PageCombiner`] and [`paperless::PaperlessClient`]. [`submit::submit_pages`] strings
//! the three together.

pub mod combine;
pub mod contract;
pub mod error;
pub mod pages;
pub mod paperless;
pub mod settings;
pub mod submit;

pub use error::{Result, ScanError};
