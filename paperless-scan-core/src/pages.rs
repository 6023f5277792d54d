//! Page store: the authoritative view of which scanned pages exist in the output directory.
//!
//! Pages are files named `scan-*.pdf`. Zero-byte files are left behind by interrupted scans;
//! any enumeration deletes them on sight so they are never surfaced or counted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, error, info, warn};

use crate::settings::SettingsProvider;

pub const PAGE_PREFIX: &str = "scan-";
pub const PAGE_EXTENSION: &str = ".pdf";

/// One page file on disk. `size` is always non-zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedPage {
    pub filename: String,
    pub filepath: PathBuf,
    /// Last modification time; pages are ordered by it.
    pub timestamp: SystemTime,
    pub size: u64,
}

/// Result of a bulk delete. Per-file failures only reduce `deleted_count`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteReport {
    pub success: bool,
    pub deleted_count: usize,
    pub error: Option<String>,
}

impl DeleteReport {
    fn succeeded(deleted_count: usize) -> Self {
        DeleteReport {
            success: true,
            deleted_count,
            error: None,
        }
    }
}

pub struct PageStore {
    settings: Arc<dyn SettingsProvider>,
}

impl PageStore {
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self { settings }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.settings.get().scan_output_dir
    }

    /// Lists usable pages, oldest first. Never fails: a missing or unreadable directory
    /// yields an empty list.
    pub fn list_pages(&self) -> Vec<ScannedPage> {
        let dir = self.output_dir();
        if !dir.exists() {
            debug!(dir = %dir.display(), "Scan directory does not exist");
            return Vec::new();
        }

        match self.scan_directory(&dir) {
            Ok(mut pages) => {
                pages.sort_by(|a, b| {
                    a.timestamp
                        .cmp(&b.timestamp)
                        .then_with(|| a.filename.cmp(&b.filename))
                });
                pages
            }
            Err(e) => {
                error!(error = %e, dir = %dir.display(), "Error reading scan directory");
                Vec::new()
            }
        }
    }

    fn scan_directory(&self, dir: &Path) -> io::Result<Vec<ScannedPage>> {
        let mut pages = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let filename = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if !is_page_name(&filename) {
                continue;
            }

            let filepath = entry.path();
            let metadata = fs::metadata(&filepath)?;
            if !metadata.is_file() {
                continue;
            }

            if metadata.len() == 0 {
                match fs::remove_file(&filepath) {
                    Ok(()) => info!(file = %filename, "Removed zero-byte scan file"),
                    Err(e) => warn!(file = %filename, error = %e, "Could not remove zero-byte scan file"),
                }
                continue;
            }

            pages.push(ScannedPage {
                filename,
                filepath,
                timestamp: metadata.modified()?,
                size: metadata.len(),
            });
        }
        Ok(pages)
    }

    /// Deletes every listed page. Listing first also prunes zero-byte files.
    pub fn clear_all_pages(&self) -> DeleteReport {
        let pages = self.list_pages();
        let deleted_count = remove_each(
            pages
                .iter()
                .map(|page| (page.filename.as_str(), page.filepath.clone())),
        );

        info!(deleted_count, "Cleared scanned pages from output directory");
        DeleteReport::succeeded(deleted_count)
    }

    /// Deletes the named files from the output directory. Names that do not exist are skipped.
    pub fn delete_pages<S: AsRef<str>>(&self, filenames: &[S]) -> DeleteReport {
        let dir = self.output_dir();
        let targets = filenames.iter().map(|f| f.as_ref()).filter_map(|filename| {
            if !is_plain_file_name(filename) {
                warn!(file = %filename, "Refusing to delete a path outside the scan directory");
                return None;
            }
            let filepath = dir.join(filename);
            filepath.exists().then_some((filename, filepath))
        });

        DeleteReport::succeeded(remove_each(targets))
    }
}

/// Removes each file, returning how many were removed. A failure is logged and skipped.
fn remove_each<'a>(targets: impl Iterator<Item = (&'a str, PathBuf)>) -> usize {
    let mut deleted_count = 0;
    for (filename, filepath) in targets {
        match fs::remove_file(&filepath) {
            Ok(()) => {
                deleted_count += 1;
                info!(file = %filename, "Deleted page");
            }
            Err(e) => warn!(file = %filename, error = %e, "Could not delete page"),
        }
    }
    deleted_count
}

fn is_page_name(filename: &str) -> bool {
    filename.starts_with(PAGE_PREFIX) && filename.ends_with(PAGE_EXTENSION)
}

/// True for a bare file name that stays inside the directory it is joined to.
pub(crate) fn is_plain_file_name(filename: &str) -> bool {
    Path::new(filename).file_name().and_then(|n| n.to_str()) == Some(filename)
}

/// Human-readable size: bytes below 1 KiB, otherwise KB or MB with one decimal.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}
