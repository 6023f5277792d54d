//! End-to-end workflow: combine the selected pages, upload the result, then clean up.
//!
//! Steps run sequentially and stop at the first failure. Nothing on disk is deleted unless the
//! upload was accepted, so a failed submit can simply be retried.

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::combine::PageCombiner;
use crate::contract::{HttpTransport, UploadAck};
use crate::error::Result;
use crate::pages::PageStore;
use crate::paperless::PaperlessClient;

#[derive(Debug)]
pub struct SubmitReport {
    pub combined_path: PathBuf,
    pub ack: UploadAck,
    /// Number of consumed page files removed after the upload.
    pub deleted_count: usize,
}

pub async fn submit_pages<T, S>(
    store: &PageStore,
    combiner: &PageCombiner,
    client: &PaperlessClient<T>,
    pages: &[S],
) -> Result<SubmitReport>
where
    T: HttpTransport,
    S: AsRef<str>,
{
    info!(pages = pages.len(), "[SUBMIT] Starting submit");

    let combined_path = combiner.combine(pages, None).await.map_err(|e| {
        error!(error = %e, "[SUBMIT][ERROR] Combine step failed");
        e
    })?;

    let ack = client.upload(&combined_path).await.map_err(|e| {
        error!(error = %e, file = %combined_path.display(), "[SUBMIT][ERROR] Upload step failed, keeping pages");
        e
    })?;

    let report = store.delete_pages(pages);
    if report.deleted_count < pages.len() {
        warn!(
            deleted = report.deleted_count,
            requested = pages.len(),
            "[SUBMIT] Not every consumed page could be deleted"
        );
    }

    if let Some(name) = combined_path.file_name().and_then(|n| n.to_str()) {
        store.delete_pages(&[name]);
    }

    info!(
        deleted = report.deleted_count,
        task_id = ack.task_id().unwrap_or("unknown"),
        "[SUBMIT] Submit complete"
    );
    Ok(SubmitReport {
        combined_path,
        ack,
        deleted_count: report.deleted_count,
    })
}
