//! Page combiner: merges an ordered list of pages into one PDF using external tools.
//!
//! Strategies are tried in order until one reports success; `pdftk` first, Ghostscript as
//! the fallback. A tool reporting success is not trusted on its own: the output file must
//! exist afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::contract::{MergeStrategy, TransportError};
use crate::error::{Result, ScanError};
use crate::pages::is_plain_file_name;
use crate::settings::SettingsProvider;

/// `pdftk <inputs...> cat output <output>`
pub struct PdftkMerge {
    program: String,
}

impl PdftkMerge {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PdftkMerge {
    fn default() -> Self {
        Self::with_program("pdftk")
    }
}

#[async_trait]
impl MergeStrategy for PdftkMerge {
    fn name(&self) -> String {
        "pdftk".to_string()
    }

    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> std::result::Result<(), TransportError> {
        let mut command = Command::new(&self.program);
        command.args(inputs).arg("cat").arg("output").arg(output);
        run_tool(&self.program, command).await
    }
}

/// `gs -dNOPAUSE -sDEVICE=pdfwrite -sOUTPUTFILE=<output> -dBATCH <inputs...>`
pub struct GhostscriptMerge {
    program: String,
}

impl GhostscriptMerge {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GhostscriptMerge {
    fn default() -> Self {
        Self::with_program("gs")
    }
}

#[async_trait]
impl MergeStrategy for GhostscriptMerge {
    fn name(&self) -> String {
        "ghostscript".to_string()
    }

    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> std::result::Result<(), TransportError> {
        let mut output_arg = std::ffi::OsString::from("-sOUTPUTFILE=");
        output_arg.push(output);

        let mut command = Command::new(&self.program);
        command
            .arg("-dNOPAUSE")
            .arg("-sDEVICE=pdfwrite")
            .arg(output_arg)
            .arg("-dBATCH")
            .args(inputs);
        run_tool(&self.program, command).await
    }
}

async fn run_tool(program: &str, mut command: Command) -> std::result::Result<(), TransportError> {
    let output = command
        .output()
        .await
        .map_err(|e| format!("failed to launch {program}: {e}"))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        Err(format!("{program} exited with {}", output.status).into())
    } else {
        Err(format!("{program} exited with {}: {stderr}", output.status).into())
    }
}

/// Default output name, e.g. `combined-2024-05-01T10-15-30-123Z.pdf`.
pub fn default_output_name() -> String {
    let timestamp = Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("combined-{timestamp}.pdf")
}

pub struct PageCombiner {
    settings: Arc<dyn SettingsProvider>,
    strategies: Vec<Box<dyn MergeStrategy>>,
}

impl PageCombiner {
    /// Combiner using `pdftk`, falling back to Ghostscript.
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self::with_strategies(
            settings,
            vec![
                Box::new(PdftkMerge::default()),
                Box::new(GhostscriptMerge::default()),
            ],
        )
    }

    pub fn with_strategies(
        settings: Arc<dyn SettingsProvider>,
        strategies: Vec<Box<dyn MergeStrategy>>,
    ) -> Self {
        Self {
            settings,
            strategies,
        }
    }

    /// Merges `page_filenames` (relative to the output directory, in order) and returns the
    /// path of the combined document.
    pub async fn combine<S: AsRef<str>>(
        &self,
        page_filenames: &[S],
        output_filename: Option<&str>,
    ) -> Result<PathBuf> {
        if page_filenames.is_empty() {
            return Err(ScanError::NoPages);
        }

        let dir = self.settings.get().scan_output_dir;
        let mut inputs = Vec::with_capacity(page_filenames.len());
        for filename in page_filenames {
            let filename = filename.as_ref();
            if !is_plain_file_name(filename) {
                error!(file = %filename, "Page name points outside the scan directory");
                return Err(ScanError::InvalidName(filename.to_string()));
            }
            let path = dir.join(filename);
            if !path.exists() {
                error!(file = %filename, "Page to combine is missing");
                return Err(ScanError::NotFound(filename.to_string()));
            }
            inputs.push(path);
        }

        let output_name = output_filename
            .map(str::to_string)
            .unwrap_or_else(default_output_name);
        if !is_plain_file_name(&output_name) {
            error!(output = %output_name, "Output name points outside the scan directory");
            return Err(ScanError::InvalidName(output_name));
        }
        let output_path = dir.join(&output_name);
        // Never overwrite: the file could be a page, and its presence would mask a silent tool.
        if output_path.exists() {
            error!(output = %output_path.display(), "Combined output already exists");
            return Err(ScanError::OutputExists(output_path));
        }

        info!(pages = inputs.len(), output = %output_name, "Combining pages");

        let mut failures = Vec::new();
        let mut merged_with = None;
        for (attempt, strategy) in self.strategies.iter().enumerate() {
            if attempt > 0 {
                warn!(tool = %strategy.name(), "Falling back to next merge tool");
            }
            match strategy.merge(&inputs, &output_path).await {
                Ok(()) => {
                    merged_with = Some(strategy.name());
                    break;
                }
                Err(e) => {
                    warn!(tool = %strategy.name(), error = %e, "Merge tool failed");
                    failures.push(format!("{}: {e}", strategy.name()));
                }
            }
        }

        let Some(tool) = merged_with else {
            if failures.is_empty() {
                failures.push("no merge tool configured".to_string());
            }
            // Output did not exist before the merge, so anything here is a partial file.
            if output_path.exists() {
                if let Err(e) = std::fs::remove_file(&output_path) {
                    warn!(output = %output_path.display(), error = %e, "Could not remove partial output");
                }
            }
            let err = ScanError::ToolExecution(failures);
            error!(error = %err, "Error combining pages");
            return Err(err);
        };

        if !output_path.exists() {
            error!(tool = %tool, output = %output_path.display(), "Merge tool reported success but produced no file");
            return Err(ScanError::OutputMissing(output_path));
        }

        info!(tool = %tool, output = %output_path.display(), "Successfully combined pages");
        Ok(output_path)
    }
}
