///
/// This module implements the CLI for paperless-scan: command parsing, wiring settings into the
/// core components, and printing results for the operator.
///
/// All business logic (page store, combining, uploading) lives in [`paperless-scan-core`].
/// This module is strictly CLI glue.
///
/// ## How To Use
/// - From the shell: `paperless-scan --config config/config.yaml list`, see `--help`.
/// - Programmatically or from tests: call [`run`] with a constructed [`Cli`].
///
/// [`paperless-scan-core`]: ../../paperless-scan-core/
use crate::load_config::load_config;
use anyhow::Result;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use paperless_scan_core::combine::PageCombiner;
use paperless_scan_core::pages::{format_size, PageStore};
use paperless_scan_core::paperless::PaperlessClient;
use paperless_scan_core::settings::SettingsProvider;
use paperless_scan_core::submit::submit_pages;
use std::path::PathBuf;
use std::sync::Arc;

/// CLI for paperless-scan: manage scanned pages and upload them to Paperless-ngx.
#[derive(Parser)]
#[clap(
    name = "paperless-scan",
    version,
    about = "Combine scanned pages and upload them to Paperless-ngx"
)]
pub struct Cli {
    /// Path to the YAML settings file
    #[clap(long, global = true, default_value = "config/config.yaml")]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List scanned pages, oldest first
    List,
    /// Delete every scanned page
    Clear,
    /// Delete the named pages
    Delete {
        #[clap(required = true)]
        pages: Vec<String>,
    },
    /// Combine the named pages, in order, into one PDF
    Combine {
        #[clap(required = true)]
        pages: Vec<String>,
        /// Output file name inside the scan directory
        #[clap(long)]
        output: Option<String>,
    },
    /// Upload a PDF to Paperless-ngx
    Upload { path: PathBuf },
    /// Combine pages, upload the result and delete the consumed pages
    Submit {
        /// Pages to submit; defaults to every listed page
        pages: Vec<String>,
    },
    /// Check settings and reachability of Paperless-ngx
    TestConnection,
    /// Validate the settings file
    CheckConfig,
}

/// Async CLI entrypoint for main() and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let settings = load_config(&cli.config)?;
    settings.trace_loaded();
    let settings: Arc<dyn SettingsProvider> = Arc::new(settings);
    let store = PageStore::new(settings.clone());

    match cli.command {
        Commands::List => {
            let pages = store.list_pages();
            if pages.is_empty() {
                println!("No scanned pages in {}", store.output_dir().display());
            }
            for page in pages {
                let modified: DateTime<Local> = page.timestamp.into();
                println!(
                    "{}\t{}\t{}",
                    page.filename,
                    format_size(page.size),
                    modified.format("%Y-%m-%d %H:%M:%S")
                );
            }
            Ok(())
        }
        Commands::Clear => {
            let report = store.clear_all_pages();
            println!("Deleted {} pages", report.deleted_count);
            Ok(())
        }
        Commands::Delete { pages } => {
            let report = store.delete_pages(&pages);
            println!("Deleted {} of {} pages", report.deleted_count, pages.len());
            Ok(())
        }
        Commands::Combine { pages, output } => {
            let combiner = PageCombiner::new(settings);
            let path = combiner.combine(&pages, output.as_deref()).await?;
            println!("Combined {} pages into {}", pages.len(), path.display());
            Ok(())
        }
        Commands::Upload { path } => {
            let client = PaperlessClient::new(settings);
            let ack = client.upload(&path).await?;
            match ack.task_id() {
                Some(task_id) => println!("Upload accepted, task {task_id}"),
                None => println!("Upload accepted"),
            }
            Ok(())
        }
        Commands::Submit { pages } => {
            let pages = if pages.is_empty() {
                store.list_pages().into_iter().map(|p| p.filename).collect()
            } else {
                pages
            };
            if pages.is_empty() {
                anyhow::bail!("No pages to submit");
            }
            let combiner = PageCombiner::new(settings.clone());
            let client = PaperlessClient::new(settings);
            let report = submit_pages(&store, &combiner, &client, &pages).await?;
            tracing::info!(command = "submit", ?report, "Submit complete");
            println!(
                "Submitted {} pages, removed {} page files",
                pages.len(),
                report.deleted_count
            );
            Ok(())
        }
        Commands::TestConnection => {
            let client = PaperlessClient::new(settings);
            let status = client.test_connection().await;
            if status.success {
                println!("Connection to Paperless-ngx successful");
                Ok(())
            } else {
                let reason = status.error.unwrap_or_else(|| "unknown error".to_string());
                Err(anyhow::anyhow!("Connection test failed: {reason}"))
            }
        }
        Commands::CheckConfig => {
            let errors = settings.validate();
            if errors.is_empty() {
                println!("Configuration is valid");
                Ok(())
            } else {
                for e in &errors {
                    eprintln!("- {e}");
                }
                Err(anyhow::anyhow!("Configuration error: {}", errors.join(", ")))
            }
        }
    }
}
