/// `load_config` module: loads the YAML settings file and injects secrets from the environment.
///
/// This is the only place where user-supplied configuration is parsed into
/// [`paperless_scan_core::settings::Settings`].
///
/// # Responsibilities
/// - Parse the YAML file; keys that are absent take their defaults
/// - Treat a missing file as "all defaults", the way a fresh install starts out
/// - Overlay environment variables, so the API token never has to live in the file
///
/// Validation is not performed here. Each core operation validates the snapshot it uses, and
/// the `check-config` subcommand reports the rules up front.
///
/// # Errors
/// Read and parse failures are `anyhow::Error`s surfaced at the CLI boundary.
use anyhow::Result;
use paperless_scan_core::settings::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const TOKEN_ENV: &str = "PAPERLESS_API_TOKEN";
pub const URL_ENV: &str = "PAPERLESS_API_URL";
pub const OUTPUT_DIR_ENV: &str = "SCAN_OUTPUT_DIR";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let mut settings = if !path_ref.exists() {
        info!(config_path = ?path_ref, "Config file not found, using defaults");
        Settings::default()
    } else {
        let config_content = match fs::read_to_string(path_ref) {
            Ok(content) => content,
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
                return Err(anyhow::anyhow!(
                    "Failed to read config file {:?}: {}",
                    path_ref,
                    e
                ));
            }
        };

        if config_content.trim().is_empty() {
            Settings::default()
        } else {
            match serde_yaml::from_str::<Settings>(&config_content) {
                Ok(settings) => {
                    info!(config_path = ?path_ref, "Parsed config YAML successfully");
                    settings
                }
                Err(e) => {
                    error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                    return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
                }
            }
        }
    };

    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Some(token) = non_empty_var(TOKEN_ENV) {
        info!("{TOKEN_ENV} found in env");
        settings.paperless_api_token = token;
    }
    if let Some(url) = non_empty_var(URL_ENV) {
        info!(url = %url, "{URL_ENV} found in env");
        settings.paperless_api_url = url;
    }
    if let Some(dir) = non_empty_var(OUTPUT_DIR_ENV) {
        info!(dir = %dir, "{OUTPUT_DIR_ENV} found in env");
        settings.scan_output_dir = PathBuf::from(dir);
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
