use std::path::Path;

use anyhow::Context;

use crate::application::config::AppConfig;

/// Prints where the configuration comes from and its effective content.
///
/// # Errors
///
/// Returns an error if the configuration cannot be serialized.
pub fn run_config(config: &AppConfig, path: &Path) -> anyhow::Result<()> {
    println!("# {}", path.display());
    println!(
        "{}",
        toml::to_string_pretty(config).context("Failed to serialize config")?
    );
    Ok(())
}
