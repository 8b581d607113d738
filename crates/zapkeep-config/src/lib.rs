// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the zapkeep session server.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, `ZAPKEEP_*` environment overrides, and miette
//! diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use zapkeep_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("token store: {}", config.session.token_store);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::ZapkeepConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Figment errors are converted into miette diagnostics; a config that
/// deserializes cleanly then goes through semantic validation. Every
/// problem found is returned, not just the first.
pub fn load_and_validate() -> Result<ZapkeepConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => validated(config),
        Err(err) => {
            let toml_sources = collect_toml_sources();
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<ZapkeepConfig, Vec<ConfigError>> {
    if !path.exists() {
        return Err(vec![ConfigError::Other(format!(
            "config file {} does not exist",
            path.display()
        ))]);
    }

    match loader::load_config_from_path(path) {
        Ok(config) => validated(config),
        Err(err) => {
            let sources = std::fs::read_to_string(path)
                .map(|content| vec![(source_name(path), content)])
                .unwrap_or_default();
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<ZapkeepConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => validated(config),
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

fn validated(config: ZapkeepConfig) -> Result<ZapkeepConfig, Vec<ConfigError>> {
    validation::validate_config(&config)?;
    tracing::debug!(
        token_store = %config.session.token_store,
        webhook = config.webhook.url.is_some(),
        websocket = config.websocket.enabled,
        archive = config.archive.enable,
        "configuration loaded"
    );
    Ok(config)
}

/// Figment records file sources by their absolute path.
fn source_name(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut candidates = vec![std::path::PathBuf::from("zapkeep.toml")];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("zapkeep/zapkeep.toml"));
    }
    candidates.push(std::path::PathBuf::from("/etc/zapkeep/zapkeep.toml"));

    candidates
        .iter()
        .filter_map(|path| {
            std::fs::read_to_string(path)
                .ok()
                .map(|content| (source_name(path), content))
        })
        .collect()
}
