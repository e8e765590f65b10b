//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{bail, Context, Result};
use std::path::Path;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let updated = set_value(&settings, key, value)?;
            updated.save_to(&config_path.to_path_buf())?;
            Output::success(&format!("Set {} = {}", key, value));
        }

        ConfigAction::Edit => {
            if !config_path.exists() {
                settings.save_to(&config_path.to_path_buf())?;
                Output::info(&format!("Created default config at {:?}", config_path));
            }

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

            Output::info(&format!("Opening config in {}...", editor));

            let status = std::process::Command::new(&editor).arg(config_path).status();

            match status {
                Ok(s) if s.success() => {
                    Output::success("Config saved.");
                }
                Ok(_) => {
                    Output::warning("Editor exited with non-zero status.");
                }
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", config_path));
                }
            }
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }

        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                Output::warning(&format!("Config already exists at {:?}", config_path));
                Output::info("Use --force to overwrite it with defaults.");
                return Ok(());
            }
            Settings::default().save_to(&config_path.to_path_buf())?;
            Output::success(&format!("Wrote default config to {:?}", config_path));
        }
    }

    Ok(())
}

/// Return a copy of `settings` with the dotted `key` set to `value`.
///
/// The value is parsed as a TOML literal when possible (numbers, booleans)
/// and taken as a plain string otherwise. The result is validated.
fn set_value(settings: &Settings, key: &str, value: &str) -> Result<Settings> {
    let mut root = toml::Value::try_from(settings).context("Failed to serialize config")?;

    let (path, field) = match key.rsplit_once('.') {
        Some((path, field)) => (Some(path), field),
        None => (None, key),
    };

    let mut table = root
        .as_table_mut()
        .context("Configuration is not a table")?;
    if let Some(path) = path {
        for part in path.split('.') {
            table = table
                .get_mut(part)
                .and_then(toml::Value::as_table_mut)
                .with_context(|| format!("Unknown configuration section '{}'", part))?;
        }
    }

    if table.get(field).is_some_and(toml::Value::is_table) {
        bail!("'{}' is a section, not a value", key);
    }
    table.insert(field.to_string(), parse_value(value));

    let updated: Settings = root
        .try_into()
        .with_context(|| format!("Invalid value for '{}': {}", key, value))?;

    // Unset optional keys are absent from the serialized form, so a key is
    // only known if it survives a round trip.
    if !has_key(&toml::Value::try_from(&updated)?, key) {
        bail!("Unknown configuration key '{}'", key);
    }

    updated.validate()?;
    Ok(updated)
}

fn has_key(root: &toml::Value, key: &str) -> bool {
    key.split('.')
        .try_fold(root, |value, part| value.get(part))
        .is_some()
}

fn parse_value(value: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("v = {}", value))
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| toml::Value::String(value.to_string()))
}
