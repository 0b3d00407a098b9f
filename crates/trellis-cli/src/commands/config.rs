//! `trellis config`: inspect configuration values.

use serde_json::Value;

use crate::{
    cli::ConfigCommands,
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

/// Dispatch to the correct config subcommand.
pub fn execute(cmd: ConfigCommands, config: &AppConfig, output: &OutputManager) -> CliResult<()> {
    match cmd {
        ConfigCommands::Get { key } => {
            let value = get_config_value(config, &key)?;
            output.raw(&format!("{value}\n"))?;
        }

        ConfigCommands::List => {
            let serialised = toml::to_string_pretty(config)
                .with_cli_context(|| "Failed to serialise config")?;
            output.raw(&serialised)?;
        }

        ConfigCommands::Path => {
            output.raw(&format!("{}\n", AppConfig::config_path().display()))?;
        }
    }

    Ok(())
}

// ── helpers ───────────────────────────────────────────────────────────────────

/// Look up a dotted key such as `database.engine`. Scalars print bare,
/// lists and sections print as JSON.
fn get_config_value(config: &AppConfig, key: &str) -> CliResult<String> {
    let tree = serde_json::to_value(config).map_err(|e| CliError::ConfigError {
        message: format!("Failed to serialise config: {e}"),
        source: Some(Box::new(e)),
    })?;

    let value = key
        .split('.')
        .try_fold(&tree, |node, part| node.get(part))
        .ok_or_else(|| CliError::InvalidInput {
            message: format!("unknown config key '{key}' (see: trellis config list)"),
            source: None,
        })?;

    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_known_keys() {
        let cfg = AppConfig::default();
        assert_eq!(get_config_value(&cfg, "project.python").unwrap(), "python3");
        assert_eq!(get_config_value(&cfg, "database.engine").unwrap(), "sqlite3");
        assert_eq!(get_config_value(&cfg, "output.no_color").unwrap(), "false");
        assert_eq!(get_config_value(&cfg, "email.port").unwrap(), "587");
    }

    #[test]
    fn unset_optional_prints_empty() {
        let cfg = AppConfig::default();
        assert_eq!(get_config_value(&cfg, "database.name").unwrap(), "");
    }

    #[test]
    fn lists_print_as_json() {
        let cfg = AppConfig::default();
        assert_eq!(
            get_config_value(&cfg, "project.allowed_hosts").unwrap(),
            r#"["localhost","127.0.0.1"]"#
        );
    }

    #[test]
    fn get_unknown_key_is_error() {
        let cfg = AppConfig::default();
        assert!(matches!(
            get_config_value(&cfg, "project.does_not_exist"),
            Err(CliError::InvalidInput { .. })
        ));
    }
}
