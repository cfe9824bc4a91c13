pub mod merge;
pub mod schema;

pub use schema::*;

use crate::cli::{Cli, Commands};
use crate::error::ConfigError;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Load configuration by merging global, explicit-file, and CLI sources.
/// Precedence: CLI > --config file > global config > defaults.
///
/// A missing global config is fine (defaults apply). A `--config` path that
/// cannot be read or parsed is an error, since the user asked for it.
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    // Layer 1: Global config (~/.config/calmate/calmate.toml or platform equivalent)
    let global = load_global_config();

    // Layer 2: Explicit config file
    let explicit = match cli_config_path(cli) {
        Some(path) => load_explicit_config(path)?,
        None => PartialConfig::default(),
    };

    // Layer 3: CLI args
    let cli_partial = cli_to_partial(cli);

    let config = cli_partial
        .with_fallback(explicit)
        .with_fallback(global)
        .finalize();

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Reject values that would make the session unusable.
pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.model.trim().is_empty() {
        return Err(ConfigError::Invalid {
            key: "model.name".into(),
            message: "must not be empty".into(),
        });
    }
    if config.max_tool_rounds == 0 {
        return Err(ConfigError::Invalid {
            key: "model.max_tool_rounds".into(),
            message: "must be at least 1".into(),
        });
    }
    if config.model_timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            key: "model.timeout_secs".into(),
            message: "must be at least 1".into(),
        });
    }
    if config.time_zone.trim().is_empty() {
        return Err(ConfigError::Invalid {
            key: "calendar.time_zone".into(),
            message: "must not be empty".into(),
        });
    }
    if !config.calendar_api_base.starts_with("http://")
        && !config.calendar_api_base.starts_with("https://")
    {
        return Err(ConfigError::Invalid {
            key: "calendar.api_base".into(),
            message: format!("'{}' is not an http(s) URL", config.calendar_api_base),
        });
    }
    Ok(())
}

/// The environment variable genai reads the key from for this model, if any.
/// Local providers (e.g. Ollama) need none.
pub fn required_api_key_env(model: &str) -> Option<&'static str> {
    let model = model.to_ascii_lowercase();
    if model.starts_with("gemini") {
        Some("GEMINI_API_KEY")
    } else if model.starts_with("gpt") || model.starts_with("o1") || model.starts_with("o3") || model.starts_with("o4") {
        Some("OPENAI_API_KEY")
    } else if model.starts_with("claude") {
        Some("ANTHROPIC_API_KEY")
    } else {
        None
    }
}

/// Fail early when the model's provider key is absent from the environment.
pub fn check_api_key(model: &str) -> Result<(), ConfigError> {
    check_api_key_with(model, |var| std::env::var(var).ok())
}

fn check_api_key_with(
    model: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let Some(var) = required_api_key_env(model) else {
        return Ok(());
    };
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::MissingApiKey {
            var: var.to_string(),
            model: model.to_string(),
        }),
    }
}

/// Load global config from the platform-specific config directory.
/// Returns empty PartialConfig if file not found.
fn load_global_config() -> PartialConfig {
    match global_config_path() {
        Some(p) => load_toml_file(&p).unwrap_or_default(),
        None => {
            tracing::debug!("Could not determine global config directory");
            PartialConfig::default()
        }
    }
}

fn load_explicit_config(path: &Path) -> Result<PartialConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config_file = parse_config(path, &contents)?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config_file.to_partial())
}

fn parse_config(path: &Path, contents: &str) -> Result<ConfigFile, ConfigError> {
    toml::from_str::<ConfigFile>(contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load and parse a TOML config file into a PartialConfig.
/// Returns None on file-not-found; parse errors are logged.
fn load_toml_file(path: &Path) -> Option<PartialConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match parse_config(path, &contents) {
            Ok(config_file) => {
                tracing::info!("Loaded config from {}", path.display());
                Some(config_file.to_partial())
            }
            Err(e) => {
                tracing::warn!("Config parse error: {}", e);
                None
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("Failed to read config at {}: {}", path.display(), e);
            None
        }
    }
}

/// Resolve the platform-specific global config path.
/// Linux: ~/.config/calmate/calmate.toml
/// macOS: ~/Library/Application Support/calmate/calmate.toml
fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "calmate")
        .map(|dirs| dirs.config_dir().join("calmate.toml"))
}

fn cli_config_path(cli: &Cli) -> Option<&Path> {
    match &cli.command {
        Commands::Run { config, .. } => config.as_deref(),
        Commands::Tools { config } => config.as_deref(),
        Commands::Mcp { config, .. } => config.as_deref(),
    }
}

/// Convert CLI arguments to a PartialConfig for merging.
fn cli_to_partial(cli: &Cli) -> PartialConfig {
    match &cli.command {
        Commands::Run {
            model,
            credentials,
            port,
            unknown_tool,
            config: _,
        } => PartialConfig {
            model: model.clone(),
            credentials_path: credentials.clone(),
            redirect_port: *port,
            unknown_tool_policy: *unknown_tool,
            ..Default::default()
        },
        Commands::Tools { .. } => PartialConfig::default(),
        Commands::Mcp { port, config: _ } => PartialConfig {
            mcp_port: *port,
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::UnknownToolPolicy;
    use clap::Parser;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("calmate.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn sectioned_file_flattens_into_partial() {
        let file: ConfigFile = toml::from_str(
            r#"
            [model]
            name = "gemini-2.5-flash"
            max_tool_rounds = 4
            unknown_tool_policy = "abort"

            [auth]
            credentials = "/etc/calmate/client.json"
            redirect_port = 8085

            [calendar]
            time_zone = "Europe/Paris"
            "#,
        )
        .unwrap();

        let config = file.to_partial().finalize();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.max_tool_rounds, 4);
        assert_eq!(config.unknown_tool_policy, UnknownToolPolicy::Abort);
        assert_eq!(config.credentials_path, PathBuf::from("/etc/calmate/client.json"));
        assert_eq!(config.redirect_port, 8085);
        assert_eq!(config.time_zone, "Europe/Paris");
        assert_eq!(config.shutdown_timeout_secs, 10);
    }

    #[test]
    fn cli_flags_override_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "[model]\nname = \"gpt-4o-mini\"\n[auth]\nredirect_port = 9000\n",
        );
        let cli = Cli::try_parse_from([
            "calmate",
            "run",
            "--model",
            "gemini-2.0-flash",
            "--config",
            path.to_str().unwrap(),
        ])
        .unwrap();

        let config = load_config(&cli).unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.redirect_port, 9000);
    }

    #[test]
    fn mcp_port_layers_like_other_settings() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "[mcp]\nport = 8181\n");
        let path = path.to_str().unwrap();

        let from_file = Cli::try_parse_from(["calmate", "mcp", "--config", path]).unwrap();
        assert_eq!(load_config(&from_file).unwrap().mcp_port, 8181);

        let from_flag =
            Cli::try_parse_from(["calmate", "mcp", "--port", "9191", "--config", path]).unwrap();
        assert_eq!(load_config(&from_flag).unwrap().mcp_port, 9191);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        let cli = Cli::try_parse_from(["calmate", "tools", "--config", missing.to_str().unwrap()])
            .unwrap();

        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn malformed_explicit_file_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "[model\nname = ");

        let err = load_explicit_config(&path).unwrap_err();
        match err {
            ConfigError::ParseError { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn zero_tool_rounds_is_invalid() {
        let mut config = PartialConfig::default().finalize();
        config.max_tool_rounds = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Invalid { key, .. }) if key == "model.max_tool_rounds"
        ));
    }

    #[test]
    fn api_key_env_follows_provider() {
        assert_eq!(required_api_key_env("gemini-2.0-flash"), Some("GEMINI_API_KEY"));
        assert_eq!(required_api_key_env("gpt-4o"), Some("OPENAI_API_KEY"));
        assert_eq!(required_api_key_env("claude-3-5-haiku"), Some("ANTHROPIC_API_KEY"));
        assert_eq!(required_api_key_env("llama3.2"), None);
    }

    #[test]
    fn missing_api_key_is_reported() {
        let err = check_api_key_with("gemini-2.0-flash", |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey { ref var, .. } if var == "GEMINI_API_KEY"));

        assert!(check_api_key_with("gemini-2.0-flash", |_| Some(" ".into())).is_err());
        assert!(check_api_key_with("gemini-2.0-flash", |_| Some("k".into())).is_ok());
        assert!(check_api_key_with("llama3.2", |_| None).is_ok());
    }
}
