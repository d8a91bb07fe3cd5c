use clap::Parser;
use config::{
    Config as ConfigCrate, ConfigError as ConfigCrateError, Environment, File, Map, Source,
    Value,
};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_GOOGLE_TALK_DOMAIN: &str = "gmail.com";
const DEFAULT_CONNECT_AUTOMATICALLY: bool = false;
const DEFAULT_LOG_FILTER: &str = "info";
const ENV_PREFIX: &str = "ROSTER";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] ConfigCrateError),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

// Every field optional so file and environment layers can leave gaps.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
struct FileConfig {
    google_talk_domain: Option<String>,
    default_resource: Option<String>,
    connect_automatically: Option<bool>,
    log_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server domain given to newly created Google Talk accounts.
    pub google_talk_domain: String,
    /// Resource given to newly created XMPP accounts.
    pub default_resource: Option<String>,
    /// Whether newly created accounts connect as soon as they are added.
    pub connect_automatically: bool,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            google_talk_domain: DEFAULT_GOOGLE_TALK_DOMAIN.to_string(),
            default_resource: None,
            connect_automatically: DEFAULT_CONNECT_AUTOMATICALLY,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Build a contact hierarchy and print its contact tree", long_about = None)]
pub struct CliArgs {
    /// Path to a custom configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the resolved configuration and exit
    #[arg(long)]
    pub debug_config: bool,

    #[arg(long)]
    pub google_talk_domain: Option<String>,
    #[arg(long)]
    pub default_resource: Option<String>,
    #[arg(long)]
    pub connect_automatically: Option<bool>,
    #[arg(long)]
    pub log_filter: Option<String>,
}

/// Resolves configuration: CLI args > environment > config file > defaults.
pub fn load_config(args: &CliArgs) -> Result<AppConfig, ConfigError> {
    let env_source = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true);
    // Missing variables are fine; only a malformed environment is skipped.
    let env_map: Map<String, Value> = env_source.collect().unwrap_or_else(|_| Map::new());
    build_config(args, Some(env_map))
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "roster-tree").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn build_config(
    args: &CliArgs,
    overrides: Option<Map<String, Value>>,
) -> Result<AppConfig, ConfigError> {
    let config_file_path = args.config.clone().or_else(default_config_path);

    let mut builder = ConfigCrate::builder();
    if let Some(ref path) = config_file_path {
        builder = builder.add_source(File::from(path.clone()).required(false));
    }
    if let Some(overrides) = overrides {
        for (key, value) in overrides {
            builder = builder.set_override(&key, value)?;
        }
    }
    let loaded: FileConfig = builder.build()?.try_deserialize()?;

    let config = AppConfig {
        google_talk_domain: args
            .google_talk_domain
            .clone()
            .or(loaded.google_talk_domain)
            .unwrap_or_else(|| DEFAULT_GOOGLE_TALK_DOMAIN.to_string()),
        default_resource: args.default_resource.clone().or(loaded.default_resource),
        connect_automatically: args
            .connect_automatically
            .or(loaded.connect_automatically)
            .unwrap_or(DEFAULT_CONNECT_AUTOMATICALLY),
        log_filter: args
            .log_filter
            .clone()
            .or(loaded.log_filter)
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
    };

    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.google_talk_domain.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "google_talk_domain must not be empty".to_string(),
        ));
    }
    if config.log_filter.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "log_filter must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::ValueKind;
    use std::fs;
    use tempfile::TempDir;

    // Points at a file that does not exist so the user's own config is ignored.
    fn isolated_args(dir: &TempDir, extra: &[&str]) -> CliArgs {
        let missing = dir.path().join("missing.toml");
        let mut cmd = vec![
            "roster-tree".to_string(),
            "--config".to_string(),
            missing.display().to_string(),
        ];
        cmd.extend(extra.iter().map(|arg| arg.to_string()));
        CliArgs::try_parse_from(cmd).expect("Failed to parse test args")
    }

    #[test]
    fn test_default_config() {
        let dir = TempDir::new().unwrap();
        let config = build_config(&isolated_args(&dir, &[]), None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.google_talk_domain, "gmail.com");
    }

    #[test]
    fn test_file_values_are_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "google_talk_domain = \"talk.example.com\"\nconnect_automatically = true\n",
        )
        .unwrap();

        let args = CliArgs::try_parse_from(["roster-tree", "--config", path.to_str().unwrap()])
            .unwrap();
        let config = build_config(&args, None).unwrap();
        assert_eq!(config.google_talk_domain, "talk.example.com");
        assert!(config.connect_automatically);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_env_override_beats_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "log_filter = \"warn\"\n").unwrap();

        let mut overrides = Map::new();
        overrides.insert(
            "log_filter".to_string(),
            Value::new(None, ValueKind::String("debug".to_string())),
        );

        let args = CliArgs::try_parse_from(["roster-tree", "--config", path.to_str().unwrap()])
            .unwrap();
        let config = build_config(&args, Some(overrides)).unwrap();
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_arg_override_beats_env() {
        let dir = TempDir::new().unwrap();
        let mut overrides = Map::new();
        overrides.insert(
            "default_resource".to_string(),
            Value::new(None, ValueKind::String("laptop".to_string())),
        );

        let args = isolated_args(&dir, &["--default-resource", "desktop"]);
        let config = build_config(&args, Some(overrides)).unwrap();
        assert_eq!(config.default_resource.as_deref(), Some("desktop"));
    }

    #[test]
    fn test_empty_domain_is_rejected() {
        let dir = TempDir::new().unwrap();
        let args = isolated_args(&dir, &["--google-talk-domain", " "]);
        let result = build_config(&args, None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
