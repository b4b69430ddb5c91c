use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::commands::ReservedNames;
use crate::store;

/// Name of the project-level override file.
pub const PROJECT_CONFIG_FILE: &str = ".promptdeck";

/// Status of config file loading
#[derive(Debug, Clone)]
pub enum ConfigLoadStatus {
    /// Config loaded successfully from existing file
    Loaded,
    /// No config file, using defaults
    Defaults,
    /// Error occurred during loading, using defaults
    Error(String),
}

/// Prompt directory configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Project prompts directory, relative to the project root.
    /// Defaults to `.codex/prompts`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_prompts: Option<String>,
    /// Personal prompts directory. Defaults to `<config-home>/prompts`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_prompts: Option<String>,
}

/// Slash command configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Extra names that custom prompts may not use, on top of the built-ins.
    pub reserved: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Expand `~` to home directory in a path string
    pub fn expand_tilde(path: &str) -> PathBuf {
        if let Some(stripped) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(stripped);
        }
        PathBuf::from(path)
    }

    /// Get the project prompts directory for a project root.
    ///
    /// Absolute (or `~`) paths are used as-is.
    pub fn project_prompts_path(&self, project_root: &Path) -> PathBuf {
        match &self.paths.project_prompts {
            Some(path) => project_root.join(Self::expand_tilde(path)),
            None => store::project_prompts_dir(project_root),
        }
    }

    /// Get the personal prompts directory, if one can be resolved.
    pub fn personal_prompts_path(&self) -> Option<PathBuf> {
        match &self.paths.personal_prompts {
            Some(path) => Some(Self::expand_tilde(path)),
            None => store::default_personal_prompts_dir(),
        }
    }

    /// Built-in command names plus any configured extras.
    pub fn reserved_names(&self) -> ReservedNames {
        let mut reserved = ReservedNames::builtins();
        reserved.extend(&self.commands.reserved);
        reserved
    }
}

/// Partial path configuration for project overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialPathsConfig {
    pub project_prompts: Option<String>,
    pub personal_prompts: Option<String>,
}

/// Partial command configuration for project overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialCommandsConfig {
    pub reserved: Option<Vec<String>>,
}

/// Partial logging configuration for project overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialLoggingConfig {
    pub level: Option<String>,
}

/// Project-specific configuration where every field is optional.
/// Parsed from `.promptdeck` files. Fields that are `None` inherit from the global config.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialConfig {
    pub paths: PartialPathsConfig,
    pub commands: PartialCommandsConfig,
    pub logging: PartialLoggingConfig,
}

/// Merge a global config with a project-level partial config.
/// Project values override global values where present.
pub fn merge_config(global: &Config, project: &PartialConfig) -> Config {
    Config {
        paths: PathsConfig {
            project_prompts: project
                .paths
                .project_prompts
                .clone()
                .or_else(|| global.paths.project_prompts.clone()),
            personal_prompts: project
                .paths
                .personal_prompts
                .clone()
                .or_else(|| global.paths.personal_prompts.clone()),
        },
        commands: CommandsConfig {
            reserved: project
                .commands
                .reserved
                .clone()
                .unwrap_or_else(|| global.commands.reserved.clone()),
        },
        logging: LoggingConfig {
            level: project
                .logging
                .level
                .clone()
                .unwrap_or_else(|| global.logging.level.clone()),
        },
    }
}

/// Loaded configuration with metadata
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_path: PathBuf,
    pub project_config_path: Option<PathBuf>,
    pub status: ConfigLoadStatus,
    /// Why the project config was ignored, if it was.
    pub project_error: Option<String>,
}

impl LoadedConfig {
    /// Load problems worth surfacing to the user, in load order.
    ///
    /// Config is read before logging starts, so these are kept here and
    /// reported once logging is up.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if let ConfigLoadStatus::Error(msg) = &self.status {
            problems.push(format!("{} ({})", msg, self.config_path.display()));
        }
        if let Some(e) = &self.project_error {
            problems.push(e.clone());
        }
        problems
    }
}

/// Get the platform-appropriate config directory
fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "promptdeck", "promptdeck").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the full path to the config file
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (`.promptdeck` in the project root).
pub fn get_project_config_path(project_root: &Path) -> Option<PathBuf> {
    let path = project_root.join(PROJECT_CONFIG_FILE);
    if path.exists() { Some(path) } else { None }
}

/// Load a project config (.promptdeck) from the given path.
/// Returns Ok(PartialConfig) on success, Err(String) on parse/read failure.
fn load_project_config(path: &Path) -> Result<PartialConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", PROJECT_CONFIG_FILE, e))?;

    toml::from_str::<PartialConfig>(&contents)
        .map_err(|e| format!("Invalid {}: {}", PROJECT_CONFIG_FILE, e))
}

/// Load configuration from file, environment, and defaults
pub fn load_config(project_root: &Path) -> LoadedConfig {
    load_config_from(get_config_path(), project_root)
}

fn load_config_from(config_path: Option<PathBuf>, project_root: &Path) -> LoadedConfig {
    let (config_path, mut config, status) = match config_path {
        Some(path) => {
            debug!("Config path: {:?}", path);
            let (config, status) = load_global_config(&path);
            (path, config, status)
        }
        None => (
            PathBuf::from("config.toml"),
            Config::default(),
            ConfigLoadStatus::Error("Could not determine config directory".to_string()),
        ),
    };

    let project_config_path = get_project_config_path(project_root);
    let mut project_error = None;
    if let Some(ref project_path) = project_config_path {
        match load_project_config(project_path) {
            Ok(partial) => {
                config = merge_config(&config, &partial);
                info!(path = ?project_path, "project_config_loaded");
            }
            // Keep using global config only; reported by the caller.
            Err(e) => project_error = Some(e),
        }
    }

    let config = apply_env_overrides(config);

    LoadedConfig {
        config,
        config_path,
        project_config_path,
        status,
        project_error,
    }
}

/// Load config from file, falling back to defaults. The file is never created.
fn load_global_config(config_path: &Path) -> (Config, ConfigLoadStatus) {
    match fs::read_to_string(config_path) {
        Ok(contents) => parse_global_config(&contents, config_path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = ?config_path, "config_not_found_using_defaults");
            (Config::default(), ConfigLoadStatus::Defaults)
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            debug!(path = ?config_path, "config_permission_denied");
            (
                Config::default(),
                ConfigLoadStatus::Error("Permission denied reading config".to_string()),
            )
        }
        Err(e) => {
            debug!(path = ?config_path, error = %e, "config_read_failed");
            (
                Config::default(),
                ConfigLoadStatus::Error(format!("Read error: {}", e)),
            )
        }
    }
}

fn parse_global_config(contents: &str, config_path: &Path) -> (Config, ConfigLoadStatus) {
    match toml::from_str::<Config>(contents) {
        Ok(config) => {
            info!("Loaded config from {:?}", config_path);
            (config, ConfigLoadStatus::Loaded)
        }
        Err(e) => {
            debug!(path = ?config_path, error = %e, "config_malformed");
            (
                Config::default(),
                ConfigLoadStatus::Error(format!("Malformed TOML: {}", e)),
            )
        }
    }
}

/// Apply environment variable overrides to config
fn apply_env_overrides(config: Config) -> Config {
    apply_overrides_from(config, |key| env::var(key).ok())
}

fn apply_overrides_from(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(path) = lookup("PROMPTDECK_PROJECT_PROMPTS") {
        debug!("Overriding paths.project_prompts from PROMPTDECK_PROJECT_PROMPTS");
        config.paths.project_prompts = Some(path);
    }

    if let Some(path) = lookup("PROMPTDECK_PERSONAL_PROMPTS") {
        debug!("Overriding paths.personal_prompts from PROMPTDECK_PERSONAL_PROMPTS");
        config.paths.personal_prompts = Some(path);
    }

    if let Some(level) = lookup("PROMPTDECK_LOG") {
        debug!("Overriding logging.level from PROMPTDECK_LOG");
        config.logging.level = level;
    }

    config
}
