//! Configuration management for tome.
//!
//! Parses `tome.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `project.name`
//! - `source.dir`
//! - `build.output_dir`
//! - string values in `theme.options`

mod expand;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override source directory.
    pub source_dir: Option<PathBuf>,
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
    /// Override worker count.
    pub jobs: Option<usize>,
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "tome.toml";

/// Upper bound for `build.jobs`.
const MAX_JOBS: usize = 512;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Project configuration.
    pub project: ProjectConfig,
    /// Source configuration (paths are relative strings from TOML).
    source: SourceConfigRaw,
    /// Build configuration (paths are relative strings from TOML).
    build: BuildConfigRaw,
    /// Theme configuration.
    pub theme: ThemeConfig,

    /// Resolved source configuration (set after loading).
    #[serde(skip)]
    pub source_resolved: SourceConfig,
    /// Resolved build configuration (set after loading).
    #[serde(skip)]
    pub build_resolved: BuildConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Project configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project name shown in page titles and the sidebar.
    pub name: String,
    /// Identifier of the document whose toctrees form the navigation root.
    /// Unset, every document no toctree includes becomes a top-level entry.
    pub root_doc: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "Documentation".to_owned(),
            root_doc: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct SourceConfigRaw {
    dir: Option<String>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

/// Resolved source configuration with absolute paths.
#[derive(Debug, Default)]
pub struct SourceConfig {
    /// Root directory of the markup sources.
    pub dir: PathBuf,
    /// Glob patterns (relative to `dir`) selecting source files.
    pub include: Vec<String>,
    /// Glob patterns (relative to `dir`) removed from the selection.
    pub exclude: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct BuildConfigRaw {
    output_dir: Option<String>,
    jobs: Option<usize>,
    cache_enabled: Option<bool>,
}

/// Resolved build configuration with absolute paths.
#[derive(Debug, Default)]
pub struct BuildConfig {
    /// Destination directory for the rendered site.
    pub output_dir: PathBuf,
    /// Project directory for tome data (.tome/).
    pub project_dir: PathBuf,
    /// Worker count for parsing and rendering (0 = available cores).
    pub jobs: usize,
    /// Whether the page cache is enabled.
    pub cache_enabled: bool,
}

impl BuildConfig {
    /// Cache directory path (.tome/cache/).
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.project_dir.join("cache")
    }
}

/// A scalar theme option value as written in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// `true` / `false`.
    Bool(bool),
    /// Integer literal.
    Integer(i64),
    /// String literal.
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Theme configuration.
///
/// Option keys are not checked here; the renderer owns the recognized set
/// and rejects unknown keys.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// Theme name.
    pub name: String,
    /// Theme options.
    pub options: BTreeMap<String, OptionValue>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            name: "default".to_owned(),
            options: BTreeMap::new(),
        }
    }
}

impl ThemeConfig {
    /// Theme options rendered as strings.
    #[must_use]
    pub fn options_as_strings(&self) -> BTreeMap<String, String> {
        self.options
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`project.name`").
        field: String,
        /// Error message (e.g., "${`PROJECT_NAME`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `tome.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.source_resolved.dir.clone_from(source_dir);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.build_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(jobs) = settings.jobs {
            self.build_resolved.jobs = jobs;
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            self.build_resolved.cache_enabled = cache_enabled;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        let mut config = Self {
            project: ProjectConfig::default(),
            source: SourceConfigRaw::default(),
            build: BuildConfigRaw::default(),
            theme: ThemeConfig::default(),
            source_resolved: SourceConfig::default(),
            build_resolved: BuildConfig::default(),
            config_path: None,
        };
        config.resolve_paths(base);
        config
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically at the end of [`Config::load`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_project()?;
        self.validate_source()?;
        self.validate_build()?;
        require_non_empty(&self.theme.name, "theme.name")?;
        Ok(())
    }

    fn validate_project(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.project.name, "project.name")?;
        let Some(root_doc) = &self.project.root_doc else {
            return Ok(());
        };
        require_non_empty(root_doc, "project.root_doc")?;
        if root_doc.starts_with('/') || root_doc.ends_with(".rst") {
            return Err(ConfigError::Validation(format!(
                "project.root_doc must be a document identifier like \"index\", got \"{root_doc}\""
            )));
        }
        Ok(())
    }

    fn validate_source(&self) -> Result<(), ConfigError> {
        if self.source_resolved.include.is_empty() {
            return Err(ConfigError::Validation(
                "source.include must list at least one pattern".to_owned(),
            ));
        }
        for pattern in self
            .source_resolved
            .include
            .iter()
            .chain(&self.source_resolved.exclude)
        {
            if glob::Pattern::new(pattern).is_err() {
                return Err(ConfigError::Validation(format!(
                    "invalid glob pattern in source: {pattern}"
                )));
            }
        }
        Ok(())
    }

    fn validate_build(&self) -> Result<(), ConfigError> {
        if self.build_resolved.jobs > MAX_JOBS {
            return Err(ConfigError::Validation(format!(
                "build.jobs cannot exceed {MAX_JOBS}"
            )));
        }
        if self.build_resolved.output_dir == self.source_resolved.dir {
            return Err(ConfigError::Validation(
                "build.output_dir must differ from source.dir".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.project.name = expand::expand_env(&self.project.name, "project.name")?;

        if let Some(ref dir) = self.source.dir {
            self.source.dir = Some(expand::expand_env(dir, "source.dir")?);
        }
        if let Some(ref dir) = self.build.output_dir {
            self.build.output_dir = Some(expand::expand_env(dir, "build.output_dir")?);
        }

        for (key, value) in &mut self.theme.options {
            if let OptionValue::Text(text) = value {
                *text = expand::expand_env(text, &format!("theme.options.{key}"))?;
            }
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let source_dir = config_dir.join(self.source.dir.as_deref().unwrap_or("docs"));
        let output_dir = match &self.build.output_dir {
            Some(dir) => config_dir.join(dir),
            None => source_dir.join("_build/html"),
        };

        self.source_resolved = SourceConfig {
            dir: source_dir,
            include: self
                .source
                .include
                .clone()
                .unwrap_or_else(|| vec!["**/*.rst".to_owned()]),
            exclude: self
                .source
                .exclude
                .clone()
                .unwrap_or_else(|| vec!["_build/**".to_owned()]),
        };

        self.build_resolved = BuildConfig {
            output_dir,
            project_dir: config_dir.join(".tome"),
            jobs: self.build.jobs.unwrap_or(0),
            cache_enabled: self.build.cache_enabled.unwrap_or(true),
        };
    }
}
