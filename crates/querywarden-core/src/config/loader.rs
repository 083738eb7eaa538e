//! Configuration loading from layered sources

use std::fs;
use std::path::{Path, PathBuf};

use super::env_loader::apply_env_overrides;
use super::model::QueryWardenConfig;
use super::validation::validate;
use crate::error::{QueryError, QueryResult};

/// File name looked up by [`discover_config_file`]
pub const CONFIG_FILE_NAME: &str = "querywarden.toml";

/// Source of configuration data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in defaults; discards anything loaded before it
    Defaults,
    /// A TOML, JSON or YAML file, picked by extension
    File(PathBuf),
    /// `QUERYWARDEN_*` environment variables
    Environment,
}

/// Layers sources in the order they were added, then validates
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_defaults(self) -> Self {
        self.add_source(ConfigSource::Defaults)
    }

    pub fn with_file(self, path: impl AsRef<Path>) -> Self {
        self.add_source(ConfigSource::File(path.as_ref().to_path_buf()))
    }

    pub fn with_env(self) -> Self {
        self.add_source(ConfigSource::Environment)
    }

    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    pub fn load(&self) -> QueryResult<QueryWardenConfig> {
        let mut config = QueryWardenConfig::default();

        for source in &self.sources {
            match source {
                ConfigSource::Defaults => {
                    tracing::debug!("loading default config");
                    config = QueryWardenConfig::default();
                }
                ConfigSource::File(path) => {
                    tracing::debug!(path = %path.display(), "loading config file");
                    config = load_config_file(path)?;
                }
                ConfigSource::Environment => {
                    tracing::debug!("applying environment overrides");
                    apply_env_overrides(&mut config)?;
                }
            }
        }

        validate(&config)?;
        Ok(config)
    }
}

/// Parse one config file. Missing keys take their defaults.
pub fn load_config_file(path: &Path) -> QueryResult<QueryWardenConfig> {
    let context = format!("Reading configuration from '{}'", path.display());
    let content = fs::read_to_string(path).map_err(|e| {
        QueryError::config_with_context(format!("Failed to read config file: {}", e), &context)
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let parsed: Result<QueryWardenConfig, String> = match extension.as_str() {
        "toml" | "" => toml::from_str(&content).map_err(|e| e.to_string()),
        "json" => serde_json::from_str(&content).map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
        other => {
            return Err(QueryError::config_with_context(
                format!("Unsupported config file format: .{}", other),
                context,
            ));
        }
    };

    parsed.map_err(|e| {
        QueryError::config_with_context(format!("Failed to parse config file: {}", e), context)
    })
}

/// First existing config file: `./querywarden.toml`, then
/// `<config dir>/querywarden/querywarden.toml`
pub fn discover_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("querywarden").join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

/// Defaults, the discovered or given file, then the environment
pub fn load_config(path: Option<&Path>) -> QueryResult<QueryWardenConfig> {
    let mut loader = ConfigLoader::new().with_defaults();
    if let Some(path) = path.map(Path::to_path_buf).or_else(discover_config_file) {
        loader = loader.with_file(path);
    }
    loader.with_env().load()
}

impl QueryWardenConfig {
    pub fn validate(&self) -> QueryResult<()> {
        validate(self)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> QueryResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| QueryError::config(format!("Failed to render config: {}", e)))
    }
}
