//! Configuration for QueryWarden
//!
//! Sources are layered by [`ConfigLoader`]: built-in defaults, a config file
//! and `QUERYWARDEN_*` environment overrides. The result is validated before
//! it is handed out.

pub mod env_loader;
pub mod loader;
pub mod model;
pub mod validation;

pub use env_loader::{ENV_PREFIX, apply_env_overrides, apply_overrides_with};
pub use loader::{
    CONFIG_FILE_NAME, ConfigLoader, ConfigSource, discover_config_file, load_config,
    load_config_file,
};
pub use model::{
    CircuitBreakerSection, CostSection, EnvironmentMultipliers, FallbackSection, LogFormat,
    LoggingSection, QueryWardenConfig, RetrySection, ServiceConfig, TierSection, TiersSection,
    TimeoutsSection,
};
pub use validation::validate;
