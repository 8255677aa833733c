//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (overlay DO_SPACES_URL, AROI_BUCKET, STORAGE_ORDER, ...)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into a Resolver shared via Arc
//!
//! On file change (--watch):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the Resolver
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow running with environment only
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_config_with_env, ConfigError};
pub use schema::{
    AssetConfig, CacheConfig, HeaderConfig, ListenerConfig, ObservabilityConfig, ProxyConfig,
    StorageConfig, TimeoutConfig, TtlSetting,
};
