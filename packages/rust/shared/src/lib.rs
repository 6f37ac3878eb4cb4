//! Shared types, error model, and configuration for blockdocs.
//!
//! This crate is the foundation depended on by all other blockdocs crates.
//! It provides:
//! - [`BlockdocsError`]: the unified error type
//! - Domain types ([`ArticleId`], [`LedgerEntry`], [`ArticleAnalysis`])
//! - Configuration ([`AppConfig`] and its sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, LbcConfig, LedgerConfig, LlmConfig, PublishConfig, StorageConfig, TermsConfig,
    config_dir, config_file_path, env_value, env_value_opt, init_config, load_config,
    load_config_from,
};
pub use error::{BlockdocsError, Result};
pub use types::{ArticleAnalysis, ArticleId, LedgerEntry, MAX_KEYWORDS};
