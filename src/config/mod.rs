//! Configuration module for Pagewise
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use pagewise::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pagewise.toml")).unwrap();
//! println!("Fetching with concurrency: {}", config.crawler.concurrency_limit);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, FrontierConfig, StorageConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
