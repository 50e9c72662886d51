//! URL handling module for Pagewise
//!
//! This module provides URL normalization, same-page and same-domain checks,
//! and the path glob patterns used to scope the crawl frontier.

mod domain;
mod matcher;
mod normalize;

pub use domain::{extract_domain, is_same_domain};
pub use matcher::{compile_patterns, first_match, GlobPattern};
pub use normalize::{is_same_page, normalize_url, NormalizeOptions};
