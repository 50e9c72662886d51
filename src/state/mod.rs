//! State module for tracking crawl progress
//!
//! `PageStatus` is the closed set of states a page record can be in, together with
//! the transition function every status write is checked against.

mod page_status;

pub use page_status::{IllegalTransition, PageStatus};
