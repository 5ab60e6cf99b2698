//! Mention Core
//!
//! Configuration shared by the indexer and its front ends: the trigger
//! phrase, the primary mention, path exclusion and document eligibility.

mod config;
mod error;

pub use config::{is_valid_mention_name, MentionConfig, WatchConfig};
pub use error::ConfigError;
