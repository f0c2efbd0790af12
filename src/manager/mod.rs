//! Thin managers over the broker client: listing with filter/sort/paging,
//! describe, create and delete for topics and groups, and produce.

mod group;
mod message;
mod topic;

use kim_adapters::AdapterError;
use thiserror::Error;

pub use group::GroupManager;
pub use message::MessageManager;
pub use topic::{format_config_value, TopicManager};

/// Errors from the managers.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Case-insensitive substring match with `*` wildcards ignored.
///
/// An empty pattern or a lone `*` matches everything.
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    let needle = pattern.replace('*', "").to_lowercase();
    needle.is_empty() || name.to_lowercase().contains(&needle)
}
