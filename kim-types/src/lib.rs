//! # kim-types
//!
//! Plain data types shared by the kim crates: what a topic, a consumer group
//! and a message look like once they have left the broker client, plus the
//! request/response shapes of the admin and message operations.
//!
//! ## Features
//!
//! - `serde`: derive `Serialize`/`Deserialize` for every type (used for JSON output)
//!
//! ## Example
//!
//! ```rust
//! use kim_types::{ListOptions, Message, SortOrder};
//!
//! let msg = Message::new("orders", 0, 42)
//!     .with_key("order-1")
//!     .with_value("{\n  \"id\": 1\n}")
//!     .with_header("source", "web");
//!
//! assert_eq!(msg.headers.get("source").map(String::as_str), Some("web"));
//!
//! let opts = ListOptions::default().sort_by("partitions").order(SortOrder::Desc);
//! assert_eq!(opts.page, 1);
//! ```

mod group;
mod listing;
mod message;
mod topic;

pub use group::*;
pub use listing::*;
pub use message::*;
pub use topic::*;
