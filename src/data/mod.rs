//! Presentation helpers shared by the interactive views and the CLI.
//!
//! - [`duration`]: parsing and formatting of duration strings (e.g. "30s", "500ms")
//! - [`views`]: fixed-width row builders for topics, groups, profiles,
//!   sessions and messages

pub mod duration;
pub mod views;
