//! # kim
//!
//! An operator CLI and interactive terminal client for Kafka and MSK
//! clusters.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          kim binary                           │
//! │  ┌─────────┐   ┌──────────┐   ┌──────────┐   ┌─────────────┐  │
//! │  │ events  │──▶│   app    │──▶│    ui    │──▶│  Terminal   │  │
//! │  │ (keys)  │   │(controller)  │(layout)  │   │             │  │
//! │  └─────────┘   └────┬─────┘   └──────────┘   └─────────────┘  │
//! │       commands ─────┤                                         │
//! │                     ▼                                         │
//! │  ┌────────────┐  ┌──────────┐  ┌──────────┐                   │
//! │  │ connection │─▶│ session  │  │ manager  │                   │
//! │  │ (profiles) │  │(registry)│  │ (topics, │                   │
//! │  └────────────┘  └────┬─────┘  │  groups) │                   │
//! │                       │        └────┬─────┘                   │
//! │                       ▼             ▼                         │
//! │              kim_adapters::BrokerClient                       │
//! │               (MemoryBroker | KafkaClient)                    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`session`]**: the consumer session registry. One pump task per
//!   `(topic, group, partition)` feeds bounded message and error channels.
//! - **[`app`]**: interactive controller state (views, scrolling, input
//!   modes) plus the live message feed.
//! - **[`commands`]**: parses and dispatches `:` command lines.
//! - **[`ui`]**: pure screen composition and ratatui painters.
//! - **[`connection`]**: per-profile client cache and connectors.
//! - **[`manager`]**: listing, describe, create and delete for topics and
//!   groups, and produce.
//! - **[`config`]**: the profile store (`~/.kim/config.toml`).
//! - **[`cli`]**: the non-interactive subcommands.
//!
//! ## Usage
//!
//! ```bash
//! kim profile add local --bootstrap-servers localhost:9092
//! kim topic list --pattern orders
//! kim message consume orders --group-id debug --from-beginning --max-messages 10
//!
//! # Interactive mode
//! kim -i
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::sync::Arc;
//! use kim::session::SessionRegistry;
//! use kim_adapters::memory::MemoryBroker;
//!
//! # tokio_test::block_on(async {
//! let broker = MemoryBroker::new();
//! broker.add_topic("orders", 1);
//!
//! let registry = SessionRegistry::new(Arc::new(broker.clone()));
//! let stream = registry.start_consumer("orders", 0, "readers", true).await.unwrap();
//! assert_eq!(registry.active_sessions().len(), 1);
//!
//! registry.stop_consumer("orders", "readers", 0).unwrap();
//! assert!(stream.recv().await.is_none());
//! # });
//! ```

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod connection;
pub mod data;
pub mod events;
pub mod logging;
pub mod manager;
pub mod output;
pub mod session;
pub mod terminal;
pub mod ui;

pub use app::{App, InputMode, View};
pub use config::{Config, Profile, ProfileStore};
pub use connection::{Connection, ConnectionManager, Connector};
pub use session::{ConsumerStream, SessionError, SessionKey, SessionRegistry};
