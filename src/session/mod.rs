//! Consumer sessions.
//!
//! A session is one `(topic, group, partition)` read owned by a
//! [`SessionRegistry`]. Each session runs a pump task that turns raw records
//! into [`Message`](kim_types::Message)s on a bounded channel.

mod batch;
mod error;
mod format;
mod pump;
mod registry;

pub use batch::{consume_batch, BatchEnd, BatchLimits, BatchOutcome};
pub use error::{SessionError, SessionKey};
pub use format::{decode_record, format_value};
pub use registry::{ConsumerStream, SessionRegistry, ERROR_BUFFER, MESSAGE_BUFFER};
