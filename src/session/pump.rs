//! The per-session pump task.
//!
//! ```text
//!   PartitionConsumer ──record──▶ decode ──▶ messages (bounded) ──▶ ConsumerStream
//!                     ──error───────────▶ errors   (bounded) ──▶ ConsumerStream
//!   stop (watch) ─────▶ abort any wait, exit
//! ```
//!
//! On exit the pump closes the partition consumer, removes its own registry
//! entry (only if the entry is still this session) and drops its senders,
//! which closes both output channels.

use kim_adapters::client::ConsumerEvent;
use kim_adapters::{AdapterError, PartitionConsumer};
use kim_types::Message;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};

use super::format::decode_record;
use super::registry::SessionMap;
use super::SessionKey;

/// Why a pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PumpExit {
    Stopped,
    StreamClosed,
    Fatal,
    ReceiverGone,
}

pub(crate) struct Pump {
    pub id: u64,
    pub key: SessionKey,
    pub consumer: PartitionConsumer,
    pub messages: mpsc::Sender<Message>,
    pub errors: mpsc::Sender<AdapterError>,
    pub stop: watch::Receiver<bool>,
    pub sessions: SessionMap,
}

impl Pump {
    pub async fn run(mut self) {
        let exit = self.pump().await;

        if let Err(err) = self.consumer.close() {
            tracing::warn!(key = %self.key, error = %err, "failed to close partition consumer");
        }

        let deregistered = {
            let mut sessions = self.sessions.lock();
            match sessions.get(&self.key) {
                Some(entry) if entry.id == self.id => sessions.remove(&self.key).is_some(),
                _ => false,
            }
        };

        tracing::debug!(
            topic = %self.key.topic,
            group = %self.key.group_id,
            partition = self.key.partition,
            ?exit,
            deregistered,
            "consumer session ended"
        );
    }

    async fn pump(&mut self) -> PumpExit {
        loop {
            if *self.stop.borrow() {
                return PumpExit::Stopped;
            }

            let event = tokio::select! {
                biased;
                _ = self.stop.changed() => return PumpExit::Stopped,
                event = self.consumer.next_event() => event,
            };

            match event {
                ConsumerEvent::Record(record) => {
                    let message = decode_record(record);
                    if let Err(exit) = forward(&self.messages, message, &mut self.stop).await {
                        return exit;
                    }
                }
                ConsumerEvent::Error(err) => {
                    let fatal = err.is_fatal();
                    tracing::warn!(key = %self.key, error = %err, fatal, "consumer error");
                    if let Err(exit) = forward(&self.errors, err, &mut self.stop).await {
                        return exit;
                    }
                    if fatal {
                        return PumpExit::Fatal;
                    }
                }
                ConsumerEvent::Closed => return PumpExit::StreamClosed,
            }
        }
    }
}

/// Send without blocking when there is room; otherwise wait for room unless
/// the stop signal fires first.
async fn forward<T>(
    tx: &mpsc::Sender<T>,
    value: T,
    stop: &mut watch::Receiver<bool>,
) -> Result<(), PumpExit> {
    match tx.try_send(value) {
        Ok(()) => Ok(()),
        Err(TrySendError::Closed(_)) => Err(PumpExit::ReceiverGone),
        Err(TrySendError::Full(value)) => tokio::select! {
            biased;
            _ = stop.changed() => Err(PumpExit::Stopped),
            sent = tx.send(value) => sent.map_err(|_| PumpExit::ReceiverGone),
        },
    }
}
