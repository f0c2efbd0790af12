//! Bounded, non-interactive consumption on top of the registry.
//!
//! A batch starts (or joins) a session, hands each message to a callback and
//! ends on the first of: message limit, timeout, interrupt, stream end. The
//! session is stopped on every exit path.

use std::future::Future;
use std::time::Duration;

use kim_adapters::AdapterError;
use kim_types::{ConsumeRequest, Message};
use tokio::time::Instant;

use super::{SessionError, SessionRegistry};

/// Limits for a batch; `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_messages: Option<usize>,
    pub timeout: Option<Duration>,
}

impl BatchLimits {
    pub fn max_messages(mut self, max: usize) -> Self {
        self.max_messages = Some(max);
        self
    }

    /// A zero timeout means no timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }
}

/// Why a batch finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEnd {
    Limit,
    Timeout,
    StreamClosed,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub received: usize,
    pub end: BatchEnd,
    /// Stream errors seen after the first message.
    pub errors: Vec<AdapterError>,
}

/// Consume until a limit is reached or `interrupt` resolves.
///
/// An error arriving before any message fails the batch; later errors are
/// collected and consumption continues.
pub async fn consume_batch<F>(
    registry: &SessionRegistry,
    request: &ConsumeRequest,
    limits: BatchLimits,
    interrupt: impl Future<Output = ()>,
    mut on_message: F,
) -> Result<BatchOutcome, SessionError>
where
    F: FnMut(&Message),
{
    let stream = registry
        .start_consumer(
            &request.topic,
            request.partition,
            &request.group_id,
            request.from_beginning,
        )
        .await?;

    let deadline = limits.timeout.map(|timeout| Instant::now() + timeout);
    let timer = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(timer);
    tokio::pin!(interrupt);

    let mut received = 0usize;
    let mut errors = Vec::new();
    let mut errors_open = true;

    let result = loop {
        if limits.max_messages.is_some_and(|max| received >= max) {
            break Ok(BatchEnd::Limit);
        }

        tokio::select! {
            biased;
            _ = &mut interrupt => break Ok(BatchEnd::Interrupted),
            _ = &mut timer => break Ok(BatchEnd::Timeout),
            message = stream.recv() => match message {
                Some(message) => {
                    received += 1;
                    on_message(&message);
                }
                None => break Ok(BatchEnd::StreamClosed),
            },
            err = stream.recv_error(), if errors_open => match err {
                Some(err) if received == 0 => break Err(SessionError::Stream(err)),
                Some(err) => {
                    tracing::warn!(topic = %request.topic, partition = request.partition, error = %err, "error while consuming");
                    errors.push(err);
                }
                None => errors_open = false,
            },
        }
    };

    match registry.stop_consumer(&request.topic, &request.group_id, request.partition) {
        Ok(()) | Err(SessionError::SessionNotFound { .. }) => {}
        Err(err) => tracing::warn!(error = %err, "failed to stop batch session"),
    }

    let end = result?;
    tracing::debug!(topic = %request.topic, received, ?end, "batch finished");
    Ok(BatchOutcome {
        received,
        end,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kim_adapters::memory::MemoryBroker;
    use std::sync::Arc;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn setup(messages: usize) -> (MemoryBroker, SessionRegistry) {
        let broker = MemoryBroker::new();
        broker.add_topic("orders", 1);
        for i in 0..messages {
            broker
                .append("orders", 0, None, format!("m{i}").as_bytes())
                .unwrap();
        }
        let registry = SessionRegistry::new(Arc::new(broker.clone()));
        (broker, registry)
    }

    fn request() -> ConsumeRequest {
        ConsumeRequest::new("orders", 0, "grp1").from_beginning(true)
    }

    async fn wait_for_reader(broker: &MemoryBroker) {
        timeout(WAIT, async {
            while broker.reader_count("orders", 0) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn stops_at_message_limit() {
        let (_broker, registry) = setup(5);
        let mut seen = Vec::new();

        let outcome = consume_batch(
            &registry,
            &request(),
            BatchLimits::default().max_messages(3),
            std::future::pending(),
            |m| seen.push(m.value.clone()),
        )
        .await
        .unwrap();

        assert_eq!(outcome.end, BatchEnd::Limit);
        assert_eq!(outcome.received, 3);
        assert_eq!(seen, vec!["m0", "m1", "m2"]);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn ends_on_timeout() {
        let (_broker, registry) = setup(0);

        let outcome = consume_batch(
            &registry,
            &request(),
            BatchLimits::default().timeout(Duration::from_millis(50)),
            std::future::pending(),
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(outcome.end, BatchEnd::Timeout);
        assert_eq!(outcome.received, 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn ends_on_interrupt() {
        let (_broker, registry) = setup(2);

        let outcome = consume_batch(
            &registry,
            &request(),
            BatchLimits::default(),
            async {},
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(outcome.end, BatchEnd::Interrupted);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn ends_when_stream_closes() {
        let (broker, registry) = setup(2);
        broker.finish_partition("orders", 0).unwrap();

        let outcome = timeout(
            WAIT,
            consume_batch(
                &registry,
                &request(),
                BatchLimits::default(),
                std::future::pending(),
                |_| {},
            ),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(outcome.end, BatchEnd::StreamClosed);
        assert_eq!(outcome.received, 2);
    }

    #[tokio::test]
    async fn error_before_first_message_fails() {
        let (broker, registry) = setup(0);
        let inject = async {
            wait_for_reader(&broker).await;
            broker
                .inject_error("orders", 0, AdapterError::Broker("boom".into()))
                .unwrap();
        };
        let request = request();

        let (result, ()) = tokio::join!(
            consume_batch(
                &registry,
                &request,
                BatchLimits::default().timeout(WAIT),
                std::future::pending(),
                |_| {},
            ),
            inject
        );

        assert!(matches!(
            result,
            Err(SessionError::Stream(AdapterError::Broker(ref msg))) if msg == "boom"
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn later_errors_keep_received_messages() {
        let (broker, registry) = setup(0);
        let script = async {
            wait_for_reader(&broker).await;
            broker.append("orders", 0, None, b"first").unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            broker
                .inject_error("orders", 0, AdapterError::Broker("hiccup".into()))
                .unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            broker.append("orders", 0, None, b"second").unwrap();
        };
        let mut seen = Vec::new();
        let request = request();

        let (result, ()) = tokio::join!(
            consume_batch(
                &registry,
                &request,
                BatchLimits::default().max_messages(2).timeout(WAIT),
                std::future::pending(),
                |m| seen.push(m.value.clone()),
            ),
            script
        );

        let outcome = result.unwrap();
        assert_eq!(outcome.end, BatchEnd::Limit);
        assert_eq!(seen, vec!["first", "second"]);
        assert_eq!(outcome.errors, vec![AdapterError::Broker("hiccup".into())]);
    }

    #[tokio::test]
    async fn zero_timeout_waits_for_messages() {
        let (broker, registry) = setup(0);
        let limits = BatchLimits::default()
            .max_messages(1)
            .timeout(crate::data::duration::parse_duration("0").unwrap());
        assert_eq!(limits.timeout, None);

        let request = ConsumeRequest::new("orders", 0, "grp1");
        let script = async {
            wait_for_reader(&broker).await;
            tokio::time::sleep(Duration::from_millis(50)).await;
            broker.append("orders", 0, None, b"late").unwrap();
        };

        let (result, ()) = tokio::join!(
            timeout(
                WAIT,
                consume_batch(&registry, &request, limits, std::future::pending(), |_| {})
            ),
            script
        );

        let outcome = result.unwrap().unwrap();
        assert_eq!(outcome.received, 1);
        assert_eq!(outcome.end, BatchEnd::Limit);
    }
}
