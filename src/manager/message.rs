use std::sync::Arc;

use kim_adapters::{AdapterError, BrokerClient};
use kim_types::{ProduceRequest, ProduceResponse};

use super::ManagerError;

/// Publishes messages.
#[derive(Debug, Clone)]
pub struct MessageManager {
    client: Arc<dyn BrokerClient>,
}

impl MessageManager {
    pub fn new(client: Arc<dyn BrokerClient>) -> Self {
        Self { client }
    }

    pub async fn produce(&self, request: &ProduceRequest) -> Result<ProduceResponse, ManagerError> {
        if !self.client.is_connected() {
            return Err(AdapterError::NotConnected.into());
        }
        if request.topic.trim().is_empty() {
            return Err(ManagerError::InvalidRequest("topic is required".into()));
        }

        let (partition, offset) = self.client.send_message(request).await?;
        tracing::info!(topic = %request.topic, partition, offset, "message produced");
        Ok(ProduceResponse {
            topic: request.topic.clone(),
            partition,
            offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kim_adapters::memory::MemoryBroker;

    #[tokio::test]
    async fn produce_reports_position() {
        let broker = MemoryBroker::new();
        broker.add_topic("orders", 2);
        let manager = MessageManager::new(Arc::new(broker));

        let first = manager
            .produce(&ProduceRequest::new("orders", "a").with_partition(1))
            .await
            .unwrap();
        let second = manager
            .produce(&ProduceRequest::new("orders", "b").with_partition(1))
            .await
            .unwrap();
        assert_eq!((first.partition, first.offset), (1, 0));
        assert_eq!(second.offset, 1);
    }

    #[tokio::test]
    async fn produce_requires_a_topic() {
        let broker = MemoryBroker::new();
        let manager = MessageManager::new(Arc::new(broker));
        assert!(matches!(
            manager.produce(&ProduceRequest::new("", "a")).await,
            Err(ManagerError::InvalidRequest(_))
        ));
    }
}
