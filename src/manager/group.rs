use std::cmp::Ordering;
use std::sync::Arc;

use kim_adapters::{AdapterError, BrokerClient};
use kim_types::{GroupDetails, GroupInfo, GroupList, ListOptions, Pagination};

use super::{matches_pattern, ManagerError};

/// Consumer group administration over a broker client.
#[derive(Debug, Clone)]
pub struct GroupManager {
    client: Arc<dyn BrokerClient>,
}

impl GroupManager {
    pub fn new(client: Arc<dyn BrokerClient>) -> Self {
        Self { client }
    }

    fn ensure_connected(&self) -> Result<(), ManagerError> {
        if self.client.is_connected() {
            Ok(())
        } else {
            Err(AdapterError::NotConnected.into())
        }
    }

    /// List groups matching `opts.pattern`, sorted by `group_id`, `state` or
    /// `protocol_type` (unknown fields sort by id), then paged.
    pub async fn list_groups(&self, opts: &ListOptions) -> Result<GroupList, ManagerError> {
        self.ensure_connected()?;
        let mut groups: Vec<GroupInfo> = self
            .client
            .list_groups()
            .await?
            .into_iter()
            .filter(|g| {
                opts.pattern
                    .as_deref()
                    .is_none_or(|p| matches_pattern(&g.group_id, p))
            })
            .collect();

        groups.sort_by(|a, b| {
            let ord = match opts.sort_by.as_str() {
                "state" => a.state.cmp(&b.state),
                "protocol_type" => a.protocol_type.cmp(&b.protocol_type),
                _ => Ordering::Equal,
            }
            .then_with(|| a.group_id.cmp(&b.group_id));
            if opts.order.is_desc() {
                ord.reverse()
            } else {
                ord
            }
        });

        let (groups, pagination) = Pagination::paginate(groups, opts);
        Ok(GroupList { groups, pagination })
    }

    pub async fn describe_group(&self, group_id: &str) -> Result<GroupDetails, ManagerError> {
        self.ensure_connected()?;
        if group_id.trim().is_empty() {
            return Err(ManagerError::InvalidRequest("group id is required".into()));
        }
        Ok(self.client.describe_group(group_id).await?)
    }

    pub async fn delete_group(&self, group_id: &str) -> Result<(), ManagerError> {
        self.ensure_connected()?;
        self.client.delete_group(group_id).await?;
        tracing::info!(group = %group_id, "consumer group deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kim_adapters::memory::MemoryBroker;
    use kim_types::SortOrder;

    fn group(id: &str, state: &str) -> GroupDetails {
        GroupDetails {
            group_id: id.into(),
            state: state.into(),
            protocol_type: "consumer".into(),
            protocol: "range".into(),
            members: vec![],
        }
    }

    fn manager() -> (MemoryBroker, GroupManager) {
        let broker = MemoryBroker::new();
        broker.add_group(group("billing", "Stable"));
        broker.add_group(group("analytics", "Empty"));
        broker.add_group(group("billing-replay", "Dead"));
        let manager = GroupManager::new(Arc::new(broker.clone()));
        (broker, manager)
    }

    #[tokio::test]
    async fn list_sorted_by_state_desc() {
        let (_, manager) = manager();
        let opts = ListOptions::default()
            .sort_by("state")
            .order(SortOrder::Desc);
        let list = manager.list_groups(&opts).await.unwrap();
        let ids: Vec<_> = list.groups.iter().map(|g| g.group_id.as_str()).collect();
        assert_eq!(ids, ["billing", "analytics", "billing-replay"]);
    }

    #[tokio::test]
    async fn list_filters_by_pattern() {
        let (_, manager) = manager();
        let opts = ListOptions::default().pattern("BILL");
        let list = manager.list_groups(&opts).await.unwrap();
        assert_eq!(list.pagination.total_items, 2);
    }

    #[tokio::test]
    async fn describe_and_delete() {
        let (_, manager) = manager();
        assert_eq!(manager.describe_group("billing").await.unwrap().state, "Stable");

        manager.delete_group("analytics").await.unwrap();
        let err = manager.describe_group("analytics").await.unwrap_err();
        assert!(matches!(err, ManagerError::Adapter(AdapterError::NotFound(_))));
    }

    #[tokio::test]
    async fn disconnected_client_fails_fast() {
        let (broker, manager) = manager();
        broker.disconnect();
        assert!(matches!(
            manager.describe_group("billing").await,
            Err(ManagerError::Adapter(AdapterError::NotConnected))
        ));
    }
}
