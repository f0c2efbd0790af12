//! Consumer group metadata.

use crate::Pagination;

/// A row of a group listing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupInfo {
    pub group_id: String,
    pub state: String,
    pub protocol_type: String,
    pub members: usize,
}

/// A partition assigned to a group member.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionAssignment {
    pub topic: String,
    pub partition: i32,
    /// Committed offset, or `-1` when nothing was committed.
    pub current_offset: i64,
    pub log_end_offset: i64,
    pub lag: i64,
}

/// A member of a consumer group.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemberInfo {
    pub member_id: String,
    pub client_id: String,
    pub client_host: String,
    pub assignments: Vec<PartitionAssignment>,
}

/// Full description of a consumer group.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupDetails {
    pub group_id: String,
    pub state: String,
    pub protocol_type: String,
    pub protocol: String,
    pub members: Vec<MemberInfo>,
}

impl GroupDetails {
    /// Sum of the lag across every assigned partition.
    pub fn total_lag(&self) -> i64 {
        self.members
            .iter()
            .flat_map(|m| m.assignments.iter())
            .map(|a| a.lag.max(0))
            .sum()
    }
}

/// A page of groups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupList {
    pub groups: Vec<GroupInfo>,
    pub pagination: Pagination,
}
