use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type DataNodeId = i32;
pub type StorageGroupName = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConsensusGroupType {
    SchemaRegion,
    DataRegion,
}

impl ConsensusGroupType {
    pub fn code(self) -> i32 {
        match self {
            ConsensusGroupType::SchemaRegion => 0,
            ConsensusGroupType::DataRegion => 1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ConsensusGroupType::SchemaRegion),
            1 => Some(ConsensusGroupType::DataRegion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConsensusGroupId {
    pub group_type: ConsensusGroupType,
    pub id: i32,
}

impl ConsensusGroupId {
    pub fn new(group_type: ConsensusGroupType, id: i32) -> Self {
        Self { group_type, id }
    }
}

impl fmt::Display for ConsensusGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}-{}", self.group_type, self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub ip: String,
    pub port: i32,
}

impl Endpoint {
    pub fn new(ip: impl Into<String>, port: i32) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DataNodeLocation {
    pub data_node_id: DataNodeId,
    pub internal_endpoint: Endpoint,
}

/// Placement of one region group: which data nodes hold a replica.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RegionReplicaSet {
    pub region_id: ConsensusGroupId,
    pub data_node_locations: Vec<DataNodeLocation>,
}

impl RegionReplicaSet {
    pub fn new(region_id: ConsensusGroupId, data_node_locations: Vec<DataNodeLocation>) -> Self {
        Self {
            region_id,
            data_node_locations,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct StorageGroupSchema {
    pub name: StorageGroupName,
    pub ttl_ms: i64,
    pub schema_replication_factor: i32,
    pub data_replication_factor: i32,
    pub time_partition_interval_ms: i64,
}

impl StorageGroupSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl_ms: i64::MAX,
            schema_replication_factor: 1,
            data_replication_factor: 1,
            time_partition_interval_ms: 604_800_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageGroupPartition {
    pub schema: StorageGroupSchema,
    pub region_groups: Vec<RegionReplicaSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionView {
    pub data_nodes: Vec<DataNodeLocation>,
    pub storage_groups: BTreeMap<StorageGroupName, StorageGroupPartition>,
    pub last_applied_index: u64,
    pub leader_id: Option<u64>,
    pub term: u64,
}

impl PartitionView {
    pub fn region_group_count(&self) -> usize {
        self.storage_groups
            .values()
            .map(|sg| sg.region_groups.len())
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub node_id: u64,
    pub addr: String,
    pub is_voter: bool,
}
