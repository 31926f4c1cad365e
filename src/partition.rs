//! The partition table: storage groups, their region groups, and the data
//! nodes known to the cluster.
//!
//! `apply` must behave identically on every node. It reads no clocks, draws no
//! randomness, and checks a whole command before touching any state, so a
//! rejected command leaves the table exactly as it was.

use crate::command::*;
use crate::error::ApplicationError;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionTable {
    data_nodes: BTreeMap<DataNodeId, DataNodeLocation>,
    storage_groups: BTreeMap<StorageGroupName, StorageGroupPartition>,
}

impl PartitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, command: &ConfigCommand) -> Result<(), ApplicationError> {
        match command {
            ConfigCommand::RegisterDataNode(cmd) => self.register_data_node(&cmd.location),
            ConfigCommand::SetStorageGroup(cmd) => self.set_storage_group(&cmd.schema),
            ConfigCommand::DeleteStorageGroup(cmd) => self.delete_storage_group(&cmd.name),
            ConfigCommand::CreateRegionGroups(cmd) => self.create_region_groups(cmd),
        }
    }

    fn register_data_node(&mut self, location: &DataNodeLocation) -> Result<(), ApplicationError> {
        match self.data_nodes.get(&location.data_node_id) {
            Some(existing) if existing == location => Ok(()),
            Some(_) => Err(ApplicationError::DataNodeConflict {
                data_node_id: location.data_node_id,
            }),
            None => {
                self.data_nodes.insert(location.data_node_id, location.clone());
                Ok(())
            }
        }
    }

    fn set_storage_group(&mut self, schema: &StorageGroupSchema) -> Result<(), ApplicationError> {
        if schema.name.is_empty() {
            return Err(ApplicationError::InvalidStorageGroup {
                name: schema.name.clone(),
                reason: "name must not be empty".to_string(),
            });
        }
        if schema.schema_replication_factor < 1 || schema.data_replication_factor < 1 {
            return Err(ApplicationError::InvalidStorageGroup {
                name: schema.name.clone(),
                reason: "replication factors must be at least 1".to_string(),
            });
        }
        if self.storage_groups.contains_key(&schema.name) {
            return Err(ApplicationError::StorageGroupAlreadyExists(schema.name.clone()));
        }

        self.storage_groups.insert(
            schema.name.clone(),
            StorageGroupPartition {
                schema: schema.clone(),
                region_groups: Vec::new(),
            },
        );
        Ok(())
    }

    fn delete_storage_group(&mut self, name: &str) -> Result<(), ApplicationError> {
        self.storage_groups
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ApplicationError::StorageGroupNotFound(name.to_string()))
    }

    /// New region groups are appended to whatever the storage group already
    /// holds. A region id may exist only once across the whole table.
    fn create_region_groups(&mut self, cmd: &CreateRegionGroups) -> Result<(), ApplicationError> {
        let mut allocated: BTreeSet<ConsensusGroupId> = self
            .storage_groups
            .values()
            .flat_map(|sg| sg.region_groups.iter().map(|rs| rs.region_id))
            .collect();

        for (storage_group, replica_sets) in cmd.region_group_map() {
            if !self.storage_groups.contains_key(storage_group) {
                return Err(ApplicationError::StorageGroupNotFound(storage_group.clone()));
            }
            for replica_set in replica_sets {
                if !allocated.insert(replica_set.region_id) {
                    return Err(ApplicationError::RegionGroupAlreadyExists {
                        storage_group: storage_group.clone(),
                        region: replica_set.region_id.to_string(),
                    });
                }
            }
        }

        for (storage_group, replica_sets) in cmd.region_group_map() {
            if let Some(partition) = self.storage_groups.get_mut(storage_group) {
                partition.region_groups.extend(replica_sets.iter().cloned());
            }
        }
        Ok(())
    }

    pub fn storage_group(&self, name: &str) -> Option<&StorageGroupPartition> {
        self.storage_groups.get(name)
    }

    pub fn storage_groups(&self) -> &BTreeMap<StorageGroupName, StorageGroupPartition> {
        &self.storage_groups
    }

    pub fn region_groups_of(&self, name: &str) -> &[RegionReplicaSet] {
        self.storage_groups
            .get(name)
            .map(|sg| sg.region_groups.as_slice())
            .unwrap_or(&[])
    }

    pub fn region_group_count(&self) -> usize {
        self.storage_groups
            .values()
            .map(|sg| sg.region_groups.len())
            .sum()
    }

    pub fn data_nodes(&self) -> impl Iterator<Item = &DataNodeLocation> {
        self.data_nodes.values()
    }

    pub fn data_node(&self, id: DataNodeId) -> Option<&DataNodeLocation> {
        self.data_nodes.get(&id)
    }
}
