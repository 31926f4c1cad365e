use crate::command::ConfigCommand;
use crate::error::{ApplicationError, DecodeError, EncodeError};
use crate::partition::PartitionTable;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedCommand(pub Vec<u8>);

impl EncodedCommand {
    pub fn encode(command: &ConfigCommand) -> Result<Self, EncodeError> {
        Ok(Self(command.encode()?.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ApplyOutcome {
    #[default]
    Applied,
    Rejected(ApplicationError),
    Skipped { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecodeErrorPolicy {
    #[default]
    Halt,
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlaneState {
    pub table: PartitionTable,
    pub last_applied_index: u64,
}

impl PlaneState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_partition_view(&self, leader_id: Option<u64>, term: u64) -> PartitionView {
        PartitionView {
            data_nodes: self.table.data_nodes().cloned().collect(),
            storage_groups: self.table.storage_groups().clone(),
            last_applied_index: self.last_applied_index,
            leader_id,
            term,
        }
    }
}

#[derive(Clone)]
pub struct SharedState {
    inner: Arc<RwLock<PlaneState>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(PlaneState::new())),
        }
    }

    // Poisoning is not propagated: writers never leave the state half-updated.
    fn read(&self) -> RwLockReadGuard<'_, PlaneState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PlaneState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn apply(&self, command: &ConfigCommand) -> Result<(), ApplicationError> {
        self.write().table.apply(command)
    }

    // Decode failures are returned as-is; the storage layer applies the policy.
    pub fn apply_encoded(&self, entry: &EncodedCommand) -> Result<ApplyOutcome, DecodeError> {
        let command = ConfigCommand::decode(entry.as_bytes())?;
        debug!(kind = %command.kind(), "applying command");

        match self.apply(&command) {
            Ok(()) => Ok(ApplyOutcome::Applied),
            Err(e) => {
                warn!(kind = %command.kind(), "command rejected: {}", e);
                Ok(ApplyOutcome::Rejected(e))
            }
        }
    }

    pub fn snapshot(&self) -> PlaneState {
        self.read().clone()
    }

    pub fn to_partition_view(&self, leader_id: Option<u64>, term: u64) -> PartitionView {
        self.read().to_partition_view(leader_id, term)
    }

    pub fn set_last_applied(&self, index: u64) {
        self.write().last_applied_index = index;
    }

    pub fn last_applied(&self) -> u64 {
        self.read().last_applied_index
    }

    pub fn restore(&self, state: PlaneState) {
        *self.write() = state;
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
