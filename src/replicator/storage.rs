use crate::replicator::state_machine::{
    ApplyOutcome, DecodeErrorPolicy, EncodedCommand, PlaneState, SharedState,
};
use anyhow::Result;
use openraft::storage::{Adaptor, LogState, RaftStorage};
use openraft::{
    Entry, EntryPayload, ErrorSubject, ErrorVerb, LogId, OptionalSend, RaftLogReader,
    RaftSnapshotBuilder, Snapshot, SnapshotMeta, StorageError, StoredMembership, Vote,
};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::io::{self, Cursor};
use std::ops::{Bound, RangeBounds};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info};

pub type NodeIdType = u64;

openraft::declare_raft_types!(
    pub TypeConfig:
        D = EncodedCommand,
        R = ApplyOutcome,
        Node = PlaneNode,
);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PlaneNode {
    pub addr: String,
    pub hostname: String,
}

impl std::fmt::Display for PlaneNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.hostname, self.addr)
    }
}

const KEY_VOTE: &[u8] = b"vote";
const KEY_LAST_PURGED: &[u8] = b"last_purged";
const KEY_APPLIED: &[u8] = b"applied";
const KEY_SNAPSHOT_IDX: &[u8] = b"snapshot_idx";
const KEY_CURRENT_SNAPSHOT: &[u8] = b"current_snapshot";

// The table and the log position it reflects live under one key so they can
// never be persisted apart.
#[derive(Debug, Default, Serialize, Deserialize)]
struct AppliedState {
    last_applied: Option<LogId<NodeIdType>>,
    membership: StoredMembership<NodeIdType, PlaneNode>,
    state: PlaneState,
}

#[derive(Serialize, Deserialize)]
struct StoredSnapshot {
    meta: SnapshotMeta<NodeIdType, PlaneNode>,
    data: Vec<u8>,
}

fn storage_err<E>(subject: ErrorSubject<NodeIdType>, verb: ErrorVerb, e: E) -> StorageError<NodeIdType>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    StorageError::from_io_error(subject, verb, io::Error::new(io::ErrorKind::Other, e))
}

fn invalid_data<E>(subject: ErrorSubject<NodeIdType>, verb: ErrorVerb, e: E) -> StorageError<NodeIdType>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    StorageError::from_io_error(subject, verb, io::Error::new(io::ErrorKind::InvalidData, e))
}

#[derive(Clone)]
pub struct SledStorage {
    log_tree: sled::Tree,
    meta_tree: sled::Tree,
    state: SharedState,
    decode_policy: DecodeErrorPolicy,
    snapshot_idx: Arc<AtomicU64>,
}

impl SledStorage {
    pub fn new<P: AsRef<Path>>(
        path: P,
        state: SharedState,
        decode_policy: DecodeErrorPolicy,
    ) -> Result<Self> {
        let db = sled::open(path)?;
        let log_tree = db.open_tree("raft_log")?;
        let meta_tree = db.open_tree("raft_meta")?;

        let snapshot_idx = match meta_tree.get(KEY_SNAPSHOT_IDX)? {
            Some(v) => bincode::deserialize(&v)?,
            None => 0,
        };

        if let Some(applied) = meta_tree.get(KEY_APPLIED)? {
            let applied: AppliedState = serde_json::from_slice(&applied)?;
            info!(
                "Restored partition table at index {}",
                applied.state.last_applied_index
            );
            state.restore(applied.state);
        }

        Ok(Self {
            log_tree,
            meta_tree,
            state,
            decode_policy,
            snapshot_idx: Arc::new(AtomicU64::new(snapshot_idx)),
        })
    }

    fn log_key(index: u64) -> [u8; 8] {
        index.to_be_bytes()
    }

    fn read_meta<T: serde::de::DeserializeOwned>(
        &self,
        key: &[u8],
        subject: ErrorSubject<NodeIdType>,
    ) -> Result<Option<T>, StorageError<NodeIdType>> {
        let raw = self
            .meta_tree
            .get(key)
            .map_err(|e| storage_err(subject.clone(), ErrorVerb::Read, e))?;
        raw.map(|v| bincode::deserialize(&v))
            .transpose()
            .map_err(|e| invalid_data(subject, ErrorVerb::Read, e))
    }

    fn write_meta<T: Serialize>(
        &self,
        key: &[u8],
        value: &T,
        subject: ErrorSubject<NodeIdType>,
    ) -> Result<(), StorageError<NodeIdType>> {
        let data =
            bincode::serialize(value).map_err(|e| storage_err(subject.clone(), ErrorVerb::Write, e))?;
        self.meta_tree
            .insert(key, data)
            .map_err(|e| storage_err(subject, ErrorVerb::Write, e))?;
        Ok(())
    }

    fn load_applied(&self) -> Result<AppliedState, StorageError<NodeIdType>> {
        let raw = self
            .meta_tree
            .get(KEY_APPLIED)
            .map_err(|e| storage_err(ErrorSubject::StateMachine, ErrorVerb::Read, e))?;
        match raw {
            Some(v) => serde_json::from_slice(&v)
                .map_err(|e| invalid_data(ErrorSubject::StateMachine, ErrorVerb::Read, e)),
            None => Ok(AppliedState::default()),
        }
    }

    fn applied_bytes(
        &self,
        last_applied: Option<LogId<NodeIdType>>,
        membership: &StoredMembership<NodeIdType, PlaneNode>,
    ) -> Result<Vec<u8>, StorageError<NodeIdType>> {
        let applied = AppliedState {
            last_applied,
            membership: membership.clone(),
            state: self.state.snapshot(),
        };
        serde_json::to_vec(&applied)
            .map_err(|e| storage_err(ErrorSubject::StateMachine, ErrorVerb::Write, e))
    }

    fn save_applied(
        &self,
        last_applied: Option<LogId<NodeIdType>>,
        membership: &StoredMembership<NodeIdType, PlaneNode>,
    ) -> Result<(), StorageError<NodeIdType>> {
        let data = self.applied_bytes(last_applied, membership)?;
        self.meta_tree
            .insert(KEY_APPLIED, data)
            .map_err(|e| storage_err(ErrorSubject::StateMachine, ErrorVerb::Write, e))?;
        Ok(())
    }

    fn snapshot_bytes(
        meta: &SnapshotMeta<NodeIdType, PlaneNode>,
        data: &[u8],
    ) -> Result<Vec<u8>, StorageError<NodeIdType>> {
        let stored = StoredSnapshot {
            meta: meta.clone(),
            data: data.to_vec(),
        };
        serde_json::to_vec(&stored).map_err(|e| {
            storage_err(ErrorSubject::Snapshot(Some(meta.signature())), ErrorVerb::Write, e)
        })
    }

    fn flush_meta(&self) -> Result<(), StorageError<NodeIdType>> {
        self.meta_tree
            .flush()
            .map_err(|e| storage_err(ErrorSubject::StateMachine, ErrorVerb::Write, e))?;
        Ok(())
    }

    fn log_keys<R: RangeBounds<[u8; 8]>>(&self, range: R) -> Result<Vec<sled::IVec>, StorageError<NodeIdType>> {
        self.log_tree
            .range(range)
            .map(|r| {
                r.map(|(k, _)| k)
                    .map_err(|e| storage_err(ErrorSubject::Logs, ErrorVerb::Read, e))
            })
            .collect()
    }

    fn apply_entry(&self, entry: &Entry<TypeConfig>) -> Result<ApplyOutcome, StorageError<NodeIdType>> {
        let EntryPayload::Normal(encoded) = &entry.payload else {
            return Ok(ApplyOutcome::Applied);
        };

        match self.state.apply_encoded(encoded) {
            Ok(outcome) => Ok(outcome),
            Err(e) => match self.decode_policy {
                DecodeErrorPolicy::Halt => {
                    error!("Undecodable command at log index {}, halting: {}", entry.log_id.index, e);
                    Err(invalid_data(
                        ErrorSubject::Apply(entry.log_id),
                        ErrorVerb::Read,
                        e,
                    ))
                }
                DecodeErrorPolicy::Skip => {
                    error!("Skipping undecodable command at log index {}: {}", entry.log_id.index, e);
                    Ok(ApplyOutcome::Skipped {
                        reason: e.to_string(),
                    })
                }
            },
        }
    }

    pub fn shared_state(&self) -> &SharedState {
        &self.state
    }
}

impl RaftLogReader<TypeConfig> for SledStorage {
    async fn try_get_log_entries<RB: RangeBounds<u64> + Clone + Debug + OptionalSend>(
        &mut self,
        range: RB,
    ) -> Result<Vec<Entry<TypeConfig>>, StorageError<NodeIdType>> {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        };

        let mut entries = Vec::new();
        for item in self.log_tree.range(Self::log_key(start)..) {
            let (_, value) = item.map_err(|e| storage_err(ErrorSubject::Logs, ErrorVerb::Read, e))?;
            let entry: Entry<TypeConfig> = serde_json::from_slice(&value)
                .map_err(|e| invalid_data(ErrorSubject::Logs, ErrorVerb::Read, e))?;
            if !range.contains(&entry.log_id.index) {
                break;
            }
            entries.push(entry);
        }

        Ok(entries)
    }
}

impl RaftSnapshotBuilder<TypeConfig> for SledStorage {
    async fn build_snapshot(&mut self) -> Result<Snapshot<TypeConfig>, StorageError<NodeIdType>> {
        let applied = self.load_applied()?;
        let data = serde_json::to_vec(&applied.state)
            .map_err(|e| storage_err(ErrorSubject::StateMachine, ErrorVerb::Read, e))?;

        let snapshot_idx = self.snapshot_idx.fetch_add(1, Ordering::SeqCst) + 1;
        self.write_meta(KEY_SNAPSHOT_IDX, &snapshot_idx, ErrorSubject::StateMachine)?;

        let snapshot_id = match applied.last_applied {
            Some(log_id) => format!("{}-{}-{}", log_id.leader_id, log_id.index, snapshot_idx),
            None => format!("--{}", snapshot_idx),
        };

        let meta = SnapshotMeta {
            last_log_id: applied.last_applied,
            last_membership: applied.membership,
            snapshot_id,
        };

        let stored = Self::snapshot_bytes(&meta, &data)?;
        self.meta_tree
            .insert(KEY_CURRENT_SNAPSHOT, stored)
            .map_err(|e| storage_err(ErrorSubject::Snapshot(Some(meta.signature())), ErrorVerb::Write, e))?;
        self.flush_meta()?;

        info!("Built snapshot {}", meta.snapshot_id);
        Ok(Snapshot {
            meta,
            snapshot: Box::new(Cursor::new(data)),
        })
    }
}

impl RaftStorage<TypeConfig> for SledStorage {
    type LogReader = Self;
    type SnapshotBuilder = Self;

    async fn get_log_state(&mut self) -> Result<LogState<TypeConfig>, StorageError<NodeIdType>> {
        let last_purged: Option<LogId<NodeIdType>> =
            self.read_meta(KEY_LAST_PURGED, ErrorSubject::Logs)?;

        let last_entry = self
            .log_tree
            .last()
            .map_err(|e| storage_err(ErrorSubject::Logs, ErrorVerb::Read, e))?;
        let last_log_id = match last_entry {
            Some((_, v)) => {
                let entry: Entry<TypeConfig> = serde_json::from_slice(&v)
                    .map_err(|e| invalid_data(ErrorSubject::Logs, ErrorVerb::Read, e))?;
                Some(entry.log_id)
            }
            None => last_purged,
        };

        Ok(LogState {
            last_purged_log_id: last_purged,
            last_log_id,
        })
    }

    async fn save_vote(&mut self, vote: &Vote<NodeIdType>) -> Result<(), StorageError<NodeIdType>> {
        self.write_meta(KEY_VOTE, vote, ErrorSubject::Vote)?;
        self.meta_tree
            .flush()
            .map_err(|e| storage_err(ErrorSubject::Vote, ErrorVerb::Write, e))?;
        Ok(())
    }

    async fn read_vote(&mut self) -> Result<Option<Vote<NodeIdType>>, StorageError<NodeIdType>> {
        self.read_meta(KEY_VOTE, ErrorSubject::Vote)
    }

    async fn get_log_reader(&mut self) -> Self::LogReader {
        self.clone()
    }

    async fn append_to_log<I>(&mut self, entries: I) -> Result<(), StorageError<NodeIdType>>
    where
        I: IntoIterator<Item = Entry<TypeConfig>> + OptionalSend,
    {
        for entry in entries {
            let key = Self::log_key(entry.log_id.index);
            let value = serde_json::to_vec(&entry)
                .map_err(|e| storage_err(ErrorSubject::Logs, ErrorVerb::Write, e))?;
            self.log_tree
                .insert(key, value)
                .map_err(|e| storage_err(ErrorSubject::Logs, ErrorVerb::Write, e))?;
        }
        self.log_tree
            .flush()
            .map_err(|e| storage_err(ErrorSubject::Logs, ErrorVerb::Write, e))?;
        Ok(())
    }

    async fn delete_conflict_logs_since(
        &mut self,
        log_id: LogId<NodeIdType>,
    ) -> Result<(), StorageError<NodeIdType>> {
        let keys = self.log_keys(Self::log_key(log_id.index)..)?;

        for key in keys {
            self.log_tree
                .remove(key)
                .map_err(|e| storage_err(ErrorSubject::Logs, ErrorVerb::Delete, e))?;
        }
        Ok(())
    }

    async fn purge_logs_upto(
        &mut self,
        log_id: LogId<NodeIdType>,
    ) -> Result<(), StorageError<NodeIdType>> {
        self.write_meta(KEY_LAST_PURGED, &log_id, ErrorSubject::Logs)?;

        let keys = self.log_keys(..=Self::log_key(log_id.index))?;

        for key in keys {
            self.log_tree
                .remove(key)
                .map_err(|e| storage_err(ErrorSubject::Logs, ErrorVerb::Delete, e))?;
        }
        Ok(())
    }

    async fn last_applied_state(
        &mut self,
    ) -> Result<
        (
            Option<LogId<NodeIdType>>,
            StoredMembership<NodeIdType, PlaneNode>,
        ),
        StorageError<NodeIdType>,
    > {
        let applied = self.load_applied()?;
        Ok((applied.last_applied, applied.membership))
    }

    async fn apply_to_state_machine(
        &mut self,
        entries: &[Entry<TypeConfig>],
    ) -> Result<Vec<ApplyOutcome>, StorageError<NodeIdType>> {
        let mut outcomes = Vec::with_capacity(entries.len());
        let mut membership = self.load_applied()?.membership;

        // Each entry is persisted together with the table it produced before
        // the next one is applied.
        for entry in entries {
            let outcome = self.apply_entry(entry)?;

            if let EntryPayload::Membership(mem) = &entry.payload {
                membership = StoredMembership::new(Some(entry.log_id), mem.clone());
            }

            self.state.set_last_applied(entry.log_id.index);
            self.save_applied(Some(entry.log_id), &membership)?;
            outcomes.push(outcome);
        }

        self.flush_meta()?;
        Ok(outcomes)
    }

    async fn get_snapshot_builder(&mut self) -> Self::SnapshotBuilder {
        self.clone()
    }

    async fn begin_receiving_snapshot(
        &mut self,
    ) -> Result<Box<Cursor<Vec<u8>>>, StorageError<NodeIdType>> {
        Ok(Box::new(Cursor::new(Vec::new())))
    }

    async fn install_snapshot(
        &mut self,
        meta: &SnapshotMeta<NodeIdType, PlaneNode>,
        snapshot: Box<Cursor<Vec<u8>>>,
    ) -> Result<(), StorageError<NodeIdType>> {
        let data = snapshot.into_inner();
        let plane_state: PlaneState = serde_json::from_slice(&data).map_err(|e| {
            invalid_data(ErrorSubject::Snapshot(Some(meta.signature())), ErrorVerb::Read, e)
        })?;

        self.state.restore(plane_state);
        if let Some(log_id) = meta.last_log_id {
            self.state.set_last_applied(log_id.index);
        }

        let mut batch = sled::Batch::default();
        batch.insert(KEY_APPLIED, self.applied_bytes(meta.last_log_id, &meta.last_membership)?);
        batch.insert(KEY_CURRENT_SNAPSHOT, Self::snapshot_bytes(meta, &data)?);
        self.meta_tree
            .apply_batch(batch)
            .map_err(|e| storage_err(ErrorSubject::Snapshot(Some(meta.signature())), ErrorVerb::Write, e))?;
        self.flush_meta()?;

        info!("Installed snapshot {}", meta.snapshot_id);
        Ok(())
    }

    async fn get_current_snapshot(
        &mut self,
    ) -> Result<Option<Snapshot<TypeConfig>>, StorageError<NodeIdType>> {
        let raw = self
            .meta_tree
            .get(KEY_CURRENT_SNAPSHOT)
            .map_err(|e| storage_err(ErrorSubject::Snapshot(None), ErrorVerb::Read, e))?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let stored: StoredSnapshot = serde_json::from_slice(&raw)
            .map_err(|e| invalid_data(ErrorSubject::Snapshot(None), ErrorVerb::Read, e))?;
        Ok(Some(Snapshot {
            meta: stored.meta,
            snapshot: Box::new(Cursor::new(stored.data)),
        }))
    }
}

pub type SledAdaptorLogStore = Adaptor<TypeConfig, SledStorage>;
pub type SledAdaptorStateMachine = Adaptor<TypeConfig, SledStorage>;

pub fn create_storage<P: AsRef<Path>>(
    path: P,
    state: SharedState,
    decode_policy: DecodeErrorPolicy,
) -> Result<(SledAdaptorLogStore, SledAdaptorStateMachine)> {
    let storage = SledStorage::new(path, state, decode_policy)?;
    Ok(Adaptor::new(storage))
}
