use metaplane::command::*;
use metaplane::replicator::state_machine::*;
use metaplane::replicator::storage::{PlaneNode, SledStorage, TypeConfig};
use metaplane::*;
use openraft::storage::RaftStorage;
use openraft::testing::log_id;
use openraft::{Entry, EntryPayload, Membership, RaftLogReader, RaftSnapshotBuilder};
use std::collections::BTreeSet;
use std::io::Cursor;
use tempfile::TempDir;

fn set_sg(name: &str) -> ConfigCommand {
    SetStorageGroup::new(StorageGroupSchema::new(name)).into()
}

fn create_region(sg: &str, id: i32) -> ConfigCommand {
    let mut cmd = CreateRegionGroups::new();
    cmd.add_region_group(
        sg,
        RegionReplicaSet::new(
            ConsensusGroupId::new(ConsensusGroupType::DataRegion, id),
            vec![DataNodeLocation {
                data_node_id: 1,
                internal_endpoint: Endpoint::new("127.0.0.1", 9003),
            }],
        ),
    );
    cmd.into()
}

fn encoded(command: &ConfigCommand) -> EncodedCommand {
    EncodedCommand::encode(command).unwrap()
}

#[test]
fn test_plane_state_new() {
    let state = PlaneState::new();
    assert!(state.table.storage_groups().is_empty());
    assert_eq!(state.last_applied_index, 0);
}

#[test]
fn test_shared_state_apply() {
    let shared = SharedState::new();
    shared.apply(&set_sg("root.sg0")).unwrap();

    let snapshot = shared.snapshot();
    assert!(snapshot.table.storage_group("root.sg0").is_some());
}

#[test]
fn test_apply_encoded_applies_fresh_command() {
    let shared = SharedState::new();

    let outcome = shared.apply_encoded(&encoded(&set_sg("root.sg0"))).unwrap();
    assert_eq!(outcome, ApplyOutcome::Applied);

    let outcome = shared
        .apply_encoded(&encoded(&create_region("root.sg0", 1)))
        .unwrap();
    assert_eq!(outcome, ApplyOutcome::Applied);
    assert_eq!(shared.snapshot().table.region_group_count(), 1);
}

#[test]
fn test_apply_encoded_reports_rejection() {
    let shared = SharedState::new();

    let outcome = shared
        .apply_encoded(&encoded(&create_region("root.missing", 1)))
        .unwrap();
    assert_eq!(
        outcome,
        ApplyOutcome::Rejected(ApplicationError::StorageGroupNotFound(
            "root.missing".to_string()
        ))
    );
    assert_eq!(shared.snapshot().table.region_group_count(), 0);
}

#[test]
fn test_apply_encoded_returns_decode_error() {
    let shared = SharedState::new();
    shared.apply(&set_sg("root.sg0")).unwrap();
    let before = shared.snapshot().table;

    let mut bytes = encoded(&create_region("root.sg0", 1)).0;
    bytes.truncate(bytes.len() - 3);

    let err = shared.apply_encoded(&EncodedCommand(bytes)).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated { .. }));
    assert_eq!(shared.snapshot().table, before);
}

#[test]
fn test_apply_encoded_unknown_kind() {
    let shared = SharedState::new();
    let mut bytes = encoded(&set_sg("root.sg0")).0;
    bytes[..4].copy_from_slice(&99i32.to_be_bytes());

    let err = shared.apply_encoded(&EncodedCommand(bytes)).unwrap_err();
    assert_eq!(err, DecodeError::UnknownKind { tag: 99 });
}

#[test]
fn test_shared_state_to_partition_view() {
    let shared = SharedState::new();
    shared.apply(&set_sg("root.sg0")).unwrap();
    shared.apply(&create_region("root.sg0", 4)).unwrap();
    shared.set_last_applied(12);

    let view = shared.to_partition_view(Some(1), 5);
    assert_eq!(view.storage_groups.len(), 1);
    assert_eq!(view.region_group_count(), 1);
    assert_eq!(view.last_applied_index, 12);
    assert_eq!(view.leader_id, Some(1));
    assert_eq!(view.term, 5);
}

#[test]
fn test_shared_state_restore() {
    let shared = SharedState::new();

    let mut state = PlaneState::new();
    state.table.apply(&set_sg("root.sg0")).unwrap();
    state.last_applied_index = 100;

    shared.restore(state);

    let snapshot = shared.snapshot();
    assert!(snapshot.table.storage_group("root.sg0").is_some());
    assert_eq!(snapshot.last_applied_index, 100);
}

#[test]
fn test_shared_state_last_applied() {
    let shared = SharedState::new();
    assert_eq!(shared.last_applied(), 0);

    shared.set_last_applied(42);
    assert_eq!(shared.last_applied(), 42);
}

#[test]
fn test_shared_state_clone() {
    let shared = SharedState::new();
    shared.apply(&set_sg("root.sg0")).unwrap();

    let cloned = shared.clone();
    cloned.apply(&set_sg("root.sg1")).unwrap();

    assert_eq!(shared.snapshot().table.storage_groups().len(), 2);
}

#[test]
fn test_plane_state_snapshot_json_round_trip() {
    let shared = SharedState::new();
    shared.apply(&set_sg("root.sg0")).unwrap();
    shared.apply(&create_region("root.sg0", 2)).unwrap();

    let data = serde_json::to_vec(&shared.snapshot()).unwrap();
    let restored: PlaneState = serde_json::from_slice(&data).unwrap();
    assert_eq!(restored.table, shared.snapshot().table);
}

#[test]
fn test_decode_error_policy_default_is_halt() {
    assert_eq!(DecodeErrorPolicy::default(), DecodeErrorPolicy::Halt);
}

#[test]
fn test_sled_storage_opens_empty() {
    let temp_dir = TempDir::new().unwrap();
    let shared = SharedState::new();

    let storage = SledStorage::new(temp_dir.path(), shared, DecodeErrorPolicy::Skip).unwrap();
    assert_eq!(storage.shared_state().last_applied(), 0);
    assert!(storage.shared_state().snapshot().table.storage_groups().is_empty());
}

fn raw_entry(index: u64, bytes: Vec<u8>) -> Entry<TypeConfig> {
    Entry {
        log_id: log_id(1, 1, index),
        payload: EntryPayload::Normal(EncodedCommand(bytes)),
    }
}

fn command_entry(index: u64, command: &ConfigCommand) -> Entry<TypeConfig> {
    raw_entry(index, encoded(command).0)
}

fn open(dir: &TempDir, policy: DecodeErrorPolicy) -> SledStorage {
    SledStorage::new(dir.path(), SharedState::new(), policy).unwrap()
}

#[tokio::test]
async fn test_halt_keeps_entries_applied_before_failure() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut storage = open(&temp_dir, DecodeErrorPolicy::Halt);
        let entries = vec![
            command_entry(1, &set_sg("root.sg0")),
            raw_entry(2, vec![0, 0, 0, 99]),
        ];

        let result = storage.apply_to_state_machine(&entries).await;
        assert!(result.is_err());
        assert_eq!(storage.shared_state().last_applied(), 1);
    }

    let mut storage = open(&temp_dir, DecodeErrorPolicy::Halt);
    let (last_applied, _) = storage.last_applied_state().await.unwrap();
    assert_eq!(last_applied, Some(log_id(1, 1, 1)));
    assert!(storage
        .shared_state()
        .snapshot()
        .table
        .storage_group("root.sg0")
        .is_some());
}

#[tokio::test]
async fn test_skip_policy_advances_past_undecodable_entry() {
    let temp_dir = TempDir::new().unwrap();
    let mut storage = open(&temp_dir, DecodeErrorPolicy::Skip);

    let entries = vec![
        command_entry(1, &set_sg("root.sg0")),
        raw_entry(2, vec![0xff; 3]),
        command_entry(3, &create_region("root.sg0", 1)),
    ];
    let outcomes = storage.apply_to_state_machine(&entries).await.unwrap();

    assert_eq!(outcomes[0], ApplyOutcome::Applied);
    assert!(matches!(outcomes[1], ApplyOutcome::Skipped { .. }));
    assert_eq!(outcomes[2], ApplyOutcome::Applied);

    let (last_applied, _) = storage.last_applied_state().await.unwrap();
    assert_eq!(last_applied, Some(log_id(1, 1, 3)));
    assert_eq!(storage.shared_state().snapshot().table.region_group_count(), 1);
}

#[tokio::test]
async fn test_rejected_command_still_advances_last_applied() {
    let temp_dir = TempDir::new().unwrap();
    let mut storage = open(&temp_dir, DecodeErrorPolicy::Halt);

    let entries = vec![command_entry(1, &create_region("root.missing", 1))];
    let outcomes = storage.apply_to_state_machine(&entries).await.unwrap();

    assert!(matches!(outcomes[0], ApplyOutcome::Rejected(_)));
    let (last_applied, _) = storage.last_applied_state().await.unwrap();
    assert_eq!(last_applied, Some(log_id(1, 1, 1)));
}

#[tokio::test]
async fn test_membership_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let membership: Membership<u64, PlaneNode> = Membership::new(vec![BTreeSet::from([1u64])], ());
    {
        let mut storage = open(&temp_dir, DecodeErrorPolicy::Halt);
        let entries = vec![
            Entry {
                log_id: log_id(1, 1, 1),
                payload: EntryPayload::Membership(membership.clone()),
            },
            command_entry(2, &set_sg("root.sg0")),
        ];
        storage.apply_to_state_machine(&entries).await.unwrap();
    }

    let mut storage = open(&temp_dir, DecodeErrorPolicy::Halt);
    let (last_applied, stored) = storage.last_applied_state().await.unwrap();
    assert_eq!(last_applied, Some(log_id(1, 1, 2)));
    assert_eq!(stored.log_id(), &Some(log_id(1, 1, 1)));
    assert_eq!(stored.membership(), &membership);
}

#[tokio::test]
async fn test_built_snapshot_is_kept_and_installable() {
    let leader_dir = TempDir::new().unwrap();
    let mut leader = open(&leader_dir, DecodeErrorPolicy::Halt);
    assert!(leader.get_current_snapshot().await.unwrap().is_none());

    let entries = vec![
        command_entry(1, &set_sg("root.sg0")),
        command_entry(2, &create_region("root.sg0", 7)),
    ];
    leader.apply_to_state_machine(&entries).await.unwrap();

    let mut builder = leader.get_snapshot_builder().await;
    let built = builder.build_snapshot().await.unwrap();
    assert_eq!(built.meta.last_log_id, Some(log_id(1, 1, 2)));

    let current = leader.get_current_snapshot().await.unwrap().unwrap();
    assert_eq!(current.meta, built.meta);
    let data = current.snapshot.into_inner();
    let state: PlaneState = serde_json::from_slice(&data).unwrap();
    assert_eq!(state.table.region_group_count(), 1);

    let follower_dir = TempDir::new().unwrap();
    let mut follower = open(&follower_dir, DecodeErrorPolicy::Halt);
    follower
        .install_snapshot(&current.meta, Box::new(Cursor::new(data)))
        .await
        .unwrap();

    assert_eq!(follower.shared_state().snapshot().table, leader.shared_state().snapshot().table);
    let (last_applied, _) = follower.last_applied_state().await.unwrap();
    assert_eq!(last_applied, Some(log_id(1, 1, 2)));
    let installed = follower.get_current_snapshot().await.unwrap().unwrap();
    assert_eq!(installed.meta.snapshot_id, current.meta.snapshot_id);
}

#[tokio::test]
async fn test_log_truncation_and_purge() {
    let temp_dir = TempDir::new().unwrap();
    let mut storage = open(&temp_dir, DecodeErrorPolicy::Halt);

    let entries: Vec<_> = (1..=5)
        .map(|i| command_entry(i, &set_sg(&format!("root.sg{}", i))))
        .collect();
    storage.append_to_log(entries).await.unwrap();

    storage.delete_conflict_logs_since(log_id(1, 1, 4)).await.unwrap();
    let state = storage.get_log_state().await.unwrap();
    assert_eq!(state.last_log_id, Some(log_id(1, 1, 3)));

    storage.purge_logs_upto(log_id(1, 1, 2)).await.unwrap();
    let remaining: Vec<u64> = storage
        .try_get_log_entries(0..10)
        .await
        .unwrap()
        .iter()
        .map(|e| e.log_id.index)
        .collect();
    assert_eq!(remaining, vec![3]);

    let state = storage.get_log_state().await.unwrap();
    assert_eq!(state.last_purged_log_id, Some(log_id(1, 1, 2)));
    assert_eq!(state.last_log_id, Some(log_id(1, 1, 3)));
}
