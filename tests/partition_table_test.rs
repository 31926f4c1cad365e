use metaplane::command::*;
use metaplane::*;

fn location(id: i32) -> DataNodeLocation {
    DataNodeLocation {
        data_node_id: id,
        internal_endpoint: Endpoint::new(format!("10.0.0.{}", id), 9003),
    }
}

fn data_region(id: i32) -> RegionReplicaSet {
    RegionReplicaSet::new(
        ConsensusGroupId::new(ConsensusGroupType::DataRegion, id),
        vec![location(1), location(2)],
    )
}

fn table_with_groups(names: &[&str]) -> PartitionTable {
    let mut table = PartitionTable::new();
    for name in names {
        table
            .apply(&SetStorageGroup::new(StorageGroupSchema::new(*name)).into())
            .unwrap();
    }
    table
}

#[test]
fn test_partition_table_new() {
    let table = PartitionTable::new();
    assert!(table.storage_groups().is_empty());
    assert_eq!(table.data_nodes().count(), 0);
    assert_eq!(table.region_group_count(), 0);
}

#[test]
fn test_apply_register_data_node() {
    let mut table = PartitionTable::new();
    table.apply(&RegisterDataNode::new(location(1)).into()).unwrap();

    assert_eq!(table.data_node(1), Some(&location(1)));

    // same location again is a no-op
    table.apply(&RegisterDataNode::new(location(1)).into()).unwrap();
    assert_eq!(table.data_nodes().count(), 1);
}

#[test]
fn test_apply_register_data_node_conflict() {
    let mut table = PartitionTable::new();
    table.apply(&RegisterDataNode::new(location(1)).into()).unwrap();

    let moved = DataNodeLocation {
        data_node_id: 1,
        internal_endpoint: Endpoint::new("10.0.0.99", 9003),
    };
    let err = table.apply(&RegisterDataNode::new(moved).into()).unwrap_err();
    assert_eq!(err, ApplicationError::DataNodeConflict { data_node_id: 1 });
    assert_eq!(table.data_node(1), Some(&location(1)));
}

#[test]
fn test_apply_set_storage_group() {
    let mut table = table_with_groups(&["root.sg0"]);

    assert!(table.storage_group("root.sg0").is_some());
    let err = table
        .apply(&SetStorageGroup::new(StorageGroupSchema::new("root.sg0")).into())
        .unwrap_err();
    assert_eq!(
        err,
        ApplicationError::StorageGroupAlreadyExists("root.sg0".to_string())
    );
}

#[test]
fn test_apply_set_storage_group_invalid() {
    let mut table = PartitionTable::new();

    let err = table
        .apply(&SetStorageGroup::new(StorageGroupSchema::new("")).into())
        .unwrap_err();
    assert!(matches!(err, ApplicationError::InvalidStorageGroup { .. }));

    let mut schema = StorageGroupSchema::new("root.sg0");
    schema.data_replication_factor = 0;
    let err = table.apply(&SetStorageGroup::new(schema).into()).unwrap_err();
    assert!(matches!(err, ApplicationError::InvalidStorageGroup { .. }));
    assert!(table.storage_groups().is_empty());
}

#[test]
fn test_apply_delete_storage_group() {
    let mut table = table_with_groups(&["root.sg0"]);
    let mut create = CreateRegionGroups::new();
    create.add_region_group("root.sg0", data_region(1));
    table.apply(&create.into()).unwrap();

    table.apply(&DeleteStorageGroup::new("root.sg0").into()).unwrap();
    assert!(table.storage_group("root.sg0").is_none());
    assert_eq!(table.region_group_count(), 0);

    let err = table
        .apply(&DeleteStorageGroup::new("root.sg0").into())
        .unwrap_err();
    assert_eq!(err, ApplicationError::StorageGroupNotFound("root.sg0".to_string()));
}

#[test]
fn test_apply_create_region_groups() {
    let mut table = table_with_groups(&["root.sg0", "root.sg1"]);

    let mut create = CreateRegionGroups::new();
    create.add_region_group("root.sg1", data_region(1));
    create.add_region_group("root.sg1", data_region(2));
    create.add_region_group("root.sg0", data_region(3));
    table.apply(&create.into()).unwrap();

    assert_eq!(table.region_groups_of("root.sg1"), &[data_region(1), data_region(2)]);
    assert_eq!(table.region_groups_of("root.sg0"), &[data_region(3)]);
    assert_eq!(table.region_group_count(), 3);
}

#[test]
fn test_create_region_groups_merges_with_existing() {
    let mut table = table_with_groups(&["root.sg0"]);

    let mut first = CreateRegionGroups::new();
    first.add_region_group("root.sg0", data_region(1));
    table.apply(&first.into()).unwrap();

    let mut second = CreateRegionGroups::new();
    second.add_region_group("root.sg0", data_region(2));
    table.apply(&second.into()).unwrap();

    assert_eq!(table.region_groups_of("root.sg0"), &[data_region(1), data_region(2)]);
}

#[test]
fn test_create_region_groups_unknown_storage_group_changes_nothing() {
    let mut table = table_with_groups(&["root.sg0"]);

    let mut create = CreateRegionGroups::new();
    create.add_region_group("root.sg0", data_region(1));
    create.add_region_group("root.sg9", data_region(2));

    let err = table.apply(&create.into()).unwrap_err();
    assert_eq!(err, ApplicationError::StorageGroupNotFound("root.sg9".to_string()));
    assert!(table.region_groups_of("root.sg0").is_empty());
}

#[test]
fn test_create_region_groups_duplicate_region_rejected() {
    let mut table = table_with_groups(&["root.sg0", "root.sg1"]);

    let mut first = CreateRegionGroups::new();
    first.add_region_group("root.sg0", data_region(1));
    table.apply(&first.into()).unwrap();
    let before = table.clone();

    let mut second = CreateRegionGroups::new();
    second.add_region_group("root.sg0", data_region(2));
    second.add_region_group("root.sg1", data_region(1));
    let err = table.apply(&second.into()).unwrap_err();

    assert!(matches!(err, ApplicationError::RegionGroupAlreadyExists { .. }));
    assert_eq!(table, before);
}

#[test]
fn test_same_region_id_different_group_type_allowed() {
    let mut table = table_with_groups(&["root.sg0"]);

    let schema_region = RegionReplicaSet::new(
        ConsensusGroupId::new(ConsensusGroupType::SchemaRegion, 1),
        vec![location(1)],
    );
    let mut create = CreateRegionGroups::new();
    create.add_region_group("root.sg0", schema_region);
    create.add_region_group("root.sg0", data_region(1));

    table.apply(&create.into()).unwrap();
    assert_eq!(table.region_group_count(), 2);
}

#[test]
fn test_tables_fed_same_bytes_converge() {
    let mut log: Vec<ConfigCommand> = Vec::new();
    log.push(SetStorageGroup::new(StorageGroupSchema::new("root.sg0")).into());
    log.push(SetStorageGroup::new(StorageGroupSchema::new("root.sg1")).into());
    let mut create = CreateRegionGroups::new();
    create.add_region_group("root.sg1", data_region(4));
    create.add_region_group("root.sg0", data_region(5));
    log.push(create.into());

    let encoded: Vec<_> = log.iter().map(|c| c.encode().unwrap()).collect();

    let mut a = PartitionTable::new();
    let mut b = PartitionTable::new();
    for bytes in &encoded {
        a.apply(&ConfigCommand::decode(bytes).unwrap()).unwrap();
        b.apply(&ConfigCommand::decode(bytes).unwrap()).unwrap();
    }

    assert_eq!(a, b);
    assert_eq!(serde_json::to_vec(&a).unwrap(), serde_json::to_vec(&b).unwrap());
}
