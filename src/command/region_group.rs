use crate::command::frame::{self, I32_LEN};
use crate::error::{DecodeError, EncodeError};
use crate::replica_set::WireCodec;
use crate::types::RegionReplicaSet;
use bytes::{Buf, BufMut};
use std::collections::BTreeMap;

/// Creates region groups for one or more storage groups.
///
/// The map is a `BTreeMap`, so encoding always visits storage groups in
/// lexicographic order: two nodes that add the same pairs in a different call
/// order produce the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CreateRegionGroups {
    region_group_map: BTreeMap<String, Vec<RegionReplicaSet>>,
}

impl CreateRegionGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `replica_set` to the list for `storage_group`.
    pub fn add_region_group(&mut self, storage_group: impl Into<String>, replica_set: RegionReplicaSet) {
        self.region_group_map
            .entry(storage_group.into())
            .or_default()
            .push(replica_set);
    }

    pub fn region_group_map(&self) -> &BTreeMap<String, Vec<RegionReplicaSet>> {
        &self.region_group_map
    }

    pub fn storage_group_count(&self) -> usize {
        self.region_group_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.region_group_map.is_empty()
    }

    pub(crate) fn encode_payload<B: BufMut>(&self, buf: &mut B) -> Result<(), EncodeError> {
        frame::put_len(buf, "storage group count", self.region_group_map.len())?;
        for (storage_group, replica_sets) in &self.region_group_map {
            frame::put_str(buf, "storage group name", storage_group)?;
            frame::put_len(buf, "region replica set count", replica_sets.len())?;
            for replica_set in replica_sets {
                replica_set.encode_to(buf)?;
            }
        }
        Ok(())
    }

    pub(crate) fn decode_payload<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        // name length + replica set count
        const MIN_GROUP_ENTRY_LEN: usize = 2 * I32_LEN;

        let group_count = frame::get_count(buf, "storage group count", MIN_GROUP_ENTRY_LEN)?;
        let mut region_group_map: BTreeMap<String, Vec<RegionReplicaSet>> = BTreeMap::new();

        for _ in 0..group_count {
            let storage_group = frame::get_str(buf, "storage group name")?;
            let out_of_order = region_group_map
                .last_key_value()
                .is_some_and(|(last, _)| *last >= storage_group);
            if out_of_order {
                return Err(DecodeError::NonCanonicalOrder { key: storage_group });
            }

            let replica_set_count = frame::get_count(
                buf,
                "region replica set count",
                RegionReplicaSet::MIN_ENCODED_LEN,
            )?;
            let mut replica_sets = Vec::with_capacity(replica_set_count);
            for _ in 0..replica_set_count {
                replica_sets.push(RegionReplicaSet::decode_from(buf)?);
            }

            region_group_map.insert(storage_group, replica_sets);
        }

        Ok(Self { region_group_map })
    }
}
