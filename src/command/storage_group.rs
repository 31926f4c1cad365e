use crate::command::frame;
use crate::error::{DecodeError, EncodeError};
use crate::types::StorageGroupSchema;
use bytes::{Buf, BufMut};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SetStorageGroup {
    pub schema: StorageGroupSchema,
}

impl SetStorageGroup {
    pub fn new(schema: StorageGroupSchema) -> Self {
        Self { schema }
    }

    pub(crate) fn encode_payload<B: BufMut>(&self, buf: &mut B) -> Result<(), EncodeError> {
        let schema = &self.schema;
        frame::put_str(buf, "storage group name", &schema.name)?;
        buf.put_i64(schema.ttl_ms);
        buf.put_i32(schema.schema_replication_factor);
        buf.put_i32(schema.data_replication_factor);
        buf.put_i64(schema.time_partition_interval_ms);
        Ok(())
    }

    pub(crate) fn decode_payload<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let schema = StorageGroupSchema {
            name: frame::get_str(buf, "storage group name")?,
            ttl_ms: frame::get_i64(buf, "ttl")?,
            schema_replication_factor: frame::get_i32(buf, "schema replication factor")?,
            data_replication_factor: frame::get_i32(buf, "data replication factor")?,
            time_partition_interval_ms: frame::get_i64(buf, "time partition interval")?,
        };
        Ok(Self { schema })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeleteStorageGroup {
    pub name: String,
}

impl DeleteStorageGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub(crate) fn encode_payload<B: BufMut>(&self, buf: &mut B) -> Result<(), EncodeError> {
        frame::put_str(buf, "storage group name", &self.name)
    }

    pub(crate) fn decode_payload<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let name = frame::get_str(buf, "storage group name")?;
        Ok(Self { name })
    }
}
