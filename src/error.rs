use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decoding never yields a partially built command: every variant is
/// returned before the caller sees any value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated stream: needed {needed} bytes for {field}, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("unknown command kind tag {tag}")]
    UnknownKind { tag: i32 },

    #[error("negative {field}: {value}")]
    NegativeLength { field: &'static str, value: i32 },

    #[error("{field} of {count} cannot fit in {remaining} remaining bytes")]
    CountTooLarge {
        field: &'static str,
        count: i32,
        remaining: usize,
    },

    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("unknown consensus group type {value}")]
    UnknownGroupType { value: i32 },

    #[error("storage group {key:?} is out of order or duplicated")]
    NonCanonicalOrder { key: String },

    #[error("{count} trailing bytes after a complete command")]
    TrailingBytes { count: usize },
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{field} of {len} does not fit an int32 frame")]
    TooLarge { field: &'static str, len: usize },

    #[error("failed to write command: {0}")]
    Io(#[from] std::io::Error),
}

// Crosses the raft response back to the proposing node.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ApplicationError {
    #[error("storage group {0} does not exist")]
    StorageGroupNotFound(String),

    #[error("storage group {0} already exists")]
    StorageGroupAlreadyExists(String),

    #[error("invalid storage group {name:?}: {reason}")]
    InvalidStorageGroup { name: String, reason: String },

    #[error("region group {region} already exists in storage group {storage_group}")]
    RegionGroupAlreadyExists {
        storage_group: String,
        region: String,
    },

    #[error("data node {data_node_id} is already registered at a different location")]
    DataNodeConflict { data_node_id: i32 },
}
