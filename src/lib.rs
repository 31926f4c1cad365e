pub mod api;
pub mod command;
pub mod config;
pub mod daemon;
pub mod error;
pub mod partition;
pub mod raft_api;
pub mod replica_set;
pub mod replicator;
pub mod types;

pub use api::create_router;
pub use command::{CommandKind, ConfigCommand, CreateRegionGroups};
pub use config::NodeConfig;
pub use daemon::PlaneDaemon;
pub use error::{ApplicationError, DecodeError, EncodeError};
pub use partition::PartitionTable;
pub use raft_api::create_raft_router;
pub use replica_set::WireCodec;
pub use replicator::{RaftReplicator, Replicator};
pub use types::*;
