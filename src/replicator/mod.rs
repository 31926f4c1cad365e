mod network;
mod raft_node;
pub mod state_machine;
pub mod storage;

pub use network::*;
pub use raft_node::*;
pub use state_machine::*;
pub use storage::*;

use crate::command::ConfigCommand;
use crate::types::*;
use async_trait::async_trait;

#[async_trait]
pub trait Replicator: Send + Sync {
    // Rejections come back as an ApplicationError inside the anyhow error.
    async fn submit(&self, command: ConfigCommand) -> anyhow::Result<()>;
    fn snapshot(&self) -> PartitionView;
    fn is_leader(&self) -> bool;
    fn leader_id(&self) -> Option<u64>;
    async fn add_peer(&self, peer: PeerInfo) -> anyhow::Result<()>;
}
