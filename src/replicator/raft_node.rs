use crate::command::ConfigCommand;
use crate::config::RaftSettings;
use crate::replicator::network::PlaneNetworkFactory;
use crate::replicator::state_machine::{ApplyOutcome, DecodeErrorPolicy, EncodedCommand, SharedState};
use crate::replicator::storage::{create_storage, NodeIdType, PlaneNode, TypeConfig};
use crate::replicator::Replicator;
use crate::types::*;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use openraft::error::{InitializeError, RaftError};
use openraft::{ChangeMembers, Config, Raft};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub type PlaneRaft = Raft<TypeConfig>;

pub struct RaftReplicator {
    node_id: NodeIdType,
    node: PlaneNode,
    raft: PlaneRaft,
    state: SharedState,
    network: PlaneNetworkFactory,
}

impl RaftReplicator {
    pub async fn new<P: AsRef<Path>>(
        node_id: NodeIdType,
        node: PlaneNode,
        data_dir: P,
        settings: &RaftSettings,
        decode_policy: DecodeErrorPolicy,
    ) -> Result<Self> {
        let config = Config {
            cluster_name: "metaplane".to_string(),
            heartbeat_interval: settings.heartbeat_interval_ms,
            election_timeout_min: settings.election_timeout_min_ms,
            election_timeout_max: settings.election_timeout_max_ms,
            ..Default::default()
        };
        let config = Arc::new(config.validate()?);

        let state = SharedState::new();
        let storage_path = data_dir.as_ref().join("raft");
        std::fs::create_dir_all(&storage_path)?;
        let (log_store, sm_store) = create_storage(&storage_path, state.clone(), decode_policy)?;
        let network = PlaneNetworkFactory::new();

        network.register_node(node_id, node.addr.clone());

        let raft = Raft::new(node_id, config, network.clone(), log_store, sm_store).await?;

        info!(
            "Raft node {} initialized as {} with storage at {:?}",
            node_id, node, storage_path
        );

        Ok(Self {
            node_id,
            node,
            raft,
            state,
            network,
        })
    }

    pub async fn initialize(&self, voters: &[PeerInfo]) -> Result<()> {
        let mut members = BTreeMap::new();
        members.insert(self.node_id, self.node.clone());
        for peer in voters.iter().filter(|p| p.is_voter) {
            self.network.register_node(peer.node_id, peer.addr.clone());
            members.insert(peer.node_id, peer_node(peer));
        }

        match self.raft.initialize(members).await {
            Ok(()) => Ok(()),
            Err(RaftError::APIError(InitializeError::NotAllowed(e))) => {
                info!("Cluster already initialized: {}", e);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn raft(&self) -> &PlaneRaft {
        &self.raft
    }

    pub fn node_id(&self) -> NodeIdType {
        self.node_id
    }

    pub fn shared_state(&self) -> &SharedState {
        &self.state
    }

    pub fn network(&self) -> &PlaneNetworkFactory {
        &self.network
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.raft
            .shutdown()
            .await
            .map_err(|e| anyhow!("Raft shutdown failed: {}", e))
    }
}

fn peer_node(peer: &PeerInfo) -> PlaneNode {
    PlaneNode {
        addr: peer.addr.clone(),
        hostname: format!("node-{}", peer.node_id),
    }
}

#[async_trait]
impl Replicator for RaftReplicator {
    async fn submit(&self, command: ConfigCommand) -> Result<()> {
        let kind = command.kind();
        let entry = EncodedCommand::encode(&command)?;

        let resp = self
            .raft
            .client_write(entry)
            .await
            .map_err(|e| anyhow!("Raft write failed: {}", e))?;
        debug!("{} committed at {}", kind, resp.log_id);

        match resp.data {
            ApplyOutcome::Applied => Ok(()),
            ApplyOutcome::Rejected(e) => Err(e.into()),
            ApplyOutcome::Skipped { reason } => {
                Err(anyhow!("{} at {} was skipped: {}", kind, resp.log_id, reason))
            }
        }
    }

    fn snapshot(&self) -> PartitionView {
        let metrics = self.raft.metrics().borrow().clone();
        self.state
            .to_partition_view(metrics.current_leader, metrics.current_term)
    }

    fn is_leader(&self) -> bool {
        self.leader_id() == Some(self.node_id)
    }

    fn leader_id(&self) -> Option<u64> {
        self.raft.metrics().borrow().current_leader
    }

    async fn add_peer(&self, peer: PeerInfo) -> Result<()> {
        let node = peer_node(&peer);
        self.network.register_node(peer.node_id, peer.addr.clone());

        if peer.is_voter {
            let mut members = BTreeMap::new();
            members.insert(peer.node_id, node);
            self.raft
                .change_membership(ChangeMembers::AddNodes(members), false)
                .await?;
        } else {
            self.raft.add_learner(peer.node_id, node, true).await?;
        }

        info!("Added peer {} at {} (voter={})", peer.node_id, peer.addr, peer.is_voter);
        Ok(())
    }
}
