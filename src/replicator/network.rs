use crate::replicator::storage::{NodeIdType, PlaneNode, TypeConfig};
use openraft::error::{InstallSnapshotError, NetworkError, RPCError, RaftError, RemoteError};
use openraft::network::{RPCOption, RaftNetwork, RaftNetworkFactory};
use openraft::raft::{
    AppendEntriesRequest, AppendEntriesResponse, InstallSnapshotRequest, InstallSnapshotResponse,
    VoteRequest, VoteResponse,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

#[derive(Clone, Default)]
pub struct PlaneNetworkFactory {
    connections: Arc<RwLock<HashMap<NodeIdType, String>>>,
    client: reqwest::Client,
}

impl PlaneNetworkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_node(&self, node_id: NodeIdType, addr: String) {
        self.connections
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(node_id, addr);
    }

    pub fn get_addr(&self, node_id: NodeIdType) -> Option<String> {
        self.connections
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&node_id)
            .cloned()
    }
}

pub struct PlaneNetwork {
    target: NodeIdType,
    target_addr: String,
    client: reqwest::Client,
}

impl PlaneNetwork {
    pub fn new(target: NodeIdType, target_addr: String, client: reqwest::Client) -> Self {
        Self {
            target,
            target_addr,
            client,
        }
    }

    async fn send_rpc<Req, Resp, E>(
        &self,
        path: &str,
        req: &Req,
    ) -> Result<Resp, RPCError<NodeIdType, PlaneNode, RaftError<NodeIdType, E>>>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
        E: std::error::Error + serde::de::DeserializeOwned,
    {
        let url = format!("http://{}/raft/{}", self.target_addr, path);
        debug!("raft rpc {} -> node {}", path, self.target);

        let response = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|e| RPCError::Network(NetworkError::new(&e)))?;

        if !response.status().is_success() {
            return Err(RPCError::Network(NetworkError::new(&std::io::Error::other(
                format!("HTTP error from node {}: {}", self.target, response.status()),
            ))));
        }

        let result: Result<Resp, RaftError<NodeIdType, E>> = response
            .json()
            .await
            .map_err(|e| RPCError::Network(NetworkError::new(&e)))?;

        result.map_err(|e| RPCError::RemoteError(RemoteError::new(self.target, e)))
    }
}

impl RaftNetworkFactory<TypeConfig> for PlaneNetworkFactory {
    type Network = PlaneNetwork;

    async fn new_client(&mut self, target: NodeIdType, node: &PlaneNode) -> Self::Network {
        let addr = self.get_addr(target).unwrap_or_else(|| node.addr.clone());
        PlaneNetwork::new(target, addr, self.client.clone())
    }
}

impl RaftNetwork<TypeConfig> for PlaneNetwork {
    async fn append_entries(
        &mut self,
        req: AppendEntriesRequest<TypeConfig>,
        _option: RPCOption,
    ) -> Result<AppendEntriesResponse<NodeIdType>, RPCError<NodeIdType, PlaneNode, RaftError<NodeIdType>>>
    {
        self.send_rpc("append_entries", &req).await
    }

    async fn install_snapshot(
        &mut self,
        req: InstallSnapshotRequest<TypeConfig>,
        _option: RPCOption,
    ) -> Result<
        InstallSnapshotResponse<NodeIdType>,
        RPCError<NodeIdType, PlaneNode, RaftError<NodeIdType, InstallSnapshotError>>,
    > {
        self.send_rpc("install_snapshot", &req).await
    }

    async fn vote(
        &mut self,
        req: VoteRequest<NodeIdType>,
        _option: RPCOption,
    ) -> Result<VoteResponse<NodeIdType>, RPCError<NodeIdType, PlaneNode, RaftError<NodeIdType>>> {
        self.send_rpc("vote", &req).await
    }
}
