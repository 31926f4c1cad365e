use crate::replicator::DecodeErrorPolicy;
use crate::types::PeerInfo;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node_id: u64,
    pub hostname: Option<String>,

    pub bind_addr: String,
    pub bind_port: u16,
    // defaults to loopback on bind_port
    pub advertise_addr: Option<String>,

    pub data_dir: PathBuf,

    pub peers: Vec<PeerConfig>,
    pub bootstrap: bool,

    pub raft: RaftSettings,

    pub on_decode_error: DecodeErrorPolicy,

    pub status_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub node_id: u64,
    pub addr: String,
    pub is_voter: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaftSettings {
    pub heartbeat_interval_ms: u64,
    pub election_timeout_min_ms: u64,
    pub election_timeout_max_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: 1,
            hostname: None,
            bind_addr: "0.0.0.0".to_string(),
            bind_port: 10710,
            advertise_addr: None,
            data_dir: PathBuf::from("/var/lib/metaplane"),
            peers: Vec::new(),
            bootstrap: false,
            raft: RaftSettings::default(),
            on_decode_error: DecodeErrorPolicy::Halt,
            status_interval_secs: 30,
        }
    }
}

impl Default for RaftSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 500,
            election_timeout_min_ms: 1500,
            election_timeout_max_ms: 3000,
        }
    }
}

impl PeerConfig {
    pub fn to_peer_info(&self) -> PeerInfo {
        PeerInfo {
            node_id: self.node_id,
            addr: self.addr.clone(),
            is_voter: self.is_voter,
        }
    }
}

impl NodeConfig {
    pub fn load(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &PathBuf) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.raft.election_timeout_min_ms <= self.raft.heartbeat_interval_ms {
            anyhow::bail!("raft.election_timeout_min_ms must exceed raft.heartbeat_interval_ms");
        }
        if self.raft.election_timeout_max_ms <= self.raft.election_timeout_min_ms {
            anyhow::bail!("raft.election_timeout_max_ms must exceed raft.election_timeout_min_ms");
        }
        if self.peers.iter().any(|p| p.node_id == self.node_id) {
            anyhow::bail!("peers must not include this node ({})", self.node_id);
        }
        Ok(())
    }

    pub fn effective_hostname(&self) -> String {
        self.hostname.clone().unwrap_or_else(|| {
            hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string())
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.bind_port)
    }

    pub fn effective_advertise_addr(&self) -> String {
        self.advertise_addr
            .clone()
            .unwrap_or_else(|| format!("127.0.0.1:{}", self.bind_port))
    }

    pub fn peer_infos(&self) -> Vec<PeerInfo> {
        self.peers.iter().map(PeerConfig::to_peer_info).collect()
    }
}
