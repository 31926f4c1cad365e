use crate::config::NodeConfig;
use crate::replicator::{PlaneNode, RaftReplicator, Replicator};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

pub struct PlaneDaemon {
    node_id: u64,
    replicator: Arc<RaftReplicator>,
    config: NodeConfig,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl PlaneDaemon {
    pub async fn new(config: NodeConfig) -> Result<Self> {
        let node_id = config.node_id;
        let hostname = config.effective_hostname();

        info!("Initializing PlaneDaemon node_id={} hostname={}", node_id, hostname);

        std::fs::create_dir_all(&config.data_dir)?;

        let node = PlaneNode {
            addr: config.effective_advertise_addr(),
            hostname,
        };
        let replicator = Arc::new(
            RaftReplicator::new(
                node_id,
                node,
                &config.data_dir,
                &config.raft,
                config.on_decode_error,
            )
            .await?,
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            node_id,
            replicator,
            config,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub async fn run(&self) -> Result<()> {
        info!("Starting PlaneDaemon...");

        let peers = self.config.peer_infos();
        if peers.is_empty() {
            info!("No peers configured, initializing as single-node cluster");
            self.replicator.initialize(&[]).await?;
        } else if self.config.bootstrap {
            info!("Bootstrapping cluster with {} peers", peers.len());
            self.replicator.initialize(&peers).await?;
            for learner in peers.into_iter().filter(|p| !p.is_voter) {
                self.replicator.add_peer(learner).await?;
            }
        } else {
            info!("Waiting for a bootstrap node to add this node");
            for peer in &peers {
                self.replicator
                    .network()
                    .register_node(peer.node_id, peer.addr.clone());
            }
        }

        let status_handle = self.spawn_status_loop();

        info!("PlaneDaemon running on {}", self.config.listen_addr());

        tokio::select! {
            _ = status_handle => {
                error!("Status loop exited unexpectedly");
            }
            _ = self.wait_for_shutdown() => {
                info!("Shutdown signal received");
            }
        }

        self.replicator.shutdown().await?;
        Ok(())
    }

    fn spawn_status_loop(&self) -> tokio::task::JoinHandle<()> {
        let replicator = self.replicator.clone();
        let interval = self.config.status_interval_secs.max(1);
        let mut shutdown_rx = self.shutdown_rx.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut metrics = replicator.raft().metrics();
            let mut last_leader = None;

            loop {
                tokio::select! {
                    changed = metrics.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let leader = metrics.borrow().current_leader;
                        if leader != last_leader {
                            info!("Raft leader changed: {:?} -> {:?}", last_leader, leader);
                            last_leader = leader;
                        }
                    }
                    _ = ticker.tick() => {
                        let view = replicator.snapshot();
                        debug!(
                            "Partition table: storage_groups={}, region_groups={}, data_nodes={}, applied={}",
                            view.storage_groups.len(),
                            view.region_group_count(),
                            view.data_nodes.len(),
                            view.last_applied_index
                        );
                    }
                    _ = shutdown_rx.changed() => {
                        break;
                    }
                }
            }
        })
    }

    async fn wait_for_shutdown(&self) {
        let mut rx = self.shutdown_rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    pub fn replicator(&self) -> &Arc<RaftReplicator> {
        &self.replicator
    }
}
