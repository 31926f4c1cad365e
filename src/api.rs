use crate::command::*;
use crate::daemon::PlaneDaemon;
use crate::error::ApplicationError;
use crate::replicator::Replicator;
use crate::types::*;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub fn create_router(daemon: Arc<PlaneDaemon>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/partition", get(get_partition_view))
        .route("/data-nodes", post(register_data_node))
        .route("/storage-groups", post(set_storage_group))
        .route("/storage-groups/:name", delete(delete_storage_group))
        .route("/region-groups", post(create_region_groups))
        .with_state(daemon)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Serialize)]
struct StatusResponse {
    node_id: u64,
    is_leader: bool,
    leader_id: Option<u64>,
    term: u64,
    last_applied_index: u64,
    storage_groups: usize,
    region_groups: usize,
}

async fn get_status(State(daemon): State<Arc<PlaneDaemon>>) -> impl IntoResponse {
    let view = daemon.replicator().snapshot();

    Json(StatusResponse {
        node_id: daemon.node_id(),
        is_leader: daemon.replicator().is_leader(),
        leader_id: view.leader_id,
        term: view.term,
        last_applied_index: view.last_applied_index,
        storage_groups: view.storage_groups.len(),
        region_groups: view.region_group_count(),
    })
}

async fn get_partition_view(State(daemon): State<Arc<PlaneDaemon>>) -> impl IntoResponse {
    Json(daemon.replicator().snapshot())
}

async fn register_data_node(
    State(daemon): State<Arc<PlaneDaemon>>,
    Json(location): Json<DataNodeLocation>,
) -> Response {
    submit(&daemon, RegisterDataNode::new(location.clone()).into(), location).await
}

async fn set_storage_group(
    State(daemon): State<Arc<PlaneDaemon>>,
    Json(schema): Json<StorageGroupSchema>,
) -> Response {
    submit(&daemon, SetStorageGroup::new(schema.clone()).into(), schema).await
}

async fn delete_storage_group(
    State(daemon): State<Arc<PlaneDaemon>>,
    Path(name): Path<String>,
) -> Response {
    let body = serde_json::json!({ "deleted": name });
    submit(&daemon, DeleteStorageGroup::new(name).into(), body).await
}

#[derive(Deserialize)]
struct CreateRegionGroupsRequest {
    region_groups: BTreeMap<String, Vec<RegionReplicaSet>>,
}

async fn create_region_groups(
    State(daemon): State<Arc<PlaneDaemon>>,
    Json(req): Json<CreateRegionGroupsRequest>,
) -> Response {
    let mut command = CreateRegionGroups::new();
    for (storage_group, replica_sets) in req.region_groups {
        for replica_set in replica_sets {
            command.add_region_group(storage_group.clone(), replica_set);
        }
    }

    let body = serde_json::json!({
        "storage_groups": command.storage_group_count(),
        "region_groups": command.region_group_map().values().map(Vec::len).sum::<usize>(),
    });
    submit(&daemon, command.into(), body).await
}

async fn submit<T: Serialize>(daemon: &PlaneDaemon, command: ConfigCommand, body: T) -> Response {
    match daemon.replicator().submit(command).await {
        Ok(()) => (StatusCode::CREATED, Json(body)).into_response(),
        Err(e) => {
            let status = if e.downcast_ref::<ApplicationError>().is_some() {
                StatusCode::CONFLICT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
        }
    }
}
