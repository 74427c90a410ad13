//! REST API handlers (spec.md §6's route table).
//!
//! Each handler enforces the scope named in the route table via
//! `IdentityService`, then delegates to the owning component and renders
//! its result as the matching DTO. Errors convert to `ApiError` via `?`.

use std::collections::HashMap;

use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::body::Bytes;

use stormstack_scheduler::SchedulingHints;
use stormstack_state::NodeCapacity;

use crate::auth::{bearer_token, require_scope};
use crate::dto::*;
use crate::error::{ApiError, ApiResult};
use crate::ApiState;

// ── Nodes ──────────────────────────────────────────────────────────

/// POST /api/nodes/register
pub async fn register_node(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<RegisterNodeRequest>,
) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.node.register").await?;
    let node = state.registry.register(
        &req.node_id,
        &req.advertise_address,
        NodeCapacity { max_containers: req.max_containers },
    )?;
    Ok(Json(NodeDto::from(node)))
}

/// PUT /api/nodes/{id}/heartbeat
pub async fn heartbeat_node(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(node_id): Path<String>,
    Json(req): Json<HeartbeatRequest>,
) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.node.register").await?;
    let node = state.registry.heartbeat(&node_id, req.metrics)?;
    Ok(Json(NodeDto::from(node)))
}

/// POST /api/nodes/{id}/drain
pub async fn drain_node(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(node_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.node.manage").await?;
    let node = state.registry.drain(&node_id)?;
    Ok(Json(NodeDto::from(node)))
}

/// DELETE /api/nodes/{id}
pub async fn deregister_node(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(node_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.node.manage").await?;
    state.registry.deregister(&node_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Cluster view ────────────────────────────────────────────────────

/// GET /api/cluster/nodes
pub async fn list_cluster_nodes(State(state): State<ApiState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.cluster.read").await?;
    let nodes: Vec<NodeDto> = state.registry.list()?.into_iter().map(NodeDto::from).collect();
    Ok(Json(nodes))
}

/// GET /api/cluster/nodes/{id}
pub async fn get_cluster_node(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(node_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.cluster.read").await?;
    match state.registry.find(&node_id)? {
        Some(node) => Ok(Json(NodeDto::from(node))),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "NODE_NOT_FOUND", format!("node {node_id} not found"))),
    }
}

/// GET /api/cluster/status
pub async fn cluster_status(State(state): State<ApiState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.cluster.read").await?;
    let nodes = state.registry.list()?;
    let healthy_nodes = nodes.iter().filter(|n| n.status == stormstack_state::NodeStatus::Healthy).count();
    let total_matches = state.matches.find_all()?.len();
    let autoscale = state
        .autoscaler
        .evaluate()
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", e.to_string()))?;

    Ok(Json(ClusterStatusDto {
        total_nodes: nodes.len(),
        healthy_nodes,
        total_matches,
        autoscale: autoscale.into(),
    }))
}

// ── Matches ──────────────────────────────────────────────────────────

/// POST /api/matches/create (and its `/api/v1/deploy` alias)
pub async fn create_match(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<CreateMatchRequest>,
) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.match.create").await?;
    let hints = SchedulingHints {
        preferred_node_id: req.preferred_node_id,
        excluded: Vec::new(),
    };
    let resp = state.coordinator.deploy(req.modules, req.player_limit, hints).await?;
    Ok((StatusCode::CREATED, Json(MatchResponseDto::from(resp))))
}

/// GET /api/matches
pub async fn list_matches(State(state): State<ApiState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.match.read").await?;
    let matches: Vec<MatchDto> = state.matches.find_all()?.into_iter().map(MatchDto::from).collect();
    Ok(Json(matches))
}

/// GET /api/matches/{id}
pub async fn get_match(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(match_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.match.read").await?;
    match state.matches.find(&match_id)? {
        Some(entry) => Ok(Json(MatchDto::from(entry))),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "MATCH_NOT_FOUND", format!("match {match_id} not found"))),
    }
}

/// DELETE /api/matches/{id}
pub async fn delete_match(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(match_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.match.delete").await?;
    state.coordinator.delete(&match_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/matches/{id}/join
pub async fn join_match(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(match_id): Path<String>,
    Json(req): Json<JoinRequest>,
) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.match.join").await?;
    let resp = state.coordinator.join(&match_id, &req.player_id, &req.player_name).await?;
    Ok(Json(JoinResponseDto::from(resp)))
}

// ── Modules ──────────────────────────────────────────────────────────

#[derive(serde::Deserialize)]
pub struct UploadModuleQuery {
    pub name: String,
    pub version: String,
    pub file_name: String,
    pub uploaded_by: String,
}

/// POST /api/modules/upload?name=...&version=...&file_name=...&uploaded_by=...
pub async fn upload_module(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(q): Query<UploadModuleQuery>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.module.upload").await?;
    let metadata = state
        .modules
        .upload(&q.name, &q.version, &q.file_name, &body, &q.uploaded_by)
        .await?;
    Ok((StatusCode::CREATED, Json(ModuleDto::from(metadata))))
}

/// GET /api/modules
pub async fn list_modules(State(state): State<ApiState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.module.read").await?;
    let modules: Vec<ModuleDto> = state.modules.list()?.into_iter().map(ModuleDto::from).collect();
    Ok(Json(modules))
}

/// GET /api/modules/{name}/{version}/download
pub async fn download_module(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((name, version)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.module.read").await?;
    let bytes = state.modules.download(&name, &version).await?;
    Ok(([(axum::http::header::CONTENT_TYPE, "application/octet-stream")], bytes))
}

/// DELETE /api/modules/{name}/{version}
pub async fn delete_module(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((name, version)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.module.delete").await?;
    state.modules.delete(&name, &version).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/modules/{name}/{version}/distribute
pub async fn distribute_module(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((name, version)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    require_scope(state.identity.as_ref(), &headers, "control-plane.module.upload").await?;
    let healthy_nodes: Vec<_> = state
        .registry
        .list()?
        .into_iter()
        .filter(|n| n.status == stormstack_state::NodeStatus::Healthy)
        .collect();
    let report = state.modules.distribute(&name, &version, healthy_nodes).await?;
    Ok(Json(DistributionReportDto {
        succeeded: report.succeeded,
        failed: report.failed,
    }))
}

// ── Proxied match traffic (C8) ────────────────────────────────────────

/// `ANY /api/matches/{id}/*` — proxied to the hosting node, authorized by
/// a match token (not a scope) per spec.md §6.
pub async fn proxy_match_request(
    State(state): State<ApiState>,
    headers: HeaderMap,
    method: axum::http::Method,
    Path((match_id, rest)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let token = bearer_token(&headers)?;
    state.tokens.verify_for_match(token, &match_id)?;

    let forward_method = reqwest::Method::from_bytes(method.as_str().as_bytes())
        .map_err(|_| ApiError::invalid_request("unsupported HTTP method"))?;
    let path_suffix = format!("/{rest}");

    let (status, response_headers, response_body) = state
        .proxy
        .forward(&match_id, forward_method, &path_suffix, headers, body.to_vec())
        .await?;

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, response_headers, response_body))
}

// ── Snapshot websocket proxy ───────────────────────────────────────────

pub async fn ws_snapshots(
    ws: axum::extract::ws::WebSocketUpgrade,
    State(state): State<ApiState>,
    Path(match_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let token = match params.get("token") {
        Some(t) => t.clone(),
        None => return ApiError::forbidden("missing token query parameter").into_response(),
    };
    if let Err(e) = state.tokens.verify_for_match(&token, &match_id) {
        return ApiError::from(e).into_response();
    }
    let upstream_url = match state.proxy.resolve_websocket(&match_id) {
        Ok(url) => url,
        Err(e) => return ApiError::from(e).into_response(),
    };

    ws.on_upgrade(move |socket| crate::ws_bridge::bridge(socket, upstream_url))
        .into_response()
}
