//! Wire DTOs — JSON shapes for the route table in spec.md §6.
//!
//! Storage keeps epoch seconds (`stormstack-state`'s types); every
//! timestamp is rendered as RFC 3339 only here, at the HTTP boundary.

use serde::{Deserialize, Serialize};
use stormstack_autoscale::{AutoscaleRecommendation, ScaleAction};
use stormstack_coordinator::{JoinResponse, MatchResponse};
use stormstack_core::time::to_rfc3339;
use stormstack_state::{MatchRegistryEntry, ModuleMetadata, Node, NodeCapacity, NodeMetrics};

#[derive(Debug, Serialize)]
pub struct NodeDto {
    pub node_id: String,
    pub advertise_address: String,
    pub status: String,
    pub capacity: NodeCapacity,
    pub metrics: NodeMetrics,
    pub registered_at: String,
    pub last_heartbeat: String,
}

impl From<Node> for NodeDto {
    fn from(n: Node) -> Self {
        NodeDto {
            node_id: n.node_id,
            advertise_address: n.advertise_address,
            status: format!("{:?}", n.status).to_uppercase(),
            capacity: n.capacity,
            metrics: n.metrics,
            registered_at: to_rfc3339(n.registered_at),
            last_heartbeat: to_rfc3339(n.last_heartbeat),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterNodeRequest {
    pub node_id: String,
    pub advertise_address: String,
    pub max_containers: u32,
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub metrics: NodeMetrics,
}

#[derive(Debug, Serialize)]
pub struct MatchDto {
    pub match_id: String,
    pub node_id: String,
    pub container_id: String,
    pub status: String,
    pub module_names: Vec<String>,
    pub created_at: String,
    pub advertise_address: String,
    pub websocket_url: String,
    pub player_count: u32,
    pub player_limit: u32,
}

impl From<MatchRegistryEntry> for MatchDto {
    fn from(e: MatchRegistryEntry) -> Self {
        MatchDto {
            match_id: e.match_id,
            node_id: e.node_id,
            container_id: e.container_id,
            status: format!("{:?}", e.status).to_uppercase(),
            module_names: e.module_names,
            created_at: to_rfc3339(e.created_at),
            advertise_address: e.advertise_address,
            websocket_url: e.websocket_url,
            player_count: e.player_count,
            player_limit: e.player_limit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMatchRequest {
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub player_limit: u32,
    #[serde(default)]
    pub preferred_node_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchResponseDto {
    pub match_id: String,
    pub status: String,
    pub advertise_address: String,
    pub websocket_url: String,
}

impl From<MatchResponse> for MatchResponseDto {
    fn from(r: MatchResponse) -> Self {
        MatchResponseDto {
            match_id: r.match_id,
            status: r.status,
            advertise_address: r.advertise_address,
            websocket_url: r.websocket_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub player_id: String,
    pub player_name: String,
}

#[derive(Debug, Serialize)]
pub struct JoinResponseDto {
    pub match_token: String,
    pub command_ws_url: String,
    pub snapshot_ws_url: String,
    pub expires_at: String,
}

impl From<JoinResponse> for JoinResponseDto {
    fn from(r: JoinResponse) -> Self {
        JoinResponseDto {
            match_token: r.match_token,
            command_ws_url: r.command_ws_url,
            snapshot_ws_url: r.snapshot_ws_url,
            expires_at: to_rfc3339(r.expires_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModuleDto {
    pub name: String,
    pub version: String,
    pub file_name: String,
    pub file_size: u64,
    pub checksum: String,
    pub uploaded_at: String,
    pub uploaded_by: String,
    pub distributed_to: Vec<String>,
}

impl From<ModuleMetadata> for ModuleDto {
    fn from(m: ModuleMetadata) -> Self {
        ModuleDto {
            name: m.name,
            version: m.version,
            file_name: m.file_name,
            file_size: m.file_size,
            checksum: m.checksum,
            uploaded_at: to_rfc3339(m.uploaded_at),
            uploaded_by: m.uploaded_by,
            distributed_to: m.distributed_to.into_iter().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DistributionReportDto {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
pub struct AutoscaleRecommendationDto {
    pub action: String,
    pub current_nodes: u32,
    pub recommended_nodes: u32,
    pub reason: String,
    pub saturation: f64,
}

impl From<AutoscaleRecommendation> for AutoscaleRecommendationDto {
    fn from(r: AutoscaleRecommendation) -> Self {
        AutoscaleRecommendationDto {
            action: match r.action {
                ScaleAction::ScaleUp => "SCALE_UP".to_string(),
                ScaleAction::ScaleDown => "SCALE_DOWN".to_string(),
                ScaleAction::None => "NONE".to_string(),
            },
            current_nodes: r.current_nodes,
            recommended_nodes: r.recommended_nodes,
            reason: r.reason,
            saturation: r.saturation,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClusterStatusDto {
    pub total_nodes: usize,
    pub healthy_nodes: usize,
    pub total_matches: usize,
    pub autoscale: AutoscaleRecommendationDto,
}
