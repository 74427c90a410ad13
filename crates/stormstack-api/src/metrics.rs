//! `/metrics` — Prometheus text exposition built directly from the live
//! registry/match/autoscale state.

use std::fmt::Write as _;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use stormstack_state::NodeStatus;

use crate::ApiState;

pub async fn render(State(state): State<ApiState>) -> impl IntoResponse {
    let mut out = String::new();

    let nodes = state.registry.list().unwrap_or_default();
    let healthy = nodes.iter().filter(|n| n.status == NodeStatus::Healthy).count();

    let _ = writeln!(out, "# HELP stormstack_nodes_total Registered nodes by status.");
    let _ = writeln!(out, "# TYPE stormstack_nodes_total gauge");
    let _ = writeln!(out, "stormstack_nodes_total{{status=\"healthy\"}} {healthy}");
    let _ = writeln!(out, "stormstack_nodes_total {}", nodes.len());

    let matches = state.matches.find_all().unwrap_or_default();
    let _ = writeln!(out, "# HELP stormstack_matches_total Matches by status.");
    let _ = writeln!(out, "# TYPE stormstack_matches_total gauge");
    let _ = writeln!(out, "stormstack_matches_total {}", matches.len());

    let total_players: u32 = matches.iter().map(|m| m.player_count).sum();
    let _ = writeln!(out, "# HELP stormstack_players_total Players across all matches.");
    let _ = writeln!(out, "# TYPE stormstack_players_total gauge");
    let _ = writeln!(out, "stormstack_players_total {total_players}");

    if let Ok(recommendation) = state.autoscaler.evaluate() {
        let _ = writeln!(out, "# HELP stormstack_saturation Cluster container saturation ratio.");
        let _ = writeln!(out, "# TYPE stormstack_saturation gauge");
        let _ = writeln!(out, "stormstack_saturation {}", recommendation.saturation);
    }

    ([(CONTENT_TYPE, "text/plain; version=0.0.4")], out)
}
