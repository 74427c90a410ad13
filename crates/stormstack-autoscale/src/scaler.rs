//! Autoscaler (C7) — periodic cluster-saturation scale recommendations.
//!
//! # Algorithm (spec.md §4.7)
//!
//! ```text
//! saturation = Σ containers / Σ max_containers over HEALTHY nodes
//! target     = (scale_up_threshold + scale_down_threshold) / 2
//!
//! if saturation > scale_up_threshold and current_nodes < max_nodes:
//!     SCALE_UP, recommended = min(max_nodes, ceil(current_nodes * saturation / target))
//!
//! if saturation < scale_down_threshold and current_nodes > min_nodes:
//!     SCALE_DOWN, recommended = max(min_nodes, ceil(current_nodes * saturation / target))
//!
//! otherwise NONE
//! ```
//!
//! Hysteresis: no non-NONE action is emitted within `cooldown` of the
//! previous one.

use std::sync::Mutex;

use stormstack_core::time::now_secs;
use stormstack_state::{NodeStatus, StateStore};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleAction {
    ScaleUp,
    ScaleDown,
    None,
}

#[derive(Debug, Clone)]
pub struct AutoscaleRecommendation {
    pub action: ScaleAction,
    pub current_nodes: u32,
    pub recommended_nodes: u32,
    pub reason: String,
    pub saturation: f64,
}

pub struct Autoscaler {
    state: StateStore,
    scale_up_threshold: f64,
    scale_down_threshold: f64,
    min_nodes: u32,
    max_nodes: u32,
    cooldown_secs: u64,
    last_action_at: Mutex<u64>,
}

impl Autoscaler {
    pub fn new(
        state: StateStore,
        scale_up_threshold: f64,
        scale_down_threshold: f64,
        min_nodes: u32,
        max_nodes: u32,
        cooldown_secs: u64,
    ) -> Self {
        Self {
            state,
            scale_up_threshold,
            scale_down_threshold,
            min_nodes,
            max_nodes,
            cooldown_secs,
            last_action_at: Mutex::new(0),
        }
    }

    /// Compute a recommendation from the current HEALTHY node set. Does
    /// not itself enforce cooldown — call `recommend` for the hysteresis
    /// wrapper used by the periodic loop.
    pub fn evaluate(&self) -> anyhow::Result<AutoscaleRecommendation> {
        let nodes = self.state.list_nodes()?;
        let healthy: Vec<_> = nodes.iter().filter(|n| n.status == NodeStatus::Healthy).collect();

        let current_nodes = healthy.len() as u32;
        let total_containers: u64 = healthy.iter().map(|n| n.metrics.containers as u64).sum();
        let total_capacity: u64 = healthy.iter().map(|n| n.capacity.max_containers as u64).sum();
        let saturation = if total_capacity == 0 {
            0.0
        } else {
            total_containers as f64 / total_capacity as f64
        };
        let target = (self.scale_up_threshold + self.scale_down_threshold) / 2.0;

        if saturation > self.scale_up_threshold && current_nodes < self.max_nodes {
            let recommended = self.max_nodes.min(
                ((current_nodes as f64 * saturation / target).ceil() as u32).max(current_nodes + 1),
            );
            return Ok(AutoscaleRecommendation {
                action: ScaleAction::ScaleUp,
                current_nodes,
                recommended_nodes: recommended,
                reason: format!("saturation {saturation:.2} exceeds scale_up_threshold {:.2}", self.scale_up_threshold),
                saturation,
            });
        }

        if saturation < self.scale_down_threshold && current_nodes > self.min_nodes {
            let recommended = self.min_nodes.max(
                ((current_nodes as f64 * saturation / target).ceil() as u32).min(current_nodes.saturating_sub(1)),
            );
            return Ok(AutoscaleRecommendation {
                action: ScaleAction::ScaleDown,
                current_nodes,
                recommended_nodes: recommended,
                reason: format!(
                    "saturation {saturation:.2} below scale_down_threshold {:.2}",
                    self.scale_down_threshold
                ),
                saturation,
            });
        }

        Ok(AutoscaleRecommendation {
            action: ScaleAction::None,
            current_nodes,
            recommended_nodes: current_nodes,
            reason: "saturation within target band".to_string(),
            saturation,
        })
    }

    /// `evaluate`, suppressing non-NONE actions within `cooldown` of the
    /// previous one.
    pub fn recommend(&self) -> anyhow::Result<AutoscaleRecommendation> {
        let recommendation = self.evaluate()?;
        if recommendation.action == ScaleAction::None {
            return Ok(recommendation);
        }

        let mut last_action_at = self.last_action_at.lock().expect("lock poisoned");
        let now = now_secs();
        if now.saturating_sub(*last_action_at) < self.cooldown_secs {
            debug!(
                elapsed = now.saturating_sub(*last_action_at),
                cooldown = self.cooldown_secs,
                "autoscaler suppressing action within cooldown"
            );
            return Ok(AutoscaleRecommendation {
                action: ScaleAction::None,
                reason: "suppressed by cooldown".to_string(),
                ..recommendation
            });
        }

        *last_action_at = now;
        info!(?recommendation.action, recommendation.recommended_nodes, "autoscaler recommendation");
        Ok(recommendation)
    }

    pub async fn run(&self, poll_interval: std::time::Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!(interval_secs = poll_interval.as_secs(), "autoscaler started");
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.recommend() {
                        tracing::error!(error = %e, "autoscaler evaluation failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("autoscaler shutting down");
                    break;
                }
            }
        }
    }
}
