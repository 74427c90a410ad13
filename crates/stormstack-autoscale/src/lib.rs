//! stormstack-autoscale — Autoscaler (C7): periodic cluster-saturation
//! scale recommendations with hysteresis (spec.md §4.7). Recommends only;
//! actuation is out of scope.

pub mod scaler;

pub use scaler::{Autoscaler, AutoscaleRecommendation, ScaleAction};
