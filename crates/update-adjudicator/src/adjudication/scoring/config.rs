use serde::{Deserialize, Serialize};

/// Thresholds and modifiers applied by risk scoring and auto-approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjudicationPolicy {
    pub auto_approve_risk_ceiling: f64,
    pub life_event_confidence_floor: f64,
    pub life_event_dampening: f64,
    pub high_confidence_threshold: f64,
    pub high_confidence_factor: f64,
    pub frequency_trigger: usize,
    pub frequency_step: f64,
    pub frequency_cap: f64,
    pub default_age: u32,
    pub neutral_fallback: f64,
}

impl Default for AdjudicationPolicy {
    fn default() -> Self {
        Self {
            auto_approve_risk_ceiling: 0.3,
            life_event_confidence_floor: 0.7,
            life_event_dampening: 0.7,
            high_confidence_threshold: 0.8,
            high_confidence_factor: 0.6,
            frequency_trigger: 2,
            frequency_step: 0.1,
            frequency_cap: 0.3,
            default_age: 30,
            neutral_fallback: 0.5,
        }
    }
}
