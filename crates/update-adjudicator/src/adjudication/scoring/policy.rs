use serde::{Deserialize, Serialize};

use super::super::domain::LifeEvent;
use super::config::AdjudicationPolicy;

/// Individual auto-approval requirement, reported when unmet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalCondition {
    RiskBelowCeiling,
    LifeEventDetected,
    LifeEventConfident,
    DocumentsAttached,
}

impl ApprovalCondition {
    pub const fn describe(self) -> &'static str {
        match self {
            ApprovalCondition::RiskBelowCeiling => "risk score at or above auto-approval ceiling",
            ApprovalCondition::LifeEventDetected => "no life event detected",
            ApprovalCondition::LifeEventConfident => "life event confidence too low",
            ApprovalCondition::DocumentsAttached => "no supporting documents attached",
        }
    }
}

/// Outcome of checking every auto-approval condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalAssessment {
    pub eligible: bool,
    pub unmet: Vec<ApprovalCondition>,
}

impl ApprovalAssessment {
    pub fn summary(&self) -> String {
        if self.eligible {
            "eligible for auto-approval".to_string()
        } else {
            let reasons: Vec<&str> = self.unmet.iter().map(|c| c.describe()).collect();
            format!("manual review required: {}", reasons.join("; "))
        }
    }
}

/// Applies policy thresholds to decide auto-approval versus manual routing.
#[derive(Debug, Clone, Default)]
pub struct ApprovalDecider {
    policy: AdjudicationPolicy,
}

impl ApprovalDecider {
    pub fn new(policy: AdjudicationPolicy) -> Self {
        Self { policy }
    }

    pub fn decide(&self, risk_score: f64, life_event: &LifeEvent, has_documents: bool) -> bool {
        self.assess(risk_score, life_event, has_documents).eligible
    }

    pub fn assess(
        &self,
        risk_score: f64,
        life_event: &LifeEvent,
        has_documents: bool,
    ) -> ApprovalAssessment {
        let checks = [
            (
                ApprovalCondition::RiskBelowCeiling,
                risk_score < self.policy.auto_approve_risk_ceiling,
            ),
            (
                ApprovalCondition::LifeEventDetected,
                life_event.is_life_event,
            ),
            (
                ApprovalCondition::LifeEventConfident,
                life_event.confidence > self.policy.life_event_confidence_floor,
            ),
            (ApprovalCondition::DocumentsAttached, has_documents),
        ];

        let unmet: Vec<ApprovalCondition> = checks
            .iter()
            .filter(|(_, held)| !held)
            .map(|(condition, _)| *condition)
            .collect();

        ApprovalAssessment {
            eligible: unmet.is_empty(),
            unmet,
        }
    }
}
