mod config;
mod policy;
mod rules;

pub use config::AdjudicationPolicy;
pub use policy::{ApprovalAssessment, ApprovalCondition, ApprovalDecider};

use chrono::NaiveDate;
use tracing::warn;

use super::domain::{LifeEvent, SubjectProfile, UpdateRequest};

/// Human-facing bucket for a risk score.
pub fn risk_level(risk_score: f64) -> &'static str {
    if risk_score > 0.7 {
        "High"
    } else if risk_score > 0.4 {
        "Medium"
    } else {
        "Low"
    }
}

/// Stateless scorer producing a bounded, two-decimal risk score.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    policy: AdjudicationPolicy,
}

impl RiskScorer {
    pub fn new(policy: AdjudicationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AdjudicationPolicy {
        &self.policy
    }

    /// Score with an already-known age.
    pub fn score(
        &self,
        request: &UpdateRequest,
        subject_age: u32,
        life_event: &LifeEvent,
        recent_submissions: usize,
    ) -> f64 {
        match rules::score(
            request.update_type,
            request.has_documents(),
            subject_age,
            life_event,
            recent_submissions,
            &self.policy,
        ) {
            Ok(score) => score,
            Err(err) => self.fallback(request, &err),
        }
    }

    /// Score against the subject record; an unknown birth date counts as the default age.
    pub fn score_for_subject(
        &self,
        request: &UpdateRequest,
        subject: &SubjectProfile,
        life_event: &LifeEvent,
        recent_submissions: usize,
        today: NaiveDate,
    ) -> f64 {
        match subject.age_on(today) {
            Ok(age) => self.score(
                request,
                age.unwrap_or(self.policy.default_age),
                life_event,
                recent_submissions,
            ),
            Err(err) => self.fallback(request, &rules::RiskInputError::from(err)),
        }
    }

    fn fallback(&self, request: &UpdateRequest, err: &rules::RiskInputError) -> f64 {
        warn!(
            request_id = %request.request_id.0,
            error = %err,
            fallback = self.policy.neutral_fallback,
            "risk scoring failed; using neutral score"
        );
        self.policy.neutral_fallback
    }
}
