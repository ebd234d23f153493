use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::assignment::{Assignment, AssignmentBalancer, AssignmentError, AssignmentPool};
use super::detection::{DetectionMethod, DuplicateDetector, LifeEventClassifier};
use super::domain::{
    CenterId, FieldUpdate, LifeEventKind, OfficerId, RequestId, SubjectProfile, TransitionError,
    UpdateRequest, UpdateStatus,
};
use super::scoring::{AdjudicationPolicy, ApprovalAssessment, ApprovalDecider, RiskScorer};

/// Decision record returned to the submitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub request_id: RequestId,
    pub status: UpdateStatus,
    pub risk_score: f64,
    pub is_duplicate: bool,
    pub duplicate_confidence: f64,
    pub is_life_event: bool,
    pub life_event_type: LifeEventKind,
    pub life_event_confidence: f64,
    pub auto_approved: bool,
    pub assigned_officer: Option<OfficerId>,
    pub assigned_center: Option<CenterId>,
}

impl DecisionResult {
    pub fn from_request(request: &UpdateRequest) -> Self {
        Self {
            request_id: request.request_id.clone(),
            status: request.status,
            risk_score: request.risk_score,
            is_duplicate: request.is_duplicate,
            duplicate_confidence: request.duplicate_confidence,
            is_life_event: request.is_life_event,
            life_event_type: request.life_event_type,
            life_event_confidence: request.life_event_confidence,
            auto_approved: request.auto_approved,
            assigned_officer: request.assigned_officer.clone(),
            assigned_center: request.assigned_center.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("request already adjudicated (status {0})")]
    AlreadyAdjudicated(UpdateStatus),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
}

/// Everything a single adjudication produced, including effects the caller
/// must commit (or compensate) as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjudication {
    pub decision: DecisionResult,
    pub detection_method: DetectionMethod,
    pub approval: Option<ApprovalAssessment>,
    pub field_update: Option<FieldUpdate>,
    pub assignment: Option<Assignment>,
}

/// Runs detection, scoring, approval and assignment in a fixed order.
pub struct AdjudicationPipeline<P> {
    duplicates: Arc<dyn DuplicateDetector>,
    life_events: LifeEventClassifier,
    scorer: RiskScorer,
    decider: ApprovalDecider,
    balancer: Arc<AssignmentBalancer<P>>,
}

impl<P: AssignmentPool> AdjudicationPipeline<P> {
    pub fn new(
        duplicates: Arc<dyn DuplicateDetector>,
        policy: AdjudicationPolicy,
        balancer: Arc<AssignmentBalancer<P>>,
    ) -> Self {
        Self {
            duplicates,
            life_events: LifeEventClassifier,
            scorer: RiskScorer::new(policy.clone()),
            decider: ApprovalDecider::new(policy),
            balancer,
        }
    }

    pub fn balancer(&self) -> &Arc<AssignmentBalancer<P>> {
        &self.balancer
    }

    /// Adjudicate a `pending` request in place.
    ///
    /// The subject record is never mutated here; an approval is returned as a
    /// [`FieldUpdate`] for the caller to apply inside its own unit of work.
    pub fn adjudicate(
        &self,
        request: &mut UpdateRequest,
        subject: &SubjectProfile,
        recent: &[UpdateRequest],
        now: DateTime<Utc>,
    ) -> Result<Adjudication, PipelineError> {
        if request.status != UpdateStatus::Pending {
            return Err(PipelineError::AlreadyAdjudicated(request.status));
        }

        let verdict = self.duplicates.detect(request, recent);
        request.is_duplicate = verdict.is_duplicate;
        request.duplicate_confidence = verdict.confidence;

        if verdict.is_duplicate {
            request.transition(UpdateStatus::Duplicate, now)?;
            info!(
                request_id = %request.request_id.0,
                subject = %request.subject_id.0,
                confidence = verdict.confidence,
                method = ?verdict.method,
                "request flagged as duplicate"
            );
            return Ok(Adjudication {
                decision: DecisionResult::from_request(request),
                detection_method: verdict.method,
                approval: None,
                field_update: None,
                assignment: None,
            });
        }

        let life_event = self
            .life_events
            .classify(request.update_type, &request.new_value);
        request.is_life_event = life_event.is_life_event;
        request.life_event_type = life_event.kind;
        request.life_event_confidence = life_event.confidence;

        request.risk_score = self.scorer.score_for_subject(
            request,
            subject,
            &life_event,
            recent.len(),
            now.date_naive(),
        );

        let approval = self
            .decider
            .assess(request.risk_score, &life_event, request.has_documents());

        if approval.eligible {
            request.transition(UpdateStatus::AutoApproved, now)?;
            request.auto_approved = true;
            let field_update = request
                .update_type
                .auto_approval_field()
                .map(|field| FieldUpdate::for_subject(subject, field, &request.new_value));
            info!(
                request_id = %request.request_id.0,
                risk = request.risk_score,
                life_event = life_event.kind.label(),
                "request auto-approved"
            );
            return Ok(Adjudication {
                decision: DecisionResult::from_request(request),
                detection_method: verdict.method,
                approval: Some(approval),
                field_update,
                assignment: None,
            });
        }

        let assignment = self.balancer.assign()?;
        match &assignment {
            Assignment::Assigned { center, officer } => {
                request.assigned_center = Some(center.center_id.clone());
                request.assigned_officer = Some(officer.officer_id.clone());
                request.transition(UpdateStatus::Processing, now)?;
                info!(
                    request_id = %request.request_id.0,
                    risk = request.risk_score,
                    center = %center.center_id.0,
                    officer = %officer.officer_id.0,
                    reason = %approval.summary(),
                    "request routed for manual review"
                );
            }
            Assignment::NoActiveCenter => {
                warn!(
                    request_id = %request.request_id.0,
                    "no active processing center with capacity; request stays pending"
                );
            }
            Assignment::NoEligibleOfficer { center } => {
                warn!(
                    request_id = %request.request_id.0,
                    center = %center.0,
                    "no eligible officer at selected center; request stays pending"
                );
            }
        }

        Ok(Adjudication {
            decision: DecisionResult::from_request(request),
            detection_method: verdict.method,
            approval: Some(approval),
            field_update: None,
            assignment: Some(assignment),
        })
    }
}
