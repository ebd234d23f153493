use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::assignment::{Assignment, AssignmentBalancer, AssignmentError, AssignmentPool};
use super::detection::{DuplicateDetector, RuleBasedDetector};
use super::domain::{
    CenterId, FieldUpdate, OfficerId, RequestId, SubjectId, TransitionError, UpdateRequest,
    UpdateStatus, UpdateSubmission,
};
use super::pipeline::{Adjudication, AdjudicationPipeline, DecisionResult, PipelineError};
use super::repository::{
    ActorKind, AuditAction, AuditEvent, AuditSink, RegistryView, RepositoryError,
    SubjectRegistry, UpdateRepository,
};
use super::validation::{IntakeGuard, ValidatedSubmission, ValidationError};
use crate::config::AdjudicationConfig;

/// Officer verdict on a request under manual review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficerDecision {
    pub request_id: RequestId,
    pub officer_id: OfficerId,
    pub action: ReviewAction,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Counts reported by an operator re-assignment sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReassignmentSummary {
    pub examined: usize,
    pub assigned: usize,
    pub still_pending: usize,
}

/// Service composing intake validation, the adjudication pipeline and storage.
pub struct UpdateRequestService<R, S, P, A> {
    guard: IntakeGuard,
    repository: Arc<R>,
    registry: Arc<S>,
    audit: Arc<A>,
    pipeline: AdjudicationPipeline<P>,
    window: Duration,
    subject_locks: SubjectLocks,
    sweep_lock: Mutex<()>,
}

impl<R, S, P, A> UpdateRequestService<R, S, P, A>
where
    R: UpdateRepository + 'static,
    S: SubjectRegistry + 'static,
    P: AssignmentPool + 'static,
    A: AuditSink + 'static,
{
    pub fn new(
        repository: Arc<R>,
        registry: Arc<S>,
        pool: Arc<P>,
        audit: Arc<A>,
        config: AdjudicationConfig,
    ) -> Self {
        Self::with_detector(
            Arc::new(RuleBasedDetector),
            repository,
            registry,
            pool,
            audit,
            config,
        )
    }

    pub fn with_detector(
        detector: Arc<dyn DuplicateDetector>,
        repository: Arc<R>,
        registry: Arc<S>,
        pool: Arc<P>,
        audit: Arc<A>,
        config: AdjudicationConfig,
    ) -> Self {
        let balancer = Arc::new(AssignmentBalancer::new(pool));
        let pipeline = AdjudicationPipeline::new(detector, config.policy, balancer);

        Self {
            guard: IntakeGuard::default(),
            repository,
            registry,
            audit,
            pipeline,
            window: Duration::days(i64::from(config.window_days)),
            subject_locks: SubjectLocks::default(),
            sweep_lock: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_subject_locks(&self) -> usize {
        self.subject_locks.tracked()
    }

    fn pool(&self) -> &Arc<P> {
        self.pipeline.balancer().pool()
    }

    /// Validate, adjudicate and persist a new submission as one unit of work.
    pub fn submit(
        &self,
        submission: UpdateSubmission,
        now: DateTime<Utc>,
    ) -> Result<DecisionResult, UpdateServiceError> {
        let validated = self.guard.validate(submission)?;
        let subject_id = validated.subject_id.clone();
        self.subject_locks
            .with_lock(&subject_id, || self.submit_locked(validated, now))
    }

    fn submit_locked(
        &self,
        validated: ValidatedSubmission,
        now: DateTime<Utc>,
    ) -> Result<DecisionResult, UpdateServiceError> {
        let view = RegistryView::load(
            &*self.registry,
            &*self.repository,
            &validated.subject_id,
            now - self.window,
        )?
        .ok_or_else(|| UpdateServiceError::SubjectNotFound(validated.subject_id.clone()))?;

        let mut request = UpdateRequest::new(
            next_request_id(now),
            validated.subject_id,
            validated.update_type,
            validated.new_value,
            now,
        );
        request.sub_type = validated.sub_type;
        request.old_value = validated.old_value;
        request.documents = validated.documents;

        let adjudication =
            self.pipeline
                .adjudicate(&mut request, &view.subject, &view.recent, now)?;

        if let Some(update) = &adjudication.field_update {
            if let Err(err) = self
                .registry
                .apply_field_update(&request.subject_id, update, now)
            {
                self.compensate(&request, &adjudication, false, now);
                return Err(err.into());
            }
        }

        if let Err(err) = self.repository.insert(request.clone()) {
            self.compensate(&request, &adjudication, true, now);
            return Err(err.into());
        }

        info!(
            request_id = %request.request_id.0,
            status = request.status.label(),
            risk = request.risk_score,
            "update request stored"
        );

        let mut details = BTreeMap::new();
        details.insert("update_type".to_string(), request.update_type.label().to_string());
        details.insert("risk_score".to_string(), format!("{:.2}", request.risk_score));
        details.insert("duplicate".to_string(), request.is_duplicate.to_string());
        details.insert("life_event".to_string(), request.is_life_event.to_string());
        details.insert("auto_approved".to_string(), request.auto_approved.to_string());
        details.insert(
            "detection_method".to_string(),
            format!("{:?}", adjudication.detection_method),
        );
        if let Some(approval) = &adjudication.approval {
            details.insert("approval".to_string(), approval.summary());
        }
        self.publish_audit(AuditEvent {
            action: AuditAction::UpdateSubmitted,
            actor: request.subject_id.0.clone(),
            actor_kind: ActorKind::Citizen,
            request_id: Some(request.request_id.clone()),
            details,
            at: now,
        });

        Ok(adjudication.decision)
    }

    /// Record an officer decision on a request that is under manual review.
    pub fn review(
        &self,
        decision: OfficerDecision,
        now: DateTime<Utc>,
    ) -> Result<UpdateRequest, UpdateServiceError> {
        let subject_id = self.get(&decision.request_id)?.subject_id;
        self.subject_locks
            .with_lock(&subject_id, || self.review_locked(decision, now))
    }

    fn review_locked(
        &self,
        decision: OfficerDecision,
        now: DateTime<Utc>,
    ) -> Result<UpdateRequest, UpdateServiceError> {
        let mut request = self.get(&decision.request_id)?;
        if request.status.is_terminal() {
            return Err(ReviewError::AlreadyFinal(request.status).into());
        }
        if request.status != UpdateStatus::Processing {
            return Err(ReviewError::NotAssigned(request.request_id).into());
        }

        let officer = self
            .pool()
            .officer(&decision.officer_id)?
            .ok_or_else(|| ReviewError::UnknownOfficer(decision.officer_id.clone()))?;

        let field_update = match decision.action {
            ReviewAction::Approve => self.officer_field_update(&request)?,
            ReviewAction::Reject => None,
        };

        let next = match decision.action {
            ReviewAction::Approve => UpdateStatus::Approved,
            ReviewAction::Reject => UpdateStatus::Rejected,
        };
        request.transition(next, now)?;
        request.reviewed_by = Some(officer.officer_id.clone());
        if decision.action == ReviewAction::Reject {
            request.rejection_reason = decision.reason.clone();
        }

        if let Some(update) = &field_update {
            self.registry
                .apply_field_update(&request.subject_id, update, now)?;
        }

        if let Err(err) = self.repository.update(request.clone()) {
            if let Some(update) = &field_update {
                self.revert_field(&request.subject_id, update, now);
            }
            return Err(err.into());
        }

        if let Some(assigned) = &request.assigned_officer {
            if let Err(err) = self.pool().complete_officer_task(assigned) {
                warn!(officer = %assigned.0, error = %err, "failed to record officer completion");
            }
        }

        info!(
            request_id = %request.request_id.0,
            officer = %officer.officer_id.0,
            status = request.status.label(),
            "officer decision recorded"
        );

        let mut details = BTreeMap::new();
        details.insert("decision".to_string(), request.status.label().to_string());
        if let Some(reason) = &request.rejection_reason {
            details.insert("reason".to_string(), reason.clone());
        }
        self.publish_audit(AuditEvent {
            action: AuditAction::RequestReviewed,
            actor: officer.officer_id.0.clone(),
            actor_kind: ActorKind::Officer,
            request_id: Some(request.request_id.clone()),
            details,
            at: now,
        });

        Ok(request)
    }

    /// Fetch a request for API responses.
    pub fn get(&self, request_id: &RequestId) -> Result<UpdateRequest, UpdateServiceError> {
        let request = self
            .repository
            .fetch(request_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(request)
    }

    /// A subject's own requests, newest first.
    pub fn requests_for_subject(
        &self,
        subject: &SubjectId,
        limit: usize,
    ) -> Result<Vec<UpdateRequest>, UpdateServiceError> {
        if self.registry.find_subject(subject)?.is_none() {
            return Err(UpdateServiceError::SubjectNotFound(subject.clone()));
        }
        let mut requests = self
            .repository
            .recent_for_subject(subject, DateTime::<Utc>::MIN_UTC)?;
        requests.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        requests.truncate(limit);
        Ok(requests)
    }

    /// Unresolved requests, riskiest first, then most recent first.
    pub fn review_queue(&self, limit: usize) -> Result<Vec<UpdateRequest>, UpdateServiceError> {
        let mut queue = self
            .repository
            .with_status(&[UpdateStatus::Pending, UpdateStatus::Processing])?;
        queue.sort_by(|a, b| {
            b.risk_score
                .total_cmp(&a.risk_score)
                .then_with(|| b.submitted_at.cmp(&a.submitted_at))
        });
        queue.truncate(limit);
        Ok(queue)
    }

    /// Operator-triggered retry of assignment for requests left `pending`.
    pub fn assign_pending(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ReassignmentSummary, UpdateServiceError> {
        let _sweep_guard = self.sweep_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut pending = self.repository.with_status(&[UpdateStatus::Pending])?;
        pending.retain(|request| request.assigned_center.is_none());
        pending.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));

        let mut summary = ReassignmentSummary {
            examined: pending.len(),
            ..ReassignmentSummary::default()
        };

        for mut request in pending {
            let Assignment::Assigned { center, officer } = self.pipeline.balancer().assign()?
            else {
                summary.still_pending += 1;
                continue;
            };

            request.assigned_center = Some(center.center_id.clone());
            request.assigned_officer = Some(officer.officer_id.clone());
            request.transition(UpdateStatus::Processing, now)?;

            if let Err(err) = self.repository.update(request.clone()) {
                self.release_slots(&center.center_id, &officer.officer_id);
                return Err(err.into());
            }

            summary.assigned += 1;
            let mut details = BTreeMap::new();
            details.insert("center".to_string(), center.center_id.0.clone());
            details.insert("officer".to_string(), officer.officer_id.0.clone());
            self.publish_audit(AuditEvent {
                action: AuditAction::PendingReassigned,
                actor: "operator".to_string(),
                actor_kind: ActorKind::Operator,
                request_id: Some(request.request_id.clone()),
                details,
                at: now,
            });
        }

        info!(
            examined = summary.examined,
            assigned = summary.assigned,
            still_pending = summary.still_pending,
            "pending re-assignment sweep finished"
        );
        Ok(summary)
    }

    fn officer_field_update(
        &self,
        request: &UpdateRequest,
    ) -> Result<Option<FieldUpdate>, UpdateServiceError> {
        let Some(field) = request.update_type.officer_approval_field() else {
            return Ok(None);
        };
        match self.registry.find_subject(&request.subject_id)? {
            Some(subject) => Ok(Some(FieldUpdate::for_subject(
                &subject,
                field,
                &request.new_value,
            ))),
            None => {
                warn!(
                    request_id = %request.request_id.0,
                    subject = %request.subject_id.0,
                    "subject missing from registry; approving without field update"
                );
                Ok(None)
            }
        }
    }

    /// Undo effects of an adjudication whose request could not be stored.
    fn compensate(
        &self,
        request: &UpdateRequest,
        adjudication: &Adjudication,
        field_applied: bool,
        now: DateTime<Utc>,
    ) {
        if field_applied {
            if let Some(update) = &adjudication.field_update {
                self.revert_field(&request.subject_id, update, now);
            }
        }
        if let Some(Assignment::Assigned { center, officer }) = &adjudication.assignment {
            self.release_slots(&center.center_id, &officer.officer_id);
        }
    }

    fn revert_field(&self, subject: &SubjectId, update: &FieldUpdate, now: DateTime<Utc>) {
        if let Err(err) = self
            .registry
            .apply_field_update(subject, &update.reverted(), now)
        {
            warn!(subject = %subject.0, error = %err, "failed to revert profile field");
        }
    }

    fn release_slots(&self, center: &CenterId, officer: &OfficerId) {
        if let Err(err) = self.pool().release_officer_slot(officer) {
            warn!(officer = %officer.0, error = %err, "failed to release officer slot");
        }
        if let Err(err) = self.pool().release_center_slot(center) {
            warn!(center = %center.0, error = %err, "failed to release center slot");
        }
    }

    fn publish_audit(&self, event: AuditEvent) {
        let action = event.action;
        if let Err(err) = self.audit.record(event) {
            warn!(?action, error = %err, "audit sink rejected event");
        }
    }
}

fn next_request_id(now: DateTime<Utc>) -> RequestId {
    let suffix = Uuid::new_v4().simple().to_string();
    RequestId(format!(
        "REQ{}{}",
        now.format("%Y%m%d%H%M%S"),
        suffix[..6].to_ascii_uppercase()
    ))
}

/// Per-subject mutexes serializing the duplicate read with the insert.
#[derive(Default)]
struct SubjectLocks {
    locks: Mutex<HashMap<SubjectId, Arc<Mutex<()>>>>,
}

impl SubjectLocks {
    /// Run `work` while holding the subject's mutex. The map entry is dropped
    /// once no other caller holds or awaits it.
    fn with_lock<T>(&self, subject: &SubjectId, work: impl FnOnce() -> T) -> T {
        let handle = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(subject.clone()).or_default().clone()
        };

        let result = {
            let _guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
            work()
        };

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here.
        if Arc::strong_count(&handle) == 2 {
            locks.remove(subject);
        }
        result
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Illegal officer decisions.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("request already final (status {0})")]
    AlreadyFinal(UpdateStatus),
    #[error("request {0:?} has not been assigned for review")]
    NotAssigned(RequestId),
    #[error("unknown officer {0:?}")]
    UnknownOfficer(OfficerId),
}

/// Error raised by the update request service.
#[derive(Debug, thiserror::Error)]
pub enum UpdateServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("subject {0:?} not found in registry")]
    SubjectNotFound(SubjectId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}
