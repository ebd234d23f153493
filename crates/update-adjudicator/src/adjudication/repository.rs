use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    CenterId, FieldUpdate, LifeEventKind, OfficerId, RequestId, SubjectId, SubjectProfile,
    UpdateRequest, UpdateStatus, UpdateType,
};
use super::scoring::risk_level;

/// Storage abstraction for update requests.
pub trait UpdateRepository: Send + Sync {
    fn insert(&self, request: UpdateRequest) -> Result<UpdateRequest, RepositoryError>;
    fn update(&self, request: UpdateRequest) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &RequestId) -> Result<Option<UpdateRequest>, RepositoryError>;
    /// Requests for `subject` submitted at or after `since`.
    fn recent_for_subject(
        &self,
        subject: &SubjectId,
        since: DateTime<Utc>,
    ) -> Result<Vec<UpdateRequest>, RepositoryError>;
    fn with_status(&self, statuses: &[UpdateStatus]) -> Result<Vec<UpdateRequest>, RepositoryError>;
}

/// Identity registry owning subject profiles.
pub trait SubjectRegistry: Send + Sync {
    fn find_subject(&self, id: &SubjectId) -> Result<Option<SubjectProfile>, RepositoryError>;
    fn apply_field_update(
        &self,
        id: &SubjectId,
        update: &FieldUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Read-only snapshot of a requester's profile and recent submissions.
#[derive(Debug, Clone)]
pub struct RegistryView {
    pub subject: SubjectProfile,
    pub recent: Vec<UpdateRequest>,
}

impl RegistryView {
    /// `Ok(None)` when the registry has no such subject.
    pub fn load<S, R>(
        registry: &S,
        requests: &R,
        subject: &SubjectId,
        since: DateTime<Utc>,
    ) -> Result<Option<Self>, RepositoryError>
    where
        S: SubjectRegistry + ?Sized,
        R: UpdateRepository + ?Sized,
    {
        let Some(profile) = registry.find_subject(subject)? else {
            return Ok(None);
        };
        let recent = requests.recent_for_subject(subject, since)?;
        Ok(Some(Self {
            subject: profile,
            recent,
        }))
    }
}

/// Outbound audit hook. Entries describe decisions; formatting is the sink's concern.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    UpdateSubmitted,
    RequestReviewed,
    PendingReassigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Citizen,
    Officer,
    Operator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub actor: String,
    pub actor_kind: ActorKind,
    pub request_id: Option<RequestId>,
    pub details: BTreeMap<String, String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit transport unavailable: {0}")]
    Transport(String),
}

/// One step of the externally visible processing timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineStep {
    pub step: &'static str,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<DateTime<Utc>>,
    pub description: String,
}

/// Sanitized representation of a request's status for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateStatusView {
    pub request_id: RequestId,
    pub subject_id: SubjectId,
    pub update_type: UpdateType,
    pub status: &'static str,
    pub risk_score: f64,
    pub risk_level: &'static str,
    pub is_duplicate: bool,
    pub duplicate_confidence: f64,
    pub is_life_event: bool,
    pub life_event_type: LifeEventKind,
    pub life_event_confidence: f64,
    pub auto_approved: bool,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_center: Option<CenterId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_officer: Option<OfficerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub timeline: Vec<TimelineStep>,
}

impl UpdateStatusView {
    pub fn from_request(request: &UpdateRequest) -> Self {
        Self {
            request_id: request.request_id.clone(),
            subject_id: request.subject_id.clone(),
            update_type: request.update_type,
            status: request.status.label(),
            risk_score: request.risk_score,
            risk_level: risk_level(request.risk_score),
            is_duplicate: request.is_duplicate,
            duplicate_confidence: request.duplicate_confidence,
            is_life_event: request.is_life_event,
            life_event_type: request.life_event_type,
            life_event_confidence: request.life_event_confidence,
            auto_approved: request.auto_approved,
            submitted_at: request.submitted_at,
            processed_at: request.processed_at,
            completed_at: request.completed_at,
            assigned_center: request.assigned_center.clone(),
            assigned_officer: request.assigned_officer.clone(),
            rejection_reason: request.rejection_reason.clone(),
            timeline: timeline(request),
        }
    }
}

fn timeline(request: &UpdateRequest) -> Vec<TimelineStep> {
    let status = request.status;
    let mut steps = vec![
        TimelineStep {
            step: "Submitted",
            state: "completed",
            at: Some(request.submitted_at),
            description: "Request received by system".to_string(),
        },
        TimelineStep {
            step: "Duplicate Check",
            state: "completed",
            at: None,
            description: if request.is_duplicate {
                "Matches a recent submission".to_string()
            } else {
                "No matching recent submission".to_string()
            },
        },
        TimelineStep {
            step: "Risk Assessment",
            state: if status == UpdateStatus::Duplicate {
                "skipped"
            } else {
                "completed"
            },
            at: None,
            description: "Analyzing request risk level".to_string(),
        },
    ];

    match status {
        UpdateStatus::AutoApproved => steps.push(TimelineStep {
            step: "Completed",
            state: "completed",
            at: request.completed_at,
            description: "Request auto-approved".to_string(),
        }),
        UpdateStatus::Processing => steps.push(TimelineStep {
            step: "Officer Review",
            state: "current",
            at: None,
            description: format!(
                "Assigned to {} at {}",
                request
                    .assigned_officer
                    .as_ref()
                    .map(|officer| officer.0.as_str())
                    .unwrap_or("unassigned"),
                request
                    .assigned_center
                    .as_ref()
                    .map(|center| center.0.as_str())
                    .unwrap_or("unassigned"),
            ),
        }),
        UpdateStatus::Approved | UpdateStatus::Rejected => steps.push(TimelineStep {
            step: "Officer Review",
            state: "completed",
            at: request.completed_at,
            description: format!("Request {} by officer", status.label()),
        }),
        UpdateStatus::Pending => steps.push(TimelineStep {
            step: "Officer Review",
            state: "waiting",
            at: None,
            description: "Awaiting processing center capacity".to_string(),
        }),
        UpdateStatus::Duplicate => {}
    }

    steps
}
