//! Adjudication of citizen-submitted demographic update requests.
//!
//! Submissions flow through intake validation, duplicate detection, life-event
//! inference, risk scoring and the auto-approval decision. Requests that are
//! neither duplicates nor auto-approved are routed to the least-loaded
//! processing center and officer.

pub mod assignment;
pub mod detection;
pub mod domain;
pub mod pipeline;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub(crate) mod validation;

#[cfg(test)]
mod tests;

pub use assignment::{Assignment, AssignmentBalancer, AssignmentError, AssignmentPool};
pub use detection::{
    ClassifierError, ClassifierPrediction, DetectionMethod, DuplicateClassifier,
    DuplicateDetector, DuplicateFeatures, DuplicateVerdict, LearnedDetector, LifeEventClassifier,
    RuleBasedDetector,
};
pub use domain::{
    CenterId, DocumentDescriptor, FieldUpdate, LifeEvent, LifeEventKind, Officer, OfficerId,
    ProcessingCenter, ProfileField, RequestId, SubjectId, SubjectProfile, UpdateRequest,
    UpdateStatus, UpdateSubmission, UpdateType,
};
pub use pipeline::{Adjudication, AdjudicationPipeline, DecisionResult, PipelineError};
pub use repository::{
    ActorKind, AuditAction, AuditError, AuditEvent, AuditSink, RegistryView, RepositoryError,
    SubjectRegistry, UpdateRepository, UpdateStatusView,
};
pub use router::update_router;
pub use scoring::{
    risk_level, AdjudicationPolicy, ApprovalAssessment, ApprovalCondition, ApprovalDecider,
    RiskScorer,
};
pub use service::{
    OfficerDecision, ReassignmentSummary, ReviewAction, ReviewError, UpdateRequestService,
    UpdateServiceError,
};
pub use validation::ValidationError;
