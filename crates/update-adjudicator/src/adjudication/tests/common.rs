use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::adjudication::assignment::{AssignmentError, AssignmentPool};
use crate::adjudication::detection::{
    ClassifierError, ClassifierPrediction, DuplicateClassifier, DuplicateFeatures,
};
use crate::adjudication::domain::{
    CenterId, DocumentDescriptor, FieldUpdate, Officer, OfficerId, ProcessingCenter, RequestId,
    SubjectId, SubjectProfile, UpdateRequest, UpdateStatus, UpdateSubmission, UpdateType,
};
use crate::adjudication::repository::{
    AuditError, AuditEvent, AuditSink, RepositoryError, SubjectRegistry, UpdateRepository,
};
use crate::adjudication::{update_router, UpdateRequestService};
use crate::config::AdjudicationConfig;

pub(super) const SUBJECT: &str = "123456789012";

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn birth_date_for_age(age: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026 - age, 1, 15).expect("valid date")
}

pub(super) fn subject(id: &str, age: Option<i32>) -> SubjectProfile {
    SubjectProfile {
        subject_id: SubjectId(id.to_string()),
        name: "Amit Patel".to_string(),
        email: Some("user@example.com".to_string()),
        phone: Some("9876543210".to_string()),
        address: Some("123 Main Street, Delhi".to_string()),
        date_of_birth: age.map(birth_date_for_age),
        gender: Some("Male".to_string()),
        marital_status: Some("single".to_string()),
        last_updated: None,
    }
}

pub(super) fn document() -> DocumentDescriptor {
    DocumentDescriptor {
        name: "Address proof".to_string(),
        document_type: "electricity_bill".to_string(),
        storage_key: "uploads/REQ-test/bill.pdf".to_string(),
    }
}

pub(super) fn request(
    id: &str,
    update_type: UpdateType,
    new_value: &str,
    with_documents: bool,
) -> UpdateRequest {
    let mut request = UpdateRequest::new(
        RequestId(id.to_string()),
        SubjectId(SUBJECT.to_string()),
        update_type,
        new_value,
        now(),
    );
    if with_documents {
        request.documents.push(document());
    }
    request
}

/// Earlier submission by the same subject, already stored.
pub(super) fn prior(id: &str, update_type: UpdateType, new_value: &str, days_ago: i64) -> UpdateRequest {
    let mut request = request(id, update_type, new_value, true);
    request.submitted_at = now() - Duration::days(days_ago);
    request.status = UpdateStatus::Processing;
    request
}

pub(super) fn submission(update_type: &str, new_value: &str, with_documents: bool) -> UpdateSubmission {
    UpdateSubmission {
        subject_id: SubjectId(SUBJECT.to_string()),
        update_type: update_type.to_string(),
        sub_type: None,
        old_value: String::new(),
        new_value: new_value.to_string(),
        documents: if with_documents {
            vec![document()]
        } else {
            Vec::new()
        },
    }
}

pub(super) fn relocation_submission() -> UpdateSubmission {
    submission("address_change", "relocating to new city", true)
}

pub(super) fn high_risk_submission() -> UpdateSubmission {
    submission("biometric_update", "fingerprint refresh", false)
}

pub(super) fn center(id: &str, load: u32, capacity: u32, active: bool) -> ProcessingCenter {
    ProcessingCenter {
        center_id: CenterId(id.to_string()),
        name: format!("{id} Processing Center"),
        location: None,
        capacity,
        current_load: load,
        active,
    }
}

pub(super) fn officer(id: &str, center: &str, workload: u32, max: u32) -> Officer {
    Officer {
        officer_id: OfficerId(id.to_string()),
        name: format!("Officer {id}"),
        processing_center: CenterId(center.to_string()),
        current_workload: workload,
        max_workload: max,
        active: true,
        total_processed: 0,
    }
}

pub(super) struct Harness {
    pub(super) service: UpdateRequestService<MemoryRepository, MemoryRegistry, MemoryPool, MemoryAudit>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) registry: Arc<MemoryRegistry>,
    pub(super) pool: Arc<MemoryPool>,
    pub(super) audit: Arc<MemoryAudit>,
}

pub(super) fn standard_pool() -> MemoryPool {
    MemoryPool::new(
        vec![
            center("PC001", 0, 1000, true),
            center("PC002", 0, 1000, true),
        ],
        vec![
            officer("OFF001", "PC001", 0, 100),
            officer("OFF002", "PC002", 0, 100),
        ],
    )
}

pub(super) fn build_harness(subject_age: Option<i32>, pool: MemoryPool) -> Harness {
    let repository = Arc::new(MemoryRepository::default());
    let registry = Arc::new(MemoryRegistry::with_subject(subject(SUBJECT, subject_age)));
    let pool = Arc::new(pool);
    let audit = Arc::new(MemoryAudit::default());
    let service = UpdateRequestService::new(
        repository.clone(),
        registry.clone(),
        pool.clone(),
        audit.clone(),
        AdjudicationConfig::default(),
    );
    Harness {
        service,
        repository,
        registry,
        pool,
        audit,
    }
}

pub(super) fn build_service() -> Harness {
    build_harness(Some(25), standard_pool())
}

pub(super) fn router_for(harness: Harness) -> axum::Router {
    update_router(Arc::new(harness.service))
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<Vec<UpdateRequest>>,
}

impl MemoryRepository {
    pub(super) fn seed(&self, request: UpdateRequest) {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .push(request);
    }

    pub(super) fn count(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

impl UpdateRepository for MemoryRepository {
    fn insert(&self, request: UpdateRequest) -> Result<UpdateRequest, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.iter().any(|existing| existing.request_id == request.request_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(request.clone());
        Ok(request)
    }

    fn update(&self, request: UpdateRequest) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard
            .iter_mut()
            .find(|existing| existing.request_id == request.request_id)
        {
            Some(slot) => {
                *slot = request;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &RequestId) -> Result<Option<UpdateRequest>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|request| &request.request_id == id).cloned())
    }

    fn recent_for_subject(
        &self,
        subject: &SubjectId,
        since: DateTime<Utc>,
    ) -> Result<Vec<UpdateRequest>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .iter()
            .filter(|request| &request.subject_id == subject && request.submitted_at >= since)
            .cloned()
            .collect())
    }

    fn with_status(&self, statuses: &[UpdateStatus]) -> Result<Vec<UpdateRequest>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .iter()
            .filter(|request| statuses.contains(&request.status))
            .cloned()
            .collect())
    }
}

/// Accepts reads but refuses to store anything.
#[derive(Default)]
pub(super) struct UnavailableRepository;

impl UpdateRepository for UnavailableRepository {
    fn insert(&self, _request: UpdateRequest) -> Result<UpdateRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _request: UpdateRequest) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &RequestId) -> Result<Option<UpdateRequest>, RepositoryError> {
        Ok(None)
    }

    fn recent_for_subject(
        &self,
        _subject: &SubjectId,
        _since: DateTime<Utc>,
    ) -> Result<Vec<UpdateRequest>, RepositoryError> {
        Ok(Vec::new())
    }

    fn with_status(&self, _statuses: &[UpdateStatus]) -> Result<Vec<UpdateRequest>, RepositoryError> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub(super) struct MemoryRegistry {
    subjects: Mutex<HashMap<SubjectId, SubjectProfile>>,
}

impl MemoryRegistry {
    pub(super) fn with_subject(profile: SubjectProfile) -> Self {
        let registry = Self::default();
        registry
            .subjects
            .lock()
            .expect("registry mutex poisoned")
            .insert(profile.subject_id.clone(), profile);
        registry
    }

    pub(super) fn profile(&self, id: &str) -> SubjectProfile {
        self.subjects
            .lock()
            .expect("registry mutex poisoned")
            .get(&SubjectId(id.to_string()))
            .cloned()
            .expect("subject seeded")
    }
}

impl SubjectRegistry for MemoryRegistry {
    fn find_subject(&self, id: &SubjectId) -> Result<Option<SubjectProfile>, RepositoryError> {
        Ok(self
            .subjects
            .lock()
            .expect("registry mutex poisoned")
            .get(id)
            .cloned())
    }

    fn apply_field_update(
        &self,
        id: &SubjectId,
        update: &FieldUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.subjects.lock().expect("registry mutex poisoned");
        let profile = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        profile.set_field(update.field, update.value.clone());
        profile.last_updated = Some(at);
        Ok(())
    }
}

#[derive(Default)]
struct PoolState {
    centers: Vec<ProcessingCenter>,
    officers: Vec<Officer>,
}

pub(super) struct MemoryPool {
    state: Mutex<PoolState>,
}

impl MemoryPool {
    pub(super) fn new(centers: Vec<ProcessingCenter>, officers: Vec<Officer>) -> Self {
        Self {
            state: Mutex::new(PoolState { centers, officers }),
        }
    }

    pub(super) fn center(&self, id: &str) -> ProcessingCenter {
        let guard = self.state.lock().expect("pool mutex poisoned");
        guard
            .centers
            .iter()
            .find(|center| center.center_id.0 == id)
            .cloned()
            .expect("center seeded")
    }

    pub(super) fn officer_snapshot(&self, id: &str) -> Officer {
        let guard = self.state.lock().expect("pool mutex poisoned");
        guard
            .officers
            .iter()
            .find(|officer| officer.officer_id.0 == id)
            .cloned()
            .expect("officer seeded")
    }

    pub(super) fn add_officer(&self, officer: Officer) {
        self.state
            .lock()
            .expect("pool mutex poisoned")
            .officers
            .push(officer);
    }
}

impl AssignmentPool for MemoryPool {
    fn active_centers(&self) -> Result<Vec<ProcessingCenter>, AssignmentError> {
        let guard = self.state.lock().expect("pool mutex poisoned");
        Ok(guard.centers.iter().filter(|c| c.active).cloned().collect())
    }

    fn eligible_officers(&self, center: &CenterId) -> Result<Vec<Officer>, AssignmentError> {
        let guard = self.state.lock().expect("pool mutex poisoned");
        Ok(guard
            .officers
            .iter()
            .filter(|officer| &officer.processing_center == center && officer.is_eligible())
            .cloned()
            .collect())
    }

    fn officer(&self, officer: &OfficerId) -> Result<Option<Officer>, AssignmentError> {
        let guard = self.state.lock().expect("pool mutex poisoned");
        Ok(guard
            .officers
            .iter()
            .find(|candidate| &candidate.officer_id == officer)
            .cloned())
    }

    fn reserve_center_slot(&self, center: &CenterId) -> Result<ProcessingCenter, AssignmentError> {
        let mut guard = self.state.lock().expect("pool mutex poisoned");
        let slot = guard
            .centers
            .iter_mut()
            .find(|candidate| &candidate.center_id == center)
            .ok_or_else(|| AssignmentError::UnknownCenter(center.clone()))?;
        if !slot.has_capacity() {
            return Err(AssignmentError::CenterAtCapacity(center.clone()));
        }
        slot.current_load += 1;
        Ok(slot.clone())
    }

    fn reserve_officer_slot(&self, officer: &OfficerId) -> Result<Officer, AssignmentError> {
        let mut guard = self.state.lock().expect("pool mutex poisoned");
        let slot = guard
            .officers
            .iter_mut()
            .find(|candidate| &candidate.officer_id == officer)
            .ok_or_else(|| AssignmentError::UnknownOfficer(officer.clone()))?;
        if !slot.is_eligible() {
            return Err(AssignmentError::OfficerUnavailable(officer.clone()));
        }
        slot.current_workload += 1;
        Ok(slot.clone())
    }

    fn release_center_slot(&self, center: &CenterId) -> Result<(), AssignmentError> {
        let mut guard = self.state.lock().expect("pool mutex poisoned");
        let slot = guard
            .centers
            .iter_mut()
            .find(|candidate| &candidate.center_id == center)
            .ok_or_else(|| AssignmentError::UnknownCenter(center.clone()))?;
        slot.current_load = slot.current_load.saturating_sub(1);
        Ok(())
    }

    fn release_officer_slot(&self, officer: &OfficerId) -> Result<(), AssignmentError> {
        let mut guard = self.state.lock().expect("pool mutex poisoned");
        let slot = guard
            .officers
            .iter_mut()
            .find(|candidate| &candidate.officer_id == officer)
            .ok_or_else(|| AssignmentError::UnknownOfficer(officer.clone()))?;
        slot.current_workload = slot.current_workload.saturating_sub(1);
        Ok(())
    }

    fn complete_officer_task(&self, officer: &OfficerId) -> Result<Officer, AssignmentError> {
        let mut guard = self.state.lock().expect("pool mutex poisoned");
        let slot = guard
            .officers
            .iter_mut()
            .find(|candidate| &candidate.officer_id == officer)
            .ok_or_else(|| AssignmentError::UnknownOfficer(officer.clone()))?;
        slot.current_workload = slot.current_workload.saturating_sub(1);
        slot.total_processed += 1;
        Ok(slot.clone())
    }
}

/// Pool whose backing store is down.
pub(super) struct OfflinePool;

impl AssignmentPool for OfflinePool {
    fn active_centers(&self) -> Result<Vec<ProcessingCenter>, AssignmentError> {
        Err(AssignmentError::Unavailable("pool offline".to_string()))
    }

    fn eligible_officers(&self, _center: &CenterId) -> Result<Vec<Officer>, AssignmentError> {
        Err(AssignmentError::Unavailable("pool offline".to_string()))
    }

    fn officer(&self, _officer: &OfficerId) -> Result<Option<Officer>, AssignmentError> {
        Err(AssignmentError::Unavailable("pool offline".to_string()))
    }

    fn reserve_center_slot(&self, _center: &CenterId) -> Result<ProcessingCenter, AssignmentError> {
        Err(AssignmentError::Unavailable("pool offline".to_string()))
    }

    fn reserve_officer_slot(&self, _officer: &OfficerId) -> Result<Officer, AssignmentError> {
        Err(AssignmentError::Unavailable("pool offline".to_string()))
    }

    fn release_center_slot(&self, _center: &CenterId) -> Result<(), AssignmentError> {
        Err(AssignmentError::Unavailable("pool offline".to_string()))
    }

    fn release_officer_slot(&self, _officer: &OfficerId) -> Result<(), AssignmentError> {
        Err(AssignmentError::Unavailable("pool offline".to_string()))
    }

    fn complete_officer_task(&self, _officer: &OfficerId) -> Result<Officer, AssignmentError> {
        Err(AssignmentError::Unavailable("pool offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAudit {
    pub(super) fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.events.lock().expect("audit mutex poisoned").push(event);
        Ok(())
    }
}

pub(super) struct FailingClassifier;

impl DuplicateClassifier for FailingClassifier {
    fn predict(&self, _features: &DuplicateFeatures) -> Result<ClassifierPrediction, ClassifierError> {
        Err(ClassifierError::Unavailable("model artifact missing".to_string()))
    }
}

pub(super) struct FixedClassifier(pub(super) ClassifierPrediction);

impl DuplicateClassifier for FixedClassifier {
    fn predict(&self, _features: &DuplicateFeatures) -> Result<ClassifierPrediction, ClassifierError> {
        Ok(self.0)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
