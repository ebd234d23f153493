use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;
use update_adjudicator::adjudication::{
    AssignmentError, AssignmentPool, AuditError, AuditEvent, AuditSink, CenterId, FieldUpdate,
    Officer, OfficerId, ProcessingCenter, RepositoryError, RequestId, SubjectId, SubjectProfile,
    SubjectRegistry, UpdateRepository, UpdateRequest, UpdateRequestService, UpdateStatus,
};
use update_adjudicator::config::AdjudicationConfig;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type InMemoryUpdateService = UpdateRequestService<
    InMemoryUpdateRepository,
    InMemorySubjectRegistry,
    InMemoryAssignmentPool,
    InMemoryAuditLog,
>;

/// In-memory collaborators seeded with the sample registry, centers and officers.
///
/// Every handle shares state with its clones, so callers can keep one around to
/// inspect what the service did.
#[derive(Clone)]
pub(crate) struct InMemoryBackend {
    pub(crate) repository: InMemoryUpdateRepository,
    pub(crate) registry: InMemorySubjectRegistry,
    pub(crate) pool: InMemoryAssignmentPool,
    pub(crate) audit: InMemoryAuditLog,
}

impl InMemoryBackend {
    pub(crate) fn sample() -> Self {
        Self {
            repository: InMemoryUpdateRepository::default(),
            registry: InMemorySubjectRegistry::with_profiles(sample_subjects()),
            pool: InMemoryAssignmentPool::new(sample_centers(), sample_officers()),
            audit: InMemoryAuditLog::default(),
        }
    }

    pub(crate) fn service(&self, config: AdjudicationConfig) -> InMemoryUpdateService {
        UpdateRequestService::new(
            Arc::new(self.repository.clone()),
            Arc::new(self.registry.clone()),
            Arc::new(self.pool.clone()),
            Arc::new(self.audit.clone()),
            config,
        )
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUpdateRepository {
    records: Arc<Mutex<HashMap<RequestId, UpdateRequest>>>,
}

impl UpdateRepository for InMemoryUpdateRepository {
    fn insert(&self, request: UpdateRequest) -> Result<UpdateRequest, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&request.request_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(request.request_id.clone(), request.clone());
        Ok(request)
    }

    fn update(&self, request: UpdateRequest) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&request.request_id) {
            guard.insert(request.request_id.clone(), request);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &RequestId) -> Result<Option<UpdateRequest>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn recent_for_subject(
        &self,
        subject: &SubjectId,
        since: DateTime<Utc>,
    ) -> Result<Vec<UpdateRequest>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|request| &request.subject_id == subject && request.submitted_at >= since)
            .cloned()
            .collect())
    }

    fn with_status(&self, statuses: &[UpdateStatus]) -> Result<Vec<UpdateRequest>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|request| statuses.contains(&request.status))
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySubjectRegistry {
    profiles: Arc<Mutex<HashMap<SubjectId, SubjectProfile>>>,
}

impl InMemorySubjectRegistry {
    pub(crate) fn with_profiles(profiles: Vec<SubjectProfile>) -> Self {
        let registry = Self::default();
        {
            let mut guard = registry.profiles.lock().expect("registry mutex poisoned");
            for profile in profiles {
                guard.insert(profile.subject_id.clone(), profile);
            }
        }
        registry
    }
}

impl SubjectRegistry for InMemorySubjectRegistry {
    fn find_subject(&self, id: &SubjectId) -> Result<Option<SubjectProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("registry mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn apply_field_update(
        &self,
        id: &SubjectId,
        update: &FieldUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.profiles.lock().expect("registry mutex poisoned");
        let profile = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        profile.set_field(update.field, update.value.clone());
        profile.last_updated = Some(at);
        Ok(())
    }
}

struct PoolState {
    centers: Vec<ProcessingCenter>,
    officers: Vec<Officer>,
}

/// Load counters guarded by one mutex so every reserve is a compare-and-increment.
#[derive(Clone)]
pub(crate) struct InMemoryAssignmentPool {
    state: Arc<Mutex<PoolState>>,
}

impl InMemoryAssignmentPool {
    pub(crate) fn new(centers: Vec<ProcessingCenter>, officers: Vec<Officer>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PoolState { centers, officers })),
        }
    }

    pub(crate) fn centers(&self) -> Vec<ProcessingCenter> {
        self.state
            .lock()
            .expect("pool mutex poisoned")
            .centers
            .clone()
    }

    pub(crate) fn officers(&self) -> Vec<Officer> {
        self.state
            .lock()
            .expect("pool mutex poisoned")
            .officers
            .clone()
    }

    pub(crate) fn set_center_active(&self, center: &CenterId, active: bool) {
        let mut guard = self.state.lock().expect("pool mutex poisoned");
        if let Some(slot) = guard.centers.iter_mut().find(|c| &c.center_id == center) {
            slot.active = active;
        }
    }
}

impl AssignmentPool for InMemoryAssignmentPool {
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

#[derive(Default, Clone)]
pub(crate) struct InMemoryAuditLog {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        info!(
            action = ?event.action,
            actor = %event.actor,
            request_id = ?event.request_id.as_ref().map(|id| id.0.as_str()),
            "audit event recorded"
        );
        let mut guard = self.events.lock().expect("audit mutex poisoned");
        guard.push(event);
        Ok(())
    }
}

impl InMemoryAuditLog {
    pub(crate) fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }
}

pub(crate) fn sample_subjects() -> Vec<SubjectProfile> {
    vec![
        SubjectProfile {
            subject_id: SubjectId("123456789012".to_string()),
            name: "Amit Patel".to_string(),
            email: Some("amit.patel@example.com".to_string()),
            phone: Some("9876543210".to_string()),
            address: Some("123 Main Street, Delhi".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 15),
            gender: Some("Male".to_string()),
            marital_status: Some("single".to_string()),
            last_updated: None,
        },
        SubjectProfile {
            subject_id: SubjectId("234567890123".to_string()),
            name: "Riya Sharma".to_string(),
            email: None,
            phone: Some("9123456780".to_string()),
            address: Some("45 Marine Drive, Mumbai".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(2010, 8, 20),
            gender: Some("Female".to_string()),
            marital_status: None,
            last_updated: None,
        },
    ]
}

pub(crate) fn sample_centers() -> Vec<ProcessingCenter> {
    vec![
        ProcessingCenter {
            center_id: CenterId("PC001".to_string()),
            name: "Delhi Processing Center".to_string(),
            location: Some("Delhi".to_string()),
            capacity: 1000,
            current_load: 0,
            active: true,
        },
        ProcessingCenter {
            center_id: CenterId("PC002".to_string()),
            name: "Mumbai Processing Center".to_string(),
            location: Some("Mumbai".to_string()),
            capacity: 1000,
            current_load: 0,
            active: true,
        },
    ]
}

pub(crate) fn sample_officers() -> Vec<Officer> {
    vec![
        Officer {
            officer_id: OfficerId("OFF001".to_string()),
            name: "Rajesh Kumar".to_string(),
            processing_center: CenterId("PC001".to_string()),
            current_workload: 0,
            max_workload: 100,
            active: true,
            total_processed: 0,
        },
        Officer {
            officer_id: OfficerId("OFF002".to_string()),
            name: "Priya Sharma".to_string(),
            processing_center: CenterId("PC002".to_string()),
            current_workload: 0,
            max_workload: 100,
            active: true,
            total_processed: 0,
        },
    ]
}
