//! Load-balanced routing of unresolved requests to centers and officers.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use super::domain::{CenterId, Officer, OfficerId, ProcessingCenter};

/// Collaborator owning center and officer load counters.
///
/// Each reserve/release call must be a single atomic compare-and-update on the
/// backing store: a reserve refuses the slot once the limit has been reached.
pub trait AssignmentPool: Send + Sync {
    fn active_centers(&self) -> Result<Vec<ProcessingCenter>, AssignmentError>;
    fn eligible_officers(&self, center: &CenterId) -> Result<Vec<Officer>, AssignmentError>;
    fn officer(&self, officer: &OfficerId) -> Result<Option<Officer>, AssignmentError>;
    fn reserve_center_slot(&self, center: &CenterId) -> Result<ProcessingCenter, AssignmentError>;
    fn reserve_officer_slot(&self, officer: &OfficerId) -> Result<Officer, AssignmentError>;
    fn release_center_slot(&self, center: &CenterId) -> Result<(), AssignmentError>;
    fn release_officer_slot(&self, officer: &OfficerId) -> Result<(), AssignmentError>;
    /// Completion bookkeeping after an officer decision.
    fn complete_officer_task(&self, officer: &OfficerId) -> Result<Officer, AssignmentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("unknown processing center {0:?}")]
    UnknownCenter(CenterId),
    #[error("unknown officer {0:?}")]
    UnknownOfficer(OfficerId),
    #[error("processing center {0:?} has no free capacity")]
    CenterAtCapacity(CenterId),
    #[error("officer {0:?} cannot take more work")]
    OfficerUnavailable(OfficerId),
    #[error("assignment pool unavailable: {0}")]
    Unavailable(String),
}

impl AssignmentError {
    /// Contention outcomes mean "no slot", not a broken collaborator.
    fn is_contention(&self) -> bool {
        matches!(
            self,
            AssignmentError::CenterAtCapacity(_) | AssignmentError::OfficerUnavailable(_)
        )
    }
}

/// Result of routing a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Assigned {
        center: ProcessingCenter,
        officer: Officer,
    },
    NoActiveCenter,
    NoEligibleOfficer { center: CenterId },
}

/// Picks the least-loaded center, then the least-loaded eligible officer within it.
///
/// Selection and reservation happen under one mutex so two concurrent
/// adjudications can never both observe the same minimum.
pub struct AssignmentBalancer<P> {
    pool: Arc<P>,
    lock: Mutex<()>,
}

impl<P: AssignmentPool> AssignmentBalancer<P> {
    pub fn new(pool: Arc<P>) -> Self {
        Self {
            pool,
            lock: Mutex::new(()),
        }
    }

    pub fn pool(&self) -> &Arc<P> {
        &self.pool
    }

    pub fn assign_center(&self) -> Result<Option<ProcessingCenter>, AssignmentError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.reserve_center()
    }

    pub fn assign_officer(
        &self,
        center: &ProcessingCenter,
    ) -> Result<Option<Officer>, AssignmentError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.reserve_officer(&center.center_id)
    }

    /// Reserve a center and an officer together; a center slot is handed back
    /// when no officer inside it can take the request.
    pub fn assign(&self) -> Result<Assignment, AssignmentError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(center) = self.reserve_center()? else {
            return Ok(Assignment::NoActiveCenter);
        };

        match self.reserve_officer(&center.center_id) {
            Ok(Some(officer)) => Ok(Assignment::Assigned { center, officer }),
            Ok(None) => {
                self.pool.release_center_slot(&center.center_id)?;
                Ok(Assignment::NoEligibleOfficer {
                    center: center.center_id,
                })
            }
            Err(err) => {
                if let Err(release_err) = self.pool.release_center_slot(&center.center_id) {
                    warn!(center = %center.center_id.0, error = %release_err, "failed to release center slot");
                }
                Err(err)
            }
        }
    }

    fn reserve_center(&self) -> Result<Option<ProcessingCenter>, AssignmentError> {
        let centers = self.pool.active_centers()?;
        let Some(selected) = centers
            .iter()
            .filter(|center| center.has_capacity())
            .min_by_key(|center| center.current_load)
        else {
            return Ok(None);
        };

        match self.pool.reserve_center_slot(&selected.center_id) {
            Ok(reserved) => {
                debug!(center = %reserved.center_id.0, load = reserved.current_load, "center slot reserved");
                Ok(Some(reserved))
            }
            Err(err) if err.is_contention() => {
                warn!(center = %selected.center_id.0, error = %err, "center slot no longer available");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn reserve_officer(&self, center: &CenterId) -> Result<Option<Officer>, AssignmentError> {
        let officers = self.pool.eligible_officers(center)?;
        let Some(selected) = officers
            .iter()
            .filter(|officer| officer.processing_center == *center && officer.is_eligible())
            .min_by_key(|officer| officer.current_workload)
        else {
            return Ok(None);
        };

        match self.pool.reserve_officer_slot(&selected.officer_id) {
            Ok(reserved) => {
                debug!(officer = %reserved.officer_id.0, workload = reserved.current_workload, "officer slot reserved");
                Ok(Some(reserved))
            }
            Err(err) if err.is_contention() => {
                warn!(officer = %selected.officer_id.0, error = %err, "officer slot no longer available");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
