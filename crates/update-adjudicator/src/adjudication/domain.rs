use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted update requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

/// Identity record an update request concerns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CenterId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfficerId(pub String);

/// Categories of demographic change a citizen may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    NameChange,
    AddressChange,
    PhoneChange,
    EmailChange,
    MaritalStatus,
    PhotoUpdate,
    BiometricUpdate,
    Other,
}

impl UpdateType {
    pub const ALL: [UpdateType; 8] = [
        UpdateType::NameChange,
        UpdateType::AddressChange,
        UpdateType::PhoneChange,
        UpdateType::EmailChange,
        UpdateType::MaritalStatus,
        UpdateType::PhotoUpdate,
        UpdateType::BiometricUpdate,
        UpdateType::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            UpdateType::NameChange => "name_change",
            UpdateType::AddressChange => "address_change",
            UpdateType::PhoneChange => "phone_change",
            UpdateType::EmailChange => "email_change",
            UpdateType::MaritalStatus => "marital_status",
            UpdateType::PhotoUpdate => "photo_update",
            UpdateType::BiometricUpdate => "biometric_update",
            UpdateType::Other => "other",
        }
    }

    /// Parse the wire label; unrecognised labels are rejected during intake.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.label() == normalized)
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            UpdateType::NameChange => "Name Correction",
            UpdateType::AddressChange => "Address Change",
            UpdateType::PhoneChange => "Phone Number Update",
            UpdateType::EmailChange => "Email Update",
            UpdateType::MaritalStatus => "Marital Status",
            UpdateType::PhotoUpdate => "Photograph Update",
            UpdateType::BiometricUpdate => "Biometric Update",
            UpdateType::Other => "Other Correction",
        }
    }

    pub const fn required_documents(self) -> &'static [&'static str] {
        match self {
            UpdateType::NameChange => &["Gazette Notification", "Identity Proof"],
            UpdateType::AddressChange => &["Address Proof (Electricity Bill/Rent Agreement)"],
            UpdateType::PhoneChange | UpdateType::EmailChange => &[],
            UpdateType::MaritalStatus => &["Marriage Certificate"],
            UpdateType::PhotoUpdate | UpdateType::BiometricUpdate => &["Identity Proof"],
            UpdateType::Other => &["Supporting Document"],
        }
    }

    /// Profile field overwritten when the change is approved without review.
    pub const fn auto_approval_field(self) -> Option<ProfileField> {
        match self {
            UpdateType::NameChange => Some(ProfileField::Name),
            UpdateType::AddressChange => Some(ProfileField::Address),
            UpdateType::PhoneChange => Some(ProfileField::Phone),
            _ => None,
        }
    }

    /// Profile field overwritten when an officer approves the change.
    pub const fn officer_approval_field(self) -> Option<ProfileField> {
        match self {
            UpdateType::MaritalStatus => Some(ProfileField::MaritalStatus),
            other => other.auto_approval_field(),
        }
    }
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Metadata for uploaded proof attached to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    pub name: String,
    pub document_type: String,
    pub storage_key: String,
}

/// Citizen provided payload, prior to intake validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSubmission {
    pub subject_id: SubjectId,
    pub update_type: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub old_value: String,
    pub new_value: String,
    #[serde(default)]
    pub documents: Vec<DocumentDescriptor>,
}

/// Lifecycle of an update request. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    Pending,
    Duplicate,
    Processing,
    AutoApproved,
    Approved,
    Rejected,
}

impl UpdateStatus {
    pub const fn label(self) -> &'static str {
        match self {
            UpdateStatus::Pending => "pending",
            UpdateStatus::Duplicate => "duplicate",
            UpdateStatus::Processing => "processing",
            UpdateStatus::AutoApproved => "auto_approved",
            UpdateStatus::Approved => "approved",
            UpdateStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            UpdateStatus::Duplicate
                | UpdateStatus::AutoApproved
                | UpdateStatus::Approved
                | UpdateStatus::Rejected
        )
    }

    pub const fn can_transition_to(self, next: UpdateStatus) -> bool {
        matches!(
            (self, next),
            (
                UpdateStatus::Pending,
                UpdateStatus::Duplicate | UpdateStatus::AutoApproved | UpdateStatus::Processing
            ) | (
                UpdateStatus::Processing,
                UpdateStatus::Approved | UpdateStatus::Rejected
            )
        )
    }
}

impl std::fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot move request from {from} to {to}")]
pub struct TransitionError {
    pub from: UpdateStatus,
    pub to: UpdateStatus,
}

/// Recognised life events inferred from request content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeEventKind {
    Marriage,
    Relocation,
    NameChange,
    Other,
}

impl LifeEventKind {
    pub const fn label(self) -> &'static str {
        match self {
            LifeEventKind::Marriage => "marriage",
            LifeEventKind::Relocation => "relocation",
            LifeEventKind::NameChange => "name_change",
            LifeEventKind::Other => "other",
        }
    }
}

/// Classifier output describing whether a request reflects a life event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifeEvent {
    pub is_life_event: bool,
    pub kind: LifeEventKind,
    pub confidence: f64,
}

impl LifeEvent {
    pub const fn none() -> Self {
        Self {
            is_life_event: false,
            kind: LifeEventKind::Other,
            confidence: 0.0,
        }
    }
}

/// A single citizen-submitted change and everything adjudication learned about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub request_id: RequestId,
    pub subject_id: SubjectId,
    pub update_type: UpdateType,
    pub sub_type: Option<String>,
    pub old_value: String,
    pub new_value: String,
    pub documents: Vec<DocumentDescriptor>,
    pub submitted_at: DateTime<Utc>,
    pub status: UpdateStatus,
    pub risk_score: f64,
    pub is_duplicate: bool,
    pub duplicate_confidence: f64,
    pub is_life_event: bool,
    pub life_event_type: LifeEventKind,
    pub life_event_confidence: f64,
    pub auto_approved: bool,
    pub assigned_center: Option<CenterId>,
    pub assigned_officer: Option<OfficerId>,
    pub reviewed_by: Option<OfficerId>,
    pub rejection_reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl UpdateRequest {
    /// Fresh `pending` request with no adjudication signals recorded yet.
    pub fn new(
        request_id: RequestId,
        subject_id: SubjectId,
        update_type: UpdateType,
        new_value: impl Into<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id,
            subject_id,
            update_type,
            sub_type: None,
            old_value: String::new(),
            new_value: new_value.into(),
            documents: Vec::new(),
            submitted_at,
            status: UpdateStatus::Pending,
            risk_score: 0.0,
            is_duplicate: false,
            duplicate_confidence: 0.0,
            is_life_event: false,
            life_event_type: LifeEventKind::Other,
            life_event_confidence: 0.0,
            auto_approved: false,
            assigned_center: None,
            assigned_officer: None,
            reviewed_by: None,
            rejection_reason: None,
            processed_at: None,
            completed_at: None,
        }
    }

    pub fn has_documents(&self) -> bool {
        !self.documents.is_empty()
    }

    pub fn life_event(&self) -> LifeEvent {
        LifeEvent {
            is_life_event: self.is_life_event,
            kind: self.life_event_type,
            confidence: self.life_event_confidence,
        }
    }

    /// Move the request forward, stamping completion times on entry into a terminal state.
    pub fn transition(
        &mut self,
        next: UpdateStatus,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        if next.is_terminal() {
            self.processed_at.get_or_insert(at);
            self.completed_at.get_or_insert(at);
        }
        Ok(())
    }
}

/// Profile attributes that approvals are wired to overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Address,
    Phone,
    MaritalStatus,
}

/// Requester's current registry record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectProfile {
    pub subject_id: SubjectId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl SubjectProfile {
    pub fn field(&self, field: ProfileField) -> Option<&str> {
        match field {
            ProfileField::Name => Some(self.name.as_str()),
            ProfileField::Address => self.address.as_deref(),
            ProfileField::Phone => self.phone.as_deref(),
            ProfileField::MaritalStatus => self.marital_status.as_deref(),
        }
    }

    pub fn set_field(&mut self, field: ProfileField, value: Option<String>) {
        match field {
            ProfileField::Name => self.name = value.unwrap_or_default(),
            ProfileField::Address => self.address = value,
            ProfileField::Phone => self.phone = value,
            ProfileField::MaritalStatus => self.marital_status = value,
        }
    }

    /// Completed years of age on `today`; `None` when the birth date is unknown.
    pub fn age_on(&self, today: NaiveDate) -> Result<Option<u32>, ProfileError> {
        let Some(dob) = self.date_of_birth else {
            return Ok(None);
        };
        if dob > today {
            return Err(ProfileError::BirthDateInFuture(dob));
        }

        let mut years = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            years -= 1;
        }
        Ok(Some(years as u32))
    }
}

/// Raised when a subject record cannot feed risk scoring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("date of birth {0} lies in the future")]
    BirthDateInFuture(NaiveDate),
}

/// Profile mutation requested by an approval, with the value it replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub field: ProfileField,
    pub value: Option<String>,
    pub previous: Option<String>,
}

impl FieldUpdate {
    pub fn for_subject(subject: &SubjectProfile, field: ProfileField, value: &str) -> Self {
        Self {
            field,
            value: Some(value.to_string()),
            previous: subject.field(field).map(str::to_string),
        }
    }

    /// Inverse update used to compensate when the surrounding unit of work fails.
    pub fn reverted(&self) -> Self {
        Self {
            field: self.field,
            value: self.previous.clone(),
            previous: self.value.clone(),
        }
    }
}

/// A processing center that receives requests needing manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingCenter {
    pub center_id: CenterId,
    pub name: String,
    pub location: Option<String>,
    pub capacity: u32,
    pub current_load: u32,
    pub active: bool,
}

impl ProcessingCenter {
    pub fn has_capacity(&self) -> bool {
        self.active && self.current_load < self.capacity
    }
}

/// Reviewing officer affiliated with a single processing center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Officer {
    pub officer_id: OfficerId,
    pub name: String,
    pub processing_center: CenterId,
    pub current_workload: u32,
    pub max_workload: u32,
    pub active: bool,
    pub total_processed: u32,
}

impl Officer {
    pub fn is_eligible(&self) -> bool {
        self.active && self.current_workload < self.max_workload
    }
}
