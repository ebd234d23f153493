use super::domain::{DocumentDescriptor, SubjectId, UpdateSubmission, UpdateType};

/// Validation errors raised before a submission enters adjudication.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("subject id is required")]
    MissingSubject,
    #[error("unknown update type {0:?}")]
    UnknownUpdateType(String),
    #[error("new value is required")]
    MissingNewValue,
    #[error("new value exceeds {max} characters (found {found})")]
    NewValueTooLong { max: usize, found: usize },
    #[error("{field} exceeds {max} characters (found {found})")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        found: usize,
    },
    #[error("document {0:?} has no storage reference")]
    UnreferencedDocument(String),
}

const DEFAULT_MAX_VALUE_CHARS: usize = 2048;

/// Submission after intake checks, ready to become an `UpdateRequest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub subject_id: SubjectId,
    pub update_type: UpdateType,
    pub sub_type: Option<String>,
    pub old_value: String,
    pub new_value: String,
    pub documents: Vec<DocumentDescriptor>,
}

/// Guard responsible for rejecting malformed submissions.
#[derive(Debug, Clone)]
pub struct IntakeGuard {
    max_value_chars: usize,
}

impl Default for IntakeGuard {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_VALUE_CHARS)
    }
}

impl IntakeGuard {
    pub fn with_limit(max_value_chars: usize) -> Self {
        let max_value_chars = if max_value_chars == 0 {
            DEFAULT_MAX_VALUE_CHARS
        } else {
            max_value_chars
        };
        Self { max_value_chars }
    }

    pub fn validate(
        &self,
        submission: UpdateSubmission,
    ) -> Result<ValidatedSubmission, ValidationError> {
        let subject_id = SubjectId(submission.subject_id.0.trim().to_string());
        if subject_id.0.is_empty() {
            return Err(ValidationError::MissingSubject);
        }

        let update_type = UpdateType::parse(&submission.update_type)
            .ok_or_else(|| ValidationError::UnknownUpdateType(submission.update_type.clone()))?;

        let new_value = submission.new_value;
        if new_value.trim().is_empty() {
            return Err(ValidationError::MissingNewValue);
        }
        let found = new_value.chars().count();
        if found > self.max_value_chars {
            return Err(ValidationError::NewValueTooLong {
                max: self.max_value_chars,
                found,
            });
        }

        self.check_length("old value", &submission.old_value)?;
        if let Some(sub_type) = &submission.sub_type {
            self.check_length("sub type", sub_type)?;
        }

        if let Some(document) = submission
            .documents
            .iter()
            .find(|document| document.storage_key.trim().is_empty())
        {
            return Err(ValidationError::UnreferencedDocument(document.name.clone()));
        }

        Ok(ValidatedSubmission {
            subject_id,
            update_type,
            sub_type: submission
                .sub_type
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            old_value: submission.old_value,
            new_value,
            documents: submission.documents,
        })
    }

    fn check_length(&self, field: &'static str, value: &str) -> Result<(), ValidationError> {
        let found = value.chars().count();
        if found > self.max_value_chars {
            return Err(ValidationError::FieldTooLong {
                field,
                max: self.max_value_chars,
                found,
            });
        }
        Ok(())
    }
}
