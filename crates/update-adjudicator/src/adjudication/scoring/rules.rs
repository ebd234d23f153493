use super::super::domain::{LifeEvent, UpdateType};
use super::config::AdjudicationPolicy;

/// Failures that force the neutral fallback score.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub(crate) enum RiskInputError {
    #[error(transparent)]
    Profile(#[from] super::super::domain::ProfileError),
    #[error("life event confidence {0} is not a finite number")]
    NonFiniteConfidence(f64),
}

pub(crate) fn age_factor(age: u32) -> f64 {
    if age < 18 {
        0.6
    } else if age > 60 {
        0.2
    } else {
        0.1
    }
}

pub(crate) fn update_type_factor(update_type: UpdateType) -> f64 {
    match update_type {
        UpdateType::NameChange => 0.6,
        UpdateType::AddressChange => 0.3,
        UpdateType::PhoneChange | UpdateType::EmailChange => 0.2,
        UpdateType::MaritalStatus => 0.5,
        UpdateType::PhotoUpdate => 0.4,
        UpdateType::BiometricUpdate => 0.7,
        UpdateType::Other => 0.4,
    }
}

pub(crate) fn document_factor(has_documents: bool) -> f64 {
    if has_documents {
        -0.2
    } else {
        0.4
    }
}

pub(crate) fn frequency_penalty(recent_submissions: usize, policy: &AdjudicationPolicy) -> f64 {
    if recent_submissions > policy.frequency_trigger {
        (recent_submissions as f64 * policy.frequency_step).min(policy.frequency_cap)
    } else {
        0.0
    }
}

/// Additive base, life-event dampening, frequency penalty, clamp, override, round.
///
/// Dampening runs before the frequency penalty so repeat submitters are not
/// softened by a life-event signal.
pub(crate) fn score(
    update_type: UpdateType,
    has_documents: bool,
    age: u32,
    life_event: &LifeEvent,
    recent_submissions: usize,
    policy: &AdjudicationPolicy,
) -> Result<f64, RiskInputError> {
    if !life_event.confidence.is_finite() {
        return Err(RiskInputError::NonFiniteConfidence(life_event.confidence));
    }

    let mut total =
        age_factor(age) + update_type_factor(update_type) + document_factor(has_documents);

    if life_event.is_life_event {
        total *= policy.life_event_dampening;
    }

    total += frequency_penalty(recent_submissions, policy);

    let mut risk = total.clamp(0.0, 1.0);
    if life_event.confidence > policy.high_confidence_threshold {
        risk *= policy.high_confidence_factor;
    }

    Ok(round_to_cents(risk))
}

pub(crate) fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
