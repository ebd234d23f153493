//! Duplicate and life-event detection.
//!
//! Both detectors are deterministic rule engines. A learned classifier can be
//! layered over duplicate detection through [`LearnedDetector`], which always
//! degrades to the rule path when the classifier misbehaves.

mod life_event;

pub use life_event::LifeEventClassifier;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{UpdateRequest, UpdateType};

/// Which detector produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    RuleBased,
    LearnedModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DuplicateVerdict {
    pub is_duplicate: bool,
    pub confidence: f64,
    pub method: DetectionMethod,
}

impl DuplicateVerdict {
    const fn rule_based(is_duplicate: bool) -> Self {
        Self {
            is_duplicate,
            confidence: if is_duplicate { 1.0 } else { 0.0 },
            method: DetectionMethod::RuleBased,
        }
    }
}

/// Decides whether a candidate repeats a recent submission for the same identity.
///
/// Implementations compare only what they are given; the caller owns the
/// look-back window.
pub trait DuplicateDetector: Send + Sync {
    fn detect(&self, candidate: &UpdateRequest, recent: &[UpdateRequest]) -> DuplicateVerdict;
}

/// Exact-match policy: same subject, same update type, identical new value.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedDetector;

impl DuplicateDetector for RuleBasedDetector {
    fn detect(&self, candidate: &UpdateRequest, recent: &[UpdateRequest]) -> DuplicateVerdict {
        let matched = recent.iter().any(|existing| {
            existing.subject_id == candidate.subject_id
                && existing.update_type == candidate.update_type
                && existing.new_value == candidate.new_value
        });
        DuplicateVerdict::rule_based(matched)
    }
}

/// Feature projection handed to a learned duplicate classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateFeatures {
    pub new_value_len: usize,
    pub is_address_change: bool,
    pub subject_id_len: usize,
    pub recent_same_type: usize,
}

impl DuplicateFeatures {
    pub fn project(candidate: &UpdateRequest, recent: &[UpdateRequest]) -> Self {
        Self {
            new_value_len: candidate.new_value.chars().count(),
            is_address_change: candidate.update_type == UpdateType::AddressChange,
            subject_id_len: candidate.subject_id.0.len(),
            recent_same_type: recent
                .iter()
                .filter(|existing| existing.update_type == candidate.update_type)
                .count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierPrediction {
    pub is_duplicate: bool,
    pub confidence: f64,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    #[error("classifier rejected features: {0}")]
    InvalidFeatures(String),
}

/// Hook for a trained duplicate model. Training one is out of scope.
pub trait DuplicateClassifier: Send + Sync {
    fn predict(&self, features: &DuplicateFeatures) -> Result<ClassifierPrediction, ClassifierError>;
}

/// Consults a classifier first and falls back to [`RuleBasedDetector`] on any failure.
pub struct LearnedDetector<C> {
    classifier: C,
    fallback: RuleBasedDetector,
}

impl<C: DuplicateClassifier> LearnedDetector<C> {
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            fallback: RuleBasedDetector,
        }
    }
}

impl<C: DuplicateClassifier> DuplicateDetector for LearnedDetector<C> {
    fn detect(&self, candidate: &UpdateRequest, recent: &[UpdateRequest]) -> DuplicateVerdict {
        let features = DuplicateFeatures::project(candidate, recent);
        match self.classifier.predict(&features) {
            Ok(prediction)
                if prediction.confidence.is_finite()
                    && (0.0..=1.0).contains(&prediction.confidence) =>
            {
                DuplicateVerdict {
                    is_duplicate: prediction.is_duplicate,
                    confidence: prediction.confidence,
                    method: DetectionMethod::LearnedModel,
                }
            }
            Ok(prediction) => {
                warn!(
                    request_id = %candidate.request_id.0,
                    confidence = prediction.confidence,
                    "duplicate classifier returned out-of-range confidence; using rule path"
                );
                self.fallback.detect(candidate, recent)
            }
            Err(err) => {
                warn!(
                    request_id = %candidate.request_id.0,
                    error = %err,
                    "duplicate classifier failed; using rule path"
                );
                self.fallback.detect(candidate, recent)
            }
        }
    }
}
