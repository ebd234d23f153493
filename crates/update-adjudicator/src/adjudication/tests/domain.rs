use super::common::*;
use crate::adjudication::domain::{
    ProfileError, ProfileField, UpdateStatus, UpdateType,
};
use chrono::{Duration, NaiveDate};

#[test]
fn only_forward_transitions_are_permitted() {
    use UpdateStatus::*;

    for next in [Duplicate, AutoApproved, Processing] {
        assert!(Pending.can_transition_to(next), "pending -> {next}");
    }
    for next in [Approved, Rejected] {
        assert!(Processing.can_transition_to(next), "processing -> {next}");
    }
    for terminal in [Duplicate, AutoApproved, Approved, Rejected] {
        assert!(terminal.is_terminal());
        for next in [Pending, Duplicate, Processing, AutoApproved, Approved, Rejected] {
            assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
        }
    }
    assert!(!Pending.can_transition_to(Approved));
    assert!(!Processing.can_transition_to(Pending));
}

#[test]
fn illegal_transition_leaves_request_untouched() {
    let mut candidate = request("REQ-1", UpdateType::PhoneChange, "9000000000", true);

    let err = candidate
        .transition(UpdateStatus::Approved, now())
        .expect_err("pending cannot jump to approved");

    assert_eq!(err.from, UpdateStatus::Pending);
    assert_eq!(err.to, UpdateStatus::Approved);
    assert_eq!(candidate.status, UpdateStatus::Pending);
    assert_eq!(candidate.completed_at, None);
}

#[test]
fn terminal_entry_stamps_completion_once() {
    let mut candidate = request("REQ-1", UpdateType::PhoneChange, "9000000000", true);
    let routed_at = now();
    let decided_at = now() + Duration::hours(6);

    candidate
        .transition(UpdateStatus::Processing, routed_at)
        .expect("pending -> processing");
    assert_eq!(candidate.processed_at, None);

    candidate
        .transition(UpdateStatus::Rejected, decided_at)
        .expect("processing -> rejected");
    assert_eq!(candidate.processed_at, Some(decided_at));
    assert_eq!(candidate.completed_at, Some(decided_at));
}

#[test]
fn age_counts_completed_years() {
    let mut profile = subject(SUBJECT, None);
    profile.date_of_birth = NaiveDate::from_ymd_opt(1990, 5, 15);

    let before_birthday = NaiveDate::from_ymd_opt(2026, 5, 14).expect("valid date");
    let on_birthday = NaiveDate::from_ymd_opt(2026, 5, 15).expect("valid date");

    assert_eq!(profile.age_on(before_birthday), Ok(Some(35)));
    assert_eq!(profile.age_on(on_birthday), Ok(Some(36)));
}

#[test]
fn future_birth_date_is_an_error() {
    let mut profile = subject(SUBJECT, None);
    let today = now().date_naive();
    let tomorrow = today + Duration::days(1);
    profile.date_of_birth = Some(tomorrow);

    assert_eq!(
        profile.age_on(today),
        Err(ProfileError::BirthDateInFuture(tomorrow))
    );
    assert_eq!(subject(SUBJECT, None).age_on(today), Ok(None));
}

#[test]
fn approval_field_mapping_differs_for_officers() {
    assert_eq!(
        UpdateType::AddressChange.auto_approval_field(),
        Some(ProfileField::Address)
    );
    assert_eq!(UpdateType::MaritalStatus.auto_approval_field(), None);
    assert_eq!(
        UpdateType::MaritalStatus.officer_approval_field(),
        Some(ProfileField::MaritalStatus)
    );
    assert_eq!(UpdateType::EmailChange.officer_approval_field(), None);
}

#[test]
fn reverted_field_update_restores_previous_value() {
    let mut profile = subject(SUBJECT, Some(30));
    let update = crate::adjudication::domain::FieldUpdate::for_subject(
        &profile,
        ProfileField::Phone,
        "9000000000",
    );

    profile.set_field(update.field, update.value.clone());
    assert_eq!(profile.phone.as_deref(), Some("9000000000"));

    let undo = update.reverted();
    profile.set_field(undo.field, undo.value.clone());
    assert_eq!(profile.phone.as_deref(), Some("9876543210"));
}

#[test]
fn update_type_parsing_is_case_and_whitespace_tolerant() {
    assert_eq!(UpdateType::parse(" PHONE_CHANGE "), Some(UpdateType::PhoneChange));
    assert_eq!(UpdateType::parse("phone"), None);
    assert_eq!(UpdateType::ALL.len(), 8);
}
