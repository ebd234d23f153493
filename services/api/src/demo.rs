use crate::infra::{InMemoryBackend, InMemoryUpdateService};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use update_adjudicator::adjudication::{
    risk_level, DecisionResult, DocumentDescriptor, OfficerDecision, OfficerId, RequestId,
    ReviewAction, SubjectId, SubjectProfile, SubjectRegistry, UpdateServiceError, UpdateStatus,
    UpdateStatusView, UpdateSubmission,
};
use update_adjudicator::config::AdjudicationConfig;
use update_adjudicator::error::AppError;

const AMIT: &str = "123456789012";
const RIYA: &str = "234567890123";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Duplicate and frequency look-back in days (defaults to 30).
    #[arg(long)]
    pub(crate) window_days: Option<u32>,
    /// Stop before officers review the routed requests.
    #[arg(long)]
    pub(crate) skip_review: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        window_days,
        skip_review,
    } = args;

    let mut config = AdjudicationConfig::default();
    if let Some(days) = window_days.filter(|days| *days > 0) {
        config.window_days = days;
    }

    let backend = InMemoryBackend::sample();
    let service = backend.service(config.clone());
    let now = Utc::now();

    println!(
        "Demographic update adjudication demo ({} day look-back)",
        config.window_days
    );

    println!("\nIncoming submissions");
    let relocation = submit(
        &service,
        "Documented relocation",
        submission(AMIT, "address_change", "Flat 12, Koregaon Park, Pune", true),
        now,
    )?;
    submit(
        &service,
        "Same relocation submitted again",
        submission(AMIT, "address_change", "Flat 12, Koregaon Park, Pune", true),
        now + Duration::minutes(2),
    )?;
    let biometric = submit(
        &service,
        "Minor's biometric refresh without documents",
        submission(RIYA, "biometric_update", "fingerprint refresh", false),
        now + Duration::minutes(3),
    )?;
    let correction = submit(
        &service,
        "Name correction with gazette notification",
        submission(AMIT, "name_change", "Amit Kumar Patel", true),
        now + Duration::minutes(4),
    )?;

    if let Some(profile) = lookup(&backend, &relocation.subject_id)? {
        println!(
            "  Registry address for {} is now: {}",
            profile.subject_id.0,
            profile.address.as_deref().unwrap_or("-")
        );
    }

    println!("\nCenter maintenance window");
    let centers = backend.pool.centers();
    for center in &centers {
        backend.pool.set_center_active(&center.center_id, false);
    }
    submit(
        &service,
        "Photograph update while every center is offline",
        submission(RIYA, "photo_update", "new photograph", false),
        now + Duration::minutes(5),
    )?;
    for center in &centers {
        backend.pool.set_center_active(&center.center_id, true);
    }
    let summary = service.assign_pending(now + Duration::minutes(30))?;
    println!(
        "- Re-assignment sweep: {} examined | {} assigned | {} still pending",
        summary.examined, summary.assigned, summary.still_pending
    );

    println!("\nOfficer review queue");
    for request in service.review_queue(10)? {
        println!(
            "- {} {} | risk {:.2} ({}) | {} | officer {}",
            request.request_id.0,
            request.update_type.display_name(),
            request.risk_score,
            risk_level(request.risk_score),
            request.status,
            request
                .assigned_officer
                .as_ref()
                .map(|officer| officer.0.as_str())
                .unwrap_or("-")
        );
    }

    if skip_review {
        return Ok(());
    }

    println!("\nOfficer decisions");
    let reviewed_at = now + Duration::hours(3);
    if let Some(officer_id) = correction.assigned_officer.clone() {
        let approved = service.review(
            OfficerDecision {
                request_id: correction.request_id.clone(),
                officer_id,
                action: ReviewAction::Approve,
                reason: None,
            },
            reviewed_at,
        )?;
        println!("- {} -> {}", approved.request_id.0, approved.status);
        if let Some(profile) = lookup(&backend, &SubjectId(AMIT.to_string()))? {
            println!("  Registry name is now: {}", profile.name);
        }
    }
    if let Some(officer_id) = biometric.assigned_officer.clone() {
        let rejected = service.review(
            OfficerDecision {
                request_id: biometric.request_id.clone(),
                officer_id,
                action: ReviewAction::Reject,
                reason: Some("guardian consent form missing".to_string()),
            },
            reviewed_at,
        )?;
        println!(
            "- {} -> {} ({})",
            rejected.request_id.0,
            rejected.status,
            rejected.rejection_reason.as_deref().unwrap_or("no reason given")
        );
    }

    println!("\nWorkload after review");
    for center in backend.pool.centers() {
        println!(
            "- {} ({}): load {}/{}",
            center.name, center.center_id.0, center.current_load, center.capacity
        );
    }
    for officer in backend.pool.officers() {
        println!(
            "- {} ({}): {} open | {} processed",
            officer.name, officer.officer_id.0, officer.current_workload, officer.total_processed
        );
    }

    let final_view = UpdateStatusView::from_request(&service.get(&correction.request_id)?);
    match serde_json::to_string_pretty(&final_view) {
        Ok(json) => println!("\nPublic status payload:\n{}", json),
        Err(err) => println!("\nPublic status payload unavailable: {}", err),
    }

    println!("Audit entries recorded: {}", backend.audit.events().len());
    Ok(())
}

fn lookup(backend: &InMemoryBackend, subject: &SubjectId) -> Result<Option<SubjectProfile>, AppError> {
    let profile = backend
        .registry
        .find_subject(subject)
        .map_err(UpdateServiceError::from)?;
    Ok(profile)
}

struct Submitted {
    request_id: RequestId,
    subject_id: SubjectId,
    assigned_officer: Option<OfficerId>,
}

fn submit(
    service: &InMemoryUpdateService,
    label: &str,
    submission: UpdateSubmission,
    at: DateTime<Utc>,
) -> Result<Submitted, AppError> {
    let subject_id = submission.subject_id.clone();
    let decision: DecisionResult = service.submit(submission, at)?;
    println!(
        "- {label}: {} -> {} (risk {:.2}, {})",
        decision.request_id.0,
        decision.status,
        decision.risk_score,
        risk_level(decision.risk_score)
    );
    if decision.is_life_event {
        println!(
            "  Life event: {} ({:.2})",
            decision.life_event_type.label(),
            decision.life_event_confidence
        );
    }
    match (&decision.status, &decision.assigned_center, &decision.assigned_officer) {
        (UpdateStatus::Processing, Some(center), Some(officer)) => {
            println!("  Routed to {} / {}", center.0, officer.0)
        }
        (UpdateStatus::Pending, _, _) => println!("  Awaiting capacity; left pending"),
        _ => {}
    }

    Ok(Submitted {
        request_id: decision.request_id,
        subject_id,
        assigned_officer: decision.assigned_officer,
    })
}

fn submission(subject: &str, update_type: &str, new_value: &str, with_documents: bool) -> UpdateSubmission {
    UpdateSubmission {
        subject_id: SubjectId(subject.to_string()),
        update_type: update_type.to_string(),
        sub_type: None,
        old_value: String::new(),
        new_value: new_value.to_string(),
        documents: if with_documents {
            vec![DocumentDescriptor {
                name: "Supporting proof".to_string(),
                document_type: update_type.to_string(),
                storage_key: format!("uploads/{subject}/{update_type}.pdf"),
            }]
        } else {
            Vec::new()
        },
    }
}
