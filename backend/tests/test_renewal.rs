//! Tests for loan renewal

use chrono::{Duration, TimeZone, Utc};
use circulation_core_rs::{
    AccountState, CheckoutRequest, CirculationEngine, CirculationError, CopyStatus,
    CreateFineRequest, FixedClock, LoanConfiguration, MaterialCopy, MaterialRecord,
    MemberSnapshot,
};
use std::sync::Arc;

fn engine_with(config: LoanConfiguration) -> (CirculationEngine, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    ));
    let engine = CirculationEngine::with_clock(config, clock.clone()).unwrap();
    engine.register_member(MemberSnapshot::new("m1".to_string(), AccountState::Active));
    engine.register_material(MaterialRecord::new("mat-1".to_string()));
    (engine, clock)
}

fn checked_out_loan(engine: &CirculationEngine, material_id: &str) -> (String, String) {
    let copy = MaterialCopy::new(material_id.to_string());
    let copy_id = copy.id().to_string();
    engine.register_copy(copy);
    let loan = engine
        .checkout(CheckoutRequest {
            member_id: "m1".to_string(),
            copy_id: copy_id.clone(),
            processed_by_id: "staff-1".to_string(),
            loan_date: None,
            notes: None,
        })
        .unwrap();
    (loan.id().to_string(), copy_id)
}

#[test]
fn test_renewal_compounds_from_original_schedule() {
    let (engine, clock) = engine_with(LoanConfiguration::default());
    let (loan_id, _) = checked_out_loan(&engine, "mat-1");
    let original_due = engine.get_loan(&loan_id).unwrap().due_date();

    // Renew several days into the loan; the new due date still extends the
    // original schedule, not the renewal instant
    clock.advance_days(5);
    let renewed = engine.renew_loan(&loan_id).unwrap();

    assert_eq!(renewed.due_date(), original_due + Duration::days(14));
    assert_eq!(renewed.renewal_count(), 1);

    clock.advance_days(5);
    let renewed = engine.renew_loan(&loan_id).unwrap();
    assert_eq!(renewed.due_date(), original_due + Duration::days(28));
    assert_eq!(renewed.renewal_count(), 2);
}

#[test]
fn test_renewal_uses_material_override() {
    let (engine, _) = engine_with(LoanConfiguration::default());
    engine.register_material(MaterialRecord::new("mat-short".to_string()).with_loan_days(3));
    let (loan_id, _) = checked_out_loan(&engine, "mat-short");
    let original_due = engine.get_loan(&loan_id).unwrap().due_date();

    let renewed = engine.renew_loan(&loan_id).unwrap();

    assert_eq!(renewed.due_date(), original_due + Duration::days(3));
}

#[test]
fn test_renewal_cap_is_idempotent() {
    let (engine, _) = engine_with(LoanConfiguration {
        max_renewals: 2,
        ..Default::default()
    });
    let (loan_id, _) = checked_out_loan(&engine, "mat-1");

    engine.renew_loan(&loan_id).unwrap();
    engine.renew_loan(&loan_id).unwrap();

    // At the cap the loan never renews again, however far from due
    for _ in 0..3 {
        let result = engine.renew_loan(&loan_id);
        match result {
            Err(CirculationError::PolicyViolation { reasons }) => {
                assert_eq!(reasons, vec!["Maximum renewals reached (2)".to_string()]);
            }
            other => panic!("expected policy violation, got {:?}", other),
        }
    }
    assert_eq!(engine.get_loan(&loan_id).unwrap().renewal_count(), 2);
}

#[test]
fn test_overdue_loan_never_renews() {
    let (engine, clock) = engine_with(LoanConfiguration::default());
    let (loan_id, _) = checked_out_loan(&engine, "mat-1");

    clock.advance_days(20);
    engine.update_overdue_loans();

    let result = engine.renew_loan(&loan_id);
    match result {
        Err(CirculationError::PolicyViolation { reasons }) => {
            // Status and past-due reasons both reported
            assert_eq!(reasons.len(), 2);
        }
        other => panic!("expected policy violation, got {:?}", other),
    }
}

#[test]
fn test_renewal_past_due_date_without_sweep_is_blocked() {
    let (engine, clock) = engine_with(LoanConfiguration::default());
    let (loan_id, _) = checked_out_loan(&engine, "mat-1");

    // Past due, but the sweep has not flipped the status yet
    clock.advance_days(20);
    let result = engine.renew_loan(&loan_id);

    match result {
        Err(CirculationError::PolicyViolation { reasons }) => {
            assert_eq!(reasons, vec!["Loan is past its due date".to_string()]);
        }
        other => panic!("expected policy violation, got {:?}", other),
    }
}

#[test]
fn test_unpaid_fines_block_renewal_unless_allowed() {
    let (engine, _) = engine_with(LoanConfiguration::default());
    let (loan_id, _) = checked_out_loan(&engine, "mat-1");
    engine
        .create_fine(CreateFineRequest {
            loan_id: loan_id.clone(),
            issued_by_id: "staff-1".to_string(),
            amount_cents: 300,
            reason: "Damaged copy".to_string(),
        })
        .unwrap();

    assert!(matches!(
        engine.renew_loan(&loan_id),
        Err(CirculationError::PolicyViolation { .. })
    ));

    let update = circulation_core_rs::ConfigurationUpdate {
        allow_loans_with_fines: Some(true),
        ..Default::default()
    };
    engine.update_configuration(&update, "staff-1").unwrap();

    assert!(engine.renew_loan(&loan_id).is_ok());
}

#[test]
fn test_renewal_has_no_copy_or_queue_side_effects() {
    let (engine, _) = engine_with(LoanConfiguration::default());
    engine.register_member(MemberSnapshot::new("m2".to_string(), AccountState::Active));
    let (loan_id, copy_id) = checked_out_loan(&engine, "mat-1");

    engine
        .create_hold(circulation_core_rs::CreateHoldRequest {
            member_id: "m2".to_string(),
            material_id: "mat-1".to_string(),
            notes: None,
        })
        .unwrap();

    engine.renew_loan(&loan_id).unwrap();

    assert_eq!(
        engine.get_copy(&copy_id).unwrap().status(),
        CopyStatus::Borrowed
    );
    let queue = engine.hold_queue("mat-1");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].queue_position(), Some(1));
}

#[test]
fn test_renewal_of_returned_loan_is_blocked() {
    let (engine, _) = engine_with(LoanConfiguration::default());
    let (loan_id, _) = checked_out_loan(&engine, "mat-1");
    engine
        .return_loan(circulation_core_rs::ReturnRequest {
            loan_id: loan_id.clone(),
            return_date: None,
        })
        .unwrap();

    assert!(matches!(
        engine.renew_loan(&loan_id),
        Err(CirculationError::PolicyViolation { .. })
    ));
}
