//! Demo driver for the circulation engine.
//!
//! Walks a scripted circulation day against an in-memory engine with a
//! pinned clock: checkouts, a hold queue, a late return that assesses a
//! fine and promotes the next hold, and both sweeps. Useful for smoke
//! testing and for eyeballing the event log a notifier would consume.

use chrono::{TimeZone, Utc};
use circulation_core_rs::{
    AccountState, CheckoutRequest, CirculationEngine, CreateHoldRequest, FixedClock,
    LoanConfiguration, MaterialCopy, MaterialRecord, MemberSnapshot, ReturnRequest,
};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "circulation-cli", about = "Scripted circulation day demo")]
struct Args {
    /// Days the borrower keeps the copy before returning it
    #[arg(long, default_value_t = 20)]
    days_out: i64,

    /// Daily fine in cents once the grace period passes
    #[arg(long, default_value_t = 150)]
    daily_fine_cents: i64,

    /// Print the full event log as JSON
    #[arg(long)]
    events: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("demo failed: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    ));
    let engine = CirculationEngine::with_clock(
        LoanConfiguration {
            daily_fine_cents: args.daily_fine_cents,
            ..Default::default()
        },
        clock.clone(),
    )?;

    for member in ["alice", "bob", "carol"] {
        engine.register_member(MemberSnapshot::new(
            member.to_string(),
            AccountState::Active,
        ));
    }
    engine.register_material(MaterialRecord::new("the-rust-book".to_string()));
    let copy = MaterialCopy::new("the-rust-book".to_string());
    let copy_id = copy.id().to_string();
    engine.register_copy(copy);

    // Alice takes the only copy out; Bob and Carol line up behind her
    let loan = engine.checkout(CheckoutRequest {
        member_id: "alice".to_string(),
        copy_id: copy_id.clone(),
        processed_by_id: "staff-1".to_string(),
        loan_date: None,
        notes: None,
    })?;
    println!(
        "alice borrowed copy {} of {}, due {}",
        copy_id,
        "the-rust-book",
        loan.due_date()
    );

    for member in ["bob", "carol"] {
        let hold = engine.create_hold(CreateHoldRequest {
            member_id: member.to_string(),
            material_id: "the-rust-book".to_string(),
            notes: None,
        })?;
        println!(
            "{} queued for the material at position {:?}",
            member,
            hold.queue_position()
        );
    }

    // Time passes; the overdue sweep flags the loan before it comes back
    clock.advance_days(args.days_out);
    let flagged = engine.update_overdue_loans();
    println!("overdue sweep flagged {} loan(s)", flagged.len());

    let returned = engine.return_loan(ReturnRequest {
        loan_id: loan.id().to_string(),
        return_date: None,
    })?;
    if let Some(return_date) = returned.return_date() {
        println!(
            "alice returned the copy on {} (due {})",
            return_date,
            returned.due_date()
        );
    }

    let stats = engine.member_stats("alice")?;
    println!(
        "alice now owes {} cents across {} fine(s); can_borrow = {}",
        stats.fines.unpaid_cents, stats.fines.fine_count, stats.can_borrow
    );

    // The freed copy went to Bob; a week of silence expires his window
    clock.advance_days(8);
    let expired = engine.expire_holds();
    println!(
        "expiration sweep lapsed {} hold(s); carol is next in line",
        expired.len()
    );

    if args.events {
        println!("{}", engine.export_events_json()?);
    }
    Ok(())
}
