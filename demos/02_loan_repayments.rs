/// loan repayments - apply, disburse, repay, and watch the balance fall
use sacco_rs::chrono::{Duration, NaiveDate, TimeZone, Utc};
use sacco_rs::{LoanApplication, Money, NewMember, Principal, RepaymentRequest, Sacco, SaccoConfig, SafeTimeProvider, TimeSource};

fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate, &'static str> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or("bad date")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let start = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).single().ok_or("bad time")?;
    let time = SafeTimeProvider::new(TimeSource::Test(start));
    let mut sacco = Sacco::new(SaccoConfig::default(), &time)?;
    let officer = Principal::officer("loans-desk");

    let member = sacco.enroll_member(&officer, NewMember::named("Baraka Mwangi"))?;
    let loan_type_id = sacco.loan_type_named("Emergency").map(|l| l.id).ok_or("emergency product missing")?;

    let loan = sacco.apply_for_loan(
        &Principal::member("baraka", member.id),
        LoanApplication {
            member_id: member.id,
            loan_type_id,
            principal: Money::from_major(1_000),
            applied_on: date(2024, 1, 2)?,
            purpose: Some("hospital bill".to_string()),
        },
    )?;
    let loan = sacco.approve_loan(&officer, loan.id, date(2024, 1, 3)?)?;

    let requests: Vec<RepaymentRequest> = (2..=4)
        .map(|month| {
            Ok(RepaymentRequest {
                loan_id: loan.id,
                amount: Money::from_major(300),
                date: date(2024, month, 3)?,
                reference: Some(format!("MPESA-{:02}", month)),
            })
        })
        .collect::<Result<Vec<_>, &'static str>>()?;

    for outcome in sacco.record_repayments(&officer, &requests)? {
        println!(
            "{} interest {} principal {} balance {} ({:?})",
            outcome.repayment.date,
            outcome.repayment.interest_paid,
            outcome.repayment.principal_paid,
            outcome.repayment.balance_after,
            outcome.status
        );
    }

    // no payment for two months: the loan goes overdue and pays the npl rate
    let controller = time.test_control().unwrap();
    controller.advance(Duration::days(150));
    let flagged = sacco.refresh_overdue_loans(&officer)?;
    println!("overdue loans: {}", flagged.len());

    let outcome = sacco.record_repayment(
        &officer,
        RepaymentRequest {
            loan_id: loan.id,
            amount: Money::from_major(200),
            date: date(2024, 6, 1)?,
            reference: None,
        },
    )?;
    println!("final payment: {:?} overpaid {}", outcome.status, outcome.allocation.overpayment);

    Ok(())
}
