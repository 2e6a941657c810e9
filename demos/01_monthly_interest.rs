/// monthly interest - quote, post, and approve a month of interest
use sacco_rs::chrono::{Duration, NaiveDate, TimeZone, Utc};
use sacco_rs::{
    Money, NewMember, NewSaving, NewSavingAccount, Period, Principal, RecordRef, Sacco, SaccoConfig, SafeTimeProvider,
    TimeSource,
};

fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate, &'static str> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or("bad date")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let start = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).single().ok_or("bad time")?;
    let time = SafeTimeProvider::new(TimeSource::Test(start));
    let mut sacco = Sacco::new(SaccoConfig::default(), &time)?;
    let officer = Principal::officer("accounts");

    let account_type_id = sacco
        .account_type_named("Ordinary savings")
        .map(|a| a.id)
        .ok_or("ordinary savings product missing")?;

    for (name, amount, day) in [("Achieng", 3_000, 16), ("Baraka", 12_000, 1), ("Chebet", 0, 1)] {
        let member = sacco.enroll_member(&officer, NewMember::named(name))?;
        let account = sacco.open_account(
            &officer,
            NewSavingAccount {
                member_id: member.id,
                account_type_id,
                initial_balance: Money::ZERO,
                opened_on: date(2024, 4, 1)?,
            },
        )?;
        if amount > 0 {
            let deposit = sacco.submit_saving(&officer, NewSaving::deposit(account.id, Money::from_major(amount), date(2024, 4, day)?))?;
            sacco.approve(&officer, RecordRef::Saving(deposit.id))?;
        }
    }

    let april = Period::new(2024, 4)?;
    for quote in sacco.quote_interest(&officer, april)? {
        println!(
            "{} avg {} -> {} ({:?})",
            quote.account_number, quote.calculation.average_daily_balance, quote.calculation.interest, quote.outcome
        );
    }

    // move the clock past the month end and post
    let controller = time.test_control().unwrap();
    controller.advance(Duration::days(30));
    let posted = sacco.post_interest(&officer, april)?;
    let refs: Vec<RecordRef> = posted.iter().map(|s| RecordRef::Saving(s.id)).collect();
    sacco.bulk_approve(&officer, &refs)?;

    // a second run for the same month posts nothing
    let again = sacco.post_interest(&officer, april)?;
    println!("posted {} interest deposits, rerun posted {}", posted.len(), again.len());

    Ok(())
}
