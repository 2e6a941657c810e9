/// quick start - enroll a member, save, and approve
use sacco_rs::chrono::NaiveDate;
use sacco_rs::{Money, NewMember, NewSaving, NewSavingAccount, Principal, RecordRef, Sacco, SaccoConfig, SafeTimeProvider, TimeSource};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let time = SafeTimeProvider::new(TimeSource::System);
    let mut sacco = Sacco::new(SaccoConfig::default(), &time)?;
    let officer = Principal::officer("teller-01");

    // enroll and open an ordinary savings account
    let member = sacco.enroll_member(&officer, NewMember::named("Achieng Otieno"))?;
    let account_type_id = sacco
        .account_type_named("Ordinary savings")
        .map(|a| a.id)
        .ok_or("ordinary savings product missing")?;
    let account = sacco.open_account(
        &officer,
        NewSavingAccount {
            member_id: member.id,
            account_type_id,
            initial_balance: Money::from_major(500),
            opened_on: NaiveDate::from_ymd_opt(2024, 1, 2).ok_or("bad date")?,
        },
    )?;

    // the member deposits; an officer approves
    let caller = Principal::member("achieng", member.id);
    let deposit = sacco.submit_saving(
        &caller,
        NewSaving::deposit(account.id, Money::from_major(1_500), NaiveDate::from_ymd_opt(2024, 1, 15).ok_or("bad date")?),
    )?;
    sacco.approve(&officer, RecordRef::Saving(deposit.id))?;

    let member = sacco.member(&caller, member.id)?;
    println!("{} {} savings: {}", member.member_number, member.name, member.savings_balance);
    println!("{}", serde_json::to_string_pretty(&sacco.member_statement(&caller, member.id)?)?);

    Ok(())
}
