use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate, CURRENCY_DP};
use crate::errors::{Result, SaccoError};
use crate::savings::{reconstruct_balance, Movement};
use crate::types::Period;

/// interest calculation result for one account and month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestCalculation {
    pub period: Period,
    pub opening_balance: Money,
    pub closing_balance: Money,
    pub average_daily_balance: Money,
    pub days: u32,
    pub annual_rate: Rate,
    pub monthly_rate: Rate,
    pub interest: Money,
}

impl InterestCalculation {
    /// zero or negative interest is never posted
    pub fn is_postable(&self) -> bool {
        self.interest.is_positive()
    }
}

/// Average-daily-balance interest for one calendar month.
///
/// `initial` is the account's opening balance and `movements` its approved
/// history. The balance entering the month excludes movements on the first
/// day; those are applied while walking the month, so each day's closing
/// balance includes that day's movements.
pub fn calculate_monthly_interest(
    initial: Money,
    movements: &[Movement],
    period: Period,
    annual_rate: Rate,
) -> Result<InterestCalculation> {
    if annual_rate.is_negative() {
        return Err(SaccoError::InvalidInterestRate { rate: annual_rate });
    }

    let start = period.start();
    let end = period.end();
    let days = period.days();
    let opening_balance = reconstruct_balance(initial, movements, start);

    // net movement per day inside the period
    let mut daily_net: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for movement in movements.iter().filter(|m| period.contains(m.date)) {
        *daily_net.entry(movement.date).or_insert(Decimal::ZERO) += movement.signed_amount().as_decimal();
    }

    let mut running = opening_balance.as_decimal();
    let mut accumulator = Decimal::ZERO;
    let mut day = start;
    while day <= end {
        if let Some(net) = daily_net.get(&day) {
            running += *net;
        }
        accumulator += running;
        day = day + Duration::days(1);
    }

    let average = accumulator / Decimal::from(days);
    let monthly_rate = annual_rate.monthly_rate();
    let interest = Money::from_decimal_half_up(average * monthly_rate.as_decimal(), CURRENCY_DP);

    tracing::debug!(
        period = %period,
        opening = %opening_balance,
        average = %average,
        interest = %interest,
        "average daily balance interest calculated"
    );

    Ok(InterestCalculation {
        period,
        opening_balance,
        closing_balance: Money::from_decimal(running),
        average_daily_balance: Money::from_decimal(average),
        days,
        annual_rate,
        monthly_rate,
        interest,
    })
}
