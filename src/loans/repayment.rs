use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate, CURRENCY_DP};
use crate::errors::{Result, SaccoError};

/// how a single payment splits between interest and principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentAllocation {
    pub amount: Money,
    pub interest_due: Money,
    pub interest_paid: Money,
    pub principal_paid: Money,
    /// part of the principal payment beyond the remaining balance
    pub overpayment: Money,
    pub new_balance: Money,
    pub paid_off: bool,
}

/// one month of interest on the remaining balance, rounded half-up
pub fn monthly_interest_due(remaining_balance: Money, annual_rate: Rate) -> Money {
    let base = remaining_balance.max(Money::ZERO);
    Money::from_decimal_half_up(
        base.as_decimal() * annual_rate.monthly_rate().as_decimal(),
        CURRENCY_DP,
    )
}

/// Split `amount` into interest and principal.
///
/// Interest is paid first, capped at one month's interest on the remaining
/// balance; everything else reduces principal. `interest_paid +
/// principal_paid == amount` for every valid input. The new balance floors at
/// zero and anything beyond it is reported as `overpayment`.
pub fn allocate_repayment(remaining_balance: Money, annual_rate: Rate, amount: Money) -> Result<RepaymentAllocation> {
    if !amount.is_positive() {
        return Err(SaccoError::InvalidAmount { amount });
    }
    if annual_rate.is_negative() {
        return Err(SaccoError::InvalidInterestRate { rate: annual_rate });
    }

    let interest_due = monthly_interest_due(remaining_balance, annual_rate);
    let interest_paid = amount.min(interest_due);
    let principal_paid = amount - interest_paid;
    let raw_balance = remaining_balance - principal_paid;

    Ok(RepaymentAllocation {
        amount,
        interest_due,
        interest_paid,
        principal_paid,
        overpayment: (-raw_balance).max(Money::ZERO),
        new_balance: raw_balance.max(Money::ZERO),
        paid_off: !raw_balance.is_positive(),
    })
}
