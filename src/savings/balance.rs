use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::TransactionType;

/// one approved savings movement, as seen by the balance calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub date: NaiveDate,
    pub transaction_type: TransactionType,
    pub amount: Money,
}

impl Movement {
    pub fn deposit(date: NaiveDate, amount: Money) -> Self {
        Self {
            date,
            transaction_type: TransactionType::Deposit,
            amount,
        }
    }

    pub fn withdrawal(date: NaiveDate, amount: Money) -> Self {
        Self {
            date,
            transaction_type: TransactionType::Withdrawal,
            amount,
        }
    }

    pub fn signed_amount(&self) -> Money {
        self.transaction_type.signed(self.amount)
    }
}

/// Balance immediately before `as_of`.
///
/// Movements dated exactly on `as_of` are excluded; they belong to the
/// period that starts on that day.
pub fn reconstruct_balance(initial: Money, movements: &[Movement], as_of: NaiveDate) -> Money {
    movements
        .iter()
        .filter(|m| m.date < as_of)
        .fold(initial, |balance, m| balance + m.signed_amount())
}
