pub mod balance;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::approval::records::require_positive;
use crate::approval::{Approvable, Approval};
use crate::decimal::{Money, Rate};
use crate::errors::{Result, SaccoError};
use crate::types::{AccountId, AccountTypeId, MemberId, Period, RecordId, RecordKind, TransactionType};

pub use balance::{reconstruct_balance, Movement};

/// savings product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountType {
    pub id: AccountTypeId,
    pub name: String,
    pub annual_rate: Rate,
}

/// member savings account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingAccount {
    pub id: AccountId,
    pub account_number: String,
    pub member_id: MemberId,
    pub account_type_id: AccountTypeId,
    pub initial_balance: Money,
    /// initial balance plus approved savings
    pub balance: Money,
    pub opened_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl SavingAccount {
    /// the initial balance, as a deposit made on the opening day
    pub fn opening_movement(&self) -> Movement {
        Movement::deposit(self.opened_on, self.initial_balance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSavingAccount {
    pub member_id: MemberId,
    pub account_type_id: AccountTypeId,
    pub initial_balance: Money,
    pub opened_on: NaiveDate,
}

impl NewSavingAccount {
    pub fn validate(&self) -> Result<()> {
        if self.initial_balance.is_negative() {
            return Err(SaccoError::InvalidAmount {
                amount: self.initial_balance,
            });
        }
        Ok(())
    }
}

/// savings transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Saving {
    pub id: RecordId,
    pub account_id: AccountId,
    pub member_id: MemberId,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub date: NaiveDate,
    pub notes: Option<String>,
    /// set on deposits generated by the interest run
    pub interest_period: Option<Period>,
    pub approval: Approval,
    pub created_at: DateTime<Utc>,
}

impl Saving {
    pub fn movement(&self) -> Movement {
        Movement {
            date: self.date,
            transaction_type: self.transaction_type,
            amount: self.amount,
        }
    }

    pub fn signed_amount(&self) -> Money {
        self.transaction_type.signed(self.amount)
    }

    pub fn has_note(&self, note: &str) -> bool {
        self.notes.as_deref() == Some(note)
    }
}

impl Approvable for Saving {
    const KIND: RecordKind = RecordKind::Saving;

    fn id(&self) -> RecordId {
        self.id
    }

    fn member_id(&self) -> MemberId {
        self.member_id
    }

    fn amount(&self) -> Money {
        self.amount
    }

    fn approval(&self) -> &Approval {
        &self.approval
    }

    fn approval_mut(&mut self) -> &mut Approval {
        &mut self.approval
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSaving {
    pub account_id: AccountId,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

impl NewSaving {
    pub fn deposit(account_id: AccountId, amount: Money, date: NaiveDate) -> Self {
        Self {
            account_id,
            transaction_type: TransactionType::Deposit,
            amount,
            date,
            notes: None,
        }
    }

    pub fn withdrawal(account_id: AccountId, amount: Money, date: NaiveDate) -> Self {
        Self {
            account_id,
            transaction_type: TransactionType::Withdrawal,
            amount,
            date,
            notes: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_positive(self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SavingEdit {
    pub transaction_type: Option<TransactionType>,
    pub amount: Option<Money>,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl SavingEdit {
    pub fn apply(&self, saving: &mut Saving) -> Result<()> {
        if let Some(amount) = self.amount {
            require_positive(amount)?;
            saving.amount = amount;
        }
        if let Some(transaction_type) = self.transaction_type {
            saving.transaction_type = transaction_type;
        }
        if let Some(date) = self.date {
            saving.date = date;
        }
        if let Some(notes) = &self.notes {
            saving.notes = Some(notes.clone());
        }
        Ok(())
    }
}
