pub mod repayment;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LoanTerms;
use crate::decimal::{Money, Rate};
use crate::errors::{Result, SaccoError};
use crate::types::{LoanId, LoanTypeId, MemberId, RecordId};

pub use repayment::{allocate_repayment, monthly_interest_due, RepaymentAllocation};

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// applied, awaiting approval
    Pending,
    /// disbursed and performing
    Active,
    /// past the grace period without payment
    Overdue,
    /// remaining balance reached zero
    PaidOff,
    /// application refused
    Rejected,
}

impl LoanStatus {
    pub fn can_transition_to(&self, to: LoanStatus) -> bool {
        matches!(
            (self, to),
            (LoanStatus::Pending, LoanStatus::Active)
                | (LoanStatus::Pending, LoanStatus::Rejected)
                | (LoanStatus::Active, LoanStatus::Overdue)
                | (LoanStatus::Active, LoanStatus::PaidOff)
                | (LoanStatus::Overdue, LoanStatus::Active)
                | (LoanStatus::Overdue, LoanStatus::PaidOff)
        )
    }

    pub fn accepts_repayment(&self) -> bool {
        matches!(self, LoanStatus::Active | LoanStatus::Overdue)
    }

    /// counts against the concurrent-loan rule
    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Pending | LoanStatus::Active | LoanStatus::Overdue)
    }
}

/// loan product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanType {
    pub id: LoanTypeId,
    pub name: String,
    pub annual_rate: Rate,
    pub npl_rate: Option<Rate>,
    pub grace_period_days: u32,
    pub maximum_amount: Option<Money>,
    pub allow_concurrent: bool,
}

impl LoanType {
    pub fn from_terms(id: LoanTypeId, terms: LoanTerms) -> Self {
        Self {
            id,
            name: terms.name,
            annual_rate: terms.annual_rate,
            npl_rate: terms.npl_rate,
            grace_period_days: terms.grace_period_days,
            maximum_amount: terms.maximum_amount,
            allow_concurrent: terms.allow_concurrent,
        }
    }

    pub fn check_amount(&self, requested: Money) -> Result<()> {
        if !requested.is_positive() {
            return Err(SaccoError::InvalidAmount { amount: requested });
        }
        if let Some(maximum) = self.maximum_amount {
            if requested > maximum {
                return Err(SaccoError::LoanAmountExceedsMaximum { maximum, requested });
            }
        }
        Ok(())
    }
}

/// member loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub member_id: MemberId,
    pub loan_type_id: LoanTypeId,
    pub principal: Money,
    pub remaining_balance: Money,
    /// rates copied from the loan type when the loan is applied for
    pub interest_rate: Rate,
    pub npl_rate: Option<Rate>,
    pub grace_period_days: u32,
    pub status: LoanStatus,
    pub purpose: Option<String>,
    pub applied_on: NaiveDate,
    pub disbursed_on: Option<NaiveDate>,
    pub last_payment_on: Option<NaiveDate>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_status_change: DateTime<Utc>,
}

impl Loan {
    pub fn from_application(id: LoanId, application: &LoanApplication, loan_type: &LoanType, now: DateTime<Utc>) -> Self {
        Self {
            id,
            member_id: application.member_id,
            loan_type_id: loan_type.id,
            principal: application.principal,
            remaining_balance: application.principal,
            interest_rate: loan_type.annual_rate,
            npl_rate: loan_type.npl_rate,
            grace_period_days: loan_type.grace_period_days,
            status: LoanStatus::Pending,
            purpose: application.purpose.clone(),
            applied_on: application.applied_on,
            disbursed_on: None,
            last_payment_on: None,
            rejection_reason: None,
            created_at: now,
            last_status_change: now,
        }
    }

    /// rate charged on the next repayment; overdue loans switch to the npl rate
    pub fn effective_rate(&self) -> Rate {
        match (self.status, self.npl_rate) {
            (LoanStatus::Overdue, Some(npl)) => npl,
            _ => self.interest_rate,
        }
    }

    /// move to `to`, returning the previous status
    pub fn transition(&mut self, to: LoanStatus, now: DateTime<Utc>) -> Result<LoanStatus> {
        if !self.status.can_transition_to(to) {
            return Err(SaccoError::InvalidLoanTransition { from: self.status, to });
        }
        let old = self.status;
        self.status = to;
        self.last_status_change = now;
        Ok(old)
    }

    /// last day the loan can go without a payment before it is overdue
    pub fn grace_deadline(&self) -> Option<NaiveDate> {
        self.last_payment_on
            .or(self.disbursed_on)
            .map(|since| since + Duration::days(self.grace_period_days as i64))
    }

    /// an active loan past its grace deadline
    pub fn is_past_grace(&self, today: NaiveDate) -> bool {
        self.status == LoanStatus::Active && self.grace_deadline().map_or(false, |deadline| today > deadline)
    }
}

/// loan application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub member_id: MemberId,
    pub loan_type_id: LoanTypeId,
    pub principal: Money,
    pub applied_on: NaiveDate,
    pub purpose: Option<String>,
}

/// recorded repayment, immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRepayment {
    pub id: RecordId,
    pub loan_id: LoanId,
    pub member_id: MemberId,
    pub amount: Money,
    pub interest_paid: Money,
    pub principal_paid: Money,
    pub balance_after: Money,
    pub date: NaiveDate,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// repayment instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentRequest {
    pub loan_id: LoanId,
    pub amount: Money,
    pub date: NaiveDate,
    pub reference: Option<String>,
}
