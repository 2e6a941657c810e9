use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::approval::ApprovalStatus;
use crate::decimal::{Money, Rate};
use crate::loans::LoanStatus;
use crate::types::{AccountId, Period, RecordKind};

#[derive(Error, Debug)]
pub enum SaccoError {
    #[error("member not found: {id}")]
    MemberNotFound {
        id: Uuid,
    },

    #[error("savings account not found: {id}")]
    AccountNotFound {
        id: Uuid,
    },

    #[error("account type not found: {id}")]
    AccountTypeNotFound {
        id: Uuid,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: Uuid,
    },

    #[error("loan type not found: {id}")]
    LoanTypeNotFound {
        id: Uuid,
    },

    #[error("service charge not found: {id}")]
    ServiceChargeNotFound {
        id: Uuid,
    },

    #[error("{kind} not found: {id}")]
    RecordNotFound {
        kind: RecordKind,
        id: Uuid,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidInterestRate {
        rate: Rate,
    },

    #[error("invalid period: {message}")]
    InvalidPeriod {
        message: String,
    },

    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange {
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("invalid {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Money,
        requested: Money,
    },

    #[error("{kind} {id} is approved and can no longer be changed")]
    ApprovedRecordImmutable {
        kind: RecordKind,
        id: Uuid,
    },

    #[error("{kind} {id} was already {status}")]
    AlreadyDecided {
        kind: RecordKind,
        id: Uuid,
        status: ApprovalStatus,
    },

    #[error("member {id} is inactive")]
    MemberInactive {
        id: Uuid,
    },

    #[error("loan type {loan_type} does not allow concurrent loans")]
    ConcurrentLoanNotAllowed {
        loan_type: String,
    },

    #[error("loan amount {requested} exceeds the maximum of {maximum}")]
    LoanAmountExceedsMaximum {
        maximum: Money,
        requested: Money,
    },

    #[error("loan not open for repayment: current status is {status:?}")]
    LoanNotActive {
        status: LoanStatus,
    },

    #[error("invalid loan transition: {from:?} -> {to:?}")]
    InvalidLoanTransition {
        from: LoanStatus,
        to: LoanStatus,
    },

    #[error("interest already posted for account {account_id} in {period}")]
    DuplicateInterestPosting {
        account_id: AccountId,
        period: Period,
    },

    #[error("{user_id} is not permitted to {action}")]
    Unauthorized {
        user_id: String,
        action: &'static str,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// how an error should be surfaced to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// bad input, rejected before any write
    Validation,
    /// input was well formed but a business rule refused it
    BusinessRule,
    /// infrastructure failure
    Unexpected,
}

impl SaccoError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SaccoError::MemberNotFound { .. }
            | SaccoError::AccountNotFound { .. }
            | SaccoError::AccountTypeNotFound { .. }
            | SaccoError::LoanNotFound { .. }
            | SaccoError::LoanTypeNotFound { .. }
            | SaccoError::ServiceChargeNotFound { .. }
            | SaccoError::RecordNotFound { .. }
            | SaccoError::InvalidAmount { .. }
            | SaccoError::InvalidInterestRate { .. }
            | SaccoError::InvalidPeriod { .. }
            | SaccoError::InvalidDateRange { .. }
            | SaccoError::InvalidField { .. } => ErrorCategory::Validation,

            SaccoError::InsufficientFunds { .. }
            | SaccoError::ApprovedRecordImmutable { .. }
            | SaccoError::AlreadyDecided { .. }
            | SaccoError::MemberInactive { .. }
            | SaccoError::ConcurrentLoanNotAllowed { .. }
            | SaccoError::LoanAmountExceedsMaximum { .. }
            | SaccoError::LoanNotActive { .. }
            | SaccoError::InvalidLoanTransition { .. }
            | SaccoError::DuplicateInterestPosting { .. }
            | SaccoError::Unauthorized { .. } => ErrorCategory::BusinessRule,

            SaccoError::Storage { .. } | SaccoError::Serialization(_) => ErrorCategory::Unexpected,
        }
    }

    /// message suitable for an end user; infrastructure detail stays in the logs
    pub fn public_message(&self) -> String {
        match self.category() {
            ErrorCategory::Unexpected => "the operation could not be completed, please try again later".to_string(),
            _ => self.to_string(),
        }
    }

    pub(crate) fn storage(message: impl Into<String>) -> Self {
        SaccoError::Storage {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SaccoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let validation = SaccoError::InvalidAmount { amount: Money::ZERO };
        assert_eq!(validation.category(), ErrorCategory::Validation);

        let rule = SaccoError::InsufficientFunds {
            available: Money::from_major(10),
            requested: Money::from_major(20),
        };
        assert_eq!(rule.category(), ErrorCategory::BusinessRule);
        assert_eq!(rule.public_message(), "insufficient funds: available 10, requested 20");

        let unexpected = SaccoError::storage("saving references a missing account");
        assert_eq!(unexpected.category(), ErrorCategory::Unexpected);
        assert!(!unexpected.public_message().contains("missing account"));
    }
}
