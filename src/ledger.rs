use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::approval::{Approvable, ApprovalStatus, AppliedServiceCharge, Dividend, Share};
use crate::decimal::Money;
use crate::loans::LoanRepayment;
use crate::savings::Saving;
use crate::types::{MemberId, RecordId, RecordKind};

/// one line of a member statement or approval queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemberTransaction {
    Saving(Saving),
    Share(Share),
    Dividend(Dividend),
    ServiceCharge(AppliedServiceCharge),
    LoanRepayment(LoanRepayment),
}

impl MemberTransaction {
    pub fn kind(&self) -> RecordKind {
        match self {
            MemberTransaction::Saving(_) => RecordKind::Saving,
            MemberTransaction::Share(_) => RecordKind::Share,
            MemberTransaction::Dividend(_) => RecordKind::Dividend,
            MemberTransaction::ServiceCharge(_) => RecordKind::ServiceCharge,
            MemberTransaction::LoanRepayment(_) => RecordKind::LoanRepayment,
        }
    }

    pub fn id(&self) -> RecordId {
        match self {
            MemberTransaction::Saving(r) => r.id,
            MemberTransaction::Share(r) => r.id,
            MemberTransaction::Dividend(r) => r.id,
            MemberTransaction::ServiceCharge(r) => r.id,
            MemberTransaction::LoanRepayment(r) => r.id,
        }
    }

    pub fn member_id(&self) -> MemberId {
        match self {
            MemberTransaction::Saving(r) => r.member_id,
            MemberTransaction::Share(r) => r.member_id,
            MemberTransaction::Dividend(r) => r.member_id,
            MemberTransaction::ServiceCharge(r) => r.member_id,
            MemberTransaction::LoanRepayment(r) => r.member_id,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            MemberTransaction::Saving(r) => r.date,
            MemberTransaction::Share(r) => r.date,
            MemberTransaction::Dividend(r) => r.date,
            MemberTransaction::ServiceCharge(r) => r.date,
            MemberTransaction::LoanRepayment(r) => r.date,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            MemberTransaction::Saving(r) => r.created_at,
            MemberTransaction::Share(r) => r.created_at,
            MemberTransaction::Dividend(r) => r.created_at,
            MemberTransaction::ServiceCharge(r) => r.created_at,
            MemberTransaction::LoanRepayment(r) => r.created_at,
        }
    }

    /// value of the record; withdrawals and charges are not negated
    pub fn amount(&self) -> Money {
        match self {
            MemberTransaction::Saving(r) => r.amount(),
            MemberTransaction::Share(r) => r.amount(),
            MemberTransaction::Dividend(r) => r.amount(),
            MemberTransaction::ServiceCharge(r) => r.amount(),
            MemberTransaction::LoanRepayment(r) => r.amount,
        }
    }

    /// loan repayments do not go through approval
    pub fn approval_status(&self) -> Option<ApprovalStatus> {
        match self {
            MemberTransaction::Saving(r) => Some(r.status()),
            MemberTransaction::Share(r) => Some(r.status()),
            MemberTransaction::Dividend(r) => Some(r.status()),
            MemberTransaction::ServiceCharge(r) => Some(r.status()),
            MemberTransaction::LoanRepayment(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.approval_status() == Some(ApprovalStatus::Pending)
    }
}

/// oldest first, by record date then creation time
pub fn sort_chronologically(transactions: &mut [MemberTransaction]) {
    transactions.sort_by(|a, b| a.date().cmp(&b.date()).then_with(|| a.created_at().cmp(&b.created_at())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::Approval;
    use crate::types::TransactionType;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_tagged_serialization_and_ordering() {
        let member_id = Uuid::new_v4();
        let saving = Saving {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            member_id,
            transaction_type: TransactionType::Withdrawal,
            amount: Money::from_major(30),
            date: date(2024, 3, 5),
            notes: None,
            interest_period: None,
            approval: Approval::pending(),
            created_at: Utc::now(),
        };
        let repayment = LoanRepayment {
            id: Uuid::new_v4(),
            loan_id: Uuid::new_v4(),
            member_id,
            amount: Money::from_major(50),
            interest_paid: Money::from_major(10),
            principal_paid: Money::from_major(40),
            balance_after: Money::from_major(960),
            date: date(2024, 3, 1),
            reference: None,
            created_at: Utc::now(),
        };

        let mut lines = vec![
            MemberTransaction::Saving(saving),
            MemberTransaction::LoanRepayment(repayment),
        ];
        sort_chronologically(&mut lines);

        assert_eq!(lines[0].kind(), RecordKind::LoanRepayment);
        assert_eq!(lines[0].approval_status(), None);
        assert!(lines[1].is_pending());
        assert_eq!(lines[1].amount(), Money::from_major(30));

        let json = serde_json::to_value(&lines[1]).unwrap();
        assert_eq!(json["kind"], "saving");
        assert_eq!(json["transaction_type"], "withdrawal");
    }
}
