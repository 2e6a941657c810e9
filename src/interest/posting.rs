use serde::{Deserialize, Serialize};

use crate::savings::Saving;
use crate::types::{AccountId, MemberId};

use super::InterestCalculation;

/// why an account does or does not receive an interest posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteOutcome {
    Postable,
    /// interest rounded to zero or below
    NotPositive,
    /// a live posting with the period's note already exists
    AlreadyPosted,
    /// account opened after the period ended
    NotOpen,
}

/// dry-run result for one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestQuote {
    pub account_id: AccountId,
    pub account_number: String,
    pub member_id: MemberId,
    pub calculation: InterestCalculation,
    pub outcome: QuoteOutcome,
}

impl InterestQuote {
    pub fn is_postable(&self) -> bool {
        self.outcome == QuoteOutcome::Postable
    }
}

/// Checks an account's savings for an earlier posting carrying `note`.
///
/// Rejected postings do not count, so a rejected run can be recalculated.
pub fn has_prior_posting<'a, I>(savings: I, note: &str) -> bool
where
    I: IntoIterator<Item = &'a Saving>,
{
    savings
        .into_iter()
        .any(|s| s.has_note(note) && !s.approval.is_rejected())
}

/// classify a calculation against the guard
pub fn classify(calculation: &InterestCalculation, already_posted: bool) -> QuoteOutcome {
    if already_posted {
        QuoteOutcome::AlreadyPosted
    } else if calculation.is_postable() {
        QuoteOutcome::Postable
    } else {
        QuoteOutcome::NotPositive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::Approval;
    use crate::decimal::{Money, Rate};
    use crate::interest::calculate_monthly_interest;
    use crate::types::{Period, TransactionType};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn saving_with_note(note: Option<&str>) -> Saving {
        Saving {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            transaction_type: TransactionType::Deposit,
            amount: Money::from_major(10),
            date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            notes: note.map(str::to_string),
            interest_period: None,
            approval: Approval::pending(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_guard_matches_note_exactly() {
        let savings = vec![
            saving_with_note(None),
            saving_with_note(Some("Monthly interest 2024-05")),
        ];

        assert!(has_prior_posting(&savings, "Monthly interest 2024-05"));
        assert!(!has_prior_posting(&savings, "Monthly interest 2024-06"));
    }

    #[test]
    fn test_guard_ignores_rejected_postings() {
        let mut rejected = saving_with_note(Some("Monthly interest 2024-06"));
        rejected.approval.status = crate::approval::ApprovalStatus::Rejected;

        assert!(!has_prior_posting(&[rejected.clone()], "Monthly interest 2024-06"));

        let mut approved = rejected;
        approved.approval.status = crate::approval::ApprovalStatus::Approved;
        assert!(has_prior_posting(&[approved], "Monthly interest 2024-06"));
    }

    #[test]
    fn test_classify() {
        let june = Period::new(2024, 6).unwrap();
        let earning = calculate_monthly_interest(Money::from_major(1_000), &[], june, Rate::from_percentage(12)).unwrap();
        let idle = calculate_monthly_interest(Money::ZERO, &[], june, Rate::from_percentage(12)).unwrap();

        assert_eq!(classify(&earning, false), QuoteOutcome::Postable);
        assert_eq!(classify(&earning, true), QuoteOutcome::AlreadyPosted);
        assert_eq!(classify(&idle, false), QuoteOutcome::NotPositive);
    }
}
