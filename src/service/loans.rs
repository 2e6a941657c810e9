use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, SaccoError};
use crate::events::Event;
use crate::loans::{
    allocate_repayment, Loan, LoanApplication, LoanRepayment, LoanStatus, RepaymentAllocation, RepaymentRequest,
};
use crate::principal::Principal;
use crate::store::Tables;
use crate::types::{LoanId, MemberId};

use super::{Sacco, WriteContext};

/// result of one recorded repayment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentOutcome {
    pub repayment: LoanRepayment,
    pub allocation: RepaymentAllocation,
    pub status: LoanStatus,
}

impl Sacco<'_> {
    pub fn apply_for_loan(&mut self, principal: &Principal, application: LoanApplication) -> Result<Loan> {
        principal.require_member_access(&application.member_id, "apply for loans")?;

        self.write("apply_for_loan", principal, |t, ctx| {
            t.member(application.member_id)?.require_active()?;
            let loan_type = t.loan_type(application.loan_type_id)?;
            loan_type.check_amount(application.principal)?;

            if !loan_type.allow_concurrent && t.open_loans(application.member_id, loan_type.id) > 0 {
                return Err(SaccoError::ConcurrentLoanNotAllowed {
                    loan_type: loan_type.name.clone(),
                });
            }

            let loan = Loan::from_application(Uuid::new_v4(), &application, loan_type, ctx.now);
            t.events.emit(Event::LoanApplied {
                loan_id: loan.id,
                member_id: loan.member_id,
                principal: loan.principal,
                timestamp: ctx.now,
            });
            t.loans.insert(loan.id, loan.clone());
            Ok(loan)
        })
    }

    /// approve and disburse a pending loan
    pub fn approve_loan(&mut self, principal: &Principal, loan_id: LoanId, disbursed_on: NaiveDate) -> Result<Loan> {
        principal.require_staff("approve loans")?;

        self.write("approve_loan", principal, |t, ctx| {
            let loan = t.loan_mut(loan_id)?;
            if disbursed_on < loan.applied_on {
                return Err(SaccoError::InvalidDateRange {
                    start: loan.applied_on,
                    end: disbursed_on,
                });
            }
            let old = loan.transition(LoanStatus::Active, ctx.now)?;
            loan.disbursed_on = Some(disbursed_on);
            let loan = loan.clone();

            status_changed(t, &loan, old, "approved", ctx);
            Ok(loan)
        })
    }

    pub fn reject_loan(&mut self, principal: &Principal, loan_id: LoanId, reason: &str) -> Result<Loan> {
        principal.require_staff("reject loans")?;
        if reason.trim().is_empty() {
            return Err(SaccoError::InvalidField {
                field: "reason",
                message: "a rejection reason is required".to_string(),
            });
        }

        self.write("reject_loan", principal, |t, ctx| {
            let loan = t.loan_mut(loan_id)?;
            let old = loan.transition(LoanStatus::Rejected, ctx.now)?;
            loan.rejection_reason = Some(reason.trim().to_string());
            let loan = loan.clone();

            status_changed(t, &loan, old, reason.trim(), ctx);
            Ok(loan)
        })
    }

    pub fn record_repayment(&mut self, principal: &Principal, request: RepaymentRequest) -> Result<RepaymentOutcome> {
        principal.require_staff("record repayments")?;
        self.write("record_repayment", principal, |t, ctx| repay_in(t, &request, ctx))
    }

    /// Apply repayments in order inside one transaction.
    ///
    /// Each entry sees the balance left by the entries before it; if any entry
    /// fails none are recorded.
    pub fn record_repayments(
        &mut self,
        principal: &Principal,
        requests: &[RepaymentRequest],
    ) -> Result<Vec<RepaymentOutcome>> {
        principal.require_staff("record repayments")?;
        self.write("record_repayments", principal, |t, ctx| {
            requests.iter().map(|request| repay_in(t, request, ctx)).collect()
        })
    }

    /// flag active loans that went past their grace period; returns the flagged ids
    pub fn refresh_overdue_loans(&mut self, principal: &Principal) -> Result<Vec<LoanId>> {
        principal.require_staff("review overdue loans")?;

        self.write("refresh_overdue_loans", principal, |t, ctx| {
            let today = ctx.today();
            let mut due: Vec<LoanId> = t
                .loans
                .values()
                .filter(|l| l.is_past_grace(today))
                .map(|l| l.id)
                .collect();
            due.sort();

            for loan_id in &due {
                let loan = t.loan_mut(*loan_id)?;
                let old = loan.transition(LoanStatus::Overdue, ctx.now)?;
                let loan = loan.clone();
                tracing::warn!(
                    loan_id = %loan.id,
                    member_id = %loan.member_id,
                    balance = %loan.remaining_balance,
                    "loan is overdue"
                );
                status_changed(t, &loan, old, "grace period elapsed", ctx);
            }
            Ok(due)
        })
    }

    pub fn loan(&self, principal: &Principal, loan_id: LoanId) -> Result<Loan> {
        let loan = self.tables().loan(loan_id)?;
        principal.require_member_access(&loan.member_id, "view loans")?;
        Ok(loan.clone())
    }

    /// a member's loans, oldest application first
    pub fn member_loans(&self, principal: &Principal, member_id: MemberId) -> Result<Vec<Loan>> {
        principal.require_member_access(&member_id, "view loans")?;
        self.tables().member(member_id)?;

        let mut loans: Vec<Loan> = self
            .tables()
            .loans
            .values()
            .filter(|l| l.member_id == member_id)
            .cloned()
            .collect();
        loans.sort_by(|a, b| a.applied_on.cmp(&b.applied_on).then_with(|| a.created_at.cmp(&b.created_at)));
        Ok(loans)
    }

    /// repayments of a loan in payment order
    pub fn loan_repayments(&self, principal: &Principal, loan_id: LoanId) -> Result<Vec<LoanRepayment>> {
        self.loan(principal, loan_id)?;

        let mut repayments: Vec<LoanRepayment> = self
            .tables()
            .repayments
            .values()
            .filter(|r| r.loan_id == loan_id)
            .cloned()
            .collect();
        repayments.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.created_at.cmp(&b.created_at)));
        Ok(repayments)
    }
}

fn repay_in(t: &mut Tables, request: &RepaymentRequest, ctx: &WriteContext<'_>) -> Result<RepaymentOutcome> {
    let loan = t.loan_mut(request.loan_id)?;
    if !loan.status.accepts_repayment() {
        return Err(SaccoError::LoanNotActive { status: loan.status });
    }
    if let Some(disbursed_on) = loan.disbursed_on {
        if request.date < disbursed_on {
            return Err(SaccoError::InvalidDateRange {
                start: disbursed_on,
                end: request.date,
            });
        }
    }

    let allocation = allocate_repayment(loan.remaining_balance, loan.effective_rate(), request.amount)?;
    loan.remaining_balance = allocation.new_balance;
    loan.last_payment_on = Some(loan.last_payment_on.map_or(request.date, |last| last.max(request.date)));

    let transition = if allocation.paid_off {
        Some((LoanStatus::PaidOff, "paid off"))
    } else if loan.status == LoanStatus::Overdue {
        Some((LoanStatus::Active, "repayment received"))
    } else {
        None
    };
    let old_status = match transition {
        Some((to, _)) => Some(loan.transition(to, ctx.now)?),
        None => None,
    };
    let loan = loan.clone();

    let repayment = LoanRepayment {
        id: Uuid::new_v4(),
        loan_id: loan.id,
        member_id: loan.member_id,
        amount: allocation.amount,
        interest_paid: allocation.interest_paid,
        principal_paid: allocation.principal_paid,
        balance_after: allocation.new_balance,
        date: request.date,
        reference: request.reference.clone(),
        created_at: ctx.now,
    };

    t.events.emit(Event::RepaymentRecorded {
        loan_id: loan.id,
        repayment_id: repayment.id,
        amount: allocation.amount,
        interest_paid: allocation.interest_paid,
        principal_paid: allocation.principal_paid,
        new_balance: allocation.new_balance,
        date: request.date,
        timestamp: ctx.now,
    });
    if let (Some(old), Some((_, reason))) = (old_status, transition) {
        status_changed(t, &loan, old, reason, ctx);
    }
    if allocation.overpayment.is_positive() {
        tracing::warn!(
            loan_id = %loan.id,
            overpayment = %allocation.overpayment,
            "repayment exceeded the remaining balance"
        );
    }

    t.repayments.insert(repayment.id, repayment.clone());
    Ok(RepaymentOutcome {
        repayment,
        allocation,
        status: loan.status,
    })
}

fn status_changed(t: &mut Tables, loan: &Loan, old_status: LoanStatus, reason: &str, ctx: &WriteContext<'_>) {
    t.events.emit(Event::LoanStatusChanged {
        loan_id: loan.id,
        old_status,
        new_status: loan.status,
        reason: reason.to_string(),
        timestamp: ctx.now,
    });
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::ledger::MemberTransaction;

    fn application(sacco: &Sacco<'_>, member_id: MemberId, loan_type: &str, principal: i64) -> LoanApplication {
        LoanApplication {
            member_id,
            loan_type_id: sacco.loan_type_named(loan_type).unwrap().id,
            principal: Money::from_major(principal),
            applied_on: date(2024, 1, 2),
            purpose: None,
        }
    }

    fn active_loan(sacco: &mut Sacco<'_>, member_id: MemberId, principal: i64) -> Loan {
        let app = application(sacco, member_id, "Emergency", principal);
        let loan = sacco.apply_for_loan(&officer(), app).unwrap();
        sacco.approve_loan(&officer(), loan.id, date(2024, 1, 5)).unwrap()
    }

    fn pay(loan_id: LoanId, amount: i64, on: NaiveDate) -> RepaymentRequest {
        RepaymentRequest {
            loan_id,
            amount: Money::from_major(amount),
            date: on,
            reference: None,
        }
    }

    #[test]
    fn test_repayment_splits_interest_and_principal() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        let loan = active_loan(&mut sacco, member.id, 1_000);

        let outcome = sacco
            .record_repayment(&officer(), pay(loan.id, 50, date(2024, 2, 5)))
            .unwrap();

        assert_eq!(outcome.repayment.interest_paid, Money::from_major(10));
        assert_eq!(outcome.repayment.principal_paid, Money::from_major(40));
        assert_eq!(outcome.repayment.balance_after, Money::from_major(960));
        assert_eq!(outcome.status, LoanStatus::Active);
        assert_eq!(sacco.loan(&officer(), loan.id).unwrap().remaining_balance, Money::from_major(960));

        let statement = sacco.member_statement(&officer(), member.id).unwrap();
        assert!(matches!(statement[0], MemberTransaction::LoanRepayment(_)));
    }

    #[test]
    fn test_batch_is_sequential() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        let loan = active_loan(&mut sacco, member.id, 1_000);

        let outcomes = sacco
            .record_repayments(
                &officer(),
                &[pay(loan.id, 50, date(2024, 2, 5)), pay(loan.id, 50, date(2024, 3, 5))],
            )
            .unwrap();

        // second payment sees 960: interest 9.60
        assert_eq!(outcomes[1].allocation.interest_paid, Money::from_str_exact("9.60").unwrap());
        assert_eq!(outcomes[1].repayment.balance_after, Money::from_str_exact("919.60").unwrap());
        assert_eq!(sacco.loan_repayments(&officer(), loan.id).unwrap().len(), 2);
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        let loan = active_loan(&mut sacco, member.id, 1_000);

        let result = sacco.record_repayments(
            &officer(),
            &[pay(loan.id, 50, date(2024, 2, 5)), pay(loan.id, 0, date(2024, 3, 5))],
        );

        assert!(matches!(result, Err(SaccoError::InvalidAmount { .. })));
        assert!(sacco.tables().repayments.is_empty());
        assert_eq!(sacco.loan(&officer(), loan.id).unwrap().remaining_balance, Money::from_major(1_000));
    }

    #[test]
    fn test_payoff_closes_loan() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        let loan = active_loan(&mut sacco, member.id, 500);

        let outcome = sacco
            .record_repayment(&officer(), pay(loan.id, 600, date(2024, 2, 1)))
            .unwrap();

        assert_eq!(outcome.status, LoanStatus::PaidOff);
        assert_eq!(outcome.allocation.overpayment, Money::from_major(95));
        assert_eq!(outcome.repayment.balance_after, Money::ZERO);
        assert!(matches!(
            sacco.record_repayment(&officer(), pay(loan.id, 10, date(2024, 2, 2))),
            Err(SaccoError::LoanNotActive { status: LoanStatus::PaidOff })
        ));

        // a closed loan no longer blocks a new one
        assert!(sacco
            .apply_for_loan(&officer(), application(&sacco, member.id, "Emergency", 1_000))
            .is_ok());
    }

    #[test]
    fn test_loan_type_rules() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");

        let too_big = application(&sacco, member.id, "Emergency", 60_000);
        assert!(matches!(
            sacco.apply_for_loan(&officer(), too_big),
            Err(SaccoError::LoanAmountExceedsMaximum { .. })
        ));

        sacco
            .apply_for_loan(&officer(), application(&sacco, member.id, "Emergency", 1_000))
            .unwrap();
        assert!(matches!(
            sacco.apply_for_loan(&officer(), application(&sacco, member.id, "Emergency", 1_000)),
            Err(SaccoError::ConcurrentLoanNotAllowed { .. })
        ));

        // development loans may run side by side
        sacco
            .apply_for_loan(&officer(), application(&sacco, member.id, "Development", 1_000))
            .unwrap();
        sacco
            .apply_for_loan(&officer(), application(&sacco, member.id, "Development", 1_000))
            .unwrap();
        assert_eq!(sacco.member_loans(&officer(), member.id).unwrap().len(), 3);
    }

    #[test]
    fn test_pending_and_rejected_loans_refuse_repayment() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        let loan = sacco
            .apply_for_loan(&officer(), application(&sacco, member.id, "Emergency", 1_000))
            .unwrap();

        assert!(matches!(
            sacco.record_repayment(&officer(), pay(loan.id, 10, date(2024, 2, 1))),
            Err(SaccoError::LoanNotActive { status: LoanStatus::Pending })
        ));

        assert!(sacco.reject_loan(&officer(), loan.id, "").is_err());
        let rejected = sacco.reject_loan(&officer(), loan.id, "insufficient guarantors").unwrap();
        assert_eq!(rejected.status, LoanStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("insufficient guarantors"));
        assert!(matches!(
            sacco.approve_loan(&officer(), loan.id, date(2024, 1, 5)),
            Err(SaccoError::InvalidLoanTransition { .. })
        ));
    }

    #[test]
    fn test_overdue_then_cured() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        // disbursed 2024-01-05 with a 30 day grace; the clock reads 2024-07-01
        let loan = active_loan(&mut sacco, member.id, 1_000);

        let flagged = sacco.refresh_overdue_loans(&officer()).unwrap();
        assert_eq!(flagged, vec![loan.id]);
        assert!(sacco.refresh_overdue_loans(&officer()).unwrap().is_empty());

        // overdue loans pay the 18% npl rate
        let outcome = sacco
            .record_repayment(&officer(), pay(loan.id, 100, date(2024, 7, 1)))
            .unwrap();
        assert_eq!(outcome.allocation.interest_paid, Money::from_major(15));
        assert_eq!(outcome.status, LoanStatus::Active);

        let current = sacco.loan(&officer(), loan.id).unwrap();
        assert_eq!(current.effective_rate(), Rate::from_percentage(12));
        assert_eq!(current.last_payment_on, Some(date(2024, 7, 1)));
    }

    #[test]
    fn test_grace_measured_from_last_payment() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        let loan = active_loan(&mut sacco, member.id, 1_000);
        sacco
            .record_repayment(&officer(), pay(loan.id, 50, date(2024, 6, 20)))
            .unwrap();

        assert!(sacco.refresh_overdue_loans(&officer()).unwrap().is_empty());

        time.test_control().unwrap().advance(chrono::Duration::days(30));
        assert_eq!(sacco.refresh_overdue_loans(&officer()).unwrap(), vec![loan.id]);
    }

    #[test]
    fn test_repayment_before_disbursement_rejected() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        let loan = active_loan(&mut sacco, member.id, 1_000);

        assert!(matches!(
            sacco.record_repayment(&officer(), pay(loan.id, 50, date(2024, 1, 4))),
            Err(SaccoError::InvalidDateRange { .. })
        ));
    }
}
