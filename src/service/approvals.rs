use crate::approval::{Approvable, AppliedServiceCharge, Dividend, RecordRef, Share};
use crate::errors::{Result, SaccoError};
use crate::events::Event;
use crate::principal::Principal;
use crate::savings::Saving;
use crate::store::Tables;

use super::savings::post_saving;
use super::{Sacco, WriteContext};

impl Sacco<'_> {
    /// approve a pending record and apply its effect
    pub fn approve(&mut self, principal: &Principal, record: RecordRef) -> Result<()> {
        principal.require_staff("approve records")?;
        self.write("approve", principal, |t, ctx| approve_in(t, record, ctx))
    }

    /// reject a pending record; nothing but its status changes
    pub fn reject(&mut self, principal: &Principal, record: RecordRef, reason: &str) -> Result<()> {
        principal.require_staff("reject records")?;
        self.write("reject", principal, |t, ctx| reject_in(t, record, reason, ctx))
    }

    /// approve every record or none of them
    pub fn bulk_approve(&mut self, principal: &Principal, records: &[RecordRef]) -> Result<usize> {
        principal.require_staff("approve records")?;
        self.write("bulk_approve", principal, |t, ctx| {
            for record in records {
                approve_in(t, *record, ctx)?;
            }
            Ok(records.len())
        })
    }

    /// reject every record with the same reason, or none of them
    pub fn bulk_reject(&mut self, principal: &Principal, records: &[RecordRef], reason: &str) -> Result<usize> {
        principal.require_staff("reject records")?;
        self.write("bulk_reject", principal, |t, ctx| {
            for record in records {
                reject_in(t, *record, reason, ctx)?;
            }
            Ok(records.len())
        })
    }
}

fn approve_in(t: &mut Tables, record: RecordRef, ctx: &WriteContext<'_>) -> Result<()> {
    let id = record.id();
    let event = match record {
        RecordRef::Saving(_) => {
            let saving = t.saving_mut(id)?;
            saving.approval.approve(Saving::KIND, id, ctx.user, ctx.now)?;
            let saving = saving.clone();
            post_saving(t, &saving)?;
            approved_event(&saving, ctx)
        }
        RecordRef::Share(_) => {
            let share = t.share_mut(id)?;
            share.approval.approve(Share::KIND, id, ctx.user, ctx.now)?;
            let share = share.clone();
            let member = member_of(t, &share)?;
            member.share_count = member.share_count.checked_add(share.shares).ok_or_else(|| {
                SaccoError::storage(format!("share count overflow for member {}", share.member_id))
            })?;
            approved_event(&share, ctx)
        }
        RecordRef::Dividend(_) => {
            let dividend = t.dividend_mut(id)?;
            dividend.approval.approve(Dividend::KIND, id, ctx.user, ctx.now)?;
            let dividend = dividend.clone();
            member_of(t, &dividend)?.dividends_earned += dividend.amount;
            approved_event(&dividend, ctx)
        }
        RecordRef::ServiceCharge(_) => {
            let charge = t.applied_charge_mut(id)?;
            charge.approval.approve(AppliedServiceCharge::KIND, id, ctx.user, ctx.now)?;
            let charge = charge.clone();
            member_of(t, &charge)?.service_charges_applied += charge.amount;
            approved_event(&charge, ctx)
        }
    };

    t.events.emit(event);
    Ok(())
}

fn reject_in(t: &mut Tables, record: RecordRef, reason: &str, ctx: &WriteContext<'_>) -> Result<()> {
    let id = record.id();
    let event = match record {
        RecordRef::Saving(_) => {
            let saving = t.saving_mut(id)?;
            saving.approval.reject(Saving::KIND, id, reason, ctx.user, ctx.now)?;
            let saving = saving.clone();
            // a rejected interest posting frees its month for a recalculation
            if let Some(period) = saving.interest_period {
                t.release_interest_posting(saving.account_id, period, id);
            }
            rejected_event(&saving, ctx)
        }
        RecordRef::Share(_) => {
            let share = t.share_mut(id)?;
            share.approval.reject(Share::KIND, id, reason, ctx.user, ctx.now)?;
            rejected_event(&*share, ctx)
        }
        RecordRef::Dividend(_) => {
            let dividend = t.dividend_mut(id)?;
            dividend.approval.reject(Dividend::KIND, id, reason, ctx.user, ctx.now)?;
            rejected_event(&*dividend, ctx)
        }
        RecordRef::ServiceCharge(_) => {
            let charge = t.applied_charge_mut(id)?;
            charge
                .approval
                .reject(AppliedServiceCharge::KIND, id, reason, ctx.user, ctx.now)?;
            rejected_event(&*charge, ctx)
        }
    };

    t.events.emit(event);
    Ok(())
}

fn member_of<'t, R: Approvable>(t: &'t mut Tables, record: &R) -> Result<&'t mut crate::member::Member> {
    let member_id = record.member_id();
    t.member_mut(member_id).map_err(|_| {
        SaccoError::storage(format!("{} {} references missing member {}", R::KIND, record.id(), member_id))
    })
}

fn approved_event<R: Approvable>(record: &R, ctx: &WriteContext<'_>) -> Event {
    Event::RecordApproved {
        kind: R::KIND,
        record_id: record.id(),
        member_id: record.member_id(),
        amount: record.amount(),
        approved_by: ctx.user.to_string(),
        timestamp: ctx.now,
    }
}

fn rejected_event<R: Approvable>(record: &R, ctx: &WriteContext<'_>) -> Event {
    Event::RecordRejected {
        kind: R::KIND,
        record_id: record.id(),
        member_id: record.member_id(),
        reason: record.approval().rejection_reason.clone().unwrap_or_default(),
        rejected_by: ctx.user.to_string(),
        timestamp: ctx.now,
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::approval::{ApprovalStatus, NewAppliedServiceCharge, NewDividend, NewShare};
    use crate::decimal::Money;
    use crate::member::MemberAggregates;
    use crate::savings::NewSaving;
    use crate::types::RecordKind;

    #[test]
    fn test_approving_savings_moves_balances() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        let account = open_account(&mut sacco, member.id, Money::from_major(200));

        let deposit = sacco
            .submit_saving(
                &officer(),
                NewSaving::deposit(account.id, Money::from_major(100), date(2024, 6, 1)),
            )
            .unwrap();
        let withdrawal = sacco
            .submit_saving(
                &officer(),
                NewSaving::withdrawal(account.id, Money::from_major(30), date(2024, 6, 5)),
            )
            .unwrap();

        sacco.approve(&officer(), RecordRef::Saving(deposit.id)).unwrap();
        assert_eq!(sacco.tables().account(account.id).unwrap().balance, Money::from_major(300));

        sacco.approve(&officer(), RecordRef::Saving(withdrawal.id)).unwrap();
        assert_eq!(sacco.tables().account(account.id).unwrap().balance, Money::from_major(270));
        assert_eq!(
            sacco.tables().member(member.id).unwrap().savings_balance,
            Money::from_major(270)
        );

        let stored = sacco.tables().saving(deposit.id).unwrap();
        assert_eq!(stored.approval.decided_by.as_deref(), Some("teller"));
        assert_eq!(stored.approval.decided_at, Some(time.now()));
    }

    #[test]
    fn test_rejection_never_changes_balances() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        let account = open_account(&mut sacco, member.id, Money::from_major(200));

        let withdrawal = sacco
            .submit_saving(
                &officer(),
                NewSaving::withdrawal(account.id, Money::from_major(150), date(2024, 6, 5)),
            )
            .unwrap();
        sacco
            .reject(&officer(), RecordRef::Saving(withdrawal.id), "signature mismatch")
            .unwrap();

        assert_eq!(sacco.tables().account(account.id).unwrap().balance, Money::from_major(200));
        let stored = sacco.tables().saving(withdrawal.id).unwrap();
        assert_eq!(stored.approval.status, ApprovalStatus::Rejected);
        assert_eq!(stored.approval.rejection_reason.as_deref(), Some("signature mismatch"));

        // a decided record cannot be decided again
        assert!(matches!(
            sacco.approve(&officer(), RecordRef::Saving(withdrawal.id)),
            Err(SaccoError::AlreadyDecided { status: ApprovalStatus::Rejected, .. })
        ));
    }

    #[test]
    fn test_withdrawal_rechecked_at_approval() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        let account = open_account(&mut sacco, member.id, Money::from_major(100));

        let first = sacco
            .submit_saving(
                &officer(),
                NewSaving::withdrawal(account.id, Money::from_major(80), date(2024, 6, 5)),
            )
            .unwrap();
        let second = sacco
            .submit_saving(
                &officer(),
                NewSaving::withdrawal(account.id, Money::from_major(80), date(2024, 6, 6)),
            )
            .unwrap();

        sacco.approve(&officer(), RecordRef::Saving(first.id)).unwrap();
        assert!(matches!(
            sacco.approve(&officer(), RecordRef::Saving(second.id)),
            Err(SaccoError::InsufficientFunds { .. })
        ));
        // the failed approval did not flip the status
        assert!(sacco.tables().saving(second.id).unwrap().approval.is_pending());
        assert_eq!(sacco.tables().account(account.id).unwrap().balance, Money::from_major(20));
    }

    #[test]
    fn test_every_kind_updates_its_aggregate() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        let account = open_account(&mut sacco, member.id, Money::ZERO);
        let fee = sacco
            .create_service_charge(&officer(), "Ledger fee", Money::from_major(15))
            .unwrap();

        let saving = sacco
            .submit_saving(
                &officer(),
                NewSaving::deposit(account.id, Money::from_major(500), date(2024, 6, 1)),
            )
            .unwrap();
        let share = sacco
            .submit_share(
                &officer(),
                NewShare {
                    member_id: member.id,
                    shares: 5,
                    date: date(2024, 6, 2),
                    notes: None,
                },
            )
            .unwrap();
        let dividend = sacco
            .declare_dividend(
                &officer(),
                NewDividend {
                    member_id: member.id,
                    amount: Money::from_major(40),
                    date: date(2024, 6, 3),
                    notes: None,
                },
            )
            .unwrap();
        let charge = sacco
            .apply_service_charge(
                &officer(),
                NewAppliedServiceCharge {
                    member_id: member.id,
                    service_charge_id: fee.id,
                    amount: None,
                    date: date(2024, 6, 4),
                    notes: None,
                },
            )
            .unwrap();

        let approved = sacco
            .bulk_approve(
                &officer(),
                &[
                    RecordRef::Saving(saving.id),
                    RecordRef::Share(share.id),
                    RecordRef::Dividend(dividend.id),
                    RecordRef::ServiceCharge(charge.id),
                ],
            )
            .unwrap();
        assert_eq!(approved, 4);

        let expected = MemberAggregates {
            savings_balance: Money::from_major(500),
            share_count: 5,
            dividends_earned: Money::from_major(40),
            service_charges_applied: Money::from_major(15),
        };
        assert_eq!(sacco.tables().member(member.id).unwrap().aggregates(), expected);
        assert_eq!(sacco.reconcile_member(&officer(), member.id).unwrap(), expected);
        assert!(sacco.pending_approvals(&officer()).unwrap().is_empty());
    }

    #[test]
    fn test_bulk_approve_is_all_or_nothing() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        let account = open_account(&mut sacco, member.id, Money::ZERO);

        let good = sacco
            .submit_saving(
                &officer(),
                NewSaving::deposit(account.id, Money::from_major(100), date(2024, 6, 1)),
            )
            .unwrap();
        sacco.take_events();

        let result = sacco.bulk_approve(
            &officer(),
            &[RecordRef::Saving(good.id), RecordRef::Share(uuid::Uuid::new_v4())],
        );

        assert!(matches!(result, Err(SaccoError::RecordNotFound { kind: RecordKind::Share, .. })));
        assert!(sacco.tables().saving(good.id).unwrap().approval.is_pending());
        assert_eq!(sacco.tables().account(account.id).unwrap().balance, Money::ZERO);
        assert!(sacco.events().is_empty());
    }

    #[test]
    fn test_bulk_reject() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        let account = open_account(&mut sacco, member.id, Money::ZERO);

        let refs: Vec<RecordRef> = (1..=3)
            .map(|day| {
                let saving = sacco
                    .submit_saving(
                        &officer(),
                        NewSaving::deposit(account.id, Money::from_major(10), date(2024, 6, day)),
                    )
                    .unwrap();
                RecordRef::Saving(saving.id)
            })
            .collect();

        assert_eq!(sacco.bulk_reject(&officer(), &refs, "duplicate entry").unwrap(), 3);
        assert!(sacco
            .events()
            .iter()
            .filter(|e| matches!(e, Event::RecordRejected { .. }))
            .count()
            == 3);
        assert!(sacco.bulk_reject(&officer(), &refs, "").is_err());
    }

    #[test]
    fn test_members_cannot_approve() {
        let time = clock();
        let mut sacco = sacco(&time);
        let member = enroll(&mut sacco, "Achieng");
        let account = open_account(&mut sacco, member.id, Money::ZERO);
        let caller = Principal::member("achieng", member.id);

        let saving = sacco
            .submit_saving(&caller, NewSaving::deposit(account.id, Money::from_major(10), date(2024, 6, 1)))
            .unwrap();
        assert!(matches!(
            sacco.approve(&caller, RecordRef::Saving(saving.id)),
            Err(SaccoError::Unauthorized { .. })
        ));
    }
}
