use uuid::Uuid;

use crate::approval::records::require_positive;
use crate::approval::{
    Approvable, AppliedServiceCharge, Approval, Dividend, NewAppliedServiceCharge, NewDividend, NewShare, RecordEdit,
    Share, ShareEdit,
};
use crate::errors::Result;
use crate::events::Event;
use crate::principal::Principal;
use crate::store::Tables;
use crate::types::{RecordId, RecordKind};

use super::{Sacco, WriteContext};

impl Sacco<'_> {
    /// allocate shares at the configured share price
    pub fn submit_share(&mut self, principal: &Principal, new: NewShare) -> Result<Share> {
        principal.require_member_access(&new.member_id, "buy shares")?;
        new.validate()?;

        self.write("submit_share", principal, |t, ctx| {
            t.member(new.member_id)?.require_active()?;
            let share = Share {
                id: Uuid::new_v4(),
                member_id: new.member_id,
                shares: new.shares,
                price_per_share: ctx.config.share_price,
                date: new.date,
                notes: new.notes,
                approval: Approval::pending(),
                created_at: ctx.now,
            };
            submitted(t, &share, ctx);
            t.shares.insert(share.id, share.clone());
            Ok(share)
        })
    }

    pub fn edit_share(&mut self, principal: &Principal, id: RecordId, edit: ShareEdit) -> Result<Share> {
        let member_id = self.tables().shares.get(&id).map(|s| s.member_id);
        if let Some(member_id) = member_id {
            principal.require_member_access(&member_id, "edit shares")?;
        }

        self.write("edit_share", principal, |t, ctx| {
            let share = t.share_mut(id)?;
            share.approval.resubmit(Share::KIND, id)?;
            edit.apply(share)?;
            let share = share.clone();
            resubmitted(t, &share, ctx);
            Ok(share)
        })
    }

    pub fn delete_share(&mut self, principal: &Principal, id: RecordId) -> Result<()> {
        let member_id = self.tables().shares.get(&id).map(|s| s.member_id);
        if let Some(member_id) = member_id {
            principal.require_member_access(&member_id, "delete shares")?;
        }

        self.write("delete_share", principal, |t, ctx| {
            t.share_mut(id)?.approval.ensure_mutable(Share::KIND, id)?;
            t.shares.remove(&id);
            deleted(t, Share::KIND, id, ctx);
            Ok(())
        })
    }

    pub fn declare_dividend(&mut self, principal: &Principal, new: NewDividend) -> Result<Dividend> {
        principal.require_staff("declare dividends")?;
        require_positive(new.amount)?;

        self.write("declare_dividend", principal, |t, ctx| {
            t.member(new.member_id)?;
            let dividend = Dividend {
                id: Uuid::new_v4(),
                member_id: new.member_id,
                amount: new.amount,
                date: new.date,
                notes: new.notes,
                approval: Approval::pending(),
                created_at: ctx.now,
            };
            submitted(t, &dividend, ctx);
            t.dividends.insert(dividend.id, dividend.clone());
            Ok(dividend)
        })
    }

    pub fn edit_dividend(&mut self, principal: &Principal, id: RecordId, edit: RecordEdit) -> Result<Dividend> {
        principal.require_staff("edit dividends")?;

        self.write("edit_dividend", principal, |t, ctx| {
            let dividend = t.dividend_mut(id)?;
            dividend.approval.resubmit(Dividend::KIND, id)?;
            edit.apply_to_dividend(dividend)?;
            let dividend = dividend.clone();
            resubmitted(t, &dividend, ctx);
            Ok(dividend)
        })
    }

    pub fn delete_dividend(&mut self, principal: &Principal, id: RecordId) -> Result<()> {
        principal.require_staff("delete dividends")?;

        self.write("delete_dividend", principal, |t, ctx| {
            t.dividend_mut(id)?.approval.ensure_mutable(Dividend::KIND, id)?;
            t.dividends.remove(&id);
            deleted(t, Dividend::KIND, id, ctx);
            Ok(())
        })
    }

    /// levy a catalog charge; the amount defaults to the catalog price
    pub fn apply_service_charge(
        &mut self,
        principal: &Principal,
        new: NewAppliedServiceCharge,
    ) -> Result<AppliedServiceCharge> {
        principal.require_staff("apply service charges")?;
        if let Some(amount) = new.amount {
            require_positive(amount)?;
        }

        self.write("apply_service_charge", principal, |t, ctx| {
            t.member(new.member_id)?;
            let catalog_amount = t.service_charge(new.service_charge_id)?.amount;

            let charge = AppliedServiceCharge {
                id: Uuid::new_v4(),
                member_id: new.member_id,
                service_charge_id: new.service_charge_id,
                amount: new.amount.unwrap_or(catalog_amount),
                date: new.date,
                notes: new.notes,
                approval: Approval::pending(),
                created_at: ctx.now,
            };
            submitted(t, &charge, ctx);
            t.applied_charges.insert(charge.id, charge.clone());
            Ok(charge)
        })
    }

    pub fn edit_service_charge(
        &mut self,
        principal: &Principal,
        id: RecordId,
        edit: RecordEdit,
    ) -> Result<AppliedServiceCharge> {
        principal.require_staff("edit service charges")?;

        self.write("edit_service_charge", principal, |t, ctx| {
            let charge = t.applied_charge_mut(id)?;
            charge.approval.resubmit(AppliedServiceCharge::KIND, id)?;
            edit.apply_to_charge(charge)?;
            let charge = charge.clone();
            resubmitted(t, &charge, ctx);
            Ok(charge)
        })
    }

    pub fn delete_service_charge(&mut self, principal: &Principal, id: RecordId) -> Result<()> {
        principal.require_staff("delete service charges")?;

        self.write("delete_service_charge", principal, |t, ctx| {
            t.applied_charge_mut(id)?
                .approval
                .ensure_mutable(AppliedServiceCharge::KIND, id)?;
            t.applied_charges.remove(&id);
            deleted(t, AppliedServiceCharge::KIND, id, ctx);
            Ok(())
        })
    }
}

fn submitted<R: Approvable>(t: &mut Tables, record: &R, ctx: &WriteContext<'_>) {
    t.events.emit(Event::RecordSubmitted {
        kind: R::KIND,
        record_id: record.id(),
        member_id: record.member_id(),
        amount: record.amount(),
        timestamp: ctx.now,
    });
}

fn resubmitted<R: Approvable>(t: &mut Tables, record: &R, ctx: &WriteContext<'_>) {
    t.events.emit(Event::RecordResubmitted {
        kind: R::KIND,
        record_id: record.id(),
        amount: record.amount(),
        timestamp: ctx.now,
    });
}

fn deleted(t: &mut Tables, kind: RecordKind, id: RecordId, ctx: &WriteContext<'_>) {
    t.events.emit(Event::RecordDeleted {
        kind,
        record_id: id,
        timestamp: ctx.now,
    });
}
