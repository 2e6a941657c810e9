use chrono::NaiveDate;
use uuid::Uuid;

use crate::approval::{Approvable, Approval};
use crate::decimal::Money;
use crate::errors::{Result, SaccoError};
use crate::events::Event;
use crate::principal::Principal;
use crate::savings::{reconstruct_balance, NewSaving, NewSavingAccount, Saving, SavingAccount, SavingEdit};
use crate::store::Tables;
use crate::types::{AccountId, MemberId, RecordId, TransactionType};

use super::Sacco;

impl Sacco<'_> {
    /// open an account; its opening balance counts toward the member's savings
    pub fn open_account(&mut self, principal: &Principal, new: NewSavingAccount) -> Result<SavingAccount> {
        principal.require_staff("open accounts")?;
        new.validate()?;

        self.write("open_account", principal, |t, ctx| {
            t.member(new.member_id)?.require_active()?;
            t.account_type(new.account_type_id)?;

            let id = Uuid::new_v4();
            let account = SavingAccount {
                id,
                account_number: t.next_account_number(),
                member_id: new.member_id,
                account_type_id: new.account_type_id,
                initial_balance: new.initial_balance,
                balance: new.initial_balance,
                opened_on: new.opened_on,
                created_at: ctx.now,
            };

            t.member_mut(new.member_id)?.savings_balance += new.initial_balance;
            t.events.emit(Event::AccountOpened {
                account_id: id,
                member_id: new.member_id,
                account_type_id: new.account_type_id,
                initial_balance: new.initial_balance,
                timestamp: ctx.now,
            });
            t.accounts.insert(id, account.clone());
            Ok(account)
        })
    }

    /// submit a pending deposit or withdrawal
    pub fn submit_saving(&mut self, principal: &Principal, new: NewSaving) -> Result<Saving> {
        new.validate()?;
        let member_id = self.tables().account(new.account_id)?.member_id;
        principal.require_member_access(&member_id, "submit savings")?;

        self.write("submit_saving", principal, |t, ctx| {
            t.member(member_id)?.require_active()?;
            let account = t.account(new.account_id)?;
            check_withdrawal(account, new.transaction_type, new.amount)?;

            let saving = Saving {
                id: Uuid::new_v4(),
                account_id: new.account_id,
                member_id,
                transaction_type: new.transaction_type,
                amount: new.amount,
                date: new.date,
                notes: new.notes,
                interest_period: None,
                approval: Approval::pending(),
                created_at: ctx.now,
            };

            t.events.emit(Event::RecordSubmitted {
                kind: Saving::KIND,
                record_id: saving.id,
                member_id,
                amount: saving.amount,
                timestamp: ctx.now,
            });
            t.savings.insert(saving.id, saving.clone());
            Ok(saving)
        })
    }

    /// edit a pending or rejected saving; it goes back to pending
    pub fn edit_saving(&mut self, principal: &Principal, id: RecordId, edit: SavingEdit) -> Result<Saving> {
        let member_id = self.tables().saving(id)?.member_id;
        principal.require_member_access(&member_id, "edit savings")?;

        self.write("edit_saving", principal, |t, ctx| {
            let saving = t.saving_mut(id)?;
            let was_rejected = saving.approval.is_rejected();
            saving.approval.resubmit(Saving::KIND, id)?;
            edit.apply(saving)?;
            let saving = saving.clone();

            check_withdrawal(t.account(saving.account_id)?, saving.transaction_type, saving.amount)?;

            // a resubmitted interest posting claims its month again
            if let (true, Some(period)) = (was_rejected, saving.interest_period) {
                t.insert_interest_posting(saving.account_id, period, id)?;
            }

            t.events.emit(Event::RecordResubmitted {
                kind: Saving::KIND,
                record_id: id,
                amount: saving.amount,
                timestamp: ctx.now,
            });
            Ok(saving)
        })
    }

    pub fn delete_saving(&mut self, principal: &Principal, id: RecordId) -> Result<()> {
        let member_id = self.tables().saving(id)?.member_id;
        principal.require_member_access(&member_id, "delete savings")?;

        self.write("delete_saving", principal, |t, ctx| {
            let saving = t.saving(id)?;
            saving.approval.ensure_mutable(Saving::KIND, id)?;
            if let Some(period) = saving.interest_period {
                let account_id = saving.account_id;
                t.release_interest_posting(account_id, period, id);
            }

            t.savings.remove(&id);
            t.events.emit(Event::RecordDeleted {
                kind: Saving::KIND,
                record_id: id,
                timestamp: ctx.now,
            });
            Ok(())
        })
    }

    pub fn account(&self, principal: &Principal, account_id: AccountId) -> Result<SavingAccount> {
        let account = self.tables().account(account_id)?;
        principal.require_member_access(&account.member_id, "view accounts")?;
        Ok(account.clone())
    }

    pub fn member_accounts(&self, principal: &Principal, member_id: MemberId) -> Result<Vec<SavingAccount>> {
        principal.require_member_access(&member_id, "view accounts")?;
        self.tables().member(member_id)?;

        let mut accounts: Vec<SavingAccount> = self
            .tables()
            .accounts
            .values()
            .filter(|a| a.member_id == member_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.account_number.cmp(&b.account_number));
        Ok(accounts)
    }

    /// approved balance at the start of `as_of`
    pub fn account_balance_as_of(&self, principal: &Principal, account_id: AccountId, as_of: NaiveDate) -> Result<Money> {
        let account = self.account(principal, account_id)?;
        let history = self.tables().account_history(&account);
        Ok(reconstruct_balance(Money::ZERO, &history, as_of))
    }
}

/// withdrawals may not exceed the approved balance
pub(crate) fn check_withdrawal(account: &SavingAccount, transaction_type: TransactionType, amount: Money) -> Result<()> {
    if transaction_type == TransactionType::Withdrawal && amount > account.balance {
        return Err(SaccoError::InsufficientFunds {
            available: account.balance,
            requested: amount,
        });
    }
    Ok(())
}

/// apply an approved saving to its account and member
pub(crate) fn post_saving(t: &mut Tables, saving: &Saving) -> Result<()> {
    let account = t.account_mut(saving.account_id).map_err(|_| {
        SaccoError::storage(format!("saving {} references missing account {}", saving.id, saving.account_id))
    })?;
    check_withdrawal(account, saving.transaction_type, saving.amount)?;
    account.balance += saving.signed_amount();

    let member = t.member_mut(saving.member_id).map_err(|_| {
        SaccoError::storage(format!("saving {} references missing member {}", saving.id, saving.member_id))
    })?;
    member.savings_balance += saving.signed_amount();
    Ok(())
}
