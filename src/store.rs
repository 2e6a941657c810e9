//! In-process tables with all-or-nothing transactions.
//!
//! `Store::transaction` stages every write on a copy of the tables and only
//! swaps it in when the closure returns `Ok`, so a failed operation leaves no
//! records, aggregate changes or audit events behind. Tables are shared
//! copy-on-write, so a write only copies the tables it touches.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::approval::{AppliedServiceCharge, Dividend, ServiceCharge, Share};
use crate::decimal::Money;
use crate::errors::{Result, SaccoError};
use crate::events::EventStore;
use crate::loans::{Loan, LoanRepayment, LoanType};
use crate::member::{Member, MemberAggregates};
use crate::savings::{AccountType, Movement, Saving, SavingAccount};
use crate::types::{
    AccountId, AccountTypeId, LoanId, LoanTypeId, MemberId, Period, RecordId, RecordKind, ServiceChargeId,
};

/// copy-on-write map; clones share storage until one side mutates
#[derive(Debug)]
pub struct Table<K, V>(Arc<HashMap<K, V>>);

impl<K, V> Table<K, V> {
    /// whether both handles still point at the same storage
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<K, V> Clone for Table<K, V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self(Arc::new(HashMap::new()))
    }
}

impl<K, V> Deref for Table<K, V> {
    type Target = HashMap<K, V>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K: Clone + Eq + Hash, V: Clone> DerefMut for Table<K, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        Arc::make_mut(&mut self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub members: Table<MemberId, Member>,
    pub account_types: Table<AccountTypeId, AccountType>,
    pub accounts: Table<AccountId, SavingAccount>,
    pub savings: Table<RecordId, Saving>,
    pub shares: Table<RecordId, Share>,
    pub dividends: Table<RecordId, Dividend>,
    pub service_charges: Table<ServiceChargeId, ServiceCharge>,
    pub applied_charges: Table<RecordId, AppliedServiceCharge>,
    pub loan_types: Table<LoanTypeId, LoanType>,
    pub loans: Table<LoanId, Loan>,
    pub repayments: Table<RecordId, LoanRepayment>,
    /// unique (account, period) index over live interest postings
    interest_index: Table<(AccountId, Period), RecordId>,
    member_seq: u64,
    account_seq: u64,
    pub events: EventStore,
}

impl Tables {
    pub fn member(&self, id: MemberId) -> Result<&Member> {
        self.members.get(&id).ok_or(SaccoError::MemberNotFound { id })
    }

    pub fn member_mut(&mut self, id: MemberId) -> Result<&mut Member> {
        self.members.get_mut(&id).ok_or(SaccoError::MemberNotFound { id })
    }

    pub fn account_type(&self, id: AccountTypeId) -> Result<&AccountType> {
        self.account_types.get(&id).ok_or(SaccoError::AccountTypeNotFound { id })
    }

    pub fn account(&self, id: AccountId) -> Result<&SavingAccount> {
        self.accounts.get(&id).ok_or(SaccoError::AccountNotFound { id })
    }

    pub fn account_mut(&mut self, id: AccountId) -> Result<&mut SavingAccount> {
        self.accounts.get_mut(&id).ok_or(SaccoError::AccountNotFound { id })
    }

    pub fn saving(&self, id: RecordId) -> Result<&Saving> {
        self.savings.get(&id).ok_or(not_found(RecordKind::Saving, id))
    }

    pub fn saving_mut(&mut self, id: RecordId) -> Result<&mut Saving> {
        self.savings.get_mut(&id).ok_or(not_found(RecordKind::Saving, id))
    }

    pub fn share_mut(&mut self, id: RecordId) -> Result<&mut Share> {
        self.shares.get_mut(&id).ok_or(not_found(RecordKind::Share, id))
    }

    pub fn dividend_mut(&mut self, id: RecordId) -> Result<&mut Dividend> {
        self.dividends.get_mut(&id).ok_or(not_found(RecordKind::Dividend, id))
    }

    pub fn applied_charge_mut(&mut self, id: RecordId) -> Result<&mut AppliedServiceCharge> {
        self.applied_charges
            .get_mut(&id)
            .ok_or(not_found(RecordKind::ServiceCharge, id))
    }

    pub fn service_charge(&self, id: ServiceChargeId) -> Result<&ServiceCharge> {
        self.service_charges
            .get(&id)
            .ok_or(SaccoError::ServiceChargeNotFound { id })
    }

    pub fn loan_type(&self, id: LoanTypeId) -> Result<&LoanType> {
        self.loan_types.get(&id).ok_or(SaccoError::LoanTypeNotFound { id })
    }

    pub fn loan(&self, id: LoanId) -> Result<&Loan> {
        self.loans.get(&id).ok_or(SaccoError::LoanNotFound { id })
    }

    pub fn loan_mut(&mut self, id: LoanId) -> Result<&mut Loan> {
        self.loans.get_mut(&id).ok_or(SaccoError::LoanNotFound { id })
    }

    /// M-0001, M-0002, ...
    pub fn next_member_number(&mut self) -> String {
        self.member_seq += 1;
        format!("M-{:04}", self.member_seq)
    }

    /// SA-000001, SA-000002, ...
    pub fn next_account_number(&mut self) -> String {
        self.account_seq += 1;
        format!("SA-{:06}", self.account_seq)
    }

    pub fn savings_for_account(&self, account_id: AccountId) -> impl Iterator<Item = &Saving> {
        self.savings.values().filter(move |s| s.account_id == account_id)
    }

    /// approved movements of an account in date order
    pub fn approved_movements(&self, account_id: AccountId) -> Vec<Movement> {
        let mut approved: Vec<&Saving> = self
            .savings_for_account(account_id)
            .filter(|s| s.approval.is_approved())
            .collect();
        approved.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.created_at.cmp(&b.created_at)));
        approved.iter().map(|s| s.movement()).collect()
    }

    /// full balance history of an account: the opening deposit on
    /// `opened_on` followed by its approved movements
    pub fn account_history(&self, account: &SavingAccount) -> Vec<Movement> {
        let mut history = vec![account.opening_movement()];
        history.extend(self.approved_movements(account.id));
        history
    }

    /// loans of a given type the member still has open
    pub fn open_loans(&self, member_id: MemberId, loan_type_id: LoanTypeId) -> usize {
        self.loans
            .values()
            .filter(|l| l.member_id == member_id && l.loan_type_id == loan_type_id && l.status.is_open())
            .count()
    }

    pub fn interest_posting(&self, account_id: AccountId, period: Period) -> Option<RecordId> {
        self.interest_index.get(&(account_id, period)).copied()
    }

    /// claim the (account, period) slot; a second claim fails
    pub fn insert_interest_posting(&mut self, account_id: AccountId, period: Period, saving_id: RecordId) -> Result<()> {
        if self.interest_index.contains_key(&(account_id, period)) {
            return Err(SaccoError::DuplicateInterestPosting { account_id, period });
        }
        self.interest_index.insert((account_id, period), saving_id);
        Ok(())
    }

    /// free the slot when its posting is rejected or deleted
    pub fn release_interest_posting(&mut self, account_id: AccountId, period: Period, saving_id: RecordId) {
        if self.interest_index.get(&(account_id, period)) == Some(&saving_id) {
            self.interest_index.remove(&(account_id, period));
        }
    }

    /// Rebuild a member's totals from approved records.
    ///
    /// Must always agree with the stored aggregates on the member.
    pub fn recompute_aggregates(&self, member_id: MemberId) -> Result<MemberAggregates> {
        self.member(member_id)?;

        let opening: Money = self
            .accounts
            .values()
            .filter(|a| a.member_id == member_id)
            .map(|a| a.initial_balance)
            .sum();

        let movements: Money = self
            .savings
            .values()
            .filter(|s| s.member_id == member_id && s.approval.is_approved())
            .map(|s| s.signed_amount())
            .sum();

        let share_count = self
            .shares
            .values()
            .filter(|s| s.member_id == member_id && s.approval.is_approved())
            .map(|s| s.shares)
            .sum();

        let dividends_earned = self
            .dividends
            .values()
            .filter(|d| d.member_id == member_id && d.approval.is_approved())
            .map(|d| d.amount)
            .sum();

        let service_charges_applied = self
            .applied_charges
            .values()
            .filter(|c| c.member_id == member_id && c.approval.is_approved())
            .map(|c| c.amount)
            .sum();

        Ok(MemberAggregates {
            savings_balance: opening + movements,
            share_count,
            dividends_earned,
            service_charges_applied,
        })
    }
}

fn not_found(kind: RecordKind, id: Uuid) -> SaccoError {
    SaccoError::RecordNotFound { kind, id }
}

#[derive(Debug, Default)]
pub struct Store {
    tables: Tables,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// committed state
    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// run `f` against a staged copy and commit only on success
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Tables) -> Result<T>,
    {
        // the audit log is not staged; new events are appended on commit
        let history = std::mem::take(&mut self.tables.events);
        let mut staged = self.tables.clone();

        match f(&mut staged) {
            Ok(value) => {
                let emitted = staged.events.take_events();
                self.tables = staged;
                self.tables.events = history;
                self.tables.events.extend(emitted);
                Ok(value)
            }
            Err(err) => {
                self.tables.events = history;
                Err(err)
            }
        }
    }

    pub fn events_mut(&mut self) -> &mut EventStore {
        &mut self.tables.events
    }
}

/// point-in-time copy of the committed records, serializable as json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub snapshot_id: Uuid,
    pub taken_at: DateTime<Utc>,
    pub members: Vec<Member>,
    pub accounts: Vec<SavingAccount>,
    pub savings: Vec<Saving>,
    pub shares: Vec<Share>,
    pub dividends: Vec<Dividend>,
    pub applied_charges: Vec<AppliedServiceCharge>,
    pub loans: Vec<Loan>,
    pub repayments: Vec<LoanRepayment>,
}

impl StoreSnapshot {
    pub fn capture(tables: &Tables, taken_at: DateTime<Utc>) -> Self {
        let mut members: Vec<Member> = tables.members.values().cloned().collect();
        members.sort_by(|a, b| a.member_number.cmp(&b.member_number));
        let mut accounts: Vec<SavingAccount> = tables.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.account_number.cmp(&b.account_number));

        Self {
            snapshot_id: Uuid::new_v4(),
            taken_at,
            members,
            accounts,
            savings: sorted_by_creation(tables.savings.values(), |s| s.created_at),
            shares: sorted_by_creation(tables.shares.values(), |s| s.created_at),
            dividends: sorted_by_creation(tables.dividends.values(), |d| d.created_at),
            applied_charges: sorted_by_creation(tables.applied_charges.values(), |c| c.created_at),
            loans: sorted_by_creation(tables.loans.values(), |l| l.created_at),
            repayments: sorted_by_creation(tables.repayments.values(), |r| r.created_at),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}

fn sorted_by_creation<'a, T, I, K>(records: I, key: K) -> Vec<T>
where
    T: Clone + 'a,
    I: Iterator<Item = &'a T>,
    K: Fn(&T) -> DateTime<Utc>,
{
    let mut out: Vec<T> = records.cloned().collect();
    out.sort_by_key(|r| key(r));
    out
}
