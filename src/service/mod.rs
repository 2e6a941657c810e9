//! Request-handler sized operations over the store.
//!
//! Every write authorizes the caller, runs inside one store transaction and
//! records its audit events in that same transaction. Reads return owned
//! copies so the web layer can serialize them freely.

pub mod approvals;
pub mod interest;
pub mod loans;
pub mod records;
pub mod savings;

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use uuid::Uuid;

use crate::approval::ServiceCharge;
use crate::config::{AccountTerms, LoanTerms, SaccoConfig};
use crate::decimal::Money;
use crate::errors::{ErrorCategory, Result, SaccoError};
use crate::events::Event;
use crate::ledger::{sort_chronologically, MemberTransaction};
use crate::loans::LoanType;
use crate::member::{Member, MemberAggregates, NewMember};
use crate::principal::Principal;
use crate::savings::AccountType;
use crate::store::{Store, StoreSnapshot, Tables};
use crate::types::{MemberId, MemberStatus};

pub use loans::RepaymentOutcome;

/// what a write closure sees besides the staged tables
pub(crate) struct WriteContext<'a> {
    pub config: &'a SaccoConfig,
    pub now: DateTime<Utc>,
    pub user: &'a str,
}

impl WriteContext<'_> {
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// cooperative back office
pub struct Sacco<'t> {
    config: SaccoConfig,
    store: Store,
    time: &'t SafeTimeProvider,
}

impl<'t> Sacco<'t> {
    /// create a sacco and register the configured products
    pub fn new(config: SaccoConfig, time: &'t SafeTimeProvider) -> Result<Self> {
        config.validate()?;

        let mut store = Store::new();
        store.transaction(|t| {
            for terms in &config.account_products {
                let id = Uuid::new_v4();
                t.account_types.insert(
                    id,
                    AccountType {
                        id,
                        name: terms.name.clone(),
                        annual_rate: terms.annual_rate,
                    },
                );
            }
            for terms in &config.loan_products {
                let id = Uuid::new_v4();
                t.loan_types.insert(id, LoanType::from_terms(id, terms.clone()));
            }
            Ok(())
        })?;

        tracing::info!(
            account_products = config.account_products.len(),
            loan_products = config.loan_products.len(),
            "sacco initialised"
        );

        Ok(Self { config, store, time })
    }

    pub fn config(&self) -> &SaccoConfig {
        &self.config
    }

    /// committed state, read only
    pub fn tables(&self) -> &Tables {
        self.store.tables()
    }

    pub fn today(&self) -> NaiveDate {
        self.time.now().date_naive()
    }

    /// run `f` in one transaction and log the outcome
    pub(crate) fn write<T, F>(&mut self, operation: &'static str, principal: &Principal, f: F) -> Result<T>
    where
        F: FnOnce(&mut Tables, &WriteContext<'_>) -> Result<T>,
    {
        let ctx = WriteContext {
            config: &self.config,
            now: self.time.now(),
            user: &principal.user_id,
        };
        let result = self.store.transaction(|t| f(t, &ctx));
        log_outcome(operation, principal, &result);
        result
    }

    // membership

    pub fn enroll_member(&mut self, principal: &Principal, new: NewMember) -> Result<Member> {
        principal.require_staff("enroll members")?;
        new.validate()?;

        self.write("enroll_member", principal, |t, ctx| {
            let id = Uuid::new_v4();
            let number = t.next_member_number();
            let member = Member::enroll(id, number, new, ctx.now);

            t.events.emit(Event::MemberEnrolled {
                member_id: id,
                name: member.name.clone(),
                timestamp: ctx.now,
            });
            t.members.insert(id, member.clone());
            Ok(member)
        })
    }

    pub fn set_member_status(&mut self, principal: &Principal, member_id: MemberId, status: MemberStatus) -> Result<Member> {
        principal.require_staff("change member status")?;

        self.write("set_member_status", principal, |t, ctx| {
            let member = t.member_mut(member_id)?;
            let old_status = member.status;
            member.status = status;
            let member = member.clone();

            if old_status != status {
                t.events.emit(Event::MemberStatusChanged {
                    member_id,
                    old_status,
                    new_status: status,
                    timestamp: ctx.now,
                });
            }
            Ok(member)
        })
    }

    pub fn member(&self, principal: &Principal, member_id: MemberId) -> Result<Member> {
        principal.require_member_access(&member_id, "view member")?;
        self.tables().member(member_id).cloned()
    }

    /// all members by member number
    pub fn members(&self, principal: &Principal) -> Result<Vec<Member>> {
        principal.require_staff("list members")?;
        let mut members: Vec<Member> = self.tables().members.values().cloned().collect();
        members.sort_by(|a, b| a.member_number.cmp(&b.member_number));
        Ok(members)
    }

    // catalogs

    pub fn create_account_type(&mut self, principal: &Principal, terms: AccountTerms) -> Result<AccountType> {
        principal.require_staff("manage account types")?;
        terms.validate()?;

        self.write("create_account_type", principal, |t, _| {
            let id = Uuid::new_v4();
            let account_type = AccountType {
                id,
                name: terms.name,
                annual_rate: terms.annual_rate,
            };
            t.account_types.insert(id, account_type.clone());
            Ok(account_type)
        })
    }

    pub fn create_loan_type(&mut self, principal: &Principal, terms: LoanTerms) -> Result<LoanType> {
        principal.require_staff("manage loan types")?;
        terms.validate()?;

        self.write("create_loan_type", principal, |t, _| {
            let id = Uuid::new_v4();
            let loan_type = LoanType::from_terms(id, terms);
            t.loan_types.insert(id, loan_type.clone());
            Ok(loan_type)
        })
    }

    pub fn create_service_charge(&mut self, principal: &Principal, name: &str, amount: Money) -> Result<ServiceCharge> {
        principal.require_staff("manage service charges")?;
        if name.trim().is_empty() {
            return Err(SaccoError::InvalidField {
                field: "name",
                message: "service charge name must not be empty".to_string(),
            });
        }
        crate::approval::records::require_positive(amount)?;

        self.write("create_service_charge", principal, |t, _| {
            let id = Uuid::new_v4();
            let charge = ServiceCharge {
                id,
                name: name.trim().to_string(),
                amount,
            };
            t.service_charges.insert(id, charge.clone());
            Ok(charge)
        })
    }

    pub fn account_type_named(&self, name: &str) -> Option<&AccountType> {
        self.tables().account_types.values().find(|a| a.name == name)
    }

    pub fn loan_type_named(&self, name: &str) -> Option<&LoanType> {
        self.tables().loan_types.values().find(|l| l.name == name)
    }

    pub fn service_charge_named(&self, name: &str) -> Option<&ServiceCharge> {
        self.tables().service_charges.values().find(|c| c.name == name)
    }

    // listings

    /// every record of a member, oldest first
    pub fn member_statement(&self, principal: &Principal, member_id: MemberId) -> Result<Vec<MemberTransaction>> {
        principal.require_member_access(&member_id, "view statements")?;
        let t = self.tables();
        t.member(member_id)?;

        let mut lines: Vec<MemberTransaction> = t
            .savings
            .values()
            .filter(|r| r.member_id == member_id)
            .cloned()
            .map(MemberTransaction::Saving)
            .chain(t.shares.values().filter(|r| r.member_id == member_id).cloned().map(MemberTransaction::Share))
            .chain(
                t.dividends
                    .values()
                    .filter(|r| r.member_id == member_id)
                    .cloned()
                    .map(MemberTransaction::Dividend),
            )
            .chain(
                t.applied_charges
                    .values()
                    .filter(|r| r.member_id == member_id)
                    .cloned()
                    .map(MemberTransaction::ServiceCharge),
            )
            .chain(
                t.repayments
                    .values()
                    .filter(|r| r.member_id == member_id)
                    .cloned()
                    .map(MemberTransaction::LoanRepayment),
            )
            .collect();

        sort_chronologically(&mut lines);
        Ok(lines)
    }

    /// records awaiting a decision, oldest first
    pub fn pending_approvals(&self, principal: &Principal) -> Result<Vec<MemberTransaction>> {
        principal.require_staff("view the approval queue")?;
        let t = self.tables();

        let mut queue: Vec<MemberTransaction> = t
            .savings
            .values()
            .filter(|r| r.approval.is_pending())
            .cloned()
            .map(MemberTransaction::Saving)
            .chain(t.shares.values().filter(|r| r.approval.is_pending()).cloned().map(MemberTransaction::Share))
            .chain(
                t.dividends
                    .values()
                    .filter(|r| r.approval.is_pending())
                    .cloned()
                    .map(MemberTransaction::Dividend),
            )
            .chain(
                t.applied_charges
                    .values()
                    .filter(|r| r.approval.is_pending())
                    .cloned()
                    .map(MemberTransaction::ServiceCharge),
            )
            .collect();

        sort_chronologically(&mut queue);
        Ok(queue)
    }

    /// check stored aggregates against a recomputation from approved records
    pub fn reconcile_member(&self, principal: &Principal, member_id: MemberId) -> Result<MemberAggregates> {
        principal.require_staff("reconcile members")?;
        let stored = self.tables().member(member_id)?.aggregates();
        let computed = self.tables().recompute_aggregates(member_id)?;

        if stored != computed {
            let err = SaccoError::storage(format!(
                "member {} aggregates drifted: stored {:?}, computed {:?}",
                member_id, stored, computed
            ));
            tracing::error!(member_id = %member_id, error = %err, "aggregate mismatch");
            return Err(err);
        }
        Ok(stored)
    }

    pub fn snapshot(&self, principal: &Principal) -> Result<StoreSnapshot> {
        principal.require_staff("export snapshots")?;
        Ok(StoreSnapshot::capture(self.tables(), self.time.now()))
    }

    // audit trail

    pub fn events(&self) -> &[Event] {
        self.tables().events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.store.events_mut().take_events()
    }
}

fn log_outcome<T>(operation: &'static str, principal: &Principal, result: &Result<T>) {
    match result {
        Ok(_) => tracing::info!(operation, user = %principal.user_id, "committed"),
        Err(err) => match err.category() {
            ErrorCategory::Unexpected => {
                tracing::error!(operation, user = %principal.user_id, error = %err, "operation failed")
            }
            category => tracing::warn!(
                operation,
                user = %principal.user_id,
                category = ?category,
                error = %err,
                "operation rejected"
            ),
        },
    }
}
