use uuid::Uuid;

use crate::approval::{Approvable, Approval};
use crate::config::SaccoConfig;
use crate::decimal::Money;
use crate::errors::{Result, SaccoError};
use crate::events::Event;
use crate::interest::{calculate_monthly_interest, classify, has_prior_posting, InterestQuote, QuoteOutcome};
use crate::principal::Principal;
use crate::savings::{Saving, SavingAccount};
use crate::store::Tables;
use crate::types::{Period, TransactionType};

use super::Sacco;

impl Sacco<'_> {
    /// Dry run of the monthly interest for every account.
    ///
    /// Nothing is written; each quote says whether the account would be
    /// posted and why not otherwise.
    pub fn quote_interest(&self, principal: &Principal, period: Period) -> Result<Vec<InterestQuote>> {
        principal.require_staff("quote interest")?;
        quote_in(self.tables(), &self.config, period)
    }

    /// Post the monthly interest as pending deposits dated on the last day of
    /// the period. All accounts are posted or none are.
    pub fn post_interest(&mut self, principal: &Principal, period: Period) -> Result<Vec<Saving>> {
        principal.require_staff("post interest")?;
        let today = self.today();
        if period.end() >= today {
            return Err(SaccoError::InvalidPeriod {
                message: format!("{} has not ended yet", period),
            });
        }

        let posted = self.write("post_interest", principal, |t, ctx| {
            let quotes = quote_in(t, ctx.config, period)?;
            let note = ctx.config.interest_note(period);
            let mut posted = Vec::new();

            for quote in quotes.iter().filter(|q| q.is_postable()) {
                let saving = Saving {
                    id: Uuid::new_v4(),
                    account_id: quote.account_id,
                    member_id: quote.member_id,
                    transaction_type: TransactionType::Deposit,
                    amount: quote.calculation.interest,
                    date: period.end(),
                    notes: Some(note.clone()),
                    interest_period: Some(period),
                    approval: Approval::pending(),
                    created_at: ctx.now,
                };

                t.insert_interest_posting(saving.account_id, period, saving.id)?;
                t.events.emit(Event::RecordSubmitted {
                    kind: Saving::KIND,
                    record_id: saving.id,
                    member_id: saving.member_id,
                    amount: saving.amount,
                    timestamp: ctx.now,
                });
                t.events.emit(Event::InterestPosted {
                    account_id: saving.account_id,
                    saving_id: saving.id,
                    period,
                    amount: saving.amount,
                    timestamp: ctx.now,
                });
                t.savings.insert(saving.id, saving.clone());
                posted.push(saving);
            }
            Ok(posted)
        })?;

        let total: Money = posted.iter().map(|s| s.amount).sum();
        tracing::info!(period = %period, accounts = posted.len(), total = %total, "monthly interest posted");
        Ok(posted)
    }
}

fn quote_in(t: &Tables, config: &SaccoConfig, period: Period) -> Result<Vec<InterestQuote>> {
    let note = config.interest_note(period);

    let mut accounts: Vec<&SavingAccount> = t.accounts.values().collect();
    accounts.sort_by(|a, b| a.account_number.cmp(&b.account_number));

    let mut quotes = Vec::with_capacity(accounts.len());
    for account in accounts {
        let rate = t
            .account_type(account.account_type_id)
            .map_err(|_| {
                SaccoError::storage(format!(
                    "account {} references missing account type {}",
                    account.account_number, account.account_type_id
                ))
            })?
            .annual_rate;

        let (outcome, calculation) = if account.opened_on > period.end() {
            let calculation = calculate_monthly_interest(Money::ZERO, &[], period, rate)?;
            (QuoteOutcome::NotOpen, calculation)
        } else {
            let history = t.account_history(account);
            let calculation = calculate_monthly_interest(Money::ZERO, &history, period, rate)?;
            let already_posted = t.interest_posting(account.id, period).is_some()
                || has_prior_posting(t.savings_for_account(account.id), &note);
            (classify(&calculation, already_posted), calculation)
        };

        tracing::debug!(
            account = %account.account_number,
            period = %period,
            interest = %calculation.interest,
            outcome = ?outcome,
            "interest quoted"
        );

        quotes.push(InterestQuote {
            account_id: account.id,
            account_number: account.account_number.clone(),
            member_id: account.member_id,
            calculation,
            outcome,
        });
    }
    Ok(quotes)
}
