pub mod approval;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod interest;
pub mod ledger;
pub mod loans;
pub mod member;
pub mod principal;
pub mod savings;
pub mod service;
pub mod store;
pub mod types;

// re-export key types
pub use approval::{Approvable, Approval, ApprovalStatus, RecordRef};
pub use config::{AccountTerms, LoanTerms, SaccoConfig};
pub use decimal::{Money, Rate};
pub use errors::{ErrorCategory, Result, SaccoError};
pub use events::{Event, EventStore};
pub use interest::{calculate_monthly_interest, InterestCalculation, InterestQuote, QuoteOutcome};
pub use ledger::MemberTransaction;
pub use loans::{allocate_repayment, Loan, LoanApplication, LoanStatus, RepaymentAllocation, RepaymentRequest};
pub use member::{Member, MemberAggregates, NewMember};
pub use principal::{Principal, Role};
pub use savings::{reconstruct_balance, Movement, NewSaving, NewSavingAccount, Saving, SavingAccount};
pub use service::{RepaymentOutcome, Sacco};
pub use types::{MemberStatus, Period, RecordKind, TransactionType};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
