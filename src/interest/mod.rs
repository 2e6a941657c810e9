pub mod average_daily;
pub mod posting;

pub use average_daily::{calculate_monthly_interest, InterestCalculation};
pub use posting::{classify, has_prior_posting, InterestQuote, QuoteOutcome};
