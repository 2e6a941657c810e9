use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{Result, SaccoError};
use crate::types::Period;

/// cooperative-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaccoConfig {
    /// notes prefix that marks a saving as a monthly interest posting
    pub interest_note_prefix: String,
    /// price of a single share
    pub share_price: Money,
    /// savings products registered at startup
    pub account_products: Vec<AccountTerms>,
    /// loan products registered at startup
    pub loan_products: Vec<LoanTerms>,
}

impl Default for SaccoConfig {
    fn default() -> Self {
        Self {
            interest_note_prefix: "Monthly interest".to_string(),
            share_price: Money::from_major(100),
            account_products: vec![AccountTerms::ordinary_savings(), AccountTerms::fixed_deposit()],
            loan_products: vec![
                LoanTerms::emergency(),
                LoanTerms::development(),
                LoanTerms::school_fees(),
            ],
        }
    }
}

impl SaccoConfig {
    /// parse from json and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SaccoConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interest_note_prefix.trim().is_empty() {
            return Err(SaccoError::InvalidField {
                field: "interest_note_prefix",
                message: "must not be empty".to_string(),
            });
        }

        if !self.share_price.is_positive() {
            return Err(SaccoError::InvalidAmount {
                amount: self.share_price,
            });
        }

        for terms in &self.account_products {
            terms.validate()?;
        }
        for terms in &self.loan_products {
            terms.validate()?;
        }

        Ok(())
    }

    /// notes string carried by the interest posting for `period`
    pub fn interest_note(&self, period: Period) -> String {
        format!("{} {}", self.interest_note_prefix, period)
    }
}

/// savings product terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountTerms {
    pub name: String,
    pub annual_rate: Rate,
}

impl AccountTerms {
    pub fn new(name: impl Into<String>, annual_rate: Rate) -> Self {
        Self {
            name: name.into(),
            annual_rate,
        }
    }

    pub fn ordinary_savings() -> Self {
        Self::new("Ordinary savings", Rate::from_percentage(6))
    }

    pub fn fixed_deposit() -> Self {
        Self::new("Fixed deposit", Rate::from_decimal(dec!(0.095)))
    }

    pub fn validate(&self) -> Result<()> {
        validate_name("account type name", &self.name)?;
        validate_rate(self.annual_rate)
    }
}

/// loan product terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub name: String,
    pub annual_rate: Rate,
    /// rate applied once a loan misses its grace period
    pub npl_rate: Option<Rate>,
    pub grace_period_days: u32,
    pub maximum_amount: Option<Money>,
    /// whether a member may hold more than one open loan of this type
    pub allow_concurrent: bool,
}

impl LoanTerms {
    pub fn emergency() -> Self {
        Self {
            name: "Emergency".to_string(),
            annual_rate: Rate::from_percentage(12),
            npl_rate: Some(Rate::from_percentage(18)),
            grace_period_days: 30,
            maximum_amount: Some(Money::from_major(50_000)),
            allow_concurrent: false,
        }
    }

    pub fn development() -> Self {
        Self {
            name: "Development".to_string(),
            annual_rate: Rate::from_percentage(10),
            npl_rate: Some(Rate::from_percentage(15)),
            grace_period_days: 60,
            maximum_amount: Some(Money::from_major(500_000)),
            allow_concurrent: true,
        }
    }

    pub fn school_fees() -> Self {
        Self {
            name: "School fees".to_string(),
            annual_rate: Rate::from_percentage(8),
            npl_rate: None,
            grace_period_days: 90,
            maximum_amount: Some(Money::from_major(200_000)),
            allow_concurrent: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_name("loan type name", &self.name)?;
        validate_rate(self.annual_rate)?;
        if let Some(npl) = self.npl_rate {
            validate_rate(npl)?;
        }
        if let Some(maximum) = self.maximum_amount {
            if !maximum.is_positive() {
                return Err(SaccoError::InvalidAmount { amount: maximum });
            }
        }
        Ok(())
    }
}

fn validate_name(field: &'static str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SaccoError::InvalidField {
            field,
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn validate_rate(rate: Rate) -> Result<()> {
    if rate.is_negative() {
        return Err(SaccoError::InvalidInterestRate { rate });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SaccoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.loan_products.len(), 3);
        assert_eq!(config.account_products.len(), 2);
    }

    #[test]
    fn test_interest_note() {
        let config = SaccoConfig::default();
        let period = Period::new(2024, 6).unwrap();
        assert_eq!(config.interest_note(period), "Monthly interest 2024-06");
    }

    #[test]
    fn test_json_round_trip_keeps_products() {
        let config = SaccoConfig::default();
        let json = config.to_json_pretty().unwrap();
        let parsed = SaccoConfig::from_json(&json).unwrap();

        assert_eq!(parsed.loan_products, config.loan_products);
        assert_eq!(parsed.share_price, config.share_price);
    }

    #[test]
    fn test_from_json_rejects_negative_rate() {
        let json = r#"{
            "interest_note_prefix": "Interest",
            "share_price": "50",
            "account_products": [{ "name": "Junior", "annual_rate": "-0.01" }],
            "loan_products": []
        }"#;

        assert!(matches!(
            SaccoConfig::from_json(json),
            Err(SaccoError::InvalidInterestRate { .. })
        ));
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        assert!(matches!(
            SaccoConfig::from_json("{ not json"),
            Err(SaccoError::Serialization(_))
        ));
    }
}
