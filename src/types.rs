use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{Result, SaccoError};

/// unique identifier for a member
pub type MemberId = Uuid;
/// unique identifier for a savings account
pub type AccountId = Uuid;
/// unique identifier for a savings product
pub type AccountTypeId = Uuid;
/// unique identifier for a loan
pub type LoanId = Uuid;
/// unique identifier for a loan product
pub type LoanTypeId = Uuid;
/// unique identifier for a service charge in the catalog
pub type ServiceChargeId = Uuid;
/// unique identifier for any financial record (saving, share, dividend...)
pub type RecordId = Uuid;

/// member status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Inactive,
}

/// direction of a savings movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

impl TransactionType {
    /// deposits add, withdrawals subtract
    pub fn signed(&self, amount: Money) -> Money {
        match self {
            TransactionType::Deposit => amount,
            TransactionType::Withdrawal => -amount,
        }
    }
}

/// kinds of records a member statement can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Saving,
    Share,
    Dividend,
    ServiceCharge,
    LoanRepayment,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Saving => "saving",
            RecordKind::Share => "share",
            RecordKind::Dividend => "dividend",
            RecordKind::ServiceCharge => "service charge",
            RecordKind::LoanRepayment => "loan repayment",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a calendar month
///
/// Bounds are resolved when the period is built, so every `Period` in
/// circulation names a real month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

/// wire form of a period: `{ "year": 2024, "month": 6 }`
#[derive(Serialize, Deserialize)]
struct PeriodParts {
    year: i32,
    month: u32,
}

impl Period {
    /// create a period; `month` is 1-based (1 = january)
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(SaccoError::InvalidPeriod {
                message: format!("month {} is outside 1..=12", month),
            });
        }

        // out-of-range years are rejected by chrono
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| SaccoError::InvalidPeriod {
            message: format!("{}-{:02} is not a representable month", year, month),
        })?;

        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| SaccoError::InvalidPeriod {
                message: format!("{}-{:02} has no representable end date", year, month),
            })?;

        Ok(Self { start, end })
    }

    /// period containing the given date
    pub fn containing(date: NaiveDate) -> Result<Self> {
        Period::new(date.year(), date.month())
    }

    pub fn year(&self) -> i32 {
        self.start.year()
    }

    pub fn month(&self) -> u32 {
        self.start.month()
    }

    /// first calendar day
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// last calendar day
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// number of calendar days
    pub fn days(&self) -> u32 {
        self.end.day()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// following month
    pub fn next(&self) -> Result<Self> {
        if self.month() == 12 {
            Period::new(self.year() + 1, 1)
        } else {
            Period::new(self.year(), self.month() + 1)
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        PeriodParts {
            year: self.year(),
            month: self.month(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let parts = PeriodParts::deserialize(deserializer)?;
        Period::new(parts.year, parts.month).map_err(de::Error::custom)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_bounds() {
        let june = Period::new(2024, 6).unwrap();
        assert_eq!(june.start(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(june.end(), NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert_eq!(june.days(), 30);

        let december = Period::new(2023, 12).unwrap();
        assert_eq!(december.end(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(december.days(), 31);
        assert_eq!(december.next().unwrap(), Period::new(2024, 1).unwrap());
    }

    #[test]
    fn test_leap_february() {
        assert_eq!(Period::new(2024, 2).unwrap().days(), 29);
        assert_eq!(Period::new(2023, 2).unwrap().days(), 28);
        assert_eq!(Period::new(2000, 2).unwrap().days(), 29);
        assert_eq!(Period::new(1900, 2).unwrap().days(), 28);
    }

    #[test]
    fn test_invalid_month() {
        assert!(matches!(Period::new(2024, 0), Err(SaccoError::InvalidPeriod { .. })));
        assert!(matches!(Period::new(2024, 13), Err(SaccoError::InvalidPeriod { .. })));
    }

    #[test]
    fn test_period_json_goes_through_validation() {
        let june: Period = serde_json::from_str(r#"{"year":2024,"month":6}"#).unwrap();
        assert_eq!(june, Period::new(2024, 6).unwrap());
        assert_eq!(june.end(), NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert_eq!(serde_json::to_string(&june).unwrap(), r#"{"year":2024,"month":6}"#);

        assert!(serde_json::from_str::<Period>(r#"{"year":2024,"month":13}"#).is_err());
        assert!(serde_json::from_str::<Period>(r#"{"year":2024,"month":0}"#).is_err());
        assert!(serde_json::from_str::<Period>(r#"{"year":999999,"month":1}"#).is_err());
    }

    #[test]
    fn test_period_display_and_contains() {
        let period = Period::containing(NaiveDate::from_ymd_opt(2024, 3, 17).unwrap()).unwrap();
        assert_eq!(period.to_string(), "2024-03");
        assert!(period.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        assert!(period.contains(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
    }

    #[test]
    fn test_transaction_sign() {
        let amount = Money::from_major(30);
        assert_eq!(TransactionType::Deposit.signed(amount), amount);
        assert_eq!(TransactionType::Withdrawal.signed(amount), -amount);
    }
}
