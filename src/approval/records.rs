use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{Result, SaccoError};
use crate::types::{MemberId, RecordId, RecordKind, ServiceChargeId};

use super::{Approvable, Approval};

/// share allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub id: RecordId,
    pub member_id: MemberId,
    pub shares: u32,
    pub price_per_share: Money,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub approval: Approval,
    pub created_at: DateTime<Utc>,
}

impl Share {
    pub fn total_value(&self) -> Money {
        self.price_per_share.times(self.shares)
    }
}

impl Approvable for Share {
    const KIND: RecordKind = RecordKind::Share;

    fn id(&self) -> RecordId {
        self.id
    }

    fn member_id(&self) -> MemberId {
        self.member_id
    }

    fn amount(&self) -> Money {
        self.total_value()
    }

    fn approval(&self) -> &Approval {
        &self.approval
    }

    fn approval_mut(&mut self) -> &mut Approval {
        &mut self.approval
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewShare {
    pub member_id: MemberId,
    pub shares: u32,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

impl NewShare {
    pub fn validate(&self) -> Result<()> {
        validate_share_count(self.shares)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShareEdit {
    pub shares: Option<u32>,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl ShareEdit {
    pub fn apply(&self, share: &mut Share) -> Result<()> {
        if let Some(shares) = self.shares {
            validate_share_count(shares)?;
            share.shares = shares;
        }
        if let Some(date) = self.date {
            share.date = date;
        }
        if let Some(notes) = &self.notes {
            share.notes = Some(notes.clone());
        }
        Ok(())
    }
}

fn validate_share_count(shares: u32) -> Result<()> {
    if shares == 0 {
        return Err(SaccoError::InvalidField {
            field: "shares",
            message: "at least one share must be allocated".to_string(),
        });
    }
    Ok(())
}

/// dividend credited to a member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub id: RecordId,
    pub member_id: MemberId,
    pub amount: Money,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub approval: Approval,
    pub created_at: DateTime<Utc>,
}

impl Approvable for Dividend {
    const KIND: RecordKind = RecordKind::Dividend;

    fn id(&self) -> RecordId {
        self.id
    }

    fn member_id(&self) -> MemberId {
        self.member_id
    }

    fn amount(&self) -> Money {
        self.amount
    }

    fn approval(&self) -> &Approval {
        &self.approval
    }

    fn approval_mut(&mut self) -> &mut Approval {
        &mut self.approval
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDividend {
    pub member_id: MemberId,
    pub amount: Money,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

/// service charge catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCharge {
    pub id: ServiceChargeId,
    pub name: String,
    pub amount: Money,
}

/// service charge levied on a member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedServiceCharge {
    pub id: RecordId,
    pub member_id: MemberId,
    pub service_charge_id: ServiceChargeId,
    pub amount: Money,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub approval: Approval,
    pub created_at: DateTime<Utc>,
}

impl Approvable for AppliedServiceCharge {
    const KIND: RecordKind = RecordKind::ServiceCharge;

    fn id(&self) -> RecordId {
        self.id
    }

    fn member_id(&self) -> MemberId {
        self.member_id
    }

    fn amount(&self) -> Money {
        self.amount
    }

    fn approval(&self) -> &Approval {
        &self.approval
    }

    fn approval_mut(&mut self) -> &mut Approval {
        &mut self.approval
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAppliedServiceCharge {
    pub member_id: MemberId,
    pub service_charge_id: ServiceChargeId,
    /// defaults to the catalog amount
    pub amount: Option<Money>,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

/// edit of a dividend or applied service charge
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordEdit {
    pub amount: Option<Money>,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl RecordEdit {
    pub fn apply_to_dividend(&self, dividend: &mut Dividend) -> Result<()> {
        self.apply(&mut dividend.amount, &mut dividend.date, &mut dividend.notes)
    }

    pub fn apply_to_charge(&self, charge: &mut AppliedServiceCharge) -> Result<()> {
        self.apply(&mut charge.amount, &mut charge.date, &mut charge.notes)
    }

    fn apply(&self, amount: &mut Money, date: &mut NaiveDate, notes: &mut Option<String>) -> Result<()> {
        if let Some(new_amount) = self.amount {
            require_positive(new_amount)?;
            *amount = new_amount;
        }
        if let Some(new_date) = self.date {
            *date = new_date;
        }
        if let Some(new_notes) = &self.notes {
            *notes = Some(new_notes.clone());
        }
        Ok(())
    }
}

pub(crate) fn require_positive(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(SaccoError::InvalidAmount { amount });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn share(shares: u32) -> Share {
        Share {
            id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            shares,
            price_per_share: Money::from_major(100),
            date: date(2024, 1, 10),
            notes: None,
            approval: Approval::pending(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_share_value() {
        assert_eq!(share(12).amount(), Money::from_major(1_200));
    }

    #[test]
    fn test_share_edit() {
        let mut record = share(5);
        let edit = ShareEdit {
            shares: Some(8),
            notes: Some("top up".to_string()),
            ..ShareEdit::default()
        };
        edit.apply(&mut record).unwrap();
        assert_eq!(record.shares, 8);
        assert_eq!(record.notes.as_deref(), Some("top up"));

        let zero = ShareEdit {
            shares: Some(0),
            ..ShareEdit::default()
        };
        assert!(zero.apply(&mut record).is_err());
        assert_eq!(record.shares, 8);
    }

    #[test]
    fn test_record_edit_rejects_non_positive_amount() {
        let mut dividend = Dividend {
            id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            amount: Money::from_major(40),
            date: date(2024, 12, 31),
            notes: None,
            approval: Approval::pending(),
            created_at: Utc::now(),
        };

        let edit = RecordEdit {
            amount: Some(Money::from_major(-1)),
            ..RecordEdit::default()
        };
        assert!(matches!(
            edit.apply_to_dividend(&mut dividend),
            Err(SaccoError::InvalidAmount { .. })
        ));

        let edit = RecordEdit {
            amount: Some(Money::from_major(55)),
            date: Some(date(2025, 1, 2)),
            notes: None,
        };
        edit.apply_to_dividend(&mut dividend).unwrap();
        assert_eq!(dividend.amount, Money::from_major(55));
        assert_eq!(dividend.date, date(2025, 1, 2));
    }
}
