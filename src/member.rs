use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{Result, SaccoError};
use crate::types::{MemberId, MemberStatus};

/// postal address of a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line: String,
    pub town: String,
    pub postal_code: Option<String>,
}

/// cooperative member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub member_number: String,
    pub name: String,
    pub phone: Option<String>,
    pub school: Option<String>,
    pub address: Option<Address>,
    pub status: MemberStatus,

    // aggregates, changed only by approved records
    pub savings_balance: Money,
    pub share_count: u32,
    pub dividends_earned: Money,
    pub service_charges_applied: Money,

    pub enrolled_at: DateTime<Utc>,
}

impl Member {
    pub fn enroll(id: MemberId, member_number: String, new: NewMember, now: DateTime<Utc>) -> Self {
        Self {
            id,
            member_number,
            name: new.name.trim().to_string(),
            phone: new.phone,
            school: new.school,
            address: new.address,
            status: MemberStatus::Active,
            savings_balance: Money::ZERO,
            share_count: 0,
            dividends_earned: Money::ZERO,
            service_charges_applied: Money::ZERO,
            enrolled_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    /// new records may only be raised for active members
    pub fn require_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(SaccoError::MemberInactive { id: self.id })
        }
    }

    pub fn aggregates(&self) -> MemberAggregates {
        MemberAggregates {
            savings_balance: self.savings_balance,
            share_count: self.share_count,
            dividends_earned: self.dividends_earned,
            service_charges_applied: self.service_charges_applied,
        }
    }
}

/// enrollment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMember {
    pub name: String,
    pub phone: Option<String>,
    pub school: Option<String>,
    pub address: Option<Address>,
}

impl NewMember {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: None,
            school: None,
            address: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SaccoError::InvalidField {
                field: "name",
                message: "member name must not be empty".to_string(),
            });
        }
        if let Some(phone) = &self.phone {
            if !phone.chars().all(|c| c.is_ascii_digit() || c == '+' || c == ' ') {
                return Err(SaccoError::InvalidField {
                    field: "phone",
                    message: format!("'{}' is not a phone number", phone),
                });
            }
        }
        Ok(())
    }
}

/// stored member totals, comparable against a recomputation from records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MemberAggregates {
    pub savings_balance: Money,
    pub share_count: u32,
    pub dividends_earned: Money,
    pub service_charges_applied: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_enroll_starts_active_and_empty() {
        let mut new = NewMember::named("  Achieng Otieno ");
        new.school = Some("Kisumu Girls".to_string());

        let member = Member::enroll(Uuid::new_v4(), "M-0001".to_string(), new, Utc::now());

        assert_eq!(member.name, "Achieng Otieno");
        assert!(member.is_active());
        assert_eq!(member.aggregates(), MemberAggregates::default());
    }

    #[test]
    fn test_validation() {
        assert!(NewMember::named("").validate().is_err());
        assert!(NewMember::named("Juma").validate().is_ok());

        let mut bad_phone = NewMember::named("Juma");
        bad_phone.phone = Some("call me".to_string());
        assert!(matches!(
            bad_phone.validate(),
            Err(SaccoError::InvalidField { field: "phone", .. })
        ));
    }

    #[test]
    fn test_inactive_member_rejected() {
        let mut member = Member::enroll(Uuid::new_v4(), "M-0002".to_string(), NewMember::named("Wanjiru"), Utc::now());
        member.status = MemberStatus::Inactive;
        assert!(matches!(member.require_active(), Err(SaccoError::MemberInactive { .. })));
    }
}
