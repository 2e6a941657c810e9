use serde::{Deserialize, Serialize};

use crate::errors::{Result, SaccoError};
use crate::types::MemberId;

/// role of an authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Officer,
    Member,
}

/// authenticated caller, passed explicitly into every operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    /// member record the caller acts as, if any
    pub member_id: Option<MemberId>,
}

impl Principal {
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Admin,
            member_id: None,
        }
    }

    pub fn officer(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Officer,
            member_id: None,
        }
    }

    pub fn member(user_id: impl Into<String>, member_id: MemberId) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Member,
            member_id: Some(member_id),
        }
    }

    /// admins and officers run the back office
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Officer)
    }

    pub fn require_staff(&self, action: &'static str) -> Result<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(self.denied(action))
        }
    }

    /// staff may act for anyone; members only for themselves
    pub fn require_member_access(&self, member_id: &MemberId, action: &'static str) -> Result<()> {
        if self.is_staff() || self.member_id.as_ref() == Some(member_id) {
            Ok(())
        } else {
            Err(self.denied(action))
        }
    }

    fn denied(&self, action: &'static str) -> SaccoError {
        SaccoError::Unauthorized {
            user_id: self.user_id.clone(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_staff_checks() {
        assert!(Principal::admin("root").require_staff("approve records").is_ok());
        assert!(Principal::officer("teller").require_staff("approve records").is_ok());

        let member = Principal::member("jane", Uuid::new_v4());
        assert!(matches!(
            member.require_staff("approve records"),
            Err(SaccoError::Unauthorized { action: "approve records", .. })
        ));
    }

    #[test]
    fn test_member_access_is_limited_to_self() {
        let own_id = Uuid::new_v4();
        let member = Principal::member("jane", own_id);

        assert!(member.require_member_access(&own_id, "submit savings").is_ok());
        assert!(member.require_member_access(&Uuid::new_v4(), "submit savings").is_err());
        assert!(Principal::officer("teller")
            .require_member_access(&Uuid::new_v4(), "submit savings")
            .is_ok());
    }
}
