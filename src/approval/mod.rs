//! Pending -> approved / rejected lifecycle shared by every financial record.
//!
//! A record is created pending. Approval applies its financial effect exactly
//! once and is never reversed; rejection stores a reason and has no effect.
//! Editing a pending or rejected record puts it back to pending. Approved
//! records are immutable.

pub mod records;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{Result, SaccoError};
use crate::types::{MemberId, RecordId, RecordKind};

pub use records::{
    AppliedServiceCharge, Dividend, NewAppliedServiceCharge, NewDividend, NewShare, RecordEdit, ServiceCharge,
    Share, ShareEdit,
};

/// approval status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// approval state embedded in every financial record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Default for Approval {
    fn default() -> Self {
        Self::pending()
    }
}

impl Approval {
    pub fn pending() -> Self {
        Self {
            status: ApprovalStatus::Pending,
            rejection_reason: None,
            decided_by: None,
            decided_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }

    pub fn is_rejected(&self) -> bool {
        self.status == ApprovalStatus::Rejected
    }

    /// pending -> approved
    pub fn approve(&mut self, kind: RecordKind, id: RecordId, by: &str, at: DateTime<Utc>) -> Result<()> {
        self.require_pending(kind, id)?;
        self.status = ApprovalStatus::Approved;
        self.rejection_reason = None;
        self.decided_by = Some(by.to_string());
        self.decided_at = Some(at);
        Ok(())
    }

    /// pending -> rejected
    pub fn reject(
        &mut self,
        kind: RecordKind,
        id: RecordId,
        reason: &str,
        by: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if reason.trim().is_empty() {
            return Err(SaccoError::InvalidField {
                field: "reason",
                message: "a rejection reason is required".to_string(),
            });
        }
        self.require_pending(kind, id)?;
        self.status = ApprovalStatus::Rejected;
        self.rejection_reason = Some(reason.trim().to_string());
        self.decided_by = Some(by.to_string());
        self.decided_at = Some(at);
        Ok(())
    }

    /// edit of a pending or rejected record: back to pending
    pub fn resubmit(&mut self, kind: RecordKind, id: RecordId) -> Result<()> {
        self.ensure_mutable(kind, id)?;
        *self = Approval::pending();
        Ok(())
    }

    /// approved records cannot be edited or deleted
    pub fn ensure_mutable(&self, kind: RecordKind, id: RecordId) -> Result<()> {
        if self.is_approved() {
            return Err(SaccoError::ApprovedRecordImmutable { kind, id });
        }
        Ok(())
    }

    fn require_pending(&self, kind: RecordKind, id: RecordId) -> Result<()> {
        if !self.is_pending() {
            return Err(SaccoError::AlreadyDecided {
                kind,
                id,
                status: self.status,
            });
        }
        Ok(())
    }
}

/// implemented by every record that passes through approval
pub trait Approvable {
    const KIND: RecordKind;

    fn id(&self) -> RecordId;
    fn member_id(&self) -> MemberId;
    /// monetary value used in events and listings
    fn amount(&self) -> Money;
    fn approval(&self) -> &Approval;
    fn approval_mut(&mut self) -> &mut Approval;

    fn status(&self) -> ApprovalStatus {
        self.approval().status
    }
}

/// reference to an approvable record, tagged by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RecordRef {
    Saving(RecordId),
    Share(RecordId),
    Dividend(RecordId),
    ServiceCharge(RecordId),
}

impl RecordRef {
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordRef::Saving(_) => RecordKind::Saving,
            RecordRef::Share(_) => RecordKind::Share,
            RecordRef::Dividend(_) => RecordKind::Dividend,
            RecordRef::ServiceCharge(_) => RecordKind::ServiceCharge,
        }
    }

    pub fn id(&self) -> RecordId {
        match self {
            RecordRef::Saving(id)
            | RecordRef::Share(id)
            | RecordRef::Dividend(id)
            | RecordRef::ServiceCharge(id) => *id,
        }
    }
}
