use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::loans::LoanStatus;
use crate::types::{AccountId, AccountTypeId, LoanId, MemberId, MemberStatus, Period, RecordId, RecordKind};

/// audit events recorded alongside every committed change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // membership events
    MemberEnrolled {
        member_id: MemberId,
        name: String,
        timestamp: DateTime<Utc>,
    },
    MemberStatusChanged {
        member_id: MemberId,
        old_status: MemberStatus,
        new_status: MemberStatus,
        timestamp: DateTime<Utc>,
    },
    AccountOpened {
        account_id: AccountId,
        member_id: MemberId,
        account_type_id: AccountTypeId,
        initial_balance: Money,
        timestamp: DateTime<Utc>,
    },

    // approval events
    RecordSubmitted {
        kind: RecordKind,
        record_id: RecordId,
        member_id: MemberId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    RecordResubmitted {
        kind: RecordKind,
        record_id: RecordId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    RecordApproved {
        kind: RecordKind,
        record_id: RecordId,
        member_id: MemberId,
        amount: Money,
        approved_by: String,
        timestamp: DateTime<Utc>,
    },
    RecordRejected {
        kind: RecordKind,
        record_id: RecordId,
        member_id: MemberId,
        reason: String,
        rejected_by: String,
        timestamp: DateTime<Utc>,
    },
    RecordDeleted {
        kind: RecordKind,
        record_id: RecordId,
        timestamp: DateTime<Utc>,
    },

    // interest events
    InterestPosted {
        account_id: AccountId,
        saving_id: RecordId,
        period: Period,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // loan events
    LoanApplied {
        loan_id: LoanId,
        member_id: MemberId,
        principal: Money,
        timestamp: DateTime<Utc>,
    },
    LoanStatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    RepaymentRecorded {
        loan_id: LoanId,
        repayment_id: RecordId,
        amount: Money,
        interest_paid: Money,
        principal_paid: Money,
        new_balance: Money,
        date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: Vec<Event>) {
        self.events.extend(events);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}
