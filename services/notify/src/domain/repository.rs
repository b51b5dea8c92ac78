#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};

use crate::domain::types::{
    DispatchOutcome, MailRecord, NewMailRecord, SourcePasswordRow, SourceProfileRow,
};
use crate::error::NotifyServiceError;

/// Repository for the mail outbox table.
pub trait MailOutboxRepository: Send + Sync {
    /// A claimed batch of due rows. The database implementation holds the
    /// row locks until [`DispatchBatch::commit`] runs.
    type Batch: DispatchBatch;

    /// Find a record by its idempotency key, any status.
    async fn find_by_event_key(
        &self,
        event_key: &str,
    ) -> Result<Option<MailRecord>, NotifyServiceError>;

    /// Whether a `sent` record exists for (recipient, event type, ticket)
    /// created at or after `cutoff` — the cooldown predicate.
    async fn sent_within(
        &self,
        recipient_email: &str,
        event_type: &str,
        ticket_id: Option<i64>,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, NotifyServiceError>;

    /// Insert a new outbox row. Returns `false` when the unique constraint
    /// on `event_key` rejected the row (a concurrent duplicate) — the
    /// constraint, not the caller's pre-checks, is the idempotency authority.
    async fn insert(&self, record: &NewMailRecord) -> Result<bool, NotifyServiceError>;

    /// Claim up to `limit` due rows (`pending`/`failed`, `next_attempt_at <=
    /// now`, attempts below the retry bound), skipping rows locked by a
    /// concurrent worker.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Self::Batch, NotifyServiceError>;
}

/// One claimed dispatch batch: the rows to deliver plus a single commit
/// applying every outcome together.
pub trait DispatchBatch: Send {
    fn records(&self) -> &[MailRecord];

    async fn commit(self, outcomes: Vec<DispatchOutcome>) -> Result<(), NotifyServiceError>;
}

/// Outbound mail transport (SMTP relay behind a bounded timeout).
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &MailRecord) -> Result<(), NotifyServiceError>;
}

/// Read-only port onto the external HR source database.
pub trait HrSourcePort: Send + Sync {
    /// Account rows whose password changed after `since`.
    async fn fetch_password_rows(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SourcePasswordRow>, NotifyServiceError>;

    /// Joined profile rows whose backing tables changed after `since`.
    async fn fetch_profile_rows(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SourceProfileRow>, NotifyServiceError>;
}

/// Write side of the local user directory.
pub trait DirectoryRepository: Send + Sync {
    /// Update a user's password hash by employee number. Returns `false`
    /// when no local row matched (password sync never inserts).
    async fn update_password(
        &self,
        emp_no: &str,
        password: &str,
    ) -> Result<bool, NotifyServiceError>;

    /// Insert a new user (role "requester", verified) or update the profile
    /// fields of an existing one.
    async fn upsert_profile(&self, row: &SourceProfileRow) -> Result<(), NotifyServiceError>;
}

/// Per-task sync watermark store.
pub trait SyncStateRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<DateTime<Utc>>, NotifyServiceError>;

    async fn set(&self, key: &str, last_synced_at: DateTime<Utc>)
    -> Result<(), NotifyServiceError>;
}
