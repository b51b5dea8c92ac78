use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Delivery attempts before an outbox row is dead.
pub const MAIL_MAX_ATTEMPTS: i32 = 3;

/// Dispatch worker poll interval.
pub const MAIL_POLL_SECONDS: u64 = 10;

/// Rows claimed per dispatch cycle.
pub const MAIL_BATCH_SIZE: u64 = 20;

/// Window during which a repeat notification of the same kind to the same
/// recipient about the same ticket is suppressed.
pub const MAIL_COOLDOWN_SECONDS: i64 = 60;

/// Retry backoff schedule in seconds for attempts 1, 2, 3+; capped at the
/// last step.
pub const MAIL_BACKOFF_STEPS: [i64; 3] = [60, 300, 900];

/// Backoff delay after the given (1-based) attempt count.
pub fn backoff_seconds(attempts: i32) -> i64 {
    let idx = (attempts - 1).clamp(0, MAIL_BACKOFF_STEPS.len() as i32 - 1);
    MAIL_BACKOFF_STEPS[idx as usize]
}

/// Watermark key for the password-only sync task.
pub const SYNC_KEY_PASSWORD: &str = "users_password_sync";

/// Watermark key for the daily full-profile sync task.
pub const SYNC_KEY_PROFILE: &str = "users_profile_sync";

/// Outbox row lifecycle state. `Sent` and `Skipped` are terminal; `Failed`
/// is retryable until `attempts` reaches [`MAIL_MAX_ATTEMPTS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailStatus {
    Pending,
    Sent,
    Failed,
    Skipped,
}

impl MailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// Fully rendered mail handed to the enqueuer. Rendering happens at enqueue
/// time; the dispatch worker only delivers what is stored here.
#[derive(Debug, Clone)]
pub struct MailPayload {
    pub event_key: String,
    pub event_type: String,
    pub ticket_id: Option<i64>,
    pub recipient_emp_no: Option<String>,
    pub recipient_email: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: String,
}

/// Row to insert into the outbox, either `pending` (deliverable) or
/// `skipped` (audit trail for a suppressed send).
#[derive(Debug, Clone)]
pub struct NewMailRecord {
    pub id: Uuid,
    pub event_key: String,
    pub event_type: String,
    pub ticket_id: Option<i64>,
    pub recipient_emp_no: Option<String>,
    pub recipient_email: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: String,
    pub status: MailStatus,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Full outbox row as read back by the dispatch worker.
#[derive(Debug, Clone)]
pub struct MailRecord {
    pub id: Uuid,
    pub event_key: String,
    pub event_type: String,
    pub ticket_id: Option<i64>,
    pub recipient_emp_no: Option<String>,
    pub recipient_email: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: String,
    pub status: MailStatus,
    pub attempts: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-row result of one dispatch cycle, applied back to the outbox in a
/// single batch commit.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub id: Uuid,
    pub status: MailStatus,
    pub attempts: i32,
    pub last_attempt_at: DateTime<Utc>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Ticket data the translator needs, snapshotted by the caller. Label
/// overrides carry display names the routers already resolved (category,
/// work type); absent overrides fall back to raw values.
#[derive(Debug, Clone)]
pub struct TicketSnapshot {
    pub id: i64,
    pub title: String,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub work_type: Option<String>,
    pub category_id: Option<i64>,
    pub category_label: Option<String>,
    pub work_type_label: Option<String>,
}

/// Identity snapshot of a requester, admin or assignee.
#[derive(Debug, Clone)]
pub struct Person {
    pub emp_no: String,
    pub name: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
}

/// Comment data carried by comment notifications.
#[derive(Debug, Clone)]
pub struct CommentSnapshot {
    pub id: i64,
    pub title: Option<String>,
}

/// A domain event that produces exactly one notification mail. One variant
/// per event kind; the translator consumes this exhaustively.
#[derive(Debug, Clone)]
pub enum TicketEvent {
    /// Ticket created — confirmation to the requester.
    TicketCreated {
        ticket: TicketSnapshot,
        requester: Person,
    },
    /// Ticket created — alert to one category admin.
    TicketCreatedAdmin {
        ticket: TicketSnapshot,
        requester: Person,
        admin: Person,
    },
    /// An admin was assigned — notifies the assignee.
    AssigneeAssigned {
        ticket: TicketSnapshot,
        assignee: Person,
    },
    /// The assignee changed — notifies the requester.
    AssigneeChanged {
        ticket: TicketSnapshot,
        requester: Person,
        assignee: Option<Person>,
    },
    /// Ticket status changed — notifies the requester.
    StatusChanged {
        ticket: TicketSnapshot,
        requester: Person,
        new_status: String,
    },
    /// The requester commented — notifies one admin.
    RequesterCommented {
        ticket: TicketSnapshot,
        comment: CommentSnapshot,
        requester: Person,
        admin: Person,
    },
    /// An admin commented — notifies the requester.
    AdminCommented {
        ticket: TicketSnapshot,
        comment: CommentSnapshot,
        requester: Person,
        author: Person,
    },
}

/// Password-sync row pulled from the HR source.
#[derive(Debug, Clone)]
pub struct SourcePasswordRow {
    pub emp_no: String,
    pub password: String,
    pub updated_at: DateTime<Utc>,
}

/// Profile-sync row pulled from the HR source (joined across the master,
/// account, title-code, department and mail-view tables).
#[derive(Debug, Clone)]
pub struct SourceProfileRow {
    pub emp_no: String,
    pub name: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub password: String,
    pub email: Option<String>,
    pub updated_at: DateTime<Utc>,
}
