use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use helpdesk_notify::domain::repository::{
    DirectoryRepository, DispatchBatch, MailOutboxRepository, MailTransport, SyncStateRepository,
};
use helpdesk_notify::domain::types::{
    DispatchOutcome, MAIL_MAX_ATTEMPTS, MailRecord, MailStatus, NewMailRecord, Person,
    SourcePasswordRow, SourceProfileRow, TicketSnapshot,
};
use helpdesk_notify::error::NotifyServiceError;
use helpdesk_notify::usecase::enqueue_mail::EnqueueMailUseCase;
use helpdesk_notify::usecase::notify::TicketNotifier;

// ── InMemoryOutbox ───────────────────────────────────────────────────────────

/// Outbox store with the database implementation's observable behavior:
/// unique event keys, the due-row claim predicate, batch outcome commits.
#[derive(Clone, Default)]
pub struct InMemoryOutbox {
    pub rows: Arc<Mutex<Vec<MailRecord>>>,
}

impl InMemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<MailRecord> {
        self.rows.lock().unwrap().clone()
    }
}

impl MailOutboxRepository for InMemoryOutbox {
    type Batch = InMemoryBatch;

    async fn find_by_event_key(
        &self,
        event_key: &str,
    ) -> Result<Option<MailRecord>, NotifyServiceError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.event_key == event_key)
            .cloned())
    }

    async fn sent_within(
        &self,
        recipient_email: &str,
        event_type: &str,
        ticket_id: Option<i64>,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, NotifyServiceError> {
        Ok(self.rows.lock().unwrap().iter().any(|r| {
            r.recipient_email == recipient_email
                && r.event_type == event_type
                && r.ticket_id == ticket_id
                && r.status == MailStatus::Sent
                && r.created_at >= cutoff
        }))
    }

    async fn insert(&self, record: &NewMailRecord) -> Result<bool, NotifyServiceError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.event_key == record.event_key) {
            return Ok(false);
        }
        rows.push(MailRecord {
            id: record.id,
            event_key: record.event_key.clone(),
            event_type: record.event_type.clone(),
            ticket_id: record.ticket_id,
            recipient_emp_no: record.recipient_emp_no.clone(),
            recipient_email: record.recipient_email.clone(),
            subject: record.subject.clone(),
            body_text: record.body_text.clone(),
            body_html: record.body_html.clone(),
            status: record.status,
            attempts: 0,
            last_attempt_at: record.last_attempt_at,
            next_attempt_at: record.next_attempt_at,
            error_message: record.error_message.clone(),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<InMemoryBatch, NotifyServiceError> {
        let records: Vec<MailRecord> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                matches!(r.status, MailStatus::Pending | MailStatus::Failed)
                    && r.next_attempt_at.is_some_and(|t| t <= now)
                    && r.attempts < MAIL_MAX_ATTEMPTS
            })
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(InMemoryBatch {
            records,
            rows: Arc::clone(&self.rows),
        })
    }
}

pub struct InMemoryBatch {
    records: Vec<MailRecord>,
    rows: Arc<Mutex<Vec<MailRecord>>>,
}

impl DispatchBatch for InMemoryBatch {
    fn records(&self) -> &[MailRecord] {
        &self.records
    }

    async fn commit(self, outcomes: Vec<DispatchOutcome>) -> Result<(), NotifyServiceError> {
        let mut rows = self.rows.lock().unwrap();
        for outcome in outcomes {
            let row = rows
                .iter_mut()
                .find(|r| r.id == outcome.id)
                .expect("outcome for unknown row");
            row.status = outcome.status;
            row.attempts = outcome.attempts;
            row.last_attempt_at = Some(outcome.last_attempt_at);
            row.next_attempt_at = outcome.next_attempt_at;
            row.error_message = outcome.error_message;
        }
        Ok(())
    }
}

// ── FlakyTransport ───────────────────────────────────────────────────────────

/// Transport that fails the first `fail_first` sends, then succeeds.
pub struct FlakyTransport {
    pub sent: Mutex<Vec<String>>,
    fail_first: Mutex<usize>,
}

impl FlakyTransport {
    pub fn reliable() -> Self {
        Self::failing_first(0)
    }

    pub fn failing_first(n: usize) -> Self {
        Self {
            sent: Mutex::new(vec![]),
            fail_first: Mutex::new(n),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl MailTransport for FlakyTransport {
    async fn send(&self, mail: &MailRecord) -> Result<(), NotifyServiceError> {
        let mut remaining = self.fail_first.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(NotifyServiceError::Delivery("relay unavailable".to_owned()));
        }
        self.sent.lock().unwrap().push(mail.event_key.clone());
        Ok(())
    }
}

// ── Directory / watermark fakes ──────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalUser {
    pub emp_no: String,
    pub name: Option<String>,
    pub password: String,
    pub role: String,
    pub title: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
    pub is_verified: bool,
}

/// User table fake with the upsert semantics of the database repository:
/// inserts default to role "requester"/verified, conflicts update profile
/// fields only.
#[derive(Default)]
pub struct InMemoryDirectory {
    pub users: Mutex<HashMap<String, LocalUser>>,
}

impl DirectoryRepository for InMemoryDirectory {
    async fn update_password(
        &self,
        emp_no: &str,
        password: &str,
    ) -> Result<bool, NotifyServiceError> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(emp_no) {
            Some(user) => {
                user.password = password.to_owned();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_profile(&self, row: &SourceProfileRow) -> Result<(), NotifyServiceError> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&row.emp_no) {
            Some(user) => {
                user.name = row.name.clone();
                user.title = row.title.clone();
                user.department = row.department.clone();
                user.email = row.email.clone();
            }
            None => {
                users.insert(
                    row.emp_no.clone(),
                    LocalUser {
                        emp_no: row.emp_no.clone(),
                        name: row.name.clone(),
                        password: row.password.clone(),
                        role: "requester".to_owned(),
                        title: row.title.clone(),
                        department: row.department.clone(),
                        email: row.email.clone(),
                        is_verified: true,
                    },
                );
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryWatermarks {
    pub state: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryWatermarks {
    pub fn current(&self, key: &str) -> Option<DateTime<Utc>> {
        self.state.lock().unwrap().get(key).copied()
    }
}

impl SyncStateRepository for InMemoryWatermarks {
    async fn get(&self, key: &str) -> Result<Option<DateTime<Utc>>, NotifyServiceError> {
        Ok(self.state.lock().unwrap().get(key).copied())
    }

    async fn set(
        &self,
        key: &str,
        last_synced_at: DateTime<Utc>,
    ) -> Result<(), NotifyServiceError> {
        self.state
            .lock()
            .unwrap()
            .insert(key.to_owned(), last_synced_at);
        Ok(())
    }
}

/// HR source fake serving a fixed row set, filtered by the watermark the
/// engine passes in.
#[derive(Default)]
pub struct StaticHrSource {
    pub password_rows: Vec<SourcePasswordRow>,
    pub profile_rows: Vec<SourceProfileRow>,
}

impl helpdesk_notify::domain::repository::HrSourcePort for StaticHrSource {
    async fn fetch_password_rows(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SourcePasswordRow>, NotifyServiceError> {
        Ok(self
            .password_rows
            .iter()
            .filter(|row| row.updated_at > since)
            .cloned()
            .collect())
    }

    async fn fetch_profile_rows(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SourceProfileRow>, NotifyServiceError> {
        Ok(self
            .profile_rows
            .iter()
            .filter(|row| row.updated_at > since)
            .cloned()
            .collect())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn notifier(outbox: InMemoryOutbox) -> TicketNotifier<InMemoryOutbox> {
    TicketNotifier {
        enqueuer: EnqueueMailUseCase {
            outbox,
            mail_enabled: true,
        },
        app_base_url: "http://desk.local".to_owned(),
    }
}

pub fn ticket(id: i64) -> TicketSnapshot {
    TicketSnapshot {
        id,
        title: "Replace broken monitor".to_owned(),
        status: Some("open".to_owned()),
        priority: Some("medium".to_owned()),
        work_type: Some("request".to_owned()),
        category_id: Some(3),
        category_label: Some("Hardware".to_owned()),
        work_type_label: None,
    }
}

pub fn person(emp_no: &str) -> Person {
    Person {
        emp_no: emp_no.to_owned(),
        name: Some(format!("User {emp_no}")),
        title: Some("Engineer".to_owned()),
        department: Some("IT".to_owned()),
        email: Some(format!("{}@example.com", emp_no.to_ascii_lowercase())),
    }
}
