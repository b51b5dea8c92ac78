use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
    sea_query::{Expr, LockBehavior, LockType, OnConflict},
};

use helpdesk_notify_schema::{mail_logs, sync_state, users};

use crate::domain::repository::{
    DirectoryRepository, DispatchBatch, MailOutboxRepository, SyncStateRepository,
};
use crate::domain::types::{
    DispatchOutcome, MAIL_MAX_ATTEMPTS, MailRecord, MailStatus, NewMailRecord, SourceProfileRow,
};
use crate::error::NotifyServiceError;

// ── Mail outbox repository ───────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbMailOutboxRepository {
    pub db: DatabaseConnection,
}

impl MailOutboxRepository for DbMailOutboxRepository {
    type Batch = DbDispatchBatch;

    async fn find_by_event_key(
        &self,
        event_key: &str,
    ) -> Result<Option<MailRecord>, NotifyServiceError> {
        let model = mail_logs::Entity::find()
            .filter(mail_logs::Column::EventKey.eq(event_key))
            .one(&self.db)
            .await
            .context("find mail by event key")?;
        model.map(record_from_model).transpose().map_err(Into::into)
    }

    async fn sent_within(
        &self,
        recipient_email: &str,
        event_type: &str,
        ticket_id: Option<i64>,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, NotifyServiceError> {
        let mut query = mail_logs::Entity::find()
            .filter(mail_logs::Column::RecipientEmail.eq(recipient_email))
            .filter(mail_logs::Column::EventType.eq(event_type))
            .filter(mail_logs::Column::Status.eq(MailStatus::Sent.as_str()))
            .filter(mail_logs::Column::CreatedAt.gte(cutoff));
        query = match ticket_id {
            Some(ticket_id) => query.filter(mail_logs::Column::TicketId.eq(ticket_id)),
            None => query.filter(mail_logs::Column::TicketId.is_null()),
        };
        let hit = query
            .one(&self.db)
            .await
            .context("check mail cooldown")?;
        Ok(hit.is_some())
    }

    async fn insert(&self, record: &NewMailRecord) -> Result<bool, NotifyServiceError> {
        let now = Utc::now();
        let result = mail_logs::ActiveModel {
            id: Set(record.id),
            event_key: Set(record.event_key.clone()),
            event_type: Set(record.event_type.clone()),
            ticket_id: Set(record.ticket_id),
            recipient_emp_no: Set(record.recipient_emp_no.clone()),
            recipient_email: Set(record.recipient_email.clone()),
            subject: Set(record.subject.clone()),
            body_text: Set(Some(record.body_text.clone())),
            body_html: Set(Some(record.body_html.clone())),
            status: Set(record.status.as_str().to_owned()),
            attempts: Set(0),
            last_attempt_at: Set(record.last_attempt_at),
            next_attempt_at: Set(record.next_attempt_at),
            error_message: Set(record.error_message.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await;

        match result {
            Ok(_) => Ok(true),
            // The unique constraint on event_key is the idempotency
            // authority; a racing duplicate is not an error.
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(false)
            }
            Err(err) => Err(anyhow::Error::new(err).context("insert mail record").into()),
        }
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<DbDispatchBatch, NotifyServiceError> {
        let txn = self
            .db
            .begin()
            .await
            .context("begin dispatch transaction")?;

        // Row locks are held until the batch commits, so a concurrent
        // worker skips these rows instead of double-sending.
        let models = mail_logs::Entity::find()
            .filter(mail_logs::Column::Status.is_in([
                MailStatus::Pending.as_str(),
                MailStatus::Failed.as_str(),
            ]))
            .filter(mail_logs::Column::NextAttemptAt.lte(now))
            .filter(mail_logs::Column::Attempts.lt(MAIL_MAX_ATTEMPTS))
            .order_by_asc(mail_logs::Column::NextAttemptAt)
            .limit(limit)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .all(&txn)
            .await
            .context("select due mail")?;

        let records = models
            .into_iter()
            .map(record_from_model)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DbDispatchBatch { txn, records })
    }
}

/// A claimed batch of due outbox rows. Holds the transaction (and therefore
/// the row locks) open until [`DispatchBatch::commit`].
pub struct DbDispatchBatch {
    txn: DatabaseTransaction,
    records: Vec<MailRecord>,
}

impl DispatchBatch for DbDispatchBatch {
    fn records(&self) -> &[MailRecord] {
        &self.records
    }

    async fn commit(self, outcomes: Vec<DispatchOutcome>) -> Result<(), NotifyServiceError> {
        let now = Utc::now();
        for outcome in &outcomes {
            mail_logs::ActiveModel {
                id: Set(outcome.id),
                status: Set(outcome.status.as_str().to_owned()),
                attempts: Set(outcome.attempts),
                last_attempt_at: Set(Some(outcome.last_attempt_at)),
                next_attempt_at: Set(outcome.next_attempt_at),
                error_message: Set(outcome.error_message.clone()),
                updated_at: Set(now),
                ..Default::default()
            }
            .update(&self.txn)
            .await
            .context("update dispatched mail record")?;
        }
        self.txn.commit().await.context("commit dispatch batch")?;
        Ok(())
    }
}

fn record_from_model(model: mail_logs::Model) -> Result<MailRecord, anyhow::Error> {
    let status = MailStatus::parse(&model.status)
        .with_context(|| format!("unknown mail status {:?}", model.status))?;
    Ok(MailRecord {
        id: model.id,
        event_key: model.event_key,
        event_type: model.event_type,
        ticket_id: model.ticket_id,
        recipient_emp_no: model.recipient_emp_no,
        recipient_email: model.recipient_email,
        subject: model.subject,
        body_text: model.body_text.unwrap_or_default(),
        body_html: model.body_html.unwrap_or_default(),
        status,
        attempts: model.attempts,
        last_attempt_at: model.last_attempt_at,
        next_attempt_at: model.next_attempt_at,
        error_message: model.error_message,
        created_at: model.created_at,
    })
}

// ── Sync watermark repository ────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSyncStateRepository {
    pub db: DatabaseConnection,
}

impl SyncStateRepository for DbSyncStateRepository {
    async fn get(&self, key: &str) -> Result<Option<DateTime<Utc>>, NotifyServiceError> {
        let model = sync_state::Entity::find_by_id(key)
            .one(&self.db)
            .await
            .context("read sync watermark")?;
        Ok(model.and_then(|m| m.last_synced_at))
    }

    async fn set(
        &self,
        key: &str,
        last_synced_at: DateTime<Utc>,
    ) -> Result<(), NotifyServiceError> {
        let now = Utc::now();
        sync_state::Entity::insert(sync_state::ActiveModel {
            key: Set(key.to_owned()),
            last_synced_at: Set(Some(last_synced_at)),
            updated_at: Set(now),
        })
        .on_conflict(
            OnConflict::column(sync_state::Column::Key)
                .update_columns([
                    sync_state::Column::LastSyncedAt,
                    sync_state::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(&self.db)
        .await
        .context("store sync watermark")?;
        Ok(())
    }
}

// ── User directory repository ────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbDirectoryRepository {
    pub db: DatabaseConnection,
}

impl DirectoryRepository for DbDirectoryRepository {
    async fn update_password(
        &self,
        emp_no: &str,
        password: &str,
    ) -> Result<bool, NotifyServiceError> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::Password, Expr::value(password))
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::EmpNo.eq(emp_no))
            .exec(&self.db)
            .await
            .context("update user password")?;
        Ok(result.rows_affected > 0)
    }

    async fn upsert_profile(&self, row: &SourceProfileRow) -> Result<(), NotifyServiceError> {
        let now = Utc::now();
        users::Entity::insert(users::ActiveModel {
            emp_no: Set(row.emp_no.clone()),
            name: Set(row.name.clone()),
            password: Set(row.password.clone()),
            role: Set("requester".to_owned()),
            title: Set(row.title.clone()),
            department: Set(row.department.clone()),
            email: Set(row.email.clone()),
            is_verified: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .on_conflict(
            // Existing users keep their role, password and verified flag;
            // only the profile fields follow the source.
            OnConflict::column(users::Column::EmpNo)
                .update_columns([
                    users::Column::Name,
                    users::Column::Title,
                    users::Column::Department,
                    users::Column::Email,
                    users::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(&self.db)
        .await
        .context("upsert user profile")?;
        Ok(())
    }
}
