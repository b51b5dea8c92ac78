use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::repository::MailOutboxRepository;
use crate::domain::types::{MAIL_COOLDOWN_SECONDS, MailPayload, MailStatus, NewMailRecord};
use crate::error::NotifyServiceError;

/// What happened to an enqueue call. Everything except `Enqueued` is a
/// deliberate suppression, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// No mail transport configured; nothing persisted.
    Disabled,
    /// A `skipped` audit row was persisted.
    Skipped(SkipReason),
    /// A record with this event key already exists; nothing persisted.
    Duplicate,
    /// A `pending` row was persisted for the dispatch worker.
    Enqueued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InvalidRecipient,
    Cooldown,
}

pub struct EnqueueMailUseCase<R: MailOutboxRepository> {
    pub outbox: R,
    /// False when SMTP host or from-address is unconfigured.
    pub mail_enabled: bool,
}

/// Syntactic RFC parse of the recipient address; no deliverability check.
fn normalize_address(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<lettre::Address>()
        .ok()
        .map(|addr| addr.to_string())
}

fn skipped_record(payload: &MailPayload, now: DateTime<Utc>, error: &str) -> NewMailRecord {
    NewMailRecord {
        id: Uuid::new_v4(),
        event_key: payload.event_key.clone(),
        event_type: payload.event_type.clone(),
        ticket_id: payload.ticket_id,
        recipient_emp_no: payload.recipient_emp_no.clone(),
        recipient_email: payload.recipient_email.clone(),
        subject: payload.subject.clone(),
        body_text: payload.body_text.clone(),
        body_html: payload.body_html.clone(),
        status: MailStatus::Skipped,
        last_attempt_at: Some(now),
        next_attempt_at: None,
        error_message: Some(error.to_owned()),
    }
}

fn pending_record(payload: &MailPayload, now: DateTime<Utc>) -> NewMailRecord {
    NewMailRecord {
        id: Uuid::new_v4(),
        event_key: payload.event_key.clone(),
        event_type: payload.event_type.clone(),
        ticket_id: payload.ticket_id,
        recipient_emp_no: payload.recipient_emp_no.clone(),
        recipient_email: payload.recipient_email.clone(),
        subject: payload.subject.clone(),
        body_text: payload.body_text.clone(),
        body_html: payload.body_html.clone(),
        status: MailStatus::Pending,
        last_attempt_at: None,
        next_attempt_at: Some(now),
        error_message: None,
    }
}

impl<R: MailOutboxRepository> EnqueueMailUseCase<R> {
    pub async fn execute(
        &self,
        mut payload: MailPayload,
    ) -> Result<EnqueueOutcome, NotifyServiceError> {
        // 1. No transport configured — a valid steady state, not an error.
        if !self.mail_enabled {
            tracing::info!(
                event_key = %payload.event_key,
                "mail transport not configured; dropping notification"
            );
            return Ok(EnqueueOutcome::Disabled);
        }

        let now = Utc::now();

        // 2. Recipient validation. Failure still consumes the event key as
        // a permanent audit trail.
        match normalize_address(&payload.recipient_email) {
            Some(normalized) => payload.recipient_email = normalized,
            None => {
                let record = skipped_record(&payload, now, "recipient address failed validation");
                self.outbox.insert(&record).await?;
                tracing::info!(
                    event_key = %payload.event_key,
                    recipient = %payload.recipient_email,
                    "invalid recipient; recorded skipped mail"
                );
                return Ok(EnqueueOutcome::Skipped(SkipReason::InvalidRecipient));
            }
        }

        // 3. Cooldown, checked before idempotency.
        let cutoff = now - Duration::seconds(MAIL_COOLDOWN_SECONDS);
        if self
            .outbox
            .sent_within(
                &payload.recipient_email,
                &payload.event_type,
                payload.ticket_id,
                cutoff,
            )
            .await?
        {
            let record = skipped_record(&payload, now, "suppressed by cooldown window");
            self.outbox.insert(&record).await?;
            tracing::info!(event_key = %payload.event_key, "cooldown hit; recorded skipped mail");
            return Ok(EnqueueOutcome::Skipped(SkipReason::Cooldown));
        }

        // 4. Idempotency pre-check.
        if self
            .outbox
            .find_by_event_key(&payload.event_key)
            .await?
            .is_some()
        {
            tracing::info!(event_key = %payload.event_key, "duplicate event; mail already recorded");
            return Ok(EnqueueOutcome::Duplicate);
        }

        // 5. Insert pending. The unique constraint on event_key is the
        // authority for racing duplicates.
        let record = pending_record(&payload, now);
        if !self.outbox.insert(&record).await? {
            tracing::info!(event_key = %payload.event_key, "duplicate event; mail already recorded");
            return Ok(EnqueueOutcome::Duplicate);
        }
        tracing::info!(event_key = %payload.event_key, "mail queued for delivery");
        Ok(EnqueueOutcome::Enqueued)
    }
}
