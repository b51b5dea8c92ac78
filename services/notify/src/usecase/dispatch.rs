use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use crate::domain::repository::{DispatchBatch, MailOutboxRepository, MailTransport};
use crate::domain::types::{
    DispatchOutcome, MAIL_BATCH_SIZE, MAIL_POLL_SECONDS, MailStatus, backoff_seconds,
};
use crate::error::NotifyServiceError;

/// Background worker draining the mail outbox. Per record:
/// `pending → {sent | failed}`; `failed → {sent | failed}` until the
/// attempts bound, after which the row is dead and never selected again.
pub struct DispatchWorker<R, T>
where
    R: MailOutboxRepository,
    T: MailTransport,
{
    pub outbox: R,
    pub transport: T,
}

impl<R, T> DispatchWorker<R, T>
where
    R: MailOutboxRepository,
    T: MailTransport,
{
    /// Poll forever. Cycle errors are logged and the loop continues.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(StdDuration::from_secs(MAIL_POLL_SECONDS));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.run_once(Utc::now()).await {
                Ok(0) => {}
                Ok(processed) => {
                    tracing::debug!(processed, "mail dispatch cycle complete");
                }
                Err(error) => {
                    tracing::error!(error = %error, "mail dispatch cycle failed");
                }
            }
        }
    }

    /// One dispatch cycle: claim due rows, attempt delivery per row, commit
    /// every outcome together. Returns the number of rows processed.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize, NotifyServiceError> {
        let batch = self.outbox.claim_due(now, MAIL_BATCH_SIZE).await?;
        if batch.records().is_empty() {
            return Ok(0);
        }

        let mut outcomes = Vec::with_capacity(batch.records().len());
        for record in batch.records() {
            let attempts = record.attempts + 1;
            match self.transport.send(record).await {
                Ok(()) => {
                    tracing::info!(event_key = %record.event_key, "mail delivered");
                    outcomes.push(DispatchOutcome {
                        id: record.id,
                        status: MailStatus::Sent,
                        attempts,
                        last_attempt_at: now,
                        next_attempt_at: None,
                        error_message: None,
                    });
                }
                Err(error) => {
                    // One row's failure never aborts the batch; the retry
                    // waits for its backoff window and a later poll tick.
                    tracing::warn!(
                        event_key = %record.event_key,
                        attempts,
                        error = %error,
                        "mail delivery failed"
                    );
                    outcomes.push(DispatchOutcome {
                        id: record.id,
                        status: MailStatus::Failed,
                        attempts,
                        last_attempt_at: now,
                        next_attempt_at: Some(now + Duration::seconds(backoff_seconds(attempts))),
                        error_message: Some(error.to_string()),
                    });
                }
            }
        }

        let processed = outcomes.len();
        batch.commit(outcomes).await?;
        Ok(processed)
    }
}
