use chrono::{Duration, Utc};

use helpdesk_notify::domain::types::MailStatus;
use helpdesk_notify::usecase::dispatch::DispatchWorker;

use crate::helpers::{FlakyTransport, InMemoryOutbox, notifier, person, ticket};

#[tokio::test]
async fn ticket_created_produces_two_mails_and_one_cycle_delivers_both() {
    let outbox = InMemoryOutbox::new();
    let notifier = notifier(outbox.clone());
    let requester = person("R100");
    let admin = person("A200");

    notifier
        .ticket_created(ticket(42), requester.clone())
        .await
        .unwrap();
    notifier
        .ticket_created_admins(ticket(42), requester, vec![admin])
        .await
        .unwrap();

    let rows = outbox.snapshot();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.ticket_id == Some(42)));
    assert!(rows.iter().all(|r| r.status == MailStatus::Pending));
    assert_ne!(rows[0].event_key, rows[1].event_key);
    assert_eq!(rows[0].event_type, "ticket_created");
    assert_eq!(rows[1].event_type, "ticket_created_admin");

    let worker = DispatchWorker {
        outbox: outbox.clone(),
        transport: FlakyTransport::reliable(),
    };
    let processed = worker.run_once(Utc::now()).await.unwrap();
    assert_eq!(processed, 2);
    assert!(
        outbox
            .snapshot()
            .iter()
            .all(|r| r.status == MailStatus::Sent)
    );
}

#[tokio::test]
async fn second_dispatch_cycle_sends_nothing_over_sent_rows() {
    let outbox = InMemoryOutbox::new();
    let notifier = notifier(outbox.clone());
    notifier
        .ticket_created(ticket(1), person("R100"))
        .await
        .unwrap();

    let worker = DispatchWorker {
        outbox: outbox.clone(),
        transport: FlakyTransport::reliable(),
    };
    worker.run_once(Utc::now()).await.unwrap();
    assert_eq!(worker.transport.sent_count(), 1);

    let processed = worker
        .run_once(Utc::now() + Duration::seconds(30))
        .await
        .unwrap();
    assert_eq!(processed, 0);
    assert_eq!(worker.transport.sent_count(), 1);
}

#[tokio::test]
async fn enqueuing_the_same_event_twice_creates_one_record() {
    let outbox = InMemoryOutbox::new();
    let notifier = notifier(outbox.clone());

    notifier
        .ticket_created(ticket(1), person("R100"))
        .await
        .unwrap();
    notifier
        .ticket_created(ticket(1), person("R100"))
        .await
        .unwrap();

    assert_eq!(outbox.snapshot().len(), 1);
}

#[tokio::test]
async fn repeat_event_kind_within_cooldown_is_skipped() {
    let outbox = InMemoryOutbox::new();
    let notifier = notifier(outbox.clone());
    let requester = person("R100");

    // First status change is delivered.
    notifier
        .status_changed(ticket(1), requester.clone(), "in_progress".to_owned())
        .await
        .unwrap();
    let worker = DispatchWorker {
        outbox: outbox.clone(),
        transport: FlakyTransport::reliable(),
    };
    worker.run_once(Utc::now()).await.unwrap();

    // A different transition (distinct event key, same kind/recipient/
    // ticket) right after lands in the cooldown window.
    notifier
        .status_changed(ticket(1), requester, "resolved".to_owned())
        .await
        .unwrap();

    let rows = outbox.snapshot();
    assert_eq!(rows.len(), 2);
    let second = rows
        .iter()
        .find(|r| r.event_key.ends_with(":resolved"))
        .unwrap();
    assert_eq!(second.status, MailStatus::Skipped);
    assert!(second.error_message.is_some());
}

#[tokio::test]
async fn failed_delivery_retries_after_backoff_and_dies_at_the_bound() {
    let outbox = InMemoryOutbox::new();
    let notifier = notifier(outbox.clone());
    notifier
        .ticket_created(ticket(1), person("R100"))
        .await
        .unwrap();

    // Every send fails.
    let worker = DispatchWorker {
        outbox: outbox.clone(),
        transport: FlakyTransport::failing_first(usize::MAX),
    };

    let mut now = Utc::now();
    for expected_attempts in 1..=3 {
        let processed = worker.run_once(now).await.unwrap();
        assert_eq!(processed, 1, "attempt {expected_attempts} should process");
        let row = &outbox.snapshot()[0];
        assert_eq!(row.status, MailStatus::Failed);
        assert_eq!(row.attempts, expected_attempts);
        // Not due again until the backoff window elapses.
        assert_eq!(worker.run_once(now).await.unwrap(), 0);
        now = row.next_attempt_at.unwrap() + Duration::seconds(1);
    }

    // Dead: excluded from polling forever, error retained for diagnosis.
    assert_eq!(worker.run_once(now + Duration::days(30)).await.unwrap(), 0);
    let row = &outbox.snapshot()[0];
    assert_eq!(row.attempts, 3);
    assert_eq!(row.error_message.as_deref(), Some("mail delivery failed: relay unavailable"));
}

#[tokio::test]
async fn transient_failure_recovers_on_a_later_cycle() {
    let outbox = InMemoryOutbox::new();
    let notifier = notifier(outbox.clone());
    notifier
        .ticket_created(ticket(1), person("R100"))
        .await
        .unwrap();

    let worker = DispatchWorker {
        outbox: outbox.clone(),
        transport: FlakyTransport::failing_first(1),
    };

    let now = Utc::now();
    worker.run_once(now).await.unwrap();
    let row = &outbox.snapshot()[0];
    assert_eq!(row.status, MailStatus::Failed);
    let retry_at = row.next_attempt_at.unwrap();
    assert_eq!(retry_at, now + Duration::seconds(60));

    worker
        .run_once(retry_at + Duration::seconds(1))
        .await
        .unwrap();
    let row = &outbox.snapshot()[0];
    assert_eq!(row.status, MailStatus::Sent);
    assert_eq!(row.attempts, 2);
    assert!(row.next_attempt_at.is_none());
    assert!(row.error_message.is_none());
}
