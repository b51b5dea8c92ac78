use chrono::{DateTime, TimeZone, Utc};

use helpdesk_notify::config::SyncSettings;
use helpdesk_notify::domain::types::{
    SYNC_KEY_PASSWORD, SYNC_KEY_PROFILE, SourcePasswordRow, SourceProfileRow,
};
use helpdesk_notify::usecase::sync::SyncEngine;

use crate::helpers::{InMemoryDirectory, InMemoryWatermarks, StaticHrSource};

fn settings() -> SyncSettings {
    SyncSettings {
        source_url: "postgres://hr/hr".to_owned(),
        source_schema: "hr".to_owned(),
        emp_no_prefix: "A".to_owned(),
        password_interval_seconds: 300,
        full_at_hour: 0,
        full_at_minute: 0,
        force_full: false,
    }
}

fn at(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
}

fn profile_row(emp_no: &str, name: &str, updated_at: DateTime<Utc>) -> SourceProfileRow {
    SourceProfileRow {
        emp_no: emp_no.to_owned(),
        name: Some(name.to_owned()),
        title: Some("Engineer".to_owned()),
        department: Some("IT".to_owned()),
        password: format!("hash-{emp_no}-v1"),
        email: Some(format!("{}@example.com", emp_no.to_ascii_lowercase())),
        updated_at,
    }
}

#[tokio::test]
async fn profile_sync_onboards_new_user_as_verified_requester() {
    let source = StaticHrSource {
        profile_rows: vec![profile_row("A100", "Alice Kim", at(2026, 8, 1, 10))],
        ..StaticHrSource::default()
    };
    let mut engine = SyncEngine::new(
        source,
        InMemoryDirectory::default(),
        InMemoryWatermarks::default(),
        settings(),
    );

    let applied = engine.run_profile_sync().await.unwrap();
    assert_eq!(applied, 1);

    let users = engine.directory.users.lock().unwrap();
    let user = users.get("A100").unwrap();
    assert_eq!(user.emp_no, "A100");
    assert_eq!(user.name.as_deref(), Some("Alice Kim"));
    assert_eq!(user.title.as_deref(), Some("Engineer"));
    assert_eq!(user.department.as_deref(), Some("IT"));
    assert_eq!(user.password, "hash-A100-v1");
    assert_eq!(user.role, "requester");
    assert!(user.is_verified);
    assert_eq!(user.email.as_deref(), Some("a100@example.com"));
}

#[tokio::test]
async fn profile_sync_updates_profile_fields_but_not_role() {
    let t1 = at(2026, 8, 1, 10);
    let t2 = at(2026, 8, 2, 10);
    let source = StaticHrSource {
        profile_rows: vec![
            profile_row("A100", "Alice Kim", t1),
            profile_row("A100", "Alice Kim (Lead)", t2),
        ],
        ..StaticHrSource::default()
    };
    let mut engine = SyncEngine::new(
        source,
        InMemoryDirectory::default(),
        InMemoryWatermarks::default(),
        settings(),
    );

    engine.run_profile_sync().await.unwrap();

    // An admin promotes the user between runs; the next sync must not
    // demote them.
    engine
        .directory
        .users
        .lock()
        .unwrap()
        .get_mut("A100")
        .unwrap()
        .role = "admin".to_owned();

    engine.run_profile_sync().await.unwrap();

    let users = engine.directory.users.lock().unwrap();
    let user = users.get("A100").unwrap();
    assert_eq!(user.role, "admin", "role must survive profile sync");
}

#[tokio::test]
async fn password_sync_updates_existing_and_ignores_unknown() {
    let t1 = at(2026, 8, 1, 10);
    let source = StaticHrSource {
        password_rows: vec![
            SourcePasswordRow {
                emp_no: "A100".to_owned(),
                password: "hash-new".to_owned(),
                updated_at: t1,
            },
            SourcePasswordRow {
                emp_no: "A999".to_owned(),
                password: "hash-ghost".to_owned(),
                updated_at: t1,
            },
        ],
        profile_rows: vec![profile_row("A100", "Alice Kim", at(2026, 7, 1, 10))],
    };
    let mut engine = SyncEngine::new(
        source,
        InMemoryDirectory::default(),
        InMemoryWatermarks::default(),
        settings(),
    );

    // Onboard A100 first, then rotate passwords.
    engine.run_profile_sync().await.unwrap();
    engine.run_password_sync().await.unwrap();

    let users = engine.directory.users.lock().unwrap();
    assert_eq!(users.get("A100").unwrap().password, "hash-new");
    assert!(
        !users.contains_key("A999"),
        "password sync must never create users"
    );
}

#[tokio::test]
async fn watermarks_are_independent_and_monotonic() {
    let password_t = at(2026, 8, 1, 10);
    let profile_t = at(2026, 8, 3, 10);
    let source = StaticHrSource {
        password_rows: vec![SourcePasswordRow {
            emp_no: "A100".to_owned(),
            password: "hash".to_owned(),
            updated_at: password_t,
        }],
        profile_rows: vec![profile_row("A100", "Alice Kim", profile_t)],
    };
    let mut engine = SyncEngine::new(
        source,
        InMemoryDirectory::default(),
        InMemoryWatermarks::default(),
        settings(),
    );

    engine.run_password_sync().await.unwrap();
    engine.run_profile_sync().await.unwrap();

    assert_eq!(engine.watermarks.current(SYNC_KEY_PASSWORD), Some(password_t));
    assert_eq!(engine.watermarks.current(SYNC_KEY_PROFILE), Some(profile_t));
}

#[tokio::test]
async fn rerun_with_no_new_rows_keeps_watermarks() {
    let t1 = at(2026, 8, 1, 10);
    let source = StaticHrSource {
        password_rows: vec![SourcePasswordRow {
            emp_no: "A100".to_owned(),
            password: "hash".to_owned(),
            updated_at: t1,
        }],
        ..StaticHrSource::default()
    };
    let engine = SyncEngine::new(
        source,
        InMemoryDirectory::default(),
        InMemoryWatermarks::default(),
        settings(),
    );

    engine.run_password_sync().await.unwrap();
    // The second run sees nothing newer than the watermark.
    let applied = engine.run_password_sync().await.unwrap();
    assert_eq!(applied, 0);

    assert_eq!(engine.watermarks.current(SYNC_KEY_PASSWORD), Some(t1));
}
