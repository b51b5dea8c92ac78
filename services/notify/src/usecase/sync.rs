use std::time::Duration as StdDuration;

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};

use crate::config::SyncSettings;
use crate::domain::repository::{DirectoryRepository, HrSourcePort, SyncStateRepository};
use crate::domain::types::{SYNC_KEY_PASSWORD, SYNC_KEY_PROFILE};
use crate::error::NotifyServiceError;

/// Scheduler tick interval; each tick independently checks both tasks.
pub const SYNC_TICK_SECONDS: u64 = 60;

/// The daily profile schedule is expressed in KST (UTC+9).
const KST_OFFSET_SECS: i32 = 9 * 3600;

fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).expect("valid KST offset")
}

/// Background engine mirroring the HR source into the local user table on
/// two independent schedules: a frequent password-only sync and a daily
/// full-profile sync, each with its own watermark.
pub struct SyncEngine<S, D, W>
where
    S: HrSourcePort,
    D: DirectoryRepository,
    W: SyncStateRepository,
{
    pub source: S,
    pub directory: D,
    pub watermarks: W,
    settings: SyncSettings,
    /// One-shot: the next successful profile run ignores its watermark.
    /// Engine-owned state, initialized from config at construction.
    force_full_pending: bool,
    last_password_run: Option<DateTime<Utc>>,
    last_profile_date: Option<NaiveDate>,
}

impl<S, D, W> SyncEngine<S, D, W>
where
    S: HrSourcePort,
    D: DirectoryRepository,
    W: SyncStateRepository,
{
    pub fn new(source: S, directory: D, watermarks: W, settings: SyncSettings) -> Self {
        let force_full_pending = settings.force_full;
        Self {
            source,
            directory,
            watermarks,
            settings,
            force_full_pending,
            last_password_run: None,
            last_profile_date: None,
        }
    }

    /// Tick forever. Task errors are logged and never terminate the loop.
    pub async fn run(mut self) {
        tracing::info!(
            password_interval_seconds = self.settings.password_interval_seconds,
            full_at_hour = self.settings.full_at_hour,
            full_at_minute = self.settings.full_at_minute,
            "directory sync started (profile schedule in KST)"
        );
        let mut ticker = tokio::time::interval(StdDuration::from_secs(SYNC_TICK_SECONDS));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.tick(Utc::now()).await;
        }
    }

    /// One scheduler tick. Each task is a bounded, independently-erroring
    /// unit of work; a failed run leaves its schedule state untouched so
    /// the next tick retries.
    pub async fn tick(&mut self, now: DateTime<Utc>) {
        if self.password_due(now) {
            match self.run_password_sync().await {
                Ok(rows) => {
                    self.last_password_run = Some(now);
                    if rows > 0 {
                        tracing::info!(rows, "user password sync completed");
                    }
                }
                Err(error) => {
                    tracing::error!(error = %error, "user password sync failed");
                }
            }
        }

        if self.profile_due(now) {
            match self.run_profile_sync().await {
                Ok(rows) => {
                    self.last_profile_date = Some(now.with_timezone(&kst()).date_naive());
                    tracing::info!(rows, "user profile sync completed");
                }
                Err(error) => {
                    tracing::error!(error = %error, "user profile sync failed");
                }
            }
        }
    }

    fn password_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_password_run {
            None => true,
            Some(last) => {
                (now - last).num_seconds() >= self.settings.password_interval_seconds as i64
            }
        }
    }

    /// Due when the KST wall-clock hour matches the configured hour and the
    /// calendar day has advanced since the last successful run, so the task
    /// fires at most once per day.
    fn profile_due(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&kst());
        local.hour() == self.settings.full_at_hour
            && self
                .last_profile_date
                .is_none_or(|date| local.date_naive() > date)
    }

    /// Password-only sync: update-only writes keyed by employee number.
    /// Never inserts — an unknown employee number is a zero-row update.
    pub async fn run_password_sync(&self) -> Result<usize, NotifyServiceError> {
        let since = self
            .watermarks
            .get(SYNC_KEY_PASSWORD)
            .await?
            .unwrap_or(DateTime::UNIX_EPOCH);

        let rows = self.source.fetch_password_rows(since).await?;
        let mut max_updated: Option<DateTime<Utc>> = None;
        let mut applied = 0usize;
        for row in &rows {
            let matched = self
                .directory
                .update_password(&row.emp_no, &row.password)
                .await?;
            if !matched {
                tracing::debug!(emp_no = %row.emp_no, "password sync: no local user for row");
            }
            applied += 1;
            if max_updated.is_none_or(|max| row.updated_at > max) {
                max_updated = Some(row.updated_at);
            }
        }

        // Advance to the max source timestamp actually applied; an empty
        // run leaves the watermark untouched.
        if let Some(max) = max_updated {
            self.watermarks.set(SYNC_KEY_PASSWORD, max).await?;
        }
        Ok(applied)
    }

    /// Full-profile sync: upsert by employee number. New local users are
    /// created with role "requester" and verified=true (onboarding).
    pub async fn run_profile_sync(&mut self) -> Result<usize, NotifyServiceError> {
        let since = if self.force_full_pending {
            DateTime::UNIX_EPOCH
        } else {
            self.watermarks
                .get(SYNC_KEY_PROFILE)
                .await?
                .unwrap_or(DateTime::UNIX_EPOCH)
        };

        let rows = self.source.fetch_profile_rows(since).await?;
        let mut max_updated: Option<DateTime<Utc>> = None;
        let mut applied = 0usize;
        for row in &rows {
            self.directory.upsert_profile(row).await?;
            applied += 1;
            if max_updated.is_none_or(|max| row.updated_at > max) {
                max_updated = Some(row.updated_at);
            }
        }

        if let Some(max) = max_updated {
            self.watermarks.set(SYNC_KEY_PROFILE, max).await?;
        }
        // Consumed only after a clean run; a failed forced run retries with
        // the epoch watermark on the next schedule.
        self.force_full_pending = false;
        Ok(applied)
    }
}
