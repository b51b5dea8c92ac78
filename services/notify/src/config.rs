/// Notify service configuration loaded from environment variables.
#[derive(Debug)]
pub struct NotifyConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port for the health HTTP server (default 3114). Env var: `NOTIFY_PORT`.
    pub notify_port: u16,
    /// Base URL used to build ticket links in mail bodies. Env var: `APP_BASE_URL`.
    pub app_base_url: String,
    /// SMTP relay host. Absent ⇒ the mail subsystem is disabled.
    pub smtp_host: Option<String>,
    /// SMTP relay port (default 25).
    pub smtp_port: u16,
    /// Sender address. Absent ⇒ the mail subsystem is disabled.
    pub smtp_from: Option<String>,
    /// Sender display name (default "Helpdesk").
    pub smtp_from_name: String,
    /// Master switch for the directory sync engine. Env var: `SYNC_ENABLED`.
    pub sync_enabled: bool,
    /// Read-only HR source connection URL. Absent ⇒ sync disabled.
    pub sync_source_database_url: Option<String>,
    /// Schema name inside the HR source database.
    pub sync_source_schema: String,
    /// Employee-number LIKE prefix filter for both sync tasks.
    pub sync_emp_no_prefix: String,
    /// Password sync interval in seconds (floored at 60).
    pub sync_password_interval_seconds: u64,
    /// Daily profile sync schedule, hour/minute in KST.
    pub sync_full_at_hour: u32,
    pub sync_full_at_minute: u32,
    /// One-shot full resync: the next profile run ignores its watermark.
    pub sync_force_full: bool,
}

/// SMTP relay settings, present only when mail delivery is configured.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub from_address: String,
    pub from_name: String,
}

/// Directory sync settings, present only when the engine is enabled.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub source_url: String,
    pub source_schema: String,
    pub emp_no_prefix: String,
    pub password_interval_seconds: u64,
    pub full_at_hour: u32,
    pub full_at_minute: u32,
    pub force_full: bool,
}

impl NotifyConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            notify_port: std::env::var("NOTIFY_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3114),
            app_base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_owned()),
            smtp_host: std::env::var("SMTP_HOST").ok().filter(|v| !v.is_empty()),
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(25),
            smtp_from: std::env::var("SMTP_FROM").ok().filter(|v| !v.is_empty()),
            smtp_from_name: std::env::var("SMTP_FROM_NAME")
                .unwrap_or_else(|_| "Helpdesk".to_owned()),
            sync_enabled: std::env::var("SYNC_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            sync_source_database_url: std::env::var("SYNC_SOURCE_DATABASE_URL")
                .ok()
                .filter(|v| !v.is_empty()),
            sync_source_schema: std::env::var("SYNC_SOURCE_SCHEMA")
                .unwrap_or_else(|_| "hr".to_owned()),
            sync_emp_no_prefix: std::env::var("SYNC_EMP_NO_PREFIX").unwrap_or_default(),
            sync_password_interval_seconds: std::env::var("SYNC_PASSWORD_INTERVAL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            sync_full_at_hour: std::env::var("SYNC_FULL_AT_HOUR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            sync_full_at_minute: std::env::var("SYNC_FULL_AT_MINUTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            sync_force_full: std::env::var("SYNC_FORCE_FULL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }

    /// SMTP settings, or `None` when host or from-address is missing.
    /// Absence is a valid disabled mode, not an error.
    pub fn smtp_settings(&self) -> Option<SmtpSettings> {
        match (&self.smtp_host, &self.smtp_from) {
            (Some(host), Some(from)) => Some(SmtpSettings {
                host: host.clone(),
                port: self.smtp_port,
                from_address: from.clone(),
                from_name: self.smtp_from_name.clone(),
            }),
            _ => None,
        }
    }

    /// Sync settings, or `None` when the engine is disabled or the source URL
    /// is missing. The interval is floored at 60 seconds.
    pub fn sync_settings(&self) -> Option<SyncSettings> {
        if !self.sync_enabled {
            return None;
        }
        let source_url = self.sync_source_database_url.clone()?;
        Some(SyncSettings {
            source_url,
            source_schema: self.sync_source_schema.clone(),
            emp_no_prefix: self.sync_emp_no_prefix.clone(),
            password_interval_seconds: self.sync_password_interval_seconds.max(60),
            full_at_hour: self.sync_full_at_hour,
            full_at_minute: self.sync_full_at_minute,
            force_full: self.sync_force_full,
        })
    }
}
