pub mod mail_logs;
pub mod sync_state;
pub mod users;
