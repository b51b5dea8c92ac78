pub mod dispatch;
pub mod enqueue_mail;
pub mod notify;
pub mod sync;
