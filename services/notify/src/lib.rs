pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod mail;
pub mod router;
pub mod state;
pub mod usecase;
