use sea_orm_migration::prelude::*;

mod m20260801_000001_create_users;
mod m20260801_000002_create_mail_logs;
mod m20260801_000003_create_sync_state;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260801_000001_create_users::Migration),
            Box::new(m20260801_000002_create_mail_logs::Migration),
            Box::new(m20260801_000003_create_sync_state::Migration),
        ]
    }
}
