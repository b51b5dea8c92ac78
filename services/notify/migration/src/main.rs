use sea_orm_migration::prelude::*;

use helpdesk_notify_migration::Migrator;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
