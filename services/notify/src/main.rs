use sea_orm::Database;
use tracing::info;

use helpdesk_notify::config::NotifyConfig;
use helpdesk_notify::infra::hr::DbHrSource;
use helpdesk_notify::infra::smtp::SmtpMailer;
use helpdesk_notify::router::build_router;
use helpdesk_notify::state::AppState;
use helpdesk_notify::usecase::dispatch::DispatchWorker;
use helpdesk_notify::usecase::sync::SyncEngine;

#[tokio::main]
async fn main() {
    helpdesk_core::tracing::init_tracing("notify");

    let config = NotifyConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let state = AppState { db };

    match config.smtp_settings() {
        Some(smtp) => {
            let mailer = SmtpMailer::new(&smtp).expect("invalid SMTP configuration");
            let worker = DispatchWorker {
                outbox: state.outbox_repo(),
                transport: mailer,
            };
            tokio::spawn(worker.run());
            info!(host = %smtp.host, port = smtp.port, "mail dispatch worker started");
        }
        None => info!("SMTP not configured; mail dispatch disabled"),
    }

    match config.sync_settings() {
        Some(sync) => {
            let source_db = Database::connect(&sync.source_url)
                .await
                .expect("failed to connect to HR source database");
            let source = DbHrSource::new(source_db, &sync).expect("invalid sync configuration");
            let engine = SyncEngine::new(
                source,
                state.directory_repo(),
                state.sync_state_repo(),
                sync,
            );
            tokio::spawn(engine.run());
        }
        None => info!("directory sync disabled"),
    }

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.notify_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("notify service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
