use sea_orm::DatabaseConnection;

use crate::infra::db::{DbDirectoryRepository, DbMailOutboxRepository, DbSyncStateRepository};

/// Shared application state: the local database handle plus repository
/// constructors over it.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
}

impl AppState {
    pub fn outbox_repo(&self) -> DbMailOutboxRepository {
        DbMailOutboxRepository {
            db: self.db.clone(),
        }
    }

    pub fn sync_state_repo(&self) -> DbSyncStateRepository {
        DbSyncStateRepository {
            db: self.db.clone(),
        }
    }

    pub fn directory_repo(&self) -> DbDirectoryRepository {
        DbDirectoryRepository {
            db: self.db.clone(),
        }
    }
}
