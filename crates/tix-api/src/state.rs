//! Shared application state

use std::sync::{Arc, Mutex, PoisonError};

use tix_core::{Database, QueryConfig};

use crate::response::ApiError;

pub struct AppState {
    db: Mutex<Database>,
    pub queries: QueryConfig,
}

impl AppState {
    pub fn new(db: Database, queries: QueryConfig) -> Self {
        Self {
            db: Mutex::new(db),
            queries,
        }
    }

    /// Run one store operation on the blocking pool, holding the handle for
    /// the duration of the call only.
    ///
    /// A panic in an earlier operation poisons the lock but leaves the
    /// connection usable: its uncommitted transaction was rolled back on drop.
    pub async fn run<T, F>(self: &Arc<Self>, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Database) -> tix_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let mut db = state.db.lock().unwrap_or_else(PoisonError::into_inner);
            op(&mut db).map_err(ApiError::from)
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
    }
}
