use std::sync::Arc;

use crate::attempt::AttemptLifecycle;
use crate::catalog::SqlExamCatalog;
use crate::config::Config;
use axum::extract::FromRef;
use chrono::Duration;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        Self { pool, config }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

/// Handlers take the lifecycle controller straight from state; building one
/// only clones the pool handle.
impl FromRef<AppState> for AttemptLifecycle {
    fn from_ref(state: &AppState) -> Self {
        AttemptLifecycle::new(
            state.pool.clone(),
            Arc::new(SqlExamCatalog::new(state.pool.clone())),
            Duration::seconds(state.config.submit_grace_seconds),
        )
    }
}
