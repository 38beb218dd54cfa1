use crate::{config::Config, realtime::NotificationHub};
use axum::extract::FromRef;
use redis::aio::ConnectionManager;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    /// Redis connection for the content cache. `None` disables caching.
    pub cache: Option<ConnectionManager>,
    pub hub: NotificationHub,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for NotificationHub {
    fn from_ref(state: &AppState) -> Self {
        state.hub.clone()
    }
}
