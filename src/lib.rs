pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {
    crate::{
        domain::gateway::GatewayRegistry,
        services::{cache::PendingCountCache, notify::Notifier},
    },
    std::sync::Arc,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub gateways: GatewayRegistry,
    pub notifier: Arc<Notifier>,
    pub pending_cache: Arc<PendingCountCache>,
}
