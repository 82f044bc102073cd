use std::sync::Arc;

use redis::Client as RedisClient;
use sqlx::PgPool;

use config::Config;

pub mod cache;
pub mod config;
pub mod error;
pub mod membership;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod result;
pub mod router;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub redis: Arc<RedisClient>,
}
