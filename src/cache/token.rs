use std::sync::Arc;

use redis::{AsyncCommands, Client as RedisClient};

use super::keys::revoked_token_key;
use crate::utils::token_fingerprint;

/// 登出吊销的令牌，保留到其原本的过期时间
pub struct TokenRevocations;

impl TokenRevocations {
    pub async fn revoke(
        redis: &Arc<RedisClient>,
        token: &str,
        expires_at: i64,
    ) -> Result<(), redis::RedisError> {
        let ttl = expires_at - chrono::Utc::now().timestamp();
        if ttl <= 0 {
            return Ok(());
        }
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let _: () = conn
            .set_ex(revoked_token_key(&token_fingerprint(token)), 1, ttl as u64)
            .await?;
        Ok(())
    }

    pub async fn is_revoked(
        redis: &Arc<RedisClient>,
        token: &str,
    ) -> Result<bool, redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        conn.exists(revoked_token_key(&token_fingerprint(token))).await
    }
}
