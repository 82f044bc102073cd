use std::sync::Arc;
use std::time::Duration;

use redis::{AsyncCommands, Client as RedisClient};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use super::keys::team_detail_key;

/// 队伍详情缓存，尽力而为：Redis 出错只记录日志，退回数据库读取
pub struct TeamCache;

impl TeamCache {
    pub async fn get<T: DeserializeOwned>(redis: &Arc<RedisClient>, team_id: Uuid) -> Option<T> {
        let key = team_detail_key(team_id);
        let mut conn = redis.get_multiplexed_async_connection().await.ok()?;
        let cached: Option<String> = conn.get(&key).await.ok()?;
        let value = serde_json::from_str(&cached?).ok()?;
        tracing::debug!("Get team from cache: {}", key);
        Some(value)
    }

    pub async fn put<T: Serialize>(
        redis: &Arc<RedisClient>,
        team_id: Uuid,
        value: &T,
        ttl: Duration,
    ) {
        let key = team_detail_key(team_id);
        let Ok(json) = serde_json::to_string(value) else {
            return;
        };
        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            let result: Result<(), redis::RedisError> = conn.set_ex(&key, json, ttl.as_secs()).await;
            match result {
                Ok(()) => tracing::debug!("Set team to cache: {}", key),
                Err(e) => tracing::warn!("Failed to cache team {}: {}", team_id, e),
            }
        }
    }

    /// 队伍或成员变更提交后调用
    pub async fn invalidate(redis: &Arc<RedisClient>, team_id: Uuid) {
        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            let result: Result<(), redis::RedisError> = conn.del(team_detail_key(team_id)).await;
            if let Err(e) = result {
                tracing::warn!("Failed to invalidate team cache {}: {}", team_id, e);
            }
        }
    }
}
