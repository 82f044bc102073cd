use axum::Json;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::Config;
use crate::permissions::Actor;
use crate::result::ApiResponse;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // 用户ID
    pub username: String, // 用户名
    #[serde(default)]
    pub is_staff: bool,
    pub exp: i64, // 过期时间
    pub iat: i64, // 签发时间
}

impl Claims {
    /// 解析请求的操作者；sub 格式错误时返回 `None`，权限检查按匿名处理
    pub fn actor(&self) -> Option<Actor> {
        let user_id = Uuid::parse_str(&self.sub).ok()?;
        Some(Actor {
            user_id,
            username: self.username.clone(),
            is_staff: self.is_staff,
        })
    }
}

pub fn generate_token(
    user_id: Uuid,
    username: &str,
    is_staff: bool,
    config: &Config,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expiration = (now + Duration::seconds(config.jwt_expiration().as_secs() as i64)).timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        is_staff,
        exp: expiration,
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    tracing::debug!("Generated token for user: {}", username);
    Ok((token, expiration))
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// 令牌指纹，避免直接存储令牌
pub fn token_fingerprint(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse::error(code, msg))
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const CONFLICT: i32 = 1001;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const INTERNAL_ERROR: i32 = 5000;
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/team_hub_test".into(),
        redis_url: "redis://127.0.0.1/".into(),
        jwt_secret: "test-secret".into(),
        jwt_expiration_secs: 3600,
        rate_limit_window_secs: 60,
        rate_limit_requests: 100,
        server_host: "127.0.0.1".into(),
        server_port: 3000,
        api_base_uri: "/api".into(),
        team_cache_ttl_secs: 600,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_carries_actor_identity() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let (token, exp) = generate_token(user_id, "ana", false, &config).unwrap();

        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.exp, exp);
        let actor = claims.actor().unwrap();
        assert_eq!(actor.user_id, user_id);
        assert_eq!(actor.username, "ana");
        assert!(!actor.is_staff);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let config = test_config();
        let (token, _) = generate_token(Uuid::new_v4(), "ana", false, &config).unwrap();

        let mut other = test_config();
        other.jwt_secret = "another-secret".into();
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            username: "ana".into(),
            is_staff: false,
            exp: Utc::now().timestamp() - 3600,
            iat: Utc::now().timestamp() - 7200,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(verify_token(&token, &config).is_err());
    }

    #[test]
    fn malformed_subject_has_no_actor() {
        let claims = Claims {
            sub: "not-a-uuid".into(),
            username: "ana".into(),
            is_staff: false,
            exp: 0,
            iat: 0,
        };
        assert!(claims.actor().is_none());
    }

    #[test]
    fn password_hash_verifies() {
        let hashed = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hashed).unwrap());
        assert!(!verify_password("battery staple", &hashed).unwrap());
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = token_fingerprint("abc");
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, token_fingerprint("abc"));
        assert_ne!(fp, token_fingerprint("abd"));
    }
}
