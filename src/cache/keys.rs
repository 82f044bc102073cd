use uuid::Uuid;

/// 队伍详情缓存键前缀
const TEAM_DETAIL_PREFIX: &str = "team:detail:";

/// 已吊销令牌键前缀
const REVOKED_TOKEN_PREFIX: &str = "token:revoked:";

/// 限流计数键前缀
const RATE_LIMIT_PREFIX: &str = "rate_limit:";

pub fn team_detail_key(team_id: Uuid) -> String {
    format!("{}{}", TEAM_DETAIL_PREFIX, team_id)
}

pub fn revoked_token_key(fingerprint: &str) -> String {
    format!("{}{}", REVOKED_TOKEN_PREFIX, fingerprint)
}

pub fn rate_limit_key(ip: &str) -> String {
    format!("{}{}", RATE_LIMIT_PREFIX, ip)
}
