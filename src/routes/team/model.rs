use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::membership::{Membership, Role, Roster, Team};
use crate::models::{MemberDetail, UserInfo};

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub username: Option<String>,
    pub role: Option<String>,
}

impl AddMemberRequest {
    pub fn role(&self) -> AppResult<Option<Role>> {
        Ok(self.role.as_deref().map(str::parse::<Role>).transpose()?)
    }
}

#[derive(Debug, Deserialize)]
pub struct UsernameRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub id: Uuid,
    pub team: Uuid,
    pub user: Uuid,
    pub role: Role,
    pub role_display: String,
    pub joined_at: DateTime<Utc>,
}

impl From<Membership> for MembershipResponse {
    fn from(m: Membership) -> Self {
        Self {
            id: m.id,
            team: m.team_id,
            user: m.user_id,
            role: m.role,
            role_display: m.role.display_name().to_string(),
            joined_at: m.joined_at,
        }
    }
}

/// 队伍详情，包含教练和完整成员列表，缓存在 Redis 中
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamDetail {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub trainer: UserInfo,
    pub memberships: Vec<MemberDetail>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamDetail {
    pub async fn load(pool: &PgPool, roster: &Roster) -> AppResult<Self> {
        let memberships = Team::member_details(pool, roster.team.id).await?;
        let trainer = memberships
            .iter()
            .find(|m| m.user.id == roster.trainer_id())
            .map(|m| m.user.clone())
            .ok_or_else(|| AppError::Internal(format!("team {} has no trainer", roster.team.id)))?;

        Ok(Self {
            id: roster.team.id,
            name: roster.team.name.clone(),
            description: roster.team.description.clone(),
            trainer,
            memberships,
            created_at: roster.team.created_at,
            updated_at: roster.team.updated_at,
        })
    }

    /// 缓存的详情只有在与数据库中的名册完全一致时才可复用
    pub fn is_current(&self, roster: &Roster) -> bool {
        let mut cached = self.roster();
        let mut fresh = roster.clone();
        cached.memberships.sort_by_key(|m| m.id);
        fresh.memberships.sort_by_key(|m| m.id);
        cached == fresh
    }

    /// 还原渲染该详情时的名册
    pub fn roster(&self) -> Roster {
        let team = Team {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            trainer_id: self.trainer.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        let memberships = self
            .memberships
            .iter()
            .map(|m| Membership {
                id: m.id,
                team_id: self.id,
                user_id: m.user.id,
                role: m.role,
                joined_at: m.joined_at,
            })
            .collect();
        Roster::new(team, memberships)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{Actor, can_view_team};

    fn info(name: &str) -> UserInfo {
        UserInfo {
            id: Uuid::new_v4(),
            username: name.into(),
            email: format!("{}@example.com", name),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    fn detail(role: Role, user: UserInfo) -> MemberDetail {
        MemberDetail {
            id: Uuid::new_v4(),
            user,
            role,
            role_display: role.display_name().into(),
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn cached_detail_rebuilds_a_consistent_roster() {
        let trainer = info("a");
        let member = info("b");
        let now = Utc::now();
        let team = TeamDetail {
            id: Uuid::new_v4(),
            name: "Falcons".into(),
            description: String::new(),
            trainer: trainer.clone(),
            memberships: vec![
                detail(Role::Trainer, trainer.clone()),
                detail(Role::Member, member.clone()),
            ],
            created_at: now,
            updated_at: now,
        };

        let roster = team.roster();
        assert!(roster.is_consistent());
        assert_eq!(roster.trainer_id(), trainer.id);
        assert_eq!(roster.role_of(member.id), Some(Role::Member));
    }

    #[test]
    fn stale_cached_detail_is_not_reused_after_removal() {
        let trainer = info("a");
        let member = info("b");
        let now = Utc::now();
        let cached = TeamDetail {
            id: Uuid::new_v4(),
            name: "Falcons".into(),
            description: String::new(),
            trainer: trainer.clone(),
            memberships: vec![
                detail(Role::Trainer, trainer.clone()),
                detail(Role::Member, member.clone()),
            ],
            created_at: now,
            updated_at: now,
        };
        assert!(cached.is_current(&cached.roster()));

        // b 被移除后数据库中的名册
        let mut fresh = cached.roster();
        fresh.memberships.retain(|m| m.user_id != member.id);

        let b = Actor {
            user_id: member.id,
            username: member.username.clone(),
            is_staff: false,
        };
        assert!(can_view_team(Some(&b), &cached.roster()));
        assert!(!cached.is_current(&fresh));
        assert!(!can_view_team(Some(&b), &fresh));
    }

    #[test]
    fn detail_from_before_a_transfer_is_stale() {
        let trainer = info("a");
        let member = info("b");
        let now = Utc::now();
        let cached = TeamDetail {
            id: Uuid::new_v4(),
            name: "Falcons".into(),
            description: String::new(),
            trainer: trainer.clone(),
            memberships: vec![
                detail(Role::Trainer, trainer.clone()),
                detail(Role::Member, member.clone()),
            ],
            created_at: now,
            updated_at: now,
        };

        let mut fresh = cached.roster();
        let a = Actor {
            user_id: trainer.id,
            username: trainer.username.clone(),
            is_staff: false,
        };
        let transfer = fresh.plan_transfer(&a, member.id).unwrap();
        fresh.apply_transfer(&transfer, now);

        assert!(!cached.is_current(&fresh));
    }

    #[test]
    fn unknown_role_in_request_is_rejected() {
        let req = AddMemberRequest {
            username: Some("b".into()),
            role: Some("captain".into()),
        };
        assert!(matches!(req.role(), Err(AppError::InvalidArgument(_))));

        let req = AddMemberRequest {
            username: None,
            role: None,
        };
        assert_eq!(req.role().unwrap(), None);
    }
}
