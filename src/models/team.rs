use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::membership::{AddTarget, Membership, Role, Roster, Team};
use crate::models::user::{User, UserInfo};
use crate::permissions::{Actor, can_modify_team};

const TEAM_COLUMNS: &str = "id, name, description, trainer_id, created_at, updated_at";
const MEMBERSHIP_COLUMNS: &str = "id, team_id, user_id, role, joined_at";

/// 成员关系及成员公开信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDetail {
    pub id: Uuid,
    pub user: UserInfo,
    pub role: Role,
    pub role_display: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MemberRow {
    id: Uuid,
    role: Role,
    joined_at: DateTime<Utc>,
    user_id: Uuid,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
}

impl From<MemberRow> for MemberDetail {
    fn from(row: MemberRow) -> Self {
        Self {
            id: row.id,
            user: UserInfo {
                id: row.user_id,
                username: row.username,
                email: row.email,
                first_name: row.first_name,
                last_name: row.last_name,
            },
            role: row.role,
            role_display: row.role.display_name().to_string(),
            joined_at: row.joined_at,
        }
    }
}

/// 从成员角度看到的队伍
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserTeam {
    pub team_id: Uuid,
    pub team_name: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

fn validate_team_fields(name: Option<&str>, description: Option<&str>) -> AppResult<()> {
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(AppError::InvalidArgument("name is required".into()));
        }
        if name.chars().count() > 100 {
            return Err(AppError::InvalidArgument(
                "name must be at most 100 characters".into(),
            ));
        }
    }
    if description.is_some_and(|d| d.chars().count() > 500) {
        return Err(AppError::InvalidArgument(
            "description must be at most 500 characters".into(),
        ));
    }
    Ok(())
}

async fn user_by_username(conn: &mut PgConnection, username: &str) -> AppResult<User> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, first_name, last_name, is_staff, password_hash, created_at \
         FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("user {} not found", username)))
}

async fn user_by_id(conn: &mut PgConnection, user_id: Uuid) -> AppResult<User> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, first_name, last_name, is_staff, password_hash, created_at \
         FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::Internal(format!("trainer {} of a team has no user row", user_id)))
}

impl Roster {
    pub async fn load(pool: &PgPool, team_id: Uuid) -> AppResult<Self> {
        let mut conn = pool.acquire().await?;
        Self::fetch(&mut conn, team_id, false).await
    }

    /// 加载名册并锁住队伍行直到事务结束，同一队伍的成员变更依次执行
    async fn load_locked(conn: &mut PgConnection, team_id: Uuid) -> AppResult<Self> {
        Self::fetch(conn, team_id, true).await
    }

    async fn fetch(conn: &mut PgConnection, team_id: Uuid, lock: bool) -> AppResult<Self> {
        let team = sqlx::query_as::<_, Team>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1{}",
            if lock { " FOR UPDATE" } else { "" }
        ))
        .bind(team_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("team not found".into()))?;

        let memberships = sqlx::query_as::<_, Membership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM team_memberships WHERE team_id = $1 ORDER BY joined_at ASC"
        ))
        .bind(team_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Roster::new(team, memberships))
    }
}

impl Team {
    pub async fn create(
        pool: &PgPool,
        actor: &Actor,
        name: &str,
        description: &str,
    ) -> AppResult<Roster> {
        validate_team_fields(Some(name), Some(description))?;
        let roster = Roster::founding(name.trim(), description, actor.user_id, Utc::now());

        // 创建队伍的同时把创建者设为教练
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO teams (id, name, description, trainer_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(roster.team.id)
        .bind(&roster.team.name)
        .bind(&roster.team.description)
        .bind(roster.team.trainer_id)
        .bind(roster.team.created_at)
        .bind(roster.team.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "team name"))?;

        for m in &roster.memberships {
            insert_membership(&mut tx, m).await?;
        }

        tx.commit().await?;

        tracing::info!(
            "User {} created team {} ({})",
            actor.username,
            roster.team.name,
            roster.team.id
        );
        Ok(roster)
    }

    pub async fn list_all(pool: &PgPool) -> AppResult<Vec<Self>> {
        let teams = sqlx::query_as::<_, Team>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams ORDER BY name ASC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(teams)
    }

    pub async fn update(
        pool: &PgPool,
        actor: &Actor,
        team_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> AppResult<Self> {
        validate_team_fields(name, description)?;

        let mut tx = pool.begin().await?;
        let roster = Roster::load_locked(&mut tx, team_id).await?;
        if !can_modify_team(Some(actor), &roster.team) {
            return Err(AppError::PermissionDenied(
                "only the trainer of this team can update it".into(),
            ));
        }

        let team = sqlx::query_as::<_, Team>(&format!(
            r#"
            UPDATE teams
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(team_id)
        .bind(name.map(str::trim))
        .bind(description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "team name"))?;

        tx.commit().await?;
        Ok(team)
    }

    pub async fn delete(pool: &PgPool, actor: &Actor, team_id: Uuid) -> AppResult<()> {
        let mut tx = pool.begin().await?;
        let roster = Roster::load_locked(&mut tx, team_id).await?;
        if !can_modify_team(Some(actor), &roster.team) {
            return Err(AppError::PermissionDenied(
                "only the trainer of this team can delete it".into(),
            ));
        }

        // 成员、帖子、活动随队伍级联删除
        sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(team_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("User {} deleted team {}", actor.username, team_id);
        Ok(())
    }

    pub async fn add_member(
        pool: &PgPool,
        actor: &Actor,
        team_id: Uuid,
        username: Option<&str>,
        role: Option<Role>,
    ) -> AppResult<Membership> {
        let mut tx = pool.begin().await?;
        let roster = Roster::load_locked(&mut tx, team_id).await?;

        let admission = roster.authorize_add(actor, username, role)?;
        let user_id = match &admission.target {
            AddTarget::Actor => actor.user_id,
            AddTarget::Username(name) => user_by_username(&mut tx, name).await?.id,
        };
        let membership = roster.admit(user_id, admission.role, Utc::now())?;
        insert_membership(&mut tx, &membership).await?;

        tx.commit().await?;

        tracing::info!(
            "User {} added {} to team {} as {}",
            actor.username,
            membership.user_id,
            team_id,
            membership.role
        );
        Ok(membership)
    }

    pub async fn remove_member(
        pool: &PgPool,
        actor: &Actor,
        team_id: Uuid,
        username: &str,
    ) -> AppResult<()> {
        let mut tx = pool.begin().await?;
        let roster = Roster::load_locked(&mut tx, team_id).await?;

        // 移除教练对任何人都是参数错误；其余情况先确认权限再按用户名查找
        let trainer = user_by_id(&mut tx, roster.trainer_id()).await?;
        let target = if trainer.username == username {
            trainer
        } else {
            roster.require_trainer(actor, "remove members")?;
            user_by_username(&mut tx, username).await?
        };

        let membership_id = roster.plan_removal(actor, target.id)?;
        delete_membership(&mut tx, membership_id).await?;

        tx.commit().await?;

        tracing::info!(
            "User {} removed {} from team {}",
            actor.username,
            target.username,
            team_id
        );
        Ok(())
    }

    pub async fn leave(pool: &PgPool, actor: &Actor, team_id: Uuid) -> AppResult<()> {
        let mut tx = pool.begin().await?;
        let roster = Roster::load_locked(&mut tx, team_id).await?;

        let membership_id = roster.plan_leave(actor)?;
        delete_membership(&mut tx, membership_id).await?;

        tx.commit().await?;

        tracing::info!("User {} left team {}", actor.username, team_id);
        Ok(())
    }

    /// 把教练角色移交给现有成员；降级、升级和队伍的教练引用一起提交
    pub async fn transfer_trainer(
        pool: &PgPool,
        actor: &Actor,
        team_id: Uuid,
        username: &str,
    ) -> AppResult<Roster> {
        let mut tx = pool.begin().await?;
        let mut roster = Roster::load_locked(&mut tx, team_id).await?;
        roster.require_trainer(actor, "transfer the trainer role")?;
        let target = user_by_username(&mut tx, username).await?;

        let transfer = roster.plan_transfer(actor, target.id)?;

        // 先降级旧教练，唯一索引不允许同时存在两个教练
        sqlx::query("UPDATE team_memberships SET role = $2 WHERE id = $1")
            .bind(transfer.demote_membership)
            .bind(Role::Member)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE team_memberships SET role = $2 WHERE id = $1")
            .bind(transfer.promote_membership)
            .bind(Role::Trainer)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        sqlx::query("UPDATE teams SET trainer_id = $2, updated_at = $3 WHERE id = $1")
            .bind(team_id)
            .bind(transfer.new_trainer)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        roster.apply_transfer(&transfer, now);

        tracing::info!(
            "Team {} trainer transferred from {} to {}",
            team_id,
            transfer.old_trainer,
            transfer.new_trainer
        );
        Ok(roster)
    }

    pub async fn member_details(pool: &PgPool, team_id: Uuid) -> AppResult<Vec<MemberDetail>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT m.id, m.role, m.joined_at,
                   u.id AS user_id, u.username, u.email, u.first_name, u.last_name
            FROM team_memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.team_id = $1
            ORDER BY m.joined_at ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(MemberDetail::from).collect())
    }

    pub async fn teams_of_user(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<UserTeam>> {
        let teams = sqlx::query_as::<_, UserTeam>(
            r#"
            SELECT t.id AS team_id, t.name AS team_name, m.role, m.joined_at
            FROM team_memberships m
            JOIN teams t ON t.id = m.team_id
            WHERE m.user_id = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(teams)
    }
}

async fn insert_membership(conn: &mut PgConnection, m: &Membership) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO team_memberships (id, team_id, user_id, role, joined_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(m.id)
    .bind(m.team_id)
    .bind(m.user_id)
    .bind(m.role)
    .bind(m.joined_at)
    .execute(conn)
    .await
    .map_err(|e| AppError::from_db(e, "membership"))?;
    Ok(())
}

async fn delete_membership(conn: &mut PgConnection, membership_id: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM team_memberships WHERE id = $1")
        .bind(membership_id)
        .execute(conn)
        .await?;
    Ok(())
}
