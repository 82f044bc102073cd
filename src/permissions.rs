//! 权限判断
//!
//! 每个检查都是操作者、资源和动作的纯函数。没有操作者或关系不匹配时一律拒绝；
//! 不会出错，也不访问存储。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::membership::{Roster, Team};
use crate::models::{Comment, Post};

/// 请求背后的已认证身份
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub username: String,
    /// 平台级标记，队伍规则不使用
    pub is_staff: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

fn is_member(actor: Option<&Actor>, roster: &Roster) -> bool {
    actor.is_some_and(|a| roster.is_member(a.user_id))
}

fn is_trainer(actor: Option<&Actor>, team: &Team) -> bool {
    actor.is_some_and(|a| a.user_id == team.trainer_id)
}

fn is_user(actor: Option<&Actor>, user_id: Uuid) -> bool {
    actor.is_some_and(|a| a.user_id == user_id)
}

pub fn can_view_team(actor: Option<&Actor>, roster: &Roster) -> bool {
    is_member(actor, roster)
}

/// 修改和删除队伍本身
pub fn can_modify_team(actor: Option<&Actor>, team: &Team) -> bool {
    is_trainer(actor, team)
}

pub fn can_create_post(actor: Option<&Actor>, team: &Team) -> bool {
    is_trainer(actor, team)
}

pub fn can_access_post(actor: Option<&Actor>, roster: &Roster, post: &Post, action: Action) -> bool {
    if post.team_id != roster.team.id {
        return false;
    }
    match action {
        Action::Read => is_member(actor, roster),
        Action::Create => can_create_post(actor, &roster.team),
        Action::Update | Action::Delete => is_user(actor, post.author_id),
    }
}

pub fn can_create_comment(actor: Option<&Actor>, roster: &Roster, post: &Post) -> bool {
    post.team_id == roster.team.id && is_member(actor, roster)
}

pub fn can_access_comment(
    actor: Option<&Actor>,
    roster: &Roster,
    comment: &Comment,
    action: Action,
) -> bool {
    match action {
        Action::Read | Action::Create => is_member(actor, roster),
        Action::Update => is_user(actor, comment.author_id),
        Action::Delete => is_user(actor, comment.author_id) || is_trainer(actor, &roster.team),
    }
}

pub fn can_manage_event(actor: Option<&Actor>, roster: &Roster, action: Action) -> bool {
    match action {
        Action::Read => is_member(actor, roster),
        Action::Create | Action::Update | Action::Delete => is_trainer(actor, &roster.team),
    }
}
