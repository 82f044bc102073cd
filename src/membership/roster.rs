use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{MembershipError, Role};
use crate::permissions::Actor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub trainer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// 权限确认后 `add_member` 实际加入的对象
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddTarget {
    Actor,
    Username(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub target: AddTarget,
    pub role: Role,
}

/// 移交教练的三次写入，按顺序执行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub team_id: Uuid,
    pub demote_membership: Uuid,
    pub promote_membership: Uuid,
    pub old_trainer: Uuid,
    pub new_trainer: Uuid,
}

/// 队伍及其全部成员关系
///
/// 所有成员规则都基于名册判断，写入之前即可检查教练不变量
/// （`team.trainer_id` 是唯一的 `Trainer` 成员）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub team: Team,
    pub memberships: Vec<Membership>,
}

impl Roster {
    pub fn new(team: Team, memberships: Vec<Membership>) -> Self {
        Self { team, memberships }
    }

    /// 新建队伍的名册，创建者为教练
    pub fn founding(name: &str, description: &str, creator: Uuid, now: DateTime<Utc>) -> Self {
        let team = Team {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            trainer_id: creator,
            created_at: now,
            updated_at: now,
        };
        let trainer = Membership {
            id: Uuid::new_v4(),
            team_id: team.id,
            user_id: creator,
            role: Role::Trainer,
            joined_at: now,
        };
        Self {
            team,
            memberships: vec![trainer],
        }
    }

    pub fn trainer_id(&self) -> Uuid {
        self.team.trainer_id
    }

    pub fn membership_of(&self, user_id: Uuid) -> Option<&Membership> {
        self.memberships.iter().find(|m| m.user_id == user_id)
    }

    pub fn role_of(&self, user_id: Uuid) -> Option<Role> {
        self.membership_of(user_id).map(|m| m.role)
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.membership_of(user_id).is_some()
    }

    pub fn is_trainer(&self, user_id: Uuid) -> bool {
        self.team.trainer_id == user_id
    }

    /// 恰好一个教练成员且为 `team.trainer_id`，同一用户不会重复加入
    pub fn is_consistent(&self) -> bool {
        let mut trainers = self.memberships.iter().filter(|m| m.role.is_trainer());
        let single_trainer = match (trainers.next(), trainers.next()) {
            (Some(t), None) => t.user_id == self.team.trainer_id,
            _ => false,
        };
        let mut users: Vec<Uuid> = self.memberships.iter().map(|m| m.user_id).collect();
        users.sort();
        users.dedup();
        single_trainer
            && users.len() == self.memberships.len()
            && self.memberships.iter().all(|m| m.team_id == self.team.id)
    }

    /// 在查找目标用户之前确定可以加入谁、以什么角色加入
    pub fn authorize_add(
        &self,
        actor: &Actor,
        username: Option<&str>,
        role: Option<Role>,
    ) -> Result<Admission, MembershipError> {
        let username = username.map(str::trim).filter(|u| !u.is_empty());

        if self.is_trainer(actor.user_id) {
            let username = username.ok_or_else(|| {
                MembershipError::InvalidArgument("username is required".into())
            })?;
            let target = if username == actor.username {
                AddTarget::Actor
            } else {
                AddTarget::Username(username.to_string())
            };
            let role = role.unwrap_or(Role::Member);
            if role.is_trainer() && target != AddTarget::Actor {
                return Err(MembershipError::PermissionDenied(
                    "trainer role can only be handed over by transferring the trainer".into(),
                ));
            }
            return Ok(Admission { target, role });
        }

        if let Some(name) = username {
            if name != actor.username {
                return Err(MembershipError::PermissionDenied(
                    "only the team trainer can add other users".into(),
                ));
            }
        }
        let role = role.unwrap_or(Role::Member);
        if role.is_trainer() {
            return Err(MembershipError::PermissionDenied(
                "only the team trainer can hold the trainer role".into(),
            ));
        }
        Ok(Admission {
            target: AddTarget::Actor,
            role,
        })
    }

    /// 生成 `user_id` 的成员记录；已是成员时返回冲突
    pub fn admit(
        &self,
        user_id: Uuid,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<Membership, MembershipError> {
        if self.is_member(user_id) {
            return Err(MembershipError::Conflict(
                "user is already a member of this team".into(),
            ));
        }
        Ok(Membership {
            id: Uuid::new_v4(),
            team_id: self.team.id,
            user_id,
            role,
            joined_at: now,
        })
    }

    /// 仅教练可以继续；在按用户名查找目标之前调用，避免泄露用户是否存在
    pub fn require_trainer(&self, actor: &Actor, action: &str) -> Result<(), MembershipError> {
        if self.is_trainer(actor.user_id) {
            return Ok(());
        }
        Err(MembershipError::PermissionDenied(format!(
            "only the team trainer can {}",
            action
        )))
    }

    /// 返回要删除的成员记录 id
    pub fn plan_removal(&self, actor: &Actor, target: Uuid) -> Result<Uuid, MembershipError> {
        if self.is_trainer(target) {
            return Err(MembershipError::InvalidArgument(
                "cannot remove the trainer, transfer the trainer role first".into(),
            ));
        }
        self.require_trainer(actor, "remove members")?;
        self.membership_of(target)
            .map(|m| m.id)
            .ok_or_else(|| MembershipError::NotFound("membership not found".into()))
    }

    pub fn plan_leave(&self, actor: &Actor) -> Result<Uuid, MembershipError> {
        if self.is_trainer(actor.user_id) {
            return Err(MembershipError::InvalidArgument(
                "the trainer cannot leave, transfer the trainer role first".into(),
            ));
        }
        self.membership_of(actor.user_id)
            .map(|m| m.id)
            .ok_or_else(|| MembershipError::NotFound("membership not found".into()))
    }

    pub fn plan_transfer(
        &self,
        actor: &Actor,
        new_trainer: Uuid,
    ) -> Result<Transfer, MembershipError> {
        self.require_trainer(actor, "transfer the trainer role")?;
        if self.is_trainer(new_trainer) {
            return Err(MembershipError::InvalidArgument(
                "user is already the trainer of this team".into(),
            ));
        }
        let promote = self.membership_of(new_trainer).ok_or_else(|| {
            MembershipError::InvalidArgument("new trainer must already be a team member".into())
        })?;
        let demote = self.membership_of(self.team.trainer_id).ok_or_else(|| {
            MembershipError::InvalidArgument("team has no trainer membership".into())
        })?;

        Ok(Transfer {
            team_id: self.team.id,
            demote_membership: demote.id,
            promote_membership: promote.id,
            old_trainer: self.team.trainer_id,
            new_trainer,
        })
    }

    #[cfg(test)]
    pub(crate) fn apply_admission(&mut self, membership: Membership) {
        self.memberships.push(membership);
    }

    #[cfg(test)]
    pub(crate) fn apply_removal(&mut self, membership_id: Uuid) {
        self.memberships.retain(|m| m.id != membership_id);
    }

    pub fn apply_transfer(&mut self, transfer: &Transfer, now: DateTime<Utc>) {
        for m in &mut self.memberships {
            if m.id == transfer.demote_membership {
                m.role = Role::Member;
            } else if m.id == transfer.promote_membership {
                m.role = Role::Trainer;
            }
        }
        self.team.trainer_id = transfer.new_trainer;
        self.team.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(name: &str) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            username: name.to_string(),
            is_staff: false,
        }
    }

    fn falcons(trainer: &Actor) -> Roster {
        Roster::founding("Falcons", "", trainer.user_id, Utc::now())
    }

    fn enroll(roster: &mut Roster, who: &Actor, role: Role) {
        let m = roster.admit(who.user_id, role, Utc::now()).unwrap();
        roster.apply_admission(m);
    }

    #[test]
    fn founding_roster_enrolls_creator_as_trainer() {
        let a = actor("a");
        let roster = falcons(&a);
        assert_eq!(roster.trainer_id(), a.user_id);
        assert_eq!(roster.role_of(a.user_id), Some(Role::Trainer));
        assert!(roster.is_consistent());
    }

    #[test]
    fn self_join_defaults_to_member() {
        let a = actor("a");
        let b = actor("b");
        let roster = falcons(&a);

        let admission = roster.authorize_add(&b, None, None).unwrap();
        assert_eq!(admission.target, AddTarget::Actor);
        assert_eq!(admission.role, Role::Member);

        let naming_self = roster.authorize_add(&b, Some("b"), Some(Role::Athlete)).unwrap();
        assert_eq!(naming_self.target, AddTarget::Actor);
        assert_eq!(naming_self.role, Role::Athlete);
    }

    #[test]
    fn non_trainer_cannot_add_others_or_claim_trainer() {
        let a = actor("a");
        let b = actor("b");
        let roster = falcons(&a);

        for role in [None, Some(Role::Member), Some(Role::Trainer)] {
            let err = roster.authorize_add(&b, Some("c"), role).unwrap_err();
            assert!(matches!(err, MembershipError::PermissionDenied(_)));
        }
        let err = roster.authorize_add(&b, None, Some(Role::Trainer)).unwrap_err();
        assert!(matches!(err, MembershipError::PermissionDenied(_)));
    }

    #[test]
    fn trainer_must_name_a_target() {
        let a = actor("a");
        let roster = falcons(&a);
        let err = roster.authorize_add(&a, None, None).unwrap_err();
        assert!(matches!(err, MembershipError::InvalidArgument(_)));
        let err = roster.authorize_add(&a, Some("   "), None).unwrap_err();
        assert!(matches!(err, MembershipError::InvalidArgument(_)));
    }

    #[test]
    fn trainer_adds_with_default_member_role() {
        let a = actor("a");
        let roster = falcons(&a);
        let admission = roster.authorize_add(&a, Some("c"), None).unwrap();
        assert_eq!(admission.target, AddTarget::Username("c".into()));
        assert_eq!(admission.role, Role::Member);

        let athlete = roster.authorize_add(&a, Some("c"), Some(Role::Athlete)).unwrap();
        assert_eq!(athlete.role, Role::Athlete);
    }

    #[test]
    fn trainer_cannot_grant_trainer_to_third_party() {
        let a = actor("a");
        let roster = falcons(&a);
        let err = roster
            .authorize_add(&a, Some("c"), Some(Role::Trainer))
            .unwrap_err();
        assert!(matches!(err, MembershipError::PermissionDenied(_)));
    }

    #[test]
    fn trainer_re_adding_self_conflicts() {
        let a = actor("a");
        let roster = falcons(&a);
        let admission = roster
            .authorize_add(&a, Some("a"), Some(Role::Trainer))
            .unwrap();
        assert_eq!(admission.target, AddTarget::Actor);
        let err = roster.admit(a.user_id, admission.role, Utc::now()).unwrap_err();
        assert!(matches!(err, MembershipError::Conflict(_)));
    }

    #[test]
    fn second_admission_conflicts() {
        let a = actor("a");
        let b = actor("b");
        let mut roster = falcons(&a);
        enroll(&mut roster, &b, Role::Member);

        let err = roster.admit(b.user_id, Role::Athlete, Utc::now()).unwrap_err();
        assert!(matches!(err, MembershipError::Conflict(_)));
        assert_eq!(roster.memberships.len(), 2);
        assert!(roster.is_consistent());
    }

    #[test]
    fn removing_trainer_is_invalid_for_any_actor() {
        let a = actor("a");
        let b = actor("b");
        let outsider = actor("x");
        let mut roster = falcons(&a);
        enroll(&mut roster, &b, Role::Member);

        for who in [&a, &b, &outsider] {
            let err = roster.plan_removal(who, a.user_id).unwrap_err();
            assert!(matches!(err, MembershipError::InvalidArgument(_)));
        }
    }

    #[test]
    fn only_trainer_removes_members() {
        let a = actor("a");
        let b = actor("b");
        let c = actor("c");
        let mut roster = falcons(&a);
        enroll(&mut roster, &b, Role::Member);
        enroll(&mut roster, &c, Role::Athlete);

        let err = roster.plan_removal(&b, c.user_id).unwrap_err();
        assert!(matches!(err, MembershipError::PermissionDenied(_)));

        let id = roster.plan_removal(&a, c.user_id).unwrap();
        roster.apply_removal(id);
        assert!(!roster.is_member(c.user_id));
        assert!(roster.is_consistent());

        let err = roster.plan_removal(&a, c.user_id).unwrap_err();
        assert!(matches!(err, MembershipError::NotFound(_)));
    }

    #[test]
    fn members_leave_but_trainer_stays() {
        let a = actor("a");
        let b = actor("b");
        let mut roster = falcons(&a);
        enroll(&mut roster, &b, Role::Member);

        let err = roster.plan_leave(&a).unwrap_err();
        assert!(matches!(err, MembershipError::InvalidArgument(_)));

        let id = roster.plan_leave(&b).unwrap();
        roster.apply_removal(id);
        assert!(!roster.is_member(b.user_id));

        let err = roster.plan_leave(&b).unwrap_err();
        assert!(matches!(err, MembershipError::NotFound(_)));
    }

    #[test]
    fn transfer_to_non_member_fails_without_changes() {
        let a = actor("a");
        let outsider = actor("x");
        let roster = falcons(&a);
        let before = roster.clone();

        let err = roster.plan_transfer(&a, outsider.user_id).unwrap_err();
        assert!(matches!(err, MembershipError::InvalidArgument(_)));
        assert_eq!(roster, before);
    }

    #[test]
    fn transfer_requires_current_trainer() {
        let a = actor("a");
        let b = actor("b");
        let c = actor("c");
        let mut roster = falcons(&a);
        enroll(&mut roster, &b, Role::Member);
        enroll(&mut roster, &c, Role::Member);

        let err = roster.plan_transfer(&b, c.user_id).unwrap_err();
        assert!(matches!(err, MembershipError::PermissionDenied(_)));

        let err = roster.plan_transfer(&a, a.user_id).unwrap_err();
        assert!(matches!(err, MembershipError::InvalidArgument(_)));
    }

    #[test]
    fn trainer_gate_names_the_refused_action() {
        let a = actor("a");
        let b = actor("b");
        let mut roster = falcons(&a);
        enroll(&mut roster, &b, Role::Member);

        assert!(roster.require_trainer(&a, "remove members").is_ok());
        let err = roster.require_trainer(&b, "remove members").unwrap_err();
        assert_eq!(
            err,
            MembershipError::PermissionDenied("only the team trainer can remove members".into())
        );
    }

    #[test]
    fn transfer_swaps_roles_and_repoints_team() {
        let a = actor("a");
        let b = actor("b");
        let mut roster = falcons(&a);
        enroll(&mut roster, &b, Role::Athlete);

        let transfer = roster.plan_transfer(&a, b.user_id).unwrap();
        assert_eq!(transfer.old_trainer, a.user_id);
        assert_eq!(transfer.new_trainer, b.user_id);
        roster.apply_transfer(&transfer, Utc::now());

        assert_eq!(roster.role_of(a.user_id), Some(Role::Member));
        assert_eq!(roster.role_of(b.user_id), Some(Role::Trainer));
        assert_eq!(roster.trainer_id(), b.user_id);
        assert!(roster.is_consistent());
    }

    #[test]
    fn falcons_scenario() {
        let a = actor("a");
        let b = actor("b");
        let mut roster = falcons(&a);

        let admission = roster.authorize_add(&b, None, None).unwrap();
        assert_eq!(admission.role, Role::Member);
        let m = roster.admit(b.user_id, admission.role, Utc::now()).unwrap();
        roster.apply_admission(m);

        let transfer = roster.plan_transfer(&a, b.user_id).unwrap();
        roster.apply_transfer(&transfer, Utc::now());
        assert_eq!(roster.role_of(b.user_id), Some(Role::Trainer));
        assert_eq!(roster.role_of(a.user_id), Some(Role::Member));
        assert_eq!(roster.trainer_id(), b.user_id);

        for role in [None, Some(Role::Member), Some(Role::Trainer)] {
            let err = roster.authorize_add(&a, Some("c"), role).unwrap_err();
            assert!(matches!(err, MembershipError::PermissionDenied(_)));
        }
        assert!(roster.is_consistent());
    }

    #[test]
    fn inconsistent_rosters_are_detected() {
        let a = actor("a");
        let b = actor("b");
        let mut roster = falcons(&a);
        enroll(&mut roster, &b, Role::Member);

        let mut two_trainers = roster.clone();
        two_trainers.memberships[1].role = Role::Trainer;
        assert!(!two_trainers.is_consistent());

        let mut diverged = roster.clone();
        diverged.team.trainer_id = b.user_id;
        assert!(!diverged.is_consistent());

        let mut no_trainer = roster.clone();
        no_trainer.memberships[0].role = Role::Member;
        assert!(!no_trainer.is_consistent());
    }
}
