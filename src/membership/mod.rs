//! 队伍成员关系：角色、名册以及加入、移除和移交教练的规则。
//! 这里不访问存储；`models::team` 在行锁下加载名册，取得计划后在同一事务内写回。

mod role;
mod roster;

pub use role::Role;
pub use roster::{AddTarget, Admission, Membership, Roster, Team, Transfer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MembershipError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    InvalidArgument(String),
}
