use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::MembershipError;

/// 用户在队伍中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "team_role", rename_all = "lowercase")]
pub enum Role {
    Trainer,
    Athlete,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Trainer => "trainer",
            Role::Athlete => "athlete",
            Role::Member => "member",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Trainer => "Trainer",
            Role::Athlete => "Athlete",
            Role::Member => "Member",
        }
    }

    pub fn is_trainer(self) -> bool {
        self == Role::Trainer
    }
}

impl FromStr for Role {
    type Err = MembershipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trainer" => Ok(Role::Trainer),
            "athlete" => Ok(Role::Athlete),
            "member" => Ok(Role::Member),
            other => Err(MembershipError::InvalidArgument(format!(
                "invalid role: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("TRAINER".parse::<Role>().unwrap(), Role::Trainer);
        assert_eq!(" athlete ".parse::<Role>().unwrap(), Role::Athlete);
        assert_eq!("Member".parse::<Role>().unwrap(), Role::Member);
    }

    #[test]
    fn unknown_role_is_invalid_argument() {
        let err = "coach".parse::<Role>().unwrap_err();
        assert!(matches!(err, MembershipError::InvalidArgument(_)));
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Athlete).unwrap(), "\"athlete\"");
        assert_eq!(Role::Trainer.to_string(), "trainer");
    }
}
