use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{UserInfo, UserTeam};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> AppResult<()> {
        let username = self.username.trim();
        if username.is_empty() || username.chars().count() > 150 {
            return Err(AppError::InvalidArgument(
                "username must be between 1 and 150 characters".into(),
            ));
        }
        // 与常见平台一致: 字母、数字以及 @ . + - _
        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            return Err(AppError::InvalidArgument(
                "username may only contain letters, digits and @/./+/-/_".into(),
            ));
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(AppError::InvalidArgument("a valid email is required".into())),
        }
        if self.password != self.password2 {
            return Err(AppError::InvalidArgument(
                "password fields didn't match".into(),
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidArgument(format!(
                "password must contain at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.password.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::InvalidArgument(
                "password can't be entirely numeric".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserInfo,
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserInfo,
    pub is_staff: bool,
    pub teams: Vec<UserTeam>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            username: "ana_b".into(),
            email: "ana@example.com".into(),
            password: "s3cure-pass".into(),
            password2: "s3cure-pass".into(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    #[test]
    fn well_formed_registration_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn mismatched_passwords_fail() {
        let mut req = request();
        req.password2 = "other-pass".into();
        assert!(matches!(req.validate(), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn weak_passwords_fail() {
        let mut short = request();
        short.password = "abc".into();
        short.password2 = "abc".into();
        assert!(short.validate().is_err());

        let mut numeric = request();
        numeric.password = "12345678".into();
        numeric.password2 = "12345678".into();
        assert!(numeric.validate().is_err());
    }

    #[test]
    fn bad_username_or_email_fail() {
        let mut spaced = request();
        spaced.username = "ana b".into();
        assert!(spaced.validate().is_err());

        let mut email = request();
        email.email = "ana.example.com".into();
        assert!(email.validate().is_err());
    }
}
