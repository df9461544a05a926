/*
 * Responsibility
 * - Users の request/response DTO
 * - validation (形式チェック) 用の validate() を持たせる
 */
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::repos::user_repo::UserRow;

/// Body of `POST /users` and `PUT /users/{id}`.
///
/// Missing fields deserialize as empty strings so they surface as
/// validation messages instead of extractor rejections.
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl UserRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("Name cannot be empty.");
        }
        if self.email.trim().is_empty() || !self.email.validate_email() {
            return Err("Invalid email address.");
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: u64,
    pub name: String,
    pub email: String,
}

impl From<UserRow> for UserResponse {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(name: &str, email: &str) -> UserRequest {
        UserRequest {
            name: name.into(),
            email: email.into(),
        }
    }

    #[test]
    fn accepts_valid_user() {
        assert_eq!(req("Ada", "ada@example.com").validate(), Ok(()));
    }

    #[test]
    fn rejects_blank_name() {
        for name in ["", "   ", "\t\n"] {
            assert_eq!(req(name, "a@b.com").validate(), Err("Name cannot be empty."));
        }
    }

    #[test]
    fn rejects_bad_email() {
        for email in ["", "  ", "not-an-email", "@example.com", "ada@"] {
            assert_eq!(
                req("Ada", email).validate(),
                Err("Invalid email address."),
                "email {email:?}"
            );
        }
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let parsed: UserRequest = serde_json::from_str(r#"{"email":"a@b.com"}"#).unwrap();
        assert_eq!(parsed.validate(), Err("Name cannot be empty."));
    }
}
