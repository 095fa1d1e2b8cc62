//! User profile returned by the auth service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Platform role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Creator,
    #[default]
    Member,
    Admin,
    #[serde(other)]
    Unknown,
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id", alias = "userId")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

impl User {
    /// Find the user in a `/auth/me` or login response.
    ///
    /// Accepts `{data: {user}}`, `{data}`, `{user}` or a bare user object.
    pub fn from_body(body: &Value) -> Option<Self> {
        let candidates = [
            body.get("data").and_then(|d| d.get("user")),
            body.get("data"),
            body.get("user"),
            Some(body),
        ];
        candidates
            .into_iter()
            .flatten()
            .find_map(|v| serde_json::from_value::<User>(v.clone()).ok())
            .filter(|u| !u.id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_nested_body() {
        let user = User::from_body(&json!({
            "success": true,
            "data": {"user": {"_id": "u1", "email": "a@b.c", "role": "creator"}}
        }))
        .unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.role, UserRole::Creator);
    }

    #[test]
    fn test_from_bare_body_with_unknown_role() {
        let user = User::from_body(&json!({"id": "u2", "role": "moderator"})).unwrap();
        assert_eq!(user.role, UserRole::Unknown);
    }

    #[test]
    fn test_missing_role_defaults_to_member() {
        let user = User::from_body(&json!({"user": {"id": "u3"}})).unwrap();
        assert_eq!(user.role, UserRole::Member);
    }

    #[test]
    fn test_no_user() {
        assert!(User::from_body(&json!({"success": false, "message": "nope"})).is_none());
    }
}
