use serde::{Deserialize, Serialize};

use crate::domain::UserId;

/// Body of `POST /users/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoRequest {
    pub user_ids: Vec<UserId>,
}

/// Per-id outcome inside a batch response. Matched back to the request by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Outcome of one [`UserInfo`] entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Found {
        name: String,
        username: Option<String>,
    },
    Failed(String),
}

impl UserInfo {
    /// A non-empty name wins; otherwise the server's reason, or a generic one.
    #[must_use]
    pub fn into_lookup(self) -> UserLookup {
        match self.name {
            Some(name) if !name.is_empty() => UserLookup::Found {
                name,
                username: self.username.filter(|u| !u.is_empty()),
            },
            _ => UserLookup::Failed(
                self.error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| "no name returned".to_string()),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoResponse {
    #[serde(default)]
    pub users: Vec<UserInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_prefers_name_over_error() {
        // language=json
        let raw = r#"{"users": [
            {"id": 10001, "name": "z", "username": "z"},
            {"id": 10002, "error": "user not found"},
            {"id": 10003, "name": "", "error": null},
            {"id": 10004, "name": "w", "username": ""}
        ]}"#;
        let response: UserInfoResponse = serde_json::from_str(raw).unwrap();
        let lookups: Vec<_> = response.users.into_iter().map(UserInfo::into_lookup).collect();

        assert_eq!(
            lookups[0],
            UserLookup::Found {
                name: "z".to_string(),
                username: Some("z".to_string())
            }
        );
        assert_eq!(lookups[1], UserLookup::Failed("user not found".to_string()));
        assert_eq!(lookups[2], UserLookup::Failed("no name returned".to_string()));
        assert_eq!(
            lookups[3],
            UserLookup::Found {
                name: "w".to_string(),
                username: None
            }
        );
    }
}
