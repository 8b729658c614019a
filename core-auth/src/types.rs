use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque bearer credential for the remote API.
///
/// The value is meaningful only to the server. It is owned by the
/// [`CredentialStore`](crate::store::CredentialStore) and mutated exclusively
/// through its `set`/`clear` operations: created on successful login or
/// refresh, destroyed on logout, explicit clear, or failed refresh.
///
/// # Security
///
/// The `Debug` implementation redacts the value so tokens never reach logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token value, for building an authorization header.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for AccessToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AccessToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

/// The current-user record returned by the profile endpoint.
///
/// Cached by [`IdentityCache`](crate::identity::IdentityCache) and
/// invalidated on logout; otherwise independent of the auth core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_round_trips() {
        let token = AccessToken::new("abc123");
        assert_eq!(token.as_str(), "abc123");
        assert_eq!(token.clone().into_string(), "abc123");
        assert_eq!(AccessToken::from("abc123"), token);
    }

    #[test]
    fn access_token_debug_redacts() {
        let token = AccessToken::new("super-secret-value");
        let debug = format!("{:?}", token);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret-value"));
    }

    #[test]
    fn user_identity_uses_camel_case_wire_names() {
        let json = r#"{
            "id": 7,
            "name": "Ada",
            "email": "ada@example.com",
            "role": "USER",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-06-01T00:00:00Z"
        }"#;

        let identity: UserIdentity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.id, 7);
        assert_eq!(identity.role, "USER");

        let back = serde_json::to_value(&identity).unwrap();
        assert!(back.get("createdAt").is_some());
        assert!(back.get("created_at").is_none());
    }
}
