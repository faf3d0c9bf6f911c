use serde::{Deserialize, Serialize};

use crate::id::UserId;
use crate::payload::{split_action, PayloadError};

/// A request to the auth handler, dispatched on the `action` field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthRequest {
    Register(RegisterRequest),
    Login(LoginRequest),
}

impl AuthRequest {
    /// Decodes a request body.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::UnknownAction`] if `action` is missing or unknown, and
    /// [`PayloadError::Malformed`] if the body is not a valid JSON object of the expected shape.
    pub fn from_body(body: &str) -> Result<Self, PayloadError> {
        let (action, value) = split_action(body)?;

        match action.as_deref() {
            Some("register") => Ok(Self::Register(serde_json::from_value(value)?)),
            Some("login") => Ok(Self::Login(serde_json::from_value(value)?)),
            _ => Err(PayloadError::UnknownAction(action)),
        }
    }
}

/// The body of `{"action": "register"}`. Presence of the required fields is checked by the
/// handler, not by the decoder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// The body of `{"action": "login"}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// The public view of a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

/// Returned by a successful register or login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserInfo,
}

#[cfg(test)]
mod tests {
    use super::{AuthRequest, LoginRequest};
    use crate::PayloadError;

    #[test]
    fn test_auth_request_from_body() {
        let req = AuthRequest::from_body(
            r#"{"action": "login", "username": "alice", "password": "secret"}"#,
        )
        .unwrap();
        assert_eq!(
            req,
            AuthRequest::Login(LoginRequest {
                username: Some("alice".into()),
                password: Some("secret".into()),
            })
        );

        match AuthRequest::from_body(r#"{"action": "register", "email": null}"#).unwrap() {
            AuthRequest::Register(req) => {
                assert_eq!(req.username, None);
                assert_eq!(req.email, None);
            }
            req => panic!("expected register, got {:?}", req),
        }

        match AuthRequest::from_body(r#"{"action": "logout"}"#) {
            Err(PayloadError::UnknownAction(Some(action))) => assert_eq!(action, "logout"),
            res => panic!("expected unknown action, got {:?}", res),
        }

        match AuthRequest::from_body(r#"{"username": "alice"}"#) {
            Err(PayloadError::UnknownAction(None)) => (),
            res => panic!("expected unknown action, got {:?}", res),
        }

        match AuthRequest::from_body(r#"{"action": "login", "username": 5}"#) {
            Err(PayloadError::Malformed(_)) => (),
            res => panic!("expected malformed body, got {:?}", res),
        }
    }
}
