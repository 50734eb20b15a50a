//! Caller identity and role, supplied by the external auth layer.
//!
//! Authentication itself lives in front of this service; the gateway
//! forwards the verified identity as trusted headers (`x-user-id`,
//! `x-user-role`). The extractor rejects any request missing or
//! mangling them with the uniform authorization error — callers never
//! learn which check failed.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

// ---

const USER_ID_HEADER: &str = "x-user-id";
const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Rep,
    Manager,
    Admin,
}

impl Role {
    fn from_header(s: &str) -> Option<Role> {
        // ---
        match s.to_ascii_lowercase().as_str() {
            "rep" => Some(Role::Rep),
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// The authenticated caller of the current request.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    // ---
    pub user_id: Uuid,
    pub role: Role,
}

impl Caller {
    /// Gate for the notify command: managers and admins only.
    pub fn require_dispatch_role(&self) -> Result<(), ApiError> {
        // ---
        match self.role {
            Role::Manager | Role::Admin => Ok(()),
            Role::Rep => Err(ApiError::Unauthorized),
        }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // ---
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or(ApiError::Unauthorized)?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(Role::from_header)
            .ok_or(ApiError::Unauthorized)?;

        Ok(Caller { user_id, role })
    }
}
