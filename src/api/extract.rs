//! Caller identity extraction
//!
//! Authentication happens upstream; the gateway forwards the caller as
//! `x-user-id` and `x-user-role` headers.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::domain::identity::{Actor, UserRole};
use crate::MarketplaceError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = MarketplaceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|h| h.to_str().ok());

        let id = header(USER_ID_HEADER).and_then(|v| Uuid::parse_str(v.trim()).ok());
        let role = header(USER_ROLE_HEADER).and_then(|v| v.trim().parse::<UserRole>().ok());
        match (id, role) {
            (Some(id), Some(role)) => Ok(Actor::new(id, role)),
            _ => {
                tracing::warn!(uri = %parts.uri, "Request without a valid caller identity");
                Err(MarketplaceError::Unauthenticated)
            }
        }
    }
}
