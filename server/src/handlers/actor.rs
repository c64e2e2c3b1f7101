//! Resolves the calling actor from headers set by the upstream
//! authentication layer.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::ticketing::{Actor, Role};
use crate::utils::error::AppError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .ok_or_else(|| AppError::AuthError(format!("Missing {name} header")))?
        .to_str()
        .map_err(|_| AppError::AuthError(format!("Header {name} is not valid text")))
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_str(&parts.headers, ACTOR_ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|_| {
                AppError::AuthError(format!("Header {ACTOR_ID_HEADER} is not a valid id"))
            })?;
        let role = header_str(&parts.headers, ACTOR_ROLE_HEADER)?
            .parse::<Role>()
            .map_err(|e| AppError::AuthError(e.to_string()))?;

        Ok(Actor::new(user_id, role))
    }
}
