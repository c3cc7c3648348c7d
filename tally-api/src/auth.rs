use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use tally_core::domain::UserId;

use crate::routes::ApiError;

/// The authenticated user, taken from the `x-user-id` header set by
/// the fronting proxy. Writes without it are rejected outright.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("authentication required"))?;

        let user_id = Uuid::parse_str(header)
            .map_err(|_| ApiError::unauthorized("invalid user identity"))?;

        Ok(CurrentUser(UserId::new(user_id)))
    }
}
