use crate::domain::UserId;
use crate::error::AppError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Header carrying the authenticated user id, set by the fronting auth proxy.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller's user id. Rejects with 401 when the header is missing or blank.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(UserId::parse)
            .map(CurrentUser)
            .ok_or(AppError::NotAuthenticated)
    }
}
