use axum::{extract::FromRequestParts, http::request::Parts};
use viaro_domain::identity::{Caller, Role};

use crate::error::ApiError;

/// Identity headers stamped by the upstream credential verifier. The
/// service trusts them as already-validated facts.
pub const CALLER_ID_HEADER: &str = "x-caller-id";
pub const CALLER_ROLE_HEADER: &str = "x-caller-role";

/// Extractor for endpoints that require an authenticated caller.
pub struct Identity(pub Caller);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match caller_from_parts(parts)? {
            Some(caller) => Ok(Identity(caller)),
            None => Err(ApiError::Unauthenticated("caller identity required".to_string())),
        }
    }
}

pub fn require_admin(caller: &Caller) -> Result<(), ApiError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("admin role required".to_string()))
    }
}

fn caller_from_parts(parts: &Parts) -> Result<Option<Caller>, ApiError> {
    let id = match parts.headers.get(CALLER_ID_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| ApiError::Unauthenticated("malformed x-caller-id header".to_string()))?
            .trim()
            .to_string(),
        None => return Ok(None),
    };
    if id.is_empty() {
        return Err(ApiError::Unauthenticated("empty x-caller-id header".to_string()));
    }

    // Absent role defaults to USER; a present but unknown role is rejected
    // rather than silently downgraded.
    let role = match parts.headers.get(CALLER_ROLE_HEADER) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|s| s.parse::<Role>().ok())
            .ok_or_else(|| ApiError::Unauthenticated("malformed x-caller-role header".to_string()))?,
        None => Role::User,
    };

    Ok(Some(Caller { id, role }))
}
