//! Caller identity extractor.
//!
//! Authentication happens upstream; this layer trusts two headers set by the
//! gateway:
//!
//! - `X-Person-Id`: the numeric person id of the caller (required).
//! - `X-Roles`: comma-separated roles, `admin` and/or `manager` (optional).

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use procure_core::identity::Actor;

use crate::error::ApiError;

pub const PERSON_ID_HEADER: &str = "x-person-id";
pub const ROLES_HEADER: &str = "x-roles";

/// The authenticated caller of a request.
pub struct CurrentActor(pub Actor);

/// Build an [`Actor`] from request headers.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
  let person_id = headers
    .get(PERSON_ID_HEADER)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.trim().parse().ok())
    .ok_or(ApiError::Unauthenticated("X-Person-Id"))?;

  let mut actor = Actor::requester(person_id);
  if let Some(roles) = headers.get(ROLES_HEADER) {
    let roles = roles
      .to_str()
      .map_err(|_| ApiError::Unauthenticated("X-Roles"))?;
    for role in roles.split(',').map(str::trim) {
      if role.eq_ignore_ascii_case("admin") {
        actor.is_admin = true;
      } else if role.eq_ignore_ascii_case("manager") {
        actor.is_manager = true;
      }
    }
  }
  Ok(actor)
}

impl<S> FromRequestParts<S> for CurrentActor
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    actor_from_headers(&parts.headers).map(CurrentActor)
  }
}
