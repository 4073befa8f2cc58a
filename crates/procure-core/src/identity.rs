//! Actors and the requester directory.
//!
//! Authentication happens outside this crate. Callers hand the engine a plain
//! [`Actor`] (a person id plus role flags); the [`IdentityResolver`] maps that
//! person to the staff and requester records that own solicitations.

use std::future::Future;

use serde::{Deserialize, Serialize};

pub type PersonId = i64;
pub type RequesterId = i64;

/// The authenticated caller of a lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub person_id:  PersonId,
  #[serde(default)]
  pub is_admin:   bool,
  #[serde(default)]
  pub is_manager: bool,
}

impl Actor {
  /// An actor with no elevated roles.
  pub fn requester(person_id: PersonId) -> Self {
    Self { person_id, is_admin: false, is_manager: false }
  }

  pub fn manager(person_id: PersonId) -> Self {
    Self { person_id, is_admin: false, is_manager: true }
  }

  pub fn admin(person_id: PersonId) -> Self {
    Self { person_id, is_admin: true, is_manager: false }
  }

  /// Managers and administrators may decide on solicitations.
  pub fn can_decide(&self) -> bool { self.is_admin || self.is_manager }
}

/// A university staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
  pub server_id: i64,
  pub person_id: PersonId,
  pub name:      String,
}

/// The organisational requester a staff member submits on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequesterRecord {
  pub requester_id:    RequesterId,
  pub server_id:       i64,
  pub department_id:   i64,
  pub department_name: String,
}

/// Maps an authenticated person to their requester record.
pub trait IdentityResolver: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Returns `None` when the person has no staff or requester record.
  fn resolve_requester(
    &self,
    person_id: PersonId,
  ) -> impl Future<Output = Result<Option<(ServerRecord, RequesterRecord)>, Self::Error>>
  + Send
  + '_;
}
