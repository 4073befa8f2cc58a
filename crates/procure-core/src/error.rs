//! Error types for `procure-core`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::{
  catalog::ItemId,
  identity::PersonId,
  solicitation::SolicitationId,
  status::Status,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("solicitation not found: {0}")]
  SolicitationNotFound(SolicitationId),

  #[error("no requester registered for person {0}")]
  RequesterNotFound(PersonId),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("the submission deadline passed on {}", format_deadline(.0))]
  DeadlineExceeded(DateTime<Utc>),

  #[error("invalid item {item_id}: {reason}")]
  InvalidItem { item_id: ItemId, reason: &'static str },

  #[error("invalid transition from {from} to {to}")]
  InvalidTransition { from: Status, to: Status },

  #[error("solicitation {id} is already finalized ({status})")]
  AlreadyFinalized { id: SolicitationId, status: Status },

  #[error("solicitation {0} is already cancelled")]
  AlreadyCancelled(SolicitationId),

  #[error("solicitation {0} was modified concurrently; reload and retry")]
  ConcurrencyConflict(SolicitationId),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("persistence error: {0}")]
  Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// The coarse error taxonomy, for callers that only need to branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  NotFound,
  Forbidden,
  DeadlineExceeded,
  InvalidItem,
  InvalidTransition,
  AlreadyFinalized,
  AlreadyCancelled,
  ConcurrencyConflict,
  Validation,
  Persistence,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::SolicitationNotFound(_) | Self::RequesterNotFound(_) => {
        ErrorKind::NotFound
      }
      Self::Forbidden(_) => ErrorKind::Forbidden,
      Self::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
      Self::InvalidItem { .. } => ErrorKind::InvalidItem,
      Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
      Self::AlreadyFinalized { .. } => ErrorKind::AlreadyFinalized,
      Self::AlreadyCancelled(_) => ErrorKind::AlreadyCancelled,
      Self::ConcurrencyConflict(_) => ErrorKind::ConcurrencyConflict,
      Self::Validation(_) => ErrorKind::Validation,
      Self::Persistence(_) => ErrorKind::Persistence,
    }
  }
}

/// Deadlines are shown to users as `dd/mm/YYYY HH:MM UTC`.
pub fn format_deadline(deadline: &DateTime<Utc>) -> String {
  deadline.format("%d/%m/%Y %H:%M UTC").to_string()
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn deadline_message_carries_formatted_date() {
    let deadline = Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 0).unwrap();
    let err = Error::DeadlineExceeded(deadline);
    assert_eq!(
      err.to_string(),
      "the submission deadline passed on 31/03/2026 23:59 UTC"
    );
    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
  }

  #[test]
  fn both_missing_entities_are_not_found() {
    assert_eq!(Error::SolicitationNotFound(1).kind(), ErrorKind::NotFound);
    assert_eq!(Error::RequesterNotFound(7).kind(), ErrorKind::NotFound);
  }
}
