//! Error type for `procure-store-sqlite`.

use procure_core::{solicitation::SolicitationId, store::StoreFailure};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("decimal parse error: {0}")]
  Decimal(#[from] rust_decimal::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown status code: {0}")]
  UnknownStatus(i64),

  #[error("unknown solicitation variant: {0:?}")]
  UnknownVariant(String),

  #[error("unknown audit action: {0:?}")]
  UnknownAction(String),

  /// The row's version moved between read and write.
  #[error("solicitation {0} was modified by another transaction")]
  Conflict(SolicitationId),
}

impl StoreFailure for Error {
  fn conflict(&self) -> Option<SolicitationId> {
    match self {
      Self::Conflict(id) => Some(*id),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
