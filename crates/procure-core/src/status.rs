//! Status reference data for solicitations.
//!
//! The six statuses are a fixed vocabulary shared by every layer. Each has a
//! stable numeric code (used as the foreign key in storage) and a name used in
//! audit text.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator as _};

/// The lifecycle status of a solicitation.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  AsRefStr,
)]
pub enum Status {
  Pending,
  AwaitingAdjustments,
  Approved,
  Rejected,
  Cancelled,
  Archived,
}

impl Status {
  /// The numeric code stored in the `statuses` reference table.
  pub fn code(self) -> i64 {
    match self {
      Self::Pending => 1,
      Self::AwaitingAdjustments => 2,
      Self::Approved => 3,
      Self::Rejected => 4,
      Self::Cancelled => 5,
      Self::Archived => 6,
    }
  }

  /// Resolve a stored code back into a status. Unknown codes yield `None`.
  pub fn from_code(code: i64) -> Option<Self> {
    Self::iter().find(|s| s.code() == code)
  }

  /// The name used in audit details, e.g. `"AwaitingAdjustments"`.
  pub fn name(self) -> &'static str {
    match self {
      Self::Pending => "Pending",
      Self::AwaitingAdjustments => "AwaitingAdjustments",
      Self::Approved => "Approved",
      Self::Rejected => "Rejected",
      Self::Cancelled => "Cancelled",
      Self::Archived => "Archived",
    }
  }

  pub fn description(self) -> &'static str {
    match self {
      Self::Pending => "Waiting for a manager decision",
      Self::AwaitingAdjustments => "Returned to the requester for adjustments",
      Self::Approved => "Approved by a manager",
      Self::Rejected => "Rejected by a manager",
      Self::Cancelled => "Cancelled by the requester or an administrator",
      Self::Archived => "Archived by the yearly archival batch",
    }
  }

  /// No transition out of a finalized status is accepted by `change_status`.
  pub fn is_finalized(self) -> bool {
    matches!(
      self,
      Self::Approved | Self::Rejected | Self::Cancelled | Self::Archived
    )
  }

  /// Approved, rejected or archived: the request can no longer be cancelled.
  pub fn is_decided(self) -> bool {
    matches!(self, Self::Approved | Self::Rejected | Self::Archived)
  }
}

/// One row of the status reference table.
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
  pub code:        i64,
  pub status:      Status,
  pub name:        &'static str,
  pub description: &'static str,
}

/// The complete reference table, in code order.
pub fn reference_table() -> Vec<StatusInfo> {
  Status::iter()
    .map(|status| StatusInfo {
      code: status.code(),
      status,
      name: status.name(),
      description: status.description(),
    })
    .collect()
}
