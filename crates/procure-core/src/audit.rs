//! Audit ledger records.
//!
//! Events are append-only: once written they are never updated or removed.
//! Exactly one event is written per lifecycle operation that changes something
//! observable; reads never write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{identity::PersonId, solicitation::SolicitationId, status::Status};

pub type EventId = i64;

/// What happened to the solicitation.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
  Creation,
  Edit,
  StatusChange,
  Cancellation,
}

/// A persisted ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
  pub event_id:        EventId,
  pub solicitation_id: SolicitationId,
  pub recorded_at:     DateTime<Utc>,
  pub actor_id:        PersonId,
  pub action:          ActionKind,
  /// Machine-composed summary of what changed.
  pub details:         String,
  /// Free text supplied by the operator, if any.
  pub observations:    Option<String>,
}

/// Input to [`crate::store::SolicitationStore::append_event`] and to the
/// write sets committed by the engine. `event_id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEvent {
  pub recorded_at:  DateTime<Utc>,
  pub actor_id:     PersonId,
  pub action:       ActionKind,
  pub details:      String,
  pub observations: Option<String>,
}

impl NewAuditEvent {
  pub fn new(
    recorded_at: DateTime<Utc>,
    actor_id: PersonId,
    action: ActionKind,
    details: impl Into<String>,
  ) -> Self {
    Self {
      recorded_at,
      actor_id,
      action,
      details: details.into(),
      observations: None,
    }
  }

  pub fn with_observations(mut self, observations: Option<String>) -> Self {
    self.observations = observations.filter(|o| !o.trim().is_empty());
    self
  }
}

/// Details text for a status transition, e.g. `"Status changed: Pending -> Approved"`.
pub fn status_change_details(from: Status, to: Status) -> String {
  format!("Status changed: {} -> {}", from.name(), to.name())
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  #[test]
  fn action_kind_text_form_is_snake_case() {
    assert_eq!(ActionKind::StatusChange.as_ref(), "status_change");
    assert_eq!(ActionKind::from_str("cancellation").unwrap(), ActionKind::Cancellation);
  }

  #[test]
  fn status_change_details_names_both_statuses() {
    assert_eq!(
      status_change_details(Status::AwaitingAdjustments, Status::Pending),
      "Status changed: AwaitingAdjustments -> Pending"
    );
  }

  #[test]
  fn blank_observations_are_dropped() {
    let at = Utc::now();
    let event = NewAuditEvent::new(at, 1, ActionKind::Edit, "x")
      .with_observations(Some("   ".into()));
    assert_eq!(event.observations, None);
  }
}
