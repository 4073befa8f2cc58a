//! The `SolicitationStore` trait: persistence of the aggregate and its
//! audit ledger.
//!
//! The trait is implemented by storage backends (e.g. `procure-store-sqlite`).
//! Every writing method is one unit of work: the aggregate rows and the ledger
//! entries it is handed become visible together or not at all.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  audit::{AuditEvent, EventId, NewAuditEvent},
  diff::ItemChanges,
  identity::RequesterId,
  solicitation::{NewSolicitation, Solicitation, SolicitationId},
};

/// Errors raised by a store must say whether they are a lost-update race.
pub trait StoreFailure: std::error::Error + Send + Sync + 'static {
  /// The solicitation whose optimistic version check failed, if that is what
  /// this error is.
  fn conflict(&self) -> Option<SolicitationId>;
}

/// One committed change to an existing solicitation.
#[derive(Debug, Clone)]
pub struct Change {
  /// The aggregate as it must look after the change. Its `version` is the
  /// version that was read; the write only applies if it is still current.
  pub after:  Solicitation,
  pub items:  ItemChanges,
  /// Ledger entries appended in the same unit of work, in order.
  pub events: Vec<NewAuditEvent>,
}

/// Abstraction over a solicitation store backend.
pub trait SolicitationStore: Send + Sync {
  type Error: StoreFailure;

  // ── Aggregate ─────────────────────────────────────────────────────────

  /// Retrieve a solicitation with its line items. Returns `None` if not found.
  fn get_solicitation(
    &self,
    id: SolicitationId,
  ) -> impl Future<Output = Result<Option<Solicitation>, Self::Error>> + Send + '_;

  /// All solicitations of one requester, newest first.
  fn list_for_requester(
    &self,
    requester_id: RequesterId,
  ) -> impl Future<Output = Result<Vec<Solicitation>, Self::Error>> + Send + '_;

  /// Every solicitation that is not archived and was created before `cutoff`.
  fn list_unarchived_before(
    &self,
    cutoff: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Solicitation>, Self::Error>> + Send + '_;

  /// Insert a new solicitation in `Pending`, assign its external id from the
  /// generated numeric id, and append `event`, all in one unit of work.
  fn insert_solicitation(
    &self,
    input: NewSolicitation,
    event: NewAuditEvent,
  ) -> impl Future<Output = Result<Solicitation, Self::Error>> + Send + '_;

  /// Apply every change in one unit of work. Fails with a conflict (and
  /// writes nothing) if any solicitation's version moved since it was read.
  fn commit(
    &self,
    changes: Vec<Change>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Audit ledger ──────────────────────────────────────────────────────

  /// Append one event on its own. Business rules are not checked.
  fn append_event(
    &self,
    solicitation_id: SolicitationId,
    event: NewAuditEvent,
  ) -> impl Future<Output = Result<EventId, Self::Error>> + Send + '_;

  /// Ledger entries for a solicitation, newest first. Unknown ids yield an
  /// empty list.
  fn list_events(
    &self,
    solicitation_id: SolicitationId,
  ) -> impl Future<Output = Result<Vec<AuditEvent>, Self::Error>> + Send + '_;
}
