//! The solicitation aggregate: a purchase request and its line items.
//!
//! Solicitations are never physically deleted. Terminal statuses are retained
//! so the audit ledger always has a subject to point at.

use chrono::{DateTime, Datelike as _, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{catalog::ItemId, identity::RequesterId, status::Status};

pub type SolicitationId = i64;

// ─── Variant ─────────────────────────────────────────────────────────────────

/// The two request shapes, without their payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
  /// Consumables and services.
  General,
  /// Trackable assets.
  Patrimonial,
}

impl Variant {
  /// Prefix of the external id.
  pub fn prefix(self) -> &'static str {
    match self {
      Self::General => "SG",
      Self::Patrimonial => "SP",
    }
  }
}

/// Variant-specific data. General requests carry one request-level
/// justification; patrimonial requests justify each line item instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Kind {
  General { justification: Option<String> },
  Patrimonial,
}

impl Kind {
  pub fn variant(&self) -> Variant {
    match self {
      Self::General { .. } => Variant::General,
      Self::Patrimonial => Variant::Patrimonial,
    }
  }

  /// The request-level justification. Always `None` for patrimonial requests.
  pub fn justification(&self) -> Option<&str> {
    match self {
      Self::General { justification } => justification.as_deref(),
      Self::Patrimonial => None,
    }
  }
}

// ─── Line items ──────────────────────────────────────────────────────────────

/// One requested catalog item. A catalog item appears at most once per
/// solicitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
  pub item_id:       ItemId,
  pub quantity:      u32,
  /// Reference price captured when the item was added; not re-derived later.
  pub unit_value:    Decimal,
  pub justification: Option<String>,
}

impl LineItem {
  pub fn total(&self) -> Decimal { self.unit_value * Decimal::from(self.quantity) }
}

// ─── Aggregate ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solicitation {
  pub id:           SolicitationId,
  /// `{PREFIX}-{year}-{id:04}`; assigned once, in the creating transaction.
  pub external_id:  String,
  pub created_at:   DateTime<Utc>,
  pub status:       Status,
  pub requester_id: RequesterId,
  pub kind:         Kind,
  pub items:        Vec<LineItem>,
  /// Optimistic-concurrency token; incremented by every committed change.
  pub version:      i64,
}

impl Solicitation {
  pub fn variant(&self) -> Variant { self.kind.variant() }

  pub fn justification(&self) -> Option<&str> { self.kind.justification() }

  pub fn item(&self, item_id: ItemId) -> Option<&LineItem> {
    self.items.iter().find(|i| i.item_id == item_id)
  }

  pub fn total(&self) -> Decimal { self.items.iter().map(LineItem::total).sum() }
}

/// Build the external id for a freshly inserted solicitation.
pub fn external_id(
  variant: Variant,
  created_at: DateTime<Utc>,
  id: SolicitationId,
) -> String {
  format!("{}-{}-{:04}", variant.prefix(), created_at.year(), id)
}

/// Input to [`crate::store::SolicitationStore::insert_solicitation`].
/// The store assigns the id, the external id, the initial status and version.
#[derive(Debug, Clone)]
pub struct NewSolicitation {
  pub created_at:   DateTime<Utc>,
  pub requester_id: RequesterId,
  pub kind:         Kind,
  pub items:        Vec<LineItem>,
}
