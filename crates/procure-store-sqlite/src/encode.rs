//! Encoding and decoding helpers between domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so that text comparison matches chronological order. Money is
//! stored as decimal text. Statuses are stored by reference-table code.

use std::str::FromStr as _;

use chrono::{DateTime, SecondsFormat, Utc};
use procure_core::{
  audit::{ActionKind, AuditEvent},
  catalog::CatalogItem,
  identity::{RequesterRecord, ServerRecord},
  solicitation::{Kind, LineItem, Solicitation, Variant},
  status::Status,
};
use rust_decimal::Decimal;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Decimal ─────────────────────────────────────────────────────────────────

pub fn encode_decimal(d: Decimal) -> String { d.to_string() }

pub fn decode_decimal(s: &str) -> Result<Decimal> { Ok(Decimal::from_str(s)?) }

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn decode_status(code: i64) -> Result<Status> {
  Status::from_code(code).ok_or(Error::UnknownStatus(code))
}

// ─── Variant ─────────────────────────────────────────────────────────────────

pub fn encode_variant(v: Variant) -> &'static str {
  match v {
    Variant::General => "general",
    Variant::Patrimonial => "patrimonial",
  }
}

pub fn decode_variant(s: &str) -> Result<Variant> {
  match s {
    "general" => Ok(Variant::General),
    "patrimonial" => Ok(Variant::Patrimonial),
    other => Err(Error::UnknownVariant(other.to_owned())),
  }
}

// ─── ActionKind ──────────────────────────────────────────────────────────────

pub fn encode_action(a: ActionKind) -> &'static str {
  match a {
    ActionKind::Creation => "creation",
    ActionKind::Edit => "edit",
    ActionKind::StatusChange => "status_change",
    ActionKind::Cancellation => "cancellation",
  }
}

pub fn decode_action(s: &str) -> Result<ActionKind> {
  ActionKind::from_str(s).map_err(|_| Error::UnknownAction(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `solicitation_items` row.
pub struct RawLineItem {
  pub item_id:       i64,
  pub quantity:      u32,
  pub unit_value:    String,
  pub justification: Option<String>,
}

impl RawLineItem {
  pub fn into_line_item(self) -> Result<LineItem> {
    Ok(LineItem {
      item_id:       self.item_id,
      quantity:      self.quantity,
      unit_value:    decode_decimal(&self.unit_value)?,
      justification: self.justification,
    })
  }
}

/// Raw values read from a `solicitations` row plus its item rows.
pub struct RawSolicitation {
  pub solicitation_id: i64,
  pub external_id:     String,
  pub created_at:      String,
  pub status_id:       i64,
  pub requester_id:    i64,
  pub variant:         String,
  pub justification:   Option<String>,
  pub version:         i64,
  pub items:           Vec<RawLineItem>,
}

impl RawSolicitation {
  pub fn into_solicitation(self) -> Result<Solicitation> {
    let kind = match decode_variant(&self.variant)? {
      Variant::General => Kind::General { justification: self.justification },
      Variant::Patrimonial => Kind::Patrimonial,
    };

    let items = self
      .items
      .into_iter()
      .map(RawLineItem::into_line_item)
      .collect::<Result<_>>()?;

    Ok(Solicitation {
      id: self.solicitation_id,
      external_id: self.external_id,
      created_at: decode_dt(&self.created_at)?,
      status: decode_status(self.status_id)?,
      requester_id: self.requester_id,
      kind,
      items,
      version: self.version,
    })
  }
}

/// Raw values read from an `audit_events` row.
pub struct RawAuditEvent {
  pub event_id:        i64,
  pub solicitation_id: i64,
  pub recorded_at:     String,
  pub actor_id:        i64,
  pub action:          String,
  pub details:         String,
  pub observations:    Option<String>,
}

impl RawAuditEvent {
  pub fn into_event(self) -> Result<AuditEvent> {
    Ok(AuditEvent {
      event_id:        self.event_id,
      solicitation_id: self.solicitation_id,
      recorded_at:     decode_dt(&self.recorded_at)?,
      actor_id:        self.actor_id,
      action:          decode_action(&self.action)?,
      details:         self.details,
      observations:    self.observations,
    })
  }
}

/// Raw values read from a `catalog_items` row.
pub struct RawCatalogItem {
  pub item_id:         i64,
  pub name:            String,
  pub active:          bool,
  pub reference_price: String,
}

impl RawCatalogItem {
  pub fn into_item(self) -> Result<CatalogItem> {
    Ok(CatalogItem {
      item_id:         self.item_id,
      name:            self.name,
      active:          self.active,
      reference_price: decode_decimal(&self.reference_price)?,
    })
  }
}

/// A `servers` row joined with its `requesters` row.
pub fn requester_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<(ServerRecord, RequesterRecord)> {
  let server = ServerRecord {
    server_id: row.get(0)?,
    person_id: row.get(1)?,
    name:      row.get(2)?,
  };
  let requester = RequesterRecord {
    requester_id:    row.get(3)?,
    server_id:       server.server_id,
    department_id:   row.get(4)?,
    department_name: row.get(5)?,
  };
  Ok((server, requester))
}
