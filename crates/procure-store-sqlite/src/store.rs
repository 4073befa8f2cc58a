//! [`SqliteStore`], the SQLite implementation of [`SolicitationStore`],
//! [`IdentityResolver`] and [`CatalogLookup`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, Transaction, types::Value};

use procure_core::{
  audit::{AuditEvent, EventId, NewAuditEvent},
  catalog::{CatalogItem, CatalogLookup, ItemId},
  identity::{IdentityResolver, PersonId, RequesterId, RequesterRecord, ServerRecord},
  solicitation::{LineItem, NewSolicitation, Solicitation, SolicitationId, external_id},
  status::{Status, reference_table},
  store::{Change, SolicitationStore},
};

use crate::{
  Error, Result,
  encode::{
    RawAuditEvent, RawCatalogItem, RawLineItem, RawSolicitation, encode_action,
    encode_decimal, encode_dt, encode_variant, requester_from_row,
  },
  schema::SCHEMA,
};

const SOLICITATION_COLUMNS: &str = "solicitation_id, external_id, created_at, status_id, \
   requester_id, variant, justification, version";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A procurement store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All writes go
/// through one connection thread, and each writing method runs inside a single
/// SQLite transaction.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let statuses = reference_table();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(SCHEMA)?;
        let tx = conn.transaction()?;
        for info in &statuses {
          tx.execute(
            "INSERT INTO statuses (status_id, name, description) VALUES (?1, ?2, ?3)
             ON CONFLICT(status_id) DO UPDATE
               SET name = excluded.name, description = excluded.description",
            rusqlite::params![info.code, info.name, info.description],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Reference data ────────────────────────────────────────────────────────

  /// Insert or replace a catalog entry.
  pub async fn upsert_catalog_item(&self, item: CatalogItem) -> Result<()> {
    let price = encode_decimal(item.reference_price);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO catalog_items (item_id, name, active, reference_price)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(item_id) DO UPDATE SET
             name = excluded.name,
             active = excluded.active,
             reference_price = excluded.reference_price",
          rusqlite::params![item.item_id, item.name, item.active, price],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn upsert_server(&self, server: ServerRecord) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO servers (server_id, person_id, name) VALUES (?1, ?2, ?3)
           ON CONFLICT(server_id) DO UPDATE SET
             person_id = excluded.person_id,
             name = excluded.name",
          rusqlite::params![server.server_id, server.person_id, server.name],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn upsert_requester(&self, requester: RequesterRecord) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO requesters (requester_id, server_id, department_id, department_name)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(requester_id) DO UPDATE SET
             server_id = excluded.server_id,
             department_id = excluded.department_id,
             department_name = excluded.department_name",
          rusqlite::params![
            requester.requester_id,
            requester.server_id,
            requester.department_id,
            requester.department_name,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run raw SQL against the connection; tests use it to inject faults.
  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_solicitations(
    &self,
    filter: String,
    param: Value,
  ) -> Result<Vec<Solicitation>> {
    let raws: Vec<RawSolicitation> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {SOLICITATION_COLUMNS} FROM solicitations {filter}");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt
          .query_map(rusqlite::params![param], raw_solicitation)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for raw in &mut rows {
          raw.items = load_items(conn, raw.solicitation_id)?;
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSolicitation::into_solicitation).collect()
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn raw_solicitation(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSolicitation> {
  Ok(RawSolicitation {
    solicitation_id: row.get(0)?,
    external_id:     row.get(1)?,
    created_at:      row.get(2)?,
    status_id:       row.get(3)?,
    requester_id:    row.get(4)?,
    variant:         row.get(5)?,
    justification:   row.get(6)?,
    version:         row.get(7)?,
    items:           Vec::new(),
  })
}

fn load_items(
  conn: &rusqlite::Connection,
  solicitation_id: SolicitationId,
) -> rusqlite::Result<Vec<RawLineItem>> {
  let mut stmt = conn.prepare(
    "SELECT item_id, quantity, unit_value, justification
     FROM solicitation_items
     WHERE solicitation_id = ?1
     ORDER BY position",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![solicitation_id], |row| {
      Ok(RawLineItem {
        item_id:       row.get(0)?,
        quantity:      row.get(1)?,
        unit_value:    row.get(2)?,
        justification: row.get(3)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn insert_item(
  tx: &Transaction<'_>,
  solicitation_id: SolicitationId,
  position: usize,
  item: &LineItem,
) -> rusqlite::Result<()> {
  tx.execute(
    "INSERT INTO solicitation_items
       (solicitation_id, item_id, position, quantity, unit_value, justification)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      solicitation_id,
      item.item_id,
      position as i64,
      item.quantity,
      encode_decimal(item.unit_value),
      item.justification,
    ],
  )?;
  Ok(())
}

fn insert_event(
  tx: &Transaction<'_>,
  solicitation_id: SolicitationId,
  event: &NewAuditEvent,
) -> rusqlite::Result<EventId> {
  tx.execute(
    "INSERT INTO audit_events
       (solicitation_id, recorded_at, actor_id, action, details, observations)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      solicitation_id,
      encode_dt(event.recorded_at),
      event.actor_id,
      encode_action(event.action),
      event.details,
      event.observations,
    ],
  )?;
  Ok(tx.last_insert_rowid())
}

/// Write one change. Returns `false` when the version check fails, in which
/// case the caller must drop the transaction.
fn apply_change(tx: &Transaction<'_>, change: &Change) -> rusqlite::Result<bool> {
  let after = &change.after;

  let updated = tx.execute(
    "UPDATE solicitations
     SET status_id = ?1, justification = ?2, version = version + 1
     WHERE solicitation_id = ?3 AND version = ?4",
    rusqlite::params![
      after.status.code(),
      after.justification(),
      after.id,
      after.version,
    ],
  )?;
  if updated == 0 {
    return Ok(false);
  }

  for item_id in &change.items.removed {
    tx.execute(
      "DELETE FROM solicitation_items WHERE solicitation_id = ?1 AND item_id = ?2",
      rusqlite::params![after.id, item_id],
    )?;
  }
  for item in &change.items.updated {
    tx.execute(
      "UPDATE solicitation_items
       SET quantity = ?1, unit_value = ?2, justification = ?3
       WHERE solicitation_id = ?4 AND item_id = ?5",
      rusqlite::params![
        item.quantity,
        encode_decimal(item.unit_value),
        item.justification,
        after.id,
        item.item_id,
      ],
    )?;
  }
  for item in &change.items.added {
    insert_item(tx, after.id, 0, item)?;
  }
  if !change.items.is_empty() {
    for (position, item) in after.items.iter().enumerate() {
      tx.execute(
        "UPDATE solicitation_items SET position = ?1
         WHERE solicitation_id = ?2 AND item_id = ?3",
        rusqlite::params![position as i64, after.id, item.item_id],
      )?;
    }
  }

  for event in &change.events {
    insert_event(tx, after.id, event)?;
  }
  Ok(true)
}

// ─── SolicitationStore impl ──────────────────────────────────────────────────

impl SolicitationStore for SqliteStore {
  type Error = Error;

  async fn get_solicitation(&self, id: SolicitationId) -> Result<Option<Solicitation>> {
    let raw: Option<RawSolicitation> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {SOLICITATION_COLUMNS} FROM solicitations WHERE solicitation_id = ?1"
        );
        let mut raw = conn
          .query_row(&sql, rusqlite::params![id], raw_solicitation)
          .optional()?;
        if let Some(raw) = raw.as_mut() {
          raw.items = load_items(conn, id)?;
        }
        Ok(raw)
      })
      .await?;

    raw.map(RawSolicitation::into_solicitation).transpose()
  }

  async fn list_for_requester(&self, requester_id: RequesterId) -> Result<Vec<Solicitation>> {
    self
      .query_solicitations(
        "WHERE requester_id = ?1 ORDER BY created_at DESC, solicitation_id DESC".to_owned(),
        Value::Integer(requester_id),
      )
      .await
  }

  async fn list_unarchived_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Solicitation>> {
    let filter = format!(
      "WHERE created_at < ?1 AND status_id <> {} ORDER BY solicitation_id",
      Status::Archived.code()
    );
    self.query_solicitations(filter, Value::Text(encode_dt(cutoff))).await
  }

  async fn insert_solicitation(
    &self,
    input: NewSolicitation,
    event: NewAuditEvent,
  ) -> Result<Solicitation> {
    let solicitation = self
      .conn
      .call(move |conn| {
        let variant = input.kind.variant();

        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO solicitations
             (created_at, status_id, requester_id, variant, justification, version)
           VALUES (?1, ?2, ?3, ?4, ?5, 1)",
          rusqlite::params![
            encode_dt(input.created_at),
            Status::Pending.code(),
            input.requester_id,
            encode_variant(variant),
            input.kind.justification(),
          ],
        )?;
        let id = tx.last_insert_rowid();

        let external_id = external_id(variant, input.created_at, id);
        tx.execute(
          "UPDATE solicitations SET external_id = ?1 WHERE solicitation_id = ?2",
          rusqlite::params![external_id, id],
        )?;

        for (position, item) in input.items.iter().enumerate() {
          insert_item(&tx, id, position, item)?;
        }
        insert_event(&tx, id, &event)?;
        tx.commit()?;

        Ok(Solicitation {
          id,
          external_id,
          created_at: input.created_at,
          status: Status::Pending,
          requester_id: input.requester_id,
          kind: input.kind,
          items: input.items,
          version: 1,
        })
      })
      .await?;

    Ok(solicitation)
  }

  async fn commit(&self, changes: Vec<Change>) -> Result<()> {
    let conflict: Option<SolicitationId> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for change in &changes {
          if !apply_change(&tx, change)? {
            // Dropping the transaction rolls back earlier changes.
            return Ok(Some(change.after.id));
          }
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match conflict {
      Some(id) => Err(Error::Conflict(id)),
      None => Ok(()),
    }
  }

  async fn append_event(
    &self,
    solicitation_id: SolicitationId,
    event: NewAuditEvent,
  ) -> Result<EventId> {
    let event_id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let event_id = insert_event(&tx, solicitation_id, &event)?;
        tx.commit()?;
        Ok(event_id)
      })
      .await?;
    Ok(event_id)
  }

  async fn list_events(&self, solicitation_id: SolicitationId) -> Result<Vec<AuditEvent>> {
    let raws: Vec<RawAuditEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT event_id, solicitation_id, recorded_at, actor_id, action, details, observations
           FROM audit_events
           WHERE solicitation_id = ?1
           ORDER BY recorded_at DESC, event_id DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![solicitation_id], |row| {
            Ok(RawAuditEvent {
              event_id:        row.get(0)?,
              solicitation_id: row.get(1)?,
              recorded_at:     row.get(2)?,
              actor_id:        row.get(3)?,
              action:          row.get(4)?,
              details:         row.get(5)?,
              observations:    row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAuditEvent::into_event).collect()
  }
}

// ─── Collaborator impls ──────────────────────────────────────────────────────

impl IdentityResolver for SqliteStore {
  type Error = Error;

  async fn resolve_requester(
    &self,
    person_id: PersonId,
  ) -> Result<Option<(ServerRecord, RequesterRecord)>> {
    let resolved = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT s.server_id, s.person_id, s.name,
                    r.requester_id, r.department_id, r.department_name
             FROM servers s
             JOIN requesters r ON r.server_id = s.server_id
             WHERE s.person_id = ?1",
            rusqlite::params![person_id],
            requester_from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(resolved)
  }
}

impl CatalogLookup for SqliteStore {
  type Error = Error;

  async fn get_item(&self, item_id: ItemId) -> Result<Option<CatalogItem>> {
    let raw: Option<RawCatalogItem> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT item_id, name, active, reference_price
             FROM catalog_items WHERE item_id = ?1",
            rusqlite::params![item_id],
            |row| {
              Ok(RawCatalogItem {
                item_id:         row.get(0)?,
                name:            row.get(1)?,
                active:          row.get(2)?,
                reference_price: row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCatalogItem::into_item).transpose()
  }
}
