//! The lifecycle engine: every state change a solicitation goes through.
//!
//! Each operation checks its business rules before anything is written, then
//! hands the store a single unit of work holding both the aggregate write and
//! its ledger entries. Nothing is retried here; a lost-update race surfaces as
//! [`Error::ConcurrencyConflict`].

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, SubsecRound as _, TimeZone as _, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use crate::{
  Error, Result,
  audit::{ActionKind, AuditEvent, NewAuditEvent, status_change_details},
  catalog::{CatalogLookup, ItemId},
  command::{
    ChangeStatus, CreateGeneral, CreatePatrimonial, EditSolicitation, LineItemInput,
    normalize_text, validate_items,
  },
  diff::{ItemChanges, plan_edit},
  environment::{Clock, ConfigProvider, SystemClock},
  identity::{Actor, IdentityResolver, RequesterRecord},
  solicitation::{Kind, LineItem, NewSolicitation, Solicitation, SolicitationId, Variant},
  status::Status,
  store::{Change, SolicitationStore, StoreFailure as _},
};

/// Orchestrates solicitation commands over a store and its collaborators.
pub struct LifecycleEngine<S, R, K> {
  store:      S,
  identities: R,
  catalog:    K,
  config:     Arc<dyn ConfigProvider>,
  clock:      Arc<dyn Clock>,
}

impl<S, R, K> LifecycleEngine<S, R, K>
where
  S: SolicitationStore,
  R: IdentityResolver,
  K: CatalogLookup,
{
  pub fn new(
    store: S,
    identities: R,
    catalog: K,
    config: Arc<dyn ConfigProvider>,
  ) -> Self {
    Self {
      store,
      identities,
      catalog,
      config,
      clock: Arc::new(SystemClock),
    }
  }

  /// Replace the system clock, e.g. with a fixed one in tests.
  pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
    self.clock = Arc::new(clock);
    self
  }

  pub fn store(&self) -> &S { &self.store }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get_by_id(&self, id: SolicitationId) -> Result<Solicitation> {
    self
      .store
      .get_solicitation(id)
      .await
      .map_err(|e| self.store_error(e))?
      .ok_or(Error::SolicitationNotFound(id))
  }

  /// The ledger of an existing solicitation, newest first.
  pub async fn list_history(&self, id: SolicitationId) -> Result<Vec<AuditEvent>> {
    self.get_by_id(id).await?;
    self.store.list_events(id).await.map_err(|e| self.store_error(e))
  }

  /// The actor's own solicitations, newest first.
  pub async fn list_mine(&self, actor: &Actor) -> Result<Vec<Solicitation>> {
    let requester = self.requester_of(actor).await?;
    self
      .store
      .list_for_requester(requester.requester_id)
      .await
      .map_err(|e| self.store_error(e))
  }

  // ── Creation ──────────────────────────────────────────────────────────

  pub async fn create_general(
    &self,
    actor: &Actor,
    command: CreateGeneral,
  ) -> Result<Solicitation> {
    self
      .create(actor, Variant::General, command.justification, command.items)
      .await
  }

  pub async fn create_patrimonial(
    &self,
    actor: &Actor,
    command: CreatePatrimonial,
  ) -> Result<Solicitation> {
    self.create(actor, Variant::Patrimonial, None, command.items).await
  }

  async fn create(
    &self,
    actor: &Actor,
    variant: Variant,
    justification: Option<String>,
    inputs: Vec<LineItemInput>,
  ) -> Result<Solicitation> {
    self.ensure_window_open()?;
    let requester = self.requester_of(actor).await?;
    validate_items(variant, justification.as_deref(), &inputs, &*self.config)
      .inspect_err(|e| debug!(person = actor.person_id, error = %e, "creation rejected"))?;
    let prices = self.resolve_prices(inputs.iter().map(|i| i.item_id)).await?;

    let items: Vec<LineItem> = inputs
      .into_iter()
      .map(|input| LineItem {
        item_id:       input.item_id,
        quantity:      input.quantity,
        unit_value:    prices.get(&input.item_id).copied().unwrap_or_default(),
        justification: normalize_text(input.justification.as_deref()),
      })
      .collect();

    let kind = match variant {
      Variant::General => Kind::General {
        justification: normalize_text(justification.as_deref()),
      },
      Variant::Patrimonial => Kind::Patrimonial,
    };

    let total: Decimal = items.iter().map(LineItem::total).sum();
    let now = self.now();
    let event = NewAuditEvent::new(
      now,
      actor.person_id,
      ActionKind::Creation,
      format!(
        "{variant} solicitation created with {} item(s), total {total}",
        items.len()
      ),
    );

    let input = NewSolicitation {
      created_at: now,
      requester_id: requester.requester_id,
      kind,
      items,
    };

    let solicitation = self
      .store
      .insert_solicitation(input, event)
      .await
      .map_err(|e| self.store_error(e))?;

    info!(
      solicitation = solicitation.id,
      external_id = %solicitation.external_id,
      person = actor.person_id,
      "solicitation created"
    );
    Ok(solicitation)
  }

  // ── Edit ──────────────────────────────────────────────────────────────

  /// Replace the justification and item set. A non-admin edit of a request
  /// awaiting adjustments resubmits it to `Pending`.
  ///
  /// Checks run in this order: deadline, ownership, finality. Item order is
  /// not a field of its own; the stored order follows the request only when
  /// an item is added, removed or updated.
  pub async fn edit(
    &self,
    id: SolicitationId,
    actor: &Actor,
    command: EditSolicitation,
  ) -> Result<Solicitation> {
    let current = self.get_by_id(id).await?;

    // Requests returned for adjustments can be fixed after the deadline.
    if current.status != Status::AwaitingAdjustments {
      self.ensure_window_open()?;
    }
    self.ensure_owner_or_admin(actor, &current).await?;

    if current.status.is_finalized() {
      return Err(Error::AlreadyFinalized { id, status: current.status });
    }

    validate_items(
      current.variant(),
      command.justification.as_deref(),
      &command.items,
      &*self.config,
    )?;

    let prices = self
      .resolve_prices(
        command
          .items
          .iter()
          .map(|i| i.item_id)
          .filter(|item_id| current.item(*item_id).is_none()),
      )
      .await?;

    let plan = plan_edit(
      &current,
      command.justification.as_deref(),
      &command.items,
      &prices,
    );

    let now = self.now();
    let mut events = Vec::new();
    if !plan.is_noop() {
      events.push(NewAuditEvent::new(
        now,
        actor.person_id,
        ActionKind::Edit,
        plan.details(),
      ));
    }

    let mut after = current.clone();
    after.kind = plan.kind;
    after.items = plan.items;

    if current.status == Status::AwaitingAdjustments && !actor.is_admin {
      after.status = Status::Pending;
      events.push(NewAuditEvent::new(
        now,
        actor.person_id,
        ActionKind::StatusChange,
        format!(
          "{} (resubmitted by the requester)",
          status_change_details(current.status, Status::Pending)
        ),
      ));
    }

    if events.is_empty() {
      debug!(solicitation = id, "edit changed nothing");
      return Ok(current);
    }

    let event_count = events.len();
    let updated = self
      .commit_one(Change { after, items: plan.changes, events })
      .await?;

    info!(
      solicitation = id,
      person = actor.person_id,
      events = event_count,
      status = %updated.status,
      "solicitation edited"
    );
    Ok(updated)
  }

  // ── Cancellation ──────────────────────────────────────────────────────

  pub async fn cancel(
    &self,
    id: SolicitationId,
    actor: &Actor,
    observations: Option<String>,
  ) -> Result<Solicitation> {
    let current = self.get_by_id(id).await?;
    self.ensure_owner_or_admin(actor, &current).await?;

    if current.status.is_decided() {
      return Err(Error::AlreadyFinalized { id, status: current.status });
    }
    if current.status == Status::Cancelled {
      return Err(Error::AlreadyCancelled(id));
    }

    let event = NewAuditEvent::new(
      self.now(),
      actor.person_id,
      ActionKind::Cancellation,
      status_change_details(current.status, Status::Cancelled),
    )
    .with_observations(observations);

    let mut after = current;
    after.status = Status::Cancelled;

    let updated = self
      .commit_one(Change {
        after,
        items: ItemChanges::default(),
        events: vec![event],
      })
      .await?;

    info!(solicitation = id, person = actor.person_id, "solicitation cancelled");
    Ok(updated)
  }

  // ── Manager decisions ─────────────────────────────────────────────────

  pub async fn change_status(
    &self,
    id: SolicitationId,
    actor: &Actor,
    command: ChangeStatus,
  ) -> Result<Solicitation> {
    if !actor.can_decide() {
      return Err(Error::Forbidden(
        "only managers and administrators may change a solicitation's status".into(),
      ));
    }

    let current = self.get_by_id(id).await?;
    let target = command.status;

    if current.status.is_finalized() {
      return Err(Error::AlreadyFinalized { id, status: current.status });
    }
    // Archival belongs to the batch and cancellation to its own operation.
    if target == current.status
      || matches!(target, Status::Archived | Status::Cancelled)
    {
      return Err(Error::InvalidTransition { from: current.status, to: target });
    }

    let event = NewAuditEvent::new(
      self.now(),
      actor.person_id,
      ActionKind::StatusChange,
      status_change_details(current.status, target),
    )
    .with_observations(command.observations);

    let mut after = current.clone();
    after.status = target;

    let updated = self
      .commit_one(Change {
        after,
        items: ItemChanges::default(),
        events: vec![event],
      })
      .await?;

    info!(
      solicitation = id,
      person = actor.person_id,
      from = %current.status,
      to = %target,
      "solicitation status changed"
    );
    Ok(updated)
  }

  // ── Archival ──────────────────────────────────────────────────────────

  /// Archive every solicitation created before January 1st of
  /// `reference_year` that is not archived yet. Returns how many were
  /// archived; zero is not an error.
  pub async fn archive_older_than(
    &self,
    reference_year: i32,
    actor: &Actor,
  ) -> Result<usize> {
    if !actor.is_admin {
      return Err(Error::Forbidden("only administrators may run the archival".into()));
    }

    let cutoff = Utc
      .with_ymd_and_hms(reference_year, 1, 1, 0, 0, 0)
      .single()
      .ok_or_else(|| Error::Validation(format!("invalid reference year {reference_year}")))?;

    let candidates = self
      .store
      .list_unarchived_before(cutoff)
      .await
      .map_err(|e| self.store_error(e))?;

    if candidates.is_empty() {
      debug!(reference_year, "nothing to archive");
      return Ok(0);
    }

    let now = self.now();
    let changes: Vec<Change> = candidates
      .into_iter()
      .map(|solicitation| {
        let details = format!(
          "{} (automatic archival of solicitations created before {reference_year})",
          status_change_details(solicitation.status, Status::Archived)
        );
        let mut after = solicitation;
        after.status = Status::Archived;
        Change {
          after,
          items: ItemChanges::default(),
          events: vec![NewAuditEvent::new(
            now,
            actor.person_id,
            ActionKind::StatusChange,
            details,
          )],
        }
      })
      .collect();

    let count = changes.len();
    self.store.commit(changes).await.map_err(|e| self.store_error(e))?;

    info!(reference_year, count, person = actor.person_id, "solicitations archived");
    Ok(count)
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  /// Current time at microsecond precision, the resolution stores keep.
  fn now(&self) -> DateTime<Utc> { self.clock.now().trunc_subsecs(6) }

  fn ensure_window_open(&self) -> Result<()> {
    match self.config.submission_deadline() {
      Some(deadline) if self.now() > deadline => {
        debug!(%deadline, "submission window closed");
        Err(Error::DeadlineExceeded(deadline))
      }
      _ => Ok(()),
    }
  }

  async fn requester_of(&self, actor: &Actor) -> Result<RequesterRecord> {
    let resolved = self
      .identities
      .resolve_requester(actor.person_id)
      .await
      .map_err(|e| collaborator_error("identity resolver", e))?;
    resolved
      .map(|(_, requester)| requester)
      .ok_or(Error::RequesterNotFound(actor.person_id))
  }

  async fn ensure_owner_or_admin(
    &self,
    actor: &Actor,
    solicitation: &Solicitation,
  ) -> Result<()> {
    if actor.is_admin {
      return Ok(());
    }
    let resolved = self
      .identities
      .resolve_requester(actor.person_id)
      .await
      .map_err(|e| collaborator_error("identity resolver", e))?;
    match resolved {
      Some((_, requester)) if requester.requester_id == solicitation.requester_id => Ok(()),
      _ => {
        debug!(
          solicitation = solicitation.id,
          person = actor.person_id,
          "actor is neither owner nor administrator"
        );
        Err(Error::Forbidden(format!(
          "solicitation {} belongs to another requester",
          solicitation.id
        )))
      }
    }
  }

  /// Look up each item in the catalog; all must exist and be active.
  async fn resolve_prices(
    &self,
    item_ids: impl Iterator<Item = ItemId>,
  ) -> Result<HashMap<ItemId, Decimal>> {
    let mut prices = HashMap::new();
    for item_id in item_ids {
      let item = self
        .catalog
        .get_item(item_id)
        .await
        .map_err(|e| collaborator_error("catalog", e))?
        .ok_or(Error::InvalidItem { item_id, reason: "not in the catalog" })?;
      if !item.active {
        return Err(Error::InvalidItem { item_id, reason: "inactive in the catalog" });
      }
      prices.insert(item_id, item.reference_price);
    }
    Ok(prices)
  }

  async fn commit_one(&self, change: Change) -> Result<Solicitation> {
    let mut updated = change.after.clone();
    self
      .store
      .commit(vec![change])
      .await
      .map_err(|e| self.store_error(e))?;
    updated.version += 1;
    Ok(updated)
  }

  fn store_error(&self, e: S::Error) -> Error {
    if let Some(id) = e.conflict() {
      debug!(solicitation = id, "concurrent modification detected");
      return Error::ConcurrencyConflict(id);
    }
    error!(error = %e, "solicitation store failure");
    Error::Persistence(Box::new(e))
  }
}

fn collaborator_error<E>(collaborator: &'static str, e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  error!(collaborator, error = %e, "collaborator failure");
  Error::Persistence(Box::new(e))
}
