//! Handlers for `/solicitations` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/solicitations/general` | Body: [`CreateGeneral`]; returns 201 |
//! | `POST` | `/solicitations/patrimonial` | Body: [`CreatePatrimonial`]; returns 201 |
//! | `GET`  | `/solicitations/mine` | The caller's own requests, newest first |
//! | `GET`  | `/solicitations/{id}` | Single solicitation |
//! | `PUT`  | `/solicitations/{id}` | Body: [`EditSolicitation`] |
//! | `POST` | `/solicitations/{id}/cancel` | Body: `{"observations":"..."}` |
//! | `POST` | `/solicitations/{id}/status` | Body: [`ChangeStatus`]; managers and admins |
//! | `GET`  | `/solicitations/{id}/history` | Audit events, newest first |
//! | `POST` | `/solicitations/archive` | Body: `{"reference_year":2026}`; admins |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use procure_core::{
  audit::AuditEvent,
  command::{ChangeStatus, CreateGeneral, CreatePatrimonial, EditSolicitation},
  solicitation::{Solicitation, SolicitationId},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Backend, Engine, actor::CurrentActor, error::ApiError};

/// A solicitation as returned by the API, with its computed total.
#[derive(Debug, Serialize)]
pub struct SolicitationView {
  #[serde(flatten)]
  pub solicitation: Solicitation,
  pub total:        Decimal,
}

impl From<Solicitation> for SolicitationView {
  fn from(solicitation: Solicitation) -> Self {
    let total = solicitation.total();
    Self { solicitation, total }
  }
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /solicitations/general`
pub async fn create_general<S: Backend>(
  State(engine): State<Arc<Engine<S>>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<CreateGeneral>,
) -> Result<impl IntoResponse, ApiError> {
  let created = engine.create_general(&actor, body).await?;
  Ok((StatusCode::CREATED, Json(SolicitationView::from(created))))
}

/// `POST /solicitations/patrimonial`
pub async fn create_patrimonial<S: Backend>(
  State(engine): State<Arc<Engine<S>>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<CreatePatrimonial>,
) -> Result<impl IntoResponse, ApiError> {
  let created = engine.create_patrimonial(&actor, body).await?;
  Ok((StatusCode::CREATED, Json(SolicitationView::from(created))))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /solicitations/mine`
pub async fn list_mine<S: Backend>(
  State(engine): State<Arc<Engine<S>>>,
  CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<SolicitationView>>, ApiError> {
  let mine = engine.list_mine(&actor).await?;
  Ok(Json(mine.into_iter().map(SolicitationView::from).collect()))
}

/// `GET /solicitations/{id}`
pub async fn get_one<S: Backend>(
  State(engine): State<Arc<Engine<S>>>,
  CurrentActor(_actor): CurrentActor,
  Path(id): Path<SolicitationId>,
) -> Result<Json<SolicitationView>, ApiError> {
  Ok(Json(engine.get_by_id(id).await?.into()))
}

/// `GET /solicitations/{id}/history`
pub async fn history<S: Backend>(
  State(engine): State<Arc<Engine<S>>>,
  CurrentActor(_actor): CurrentActor,
  Path(id): Path<SolicitationId>,
) -> Result<Json<Vec<AuditEvent>>, ApiError> {
  Ok(Json(engine.list_history(id).await?))
}

// ─── Edit ─────────────────────────────────────────────────────────────────────

/// `PUT /solicitations/{id}`: the body replaces the justification and the
/// complete item set.
pub async fn edit<S: Backend>(
  State(engine): State<Arc<Engine<S>>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<SolicitationId>,
  Json(body): Json<EditSolicitation>,
) -> Result<Json<SolicitationView>, ApiError> {
  Ok(Json(engine.edit(id, &actor, body).await?.into()))
}

// ─── Cancel ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CancelBody {
  #[serde(default)]
  pub observations: Option<String>,
}

/// `POST /solicitations/{id}/cancel`
pub async fn cancel<S: Backend>(
  State(engine): State<Arc<Engine<S>>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<SolicitationId>,
  Json(body): Json<CancelBody>,
) -> Result<Json<SolicitationView>, ApiError> {
  Ok(Json(engine.cancel(id, &actor, body.observations).await?.into()))
}

// ─── Status ───────────────────────────────────────────────────────────────────

/// `POST /solicitations/{id}/status`
pub async fn change_status<S: Backend>(
  State(engine): State<Arc<Engine<S>>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<SolicitationId>,
  Json(body): Json<ChangeStatus>,
) -> Result<Json<SolicitationView>, ApiError> {
  Ok(Json(engine.change_status(id, &actor, body).await?.into()))
}

// ─── Archive ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ArchiveBody {
  pub reference_year: i32,
}

#[derive(Debug, Serialize)]
pub struct ArchiveOutcome {
  pub archived: usize,
}

/// `POST /solicitations/archive`
pub async fn archive<S: Backend>(
  State(engine): State<Arc<Engine<S>>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<ArchiveBody>,
) -> Result<Json<ArchiveOutcome>, ApiError> {
  let archived = engine.archive_older_than(body.reference_year, &actor).await?;
  Ok(Json(ArchiveOutcome { archived }))
}
