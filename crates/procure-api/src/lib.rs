//! JSON REST API for procurement solicitations.
//!
//! Exposes an axum [`Router`] backed by a [`LifecycleEngine`] over any
//! backend that stores solicitations, resolves requesters and looks up
//! catalog items. Authentication is the caller's responsibility; handlers
//! read the caller from the `X-Person-Id` and `X-Roles` headers (see
//! [`actor`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", procure_api::api_router(engine.clone()))
//! ```

pub mod actor;
pub mod error;
pub mod solicitations;
pub mod statuses;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use procure_core::{
  LifecycleEngine, catalog::CatalogLookup, identity::IdentityResolver,
  store::SolicitationStore,
};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// A backend able to serve every collaborator role of the engine.
pub trait Backend:
  SolicitationStore + IdentityResolver + CatalogLookup + Send + Sync + 'static
{
}

impl<T> Backend for T where
  T: SolicitationStore + IdentityResolver + CatalogLookup + Send + Sync + 'static
{
}

/// The engine shape served by the API.
pub type Engine<S> = LifecycleEngine<S, S, S>;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: Backend>(engine: Arc<Engine<S>>) -> Router<()> {
  Router::new()
    // Creation and the caller's own requests
    .route("/solicitations/general", post(solicitations::create_general::<S>))
    .route("/solicitations/patrimonial", post(solicitations::create_patrimonial::<S>))
    .route("/solicitations/mine", get(solicitations::list_mine::<S>))
    // Batch archival
    .route("/solicitations/archive", post(solicitations::archive::<S>))
    // Single solicitation
    .route(
      "/solicitations/{id}",
      get(solicitations::get_one::<S>).put(solicitations::edit::<S>),
    )
    .route("/solicitations/{id}/cancel", post(solicitations::cancel::<S>))
    .route("/solicitations/{id}/status", post(solicitations::change_status::<S>))
    .route("/solicitations/{id}/history", get(solicitations::history::<S>))
    // Reference data
    .route("/statuses", get(statuses::list))
    .layer(TraceLayer::new_for_http())
    .with_state(engine)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::{TimeZone as _, Utc};
  use procure_core::{
    catalog::CatalogItem,
    environment::{FixedClock, StaticConfig},
    identity::{RequesterRecord, ServerRecord},
  };
  use procure_store_sqlite::SqliteStore;
  use rust_decimal::Decimal;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  const OWNER: &str = "100";
  const OTHER: &str = "200";
  const MANAGER: &str = "300";

  async fn make_engine(config: StaticConfig) -> Arc<Engine<SqliteStore>> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .upsert_catalog_item(CatalogItem {
        item_id:         1,
        name:            "A4 paper ream".into(),
        active:          true,
        reference_price: Decimal::from(50),
      })
      .await
      .unwrap();
    for (server_id, person_id) in [(1, 100), (2, 200)] {
      store
        .upsert_server(ServerRecord {
          server_id,
          person_id,
          name: format!("Server {server_id}"),
        })
        .await
        .unwrap();
      store
        .upsert_requester(RequesterRecord {
          requester_id: server_id * 10,
          server_id,
          department_id: 1,
          department_name: "Physics".into(),
        })
        .await
        .unwrap();
    }

    let now = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap();
    Arc::new(
      LifecycleEngine::new(store.clone(), store.clone(), store, Arc::new(config))
        .with_clock(FixedClock(now)),
    )
  }

  async fn send(
    engine: &Arc<Engine<SqliteStore>>,
    method: &str,
    uri: &str,
    actor: Option<(&str, &str)>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((person, roles)) = actor {
      builder = builder.header("X-Person-Id", person).header("X-Roles", roles);
    }
    let req = match body {
      Some(body) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let resp = api_router(engine.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
  }

  async fn create(engine: &Arc<Engine<SqliteStore>>) -> i64 {
    let (status, body) = send(
      engine,
      "POST",
      "/solicitations/general",
      Some((OWNER, "")),
      Some(json!({
        "justification": "Lab notebooks",
        "items": [{ "item_id": 1, "quantity": 3 }]
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
  }

  #[tokio::test]
  async fn create_returns_201_with_external_id() {
    let engine = make_engine(StaticConfig::default()).await;
    let id = create(&engine).await;

    let (status, body) =
      send(&engine, "GET", &format!("/solicitations/{id}"), Some((OWNER, "")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["external_id"], format!("SG-2026-{id:04}"));
    assert_eq!(body["status"], "Pending");
    assert_eq!(body["kind"]["variant"], "general");
    assert_eq!(body["total"], "150");
  }

  #[tokio::test]
  async fn missing_person_header_is_401() {
    let engine = make_engine(StaticConfig::default()).await;
    let (status, body) = send(&engine, "GET", "/solicitations/mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthenticated");
  }

  #[tokio::test]
  async fn deadline_and_catalog_errors_are_422() {
    let closed = StaticConfig {
      submission_deadline: Some(Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 0).unwrap()),
      ..StaticConfig::default()
    };
    let engine = make_engine(closed).await;
    let (status, body) = send(
      &engine,
      "POST",
      "/solicitations/general",
      Some((OWNER, "")),
      Some(json!({ "justification": "x", "items": [{ "item_id": 1, "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "deadline_exceeded");
    assert!(body["error"].as_str().unwrap().contains("31/03/2026 23:59"));

    let engine = make_engine(StaticConfig::default()).await;
    let (status, body) = send(
      &engine,
      "POST",
      "/solicitations/patrimonial",
      Some((OWNER, "")),
      Some(json!({ "items": [{ "item_id": 99, "quantity": 1, "justification": "x" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_item");
  }

  #[tokio::test]
  async fn status_changes_need_a_manager_and_finalize() {
    let engine = make_engine(StaticConfig::default()).await;
    let id = create(&engine).await;
    let uri = format!("/solicitations/{id}/status");
    let approve = json!({ "status": "Approved", "observations": "Within budget" });

    let (status, body) =
      send(&engine, "POST", &uri, Some((OWNER, "")), Some(approve.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");

    let (status, body) =
      send(&engine, "POST", &uri, Some((MANAGER, "manager")), Some(approve.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Approved");

    let (status, body) =
      send(&engine, "POST", &uri, Some((MANAGER, "manager")), Some(approve)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_finalized");

    let (status, body) = send(
      &engine,
      "GET",
      &format!("/solicitations/{id}/history"),
      Some((OWNER, "")),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = body.as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["action"], "status_change");
    assert_eq!(events[0]["observations"], "Within budget");
  }

  #[tokio::test]
  async fn edit_and_cancel_are_owner_only() {
    let engine = make_engine(StaticConfig::default()).await;
    let id = create(&engine).await;
    let uri = format!("/solicitations/{id}");
    let edit = json!({
      "justification": "Lab notebooks",
      "items": [{ "item_id": 1, "quantity": 5 }]
    });

    let (status, _) = send(&engine, "PUT", &uri, Some((OTHER, "")), Some(edit.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&engine, "PUT", &uri, Some((OWNER, "")), Some(edit)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["quantity"], 5);

    let cancel = format!("{uri}/cancel");
    let (status, body) =
      send(&engine, "POST", &cancel, Some((OWNER, "")), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Cancelled");

    let (status, body) =
      send(&engine, "POST", &cancel, Some((OWNER, "")), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_cancelled");
  }

  #[tokio::test]
  async fn mine_lists_only_the_callers_requests() {
    let engine = make_engine(StaticConfig::default()).await;
    let id = create(&engine).await;

    let (_, body) = send(&engine, "GET", "/solicitations/mine", Some((OWNER, "")), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], id);

    let (_, body) = send(&engine, "GET", "/solicitations/mine", Some((OTHER, "")), None).await;
    assert!(body.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn archive_is_admin_only() {
    let engine = make_engine(StaticConfig::default()).await;
    create(&engine).await;
    let body = json!({ "reference_year": 2027 });

    let (status, _) = send(
      &engine,
      "POST",
      "/solicitations/archive",
      Some((MANAGER, "manager")),
      Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, outcome) =
      send(&engine, "POST", "/solicitations/archive", Some(("1", "admin")), Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["archived"], 1);
  }

  #[tokio::test]
  async fn unknown_solicitation_is_404() {
    let engine = make_engine(StaticConfig::default()).await;
    let (status, body) =
      send(&engine, "GET", "/solicitations/77/history", Some((OWNER, "")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
  }

  #[tokio::test]
  async fn statuses_lists_the_reference_table() {
    let engine = make_engine(StaticConfig::default()).await;
    let (status, body) = send(&engine, "GET", "/statuses", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0]["code"], 1);
    assert_eq!(rows[0]["name"], "Pending");
  }
}
