//! `GET /statuses`: the status reference table.

use axum::Json;
use procure_core::status::{StatusInfo, reference_table};

pub async fn list() -> Json<Vec<StatusInfo>> { Json(reference_table()) }
