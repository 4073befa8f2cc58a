//! Catalog lookup: the items a solicitation may reference.

use std::future::Future;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type ItemId = i64;

/// An entry of the purchasing catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
  pub item_id:         ItemId,
  pub name:            String,
  /// Inactive items stay in the catalog for history but cannot be requested.
  pub active:          bool,
  /// Current reference price; captured into a line item when it is added.
  pub reference_price: Decimal,
}

pub trait CatalogLookup: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Returns `None` when no catalog entry has this id.
  fn get_item(
    &self,
    item_id: ItemId,
  ) -> impl Future<Output = Result<Option<CatalogItem>, Self::Error>> + Send + '_;
}
