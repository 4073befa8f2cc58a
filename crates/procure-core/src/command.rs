//! Command payloads accepted by the lifecycle engine, and their shape checks.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  catalog::ItemId,
  environment::ConfigProvider,
  solicitation::Variant,
  status::Status,
};

/// A requested line item as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemInput {
  pub item_id:       ItemId,
  pub quantity:      u32,
  /// Only honoured when editing an item already on the request. New items
  /// always capture the catalog reference price.
  #[serde(default)]
  pub unit_value:    Option<Decimal>,
  #[serde(default)]
  pub justification: Option<String>,
}

impl LineItemInput {
  pub fn new(item_id: ItemId, quantity: u32) -> Self {
    Self { item_id, quantity, unit_value: None, justification: None }
  }

  pub fn justified(mut self, justification: impl Into<String>) -> Self {
    self.justification = Some(justification.into());
    self
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateGeneral {
  #[serde(default)]
  pub justification: Option<String>,
  pub items:         Vec<LineItemInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePatrimonial {
  pub items: Vec<LineItemInput>,
}

/// Replacement contents for an existing solicitation. The item list is the
/// complete new set; it is diffed against the current one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditSolicitation {
  #[serde(default)]
  pub justification: Option<String>,
  pub items:         Vec<LineItemInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStatus {
  pub status:       Status,
  #[serde(default)]
  pub observations: Option<String>,
}

/// Check the item list against the configured limits and the variant rules.
/// Catalog membership is checked separately, since it needs I/O.
pub fn validate_items<C: ConfigProvider + ?Sized>(
  variant: Variant,
  justification: Option<&str>,
  items: &[LineItemInput],
  config: &C,
) -> Result<()> {
  if items.is_empty() {
    return Err(Error::Validation("a solicitation needs at least one item".into()));
  }

  let max_items = config.max_items_per_request();
  if items.len() > max_items {
    return Err(Error::Validation(format!(
      "{} items requested; at most {max_items} are allowed per solicitation",
      items.len()
    )));
  }

  let max_quantity = config.max_quantity_per_item();
  let mut seen = HashSet::with_capacity(items.len());
  for item in items {
    if !seen.insert(item.item_id) {
      return Err(Error::Validation(format!(
        "item {} appears more than once",
        item.item_id
      )));
    }
    if item.quantity == 0 || item.quantity > max_quantity {
      return Err(Error::Validation(format!(
        "quantity of item {} must be between 1 and {max_quantity}",
        item.item_id
      )));
    }
    if let Some(value) = item.unit_value
      && value.is_sign_negative()
    {
      return Err(Error::Validation(format!(
        "unit value of item {} cannot be negative",
        item.item_id
      )));
    }
    if variant == Variant::Patrimonial && is_blank(item.justification.as_deref()) {
      return Err(Error::Validation(format!(
        "item {} needs a justification on a patrimonial request",
        item.item_id
      )));
    }
  }

  if variant == Variant::Patrimonial && !is_blank(justification) {
    return Err(Error::Validation(
      "patrimonial requests are justified per item, not per request".into(),
    ));
  }

  Ok(())
}

/// Trim free text and collapse empty strings to `None`.
pub(crate) fn normalize_text(text: Option<&str>) -> Option<String> {
  text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_owned)
}

fn is_blank(text: Option<&str>) -> bool { normalize_text(text).is_none() }

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ErrorKind, environment::StaticConfig};

  fn config() -> StaticConfig {
    StaticConfig {
      max_items_per_request: 2,
      max_quantity_per_item: 10,
      ..StaticConfig::default()
    }
  }

  fn kind_of(result: Result<()>) -> ErrorKind {
    result.expect_err("validation should fail").kind()
  }

  #[test]
  fn accepts_a_well_formed_general_request() {
    let items = vec![LineItemInput::new(1, 2), LineItemInput::new(2, 10)];
    assert!(validate_items(Variant::General, Some("why"), &items, &config()).is_ok());
  }

  #[test]
  fn rejects_empty_and_oversized_item_lists() {
    let c = config();
    assert_eq!(kind_of(validate_items(Variant::General, None, &[], &c)), ErrorKind::Validation);

    let items: Vec<_> = (1..=3).map(|id| LineItemInput::new(id, 1)).collect();
    assert_eq!(
      kind_of(validate_items(Variant::General, None, &items, &c)),
      ErrorKind::Validation
    );
  }

  #[test]
  fn rejects_duplicates_and_out_of_range_quantities() {
    let c = config();
    let dup = vec![LineItemInput::new(1, 1), LineItemInput::new(1, 2)];
    assert!(validate_items(Variant::General, None, &dup, &c).is_err());
    assert!(validate_items(Variant::General, None, &[LineItemInput::new(1, 0)], &c).is_err());
    assert!(validate_items(Variant::General, None, &[LineItemInput::new(1, 11)], &c).is_err());
  }

  #[test]
  fn patrimonial_items_need_their_own_justification() {
    let c = config();
    let bare = vec![LineItemInput::new(1, 1)];
    assert!(validate_items(Variant::Patrimonial, None, &bare, &c).is_err());

    let justified = vec![LineItemInput::new(1, 1).justified("new lab bench")];
    assert!(validate_items(Variant::Patrimonial, None, &justified, &c).is_ok());
    assert!(validate_items(Variant::Patrimonial, Some("request level"), &justified, &c).is_err());
  }
}
