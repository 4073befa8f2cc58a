//! Edit pipeline: requested contents → minimal line-item changes.
//!
//! Items only in the new set are added, items only in the old set are
//! removed, and items in both are overwritten field by field. Every field that
//! actually changes yields one human-readable line for the audit ledger.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::{
  catalog::ItemId,
  command::{LineItemInput, normalize_text},
  solicitation::{Kind, LineItem, Solicitation},
};

/// Separator between change lines in an edit event's details.
pub const DETAIL_SEPARATOR: &str = "; ";

/// Row-level changes to a solicitation's line items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemChanges {
  pub added:   Vec<LineItem>,
  pub removed: Vec<ItemId>,
  pub updated: Vec<LineItem>,
}

impl ItemChanges {
  pub fn is_empty(&self) -> bool {
    self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
  }
}

/// The outcome of diffing an edit against the current solicitation.
#[derive(Debug, Clone)]
pub struct EditPlan {
  pub kind:    Kind,
  /// The complete new item list, in request order.
  pub items:   Vec<LineItem>,
  pub changes: ItemChanges,
  /// One line per effective field change; empty when nothing changed.
  pub lines:   Vec<String>,
}

impl EditPlan {
  pub fn is_noop(&self) -> bool { self.lines.is_empty() }

  pub fn details(&self) -> String { self.lines.join(DETAIL_SEPARATOR) }
}

/// Diff `inputs` against `current`.
///
/// `prices` must hold the catalog reference price of every item that is not
/// already on the solicitation; the caller validates those items first.
pub fn plan_edit(
  current: &Solicitation,
  justification: Option<&str>,
  inputs: &[LineItemInput],
  prices: &HashMap<ItemId, Decimal>,
) -> EditPlan {
  let mut lines = Vec::new();

  let kind = match &current.kind {
    Kind::General { justification: old } => {
      let new = normalize_text(justification);
      if *old != new {
        lines.push(format!(
          "Justification changed from {} to {}",
          quoted(old.as_deref()),
          quoted(new.as_deref())
        ));
      }
      Kind::General { justification: new }
    }
    Kind::Patrimonial => Kind::Patrimonial,
  };

  let mut changes = ItemChanges::default();
  let mut items = Vec::with_capacity(inputs.len());

  for input in inputs {
    let justification = normalize_text(input.justification.as_deref());

    let Some(old) = current.item(input.item_id) else {
      // Validated by the caller; a missing price here is a zero-cost item.
      let unit_value = prices.get(&input.item_id).copied().unwrap_or_default();
      let item = LineItem {
        item_id: input.item_id,
        quantity: input.quantity,
        unit_value,
        justification,
      };
      lines.push(format!(
        "Item {} added: quantity {}, unit value {}",
        item.item_id, item.quantity, item.unit_value
      ));
      changes.added.push(item.clone());
      items.push(item);
      continue;
    };

    let item = LineItem {
      item_id: old.item_id,
      quantity: input.quantity,
      unit_value: input.unit_value.unwrap_or(old.unit_value),
      justification,
    };

    let before = lines.len();
    if old.quantity != item.quantity {
      lines.push(format!(
        "Item {} quantity: {} -> {}",
        item.item_id, old.quantity, item.quantity
      ));
    }
    if old.unit_value != item.unit_value {
      lines.push(format!(
        "Item {} unit value: {} -> {}",
        item.item_id, old.unit_value, item.unit_value
      ));
    }
    if old.justification != item.justification {
      lines.push(format!(
        "Item {} justification: {} -> {}",
        item.item_id,
        quoted(old.justification.as_deref()),
        quoted(item.justification.as_deref())
      ));
    }
    if lines.len() > before {
      changes.updated.push(item.clone());
    }
    items.push(item);
  }

  let kept: HashSet<ItemId> = inputs.iter().map(|i| i.item_id).collect();
  for old in &current.items {
    if !kept.contains(&old.item_id) {
      lines.push(format!("Item {} removed", old.item_id));
      changes.removed.push(old.item_id);
    }
  }

  EditPlan { kind, items, changes, lines }
}

fn quoted(text: Option<&str>) -> String {
  match text {
    Some(t) => format!("\"{t}\""),
    None => "(empty)".to_owned(),
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::status::Status;

  fn item(item_id: ItemId, quantity: u32, value: i64) -> LineItem {
    LineItem {
      item_id,
      quantity,
      unit_value: Decimal::from(value),
      justification: None,
    }
  }

  fn general(items: Vec<LineItem>) -> Solicitation {
    Solicitation {
      id: 1,
      external_id: "SG-2026-0001".into(),
      created_at: Utc::now(),
      status: Status::Pending,
      requester_id: 1,
      kind: Kind::General { justification: Some("lab supplies".into()) },
      items,
      version: 1,
    }
  }

  #[test]
  fn identical_contents_are_a_noop() {
    let current = general(vec![item(1, 2, 50)]);
    let plan = plan_edit(
      &current,
      Some("lab supplies"),
      &[LineItemInput::new(1, 2)],
      &HashMap::new(),
    );
    assert!(plan.is_noop());
    assert!(plan.changes.is_empty());
    assert_eq!(plan.items, current.items);
  }

  #[test]
  fn added_removed_and_updated_items_are_classified() {
    let current = general(vec![item(1, 2, 50), item(2, 1, 10)]);
    let prices = HashMap::from([(3, Decimal::from(7))]);
    let plan = plan_edit(
      &current,
      Some("lab supplies"),
      &[LineItemInput::new(1, 5), LineItemInput::new(3, 4)],
      &prices,
    );

    assert_eq!(plan.changes.added, vec![item(3, 4, 7)]);
    assert_eq!(plan.changes.removed, vec![2]);
    assert_eq!(plan.changes.updated, vec![item(1, 5, 50)]);
    assert_eq!(plan.lines, vec![
      "Item 1 quantity: 2 -> 5".to_owned(),
      "Item 3 added: quantity 4, unit value 7".to_owned(),
      "Item 2 removed".to_owned(),
    ]);
  }

  #[test]
  fn every_changed_field_gets_its_own_line() {
    let current = general(vec![item(1, 2, 50)]);
    let mut input = LineItemInput::new(1, 3).justified("broken printer");
    input.unit_value = Some(Decimal::from(45));
    let plan = plan_edit(&current, Some("printing"), &[input], &HashMap::new());

    assert_eq!(plan.lines.len(), 4);
    let details = plan.details();
    assert!(details.contains("Justification changed from \"lab supplies\" to \"printing\""));
    assert!(details.contains("Item 1 quantity: 2 -> 3"));
    assert!(details.contains("Item 1 unit value: 50 -> 45"));
    assert!(details.contains("Item 1 justification: (empty) -> \"broken printer\""));
  }

  #[test]
  fn unchanged_unit_value_is_kept_when_not_supplied() {
    let current = general(vec![item(1, 2, 50)]);
    let plan = plan_edit(
      &current,
      Some("lab supplies"),
      &[LineItemInput::new(1, 4)],
      &HashMap::from([(1, Decimal::from(99))]),
    );
    assert_eq!(plan.items[0].unit_value, Decimal::from(50));
  }
}
