//! Ambient inputs of the lifecycle engine: configuration and time.

use chrono::{DateTime, Utc};

/// Submission window and per-request limits.
pub trait ConfigProvider: Send + Sync {
  /// `None` means submissions are always open.
  fn submission_deadline(&self) -> Option<DateTime<Utc>>;
  fn max_items_per_request(&self) -> usize;
  fn max_quantity_per_item(&self) -> u32;
}

/// A fixed set of configuration values.
#[derive(Debug, Clone)]
pub struct StaticConfig {
  pub submission_deadline:   Option<DateTime<Utc>>,
  pub max_items_per_request: usize,
  pub max_quantity_per_item: u32,
}

impl Default for StaticConfig {
  fn default() -> Self {
    Self {
      submission_deadline:   None,
      max_items_per_request: 50,
      max_quantity_per_item: 1000,
    }
  }
}

impl ConfigProvider for StaticConfig {
  fn submission_deadline(&self) -> Option<DateTime<Utc>> {
    self.submission_deadline
  }

  fn max_items_per_request(&self) -> usize { self.max_items_per_request }

  fn max_quantity_per_item(&self) -> u32 { self.max_quantity_per_item }
}

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// Always returns the same instant; keeps timestamps and years reproducible.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> { self.0 }
}
