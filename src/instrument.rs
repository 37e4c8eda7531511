//! Injectable diagnostics for running subscriptions.
//!
//! An [`Instrumentation`] hook is attached to one point of a chain with
//! `Observable::instrument`. It is told about every subscribe call passing
//! that point, every event flowing through it, and the release of each
//! subscription. Hooks are plain values: nothing is registered globally.

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Receives the life-cycle of every subscription of an instrumented stage.
///
/// All methods default to doing nothing.
pub trait Instrumentation: Send + Sync {
  fn on_subscribe(&self) {}

  fn on_next(&self) {}

  fn on_error(&self) {}

  fn on_complete(&self) {}

  /// The subscription ended, by a terminal event or by unsubscribe. Called
  /// exactly once per subscription.
  fn on_release(&self) {}
}

/// Counts live subscriptions.
///
/// ```rust
/// use rxcore::prelude::*;
/// use std::sync::Arc;
///
/// let counter = Arc::new(ResourceCounter::default());
/// let subject = Subject::<i32, ()>::publish();
/// let subscription = subject.clone().instrument(counter.clone()).subscribe_next(|_| {});
/// assert_eq!(counter.live(), 1);
/// subscription.unsubscribe();
/// assert_eq!(counter.live(), 0);
/// ```
#[derive(Debug, Default)]
pub struct ResourceCounter {
  live: AtomicUsize,
  total: AtomicUsize,
}

impl ResourceCounter {
  /// Subscriptions started and not yet released.
  pub fn live(&self) -> usize { self.live.load(Ordering::Acquire) }

  /// Subscriptions started since creation.
  pub fn total(&self) -> usize { self.total.load(Ordering::Acquire) }
}

impl Instrumentation for ResourceCounter {
  fn on_subscribe(&self) {
    self.live.fetch_add(1, Ordering::AcqRel);
    self.total.fetch_add(1, Ordering::AcqRel);
  }

  fn on_release(&self) { self.live.fetch_sub(1, Ordering::AcqRel); }
}

/// Emits a `tracing` event for every life-cycle step, tagged with `name`.
#[derive(Debug, Clone)]
pub struct TracingInstrumentation {
  name: String,
}

impl TracingInstrumentation {
  pub fn new(name: impl Into<String>) -> Self { Self { name: name.into() } }
}

impl Instrumentation for TracingInstrumentation {
  fn on_subscribe(&self) { debug!(stage = %self.name, "subscribe"); }

  fn on_next(&self) { tracing::trace!(stage = %self.name, "next"); }

  fn on_error(&self) { debug!(stage = %self.name, "error"); }

  fn on_complete(&self) { debug!(stage = %self.name, "complete"); }

  fn on_release(&self) { debug!(stage = %self.name, "release"); }
}
