//! Subscriptions: handles that release the resources of a running stream.
//!
//! Every concrete handle the crate hands out is cheap to clone and shares its
//! state between clones, so unsubscribing the same subscription twice (through
//! two clones) releases its resources exactly once.

mod boxed;
mod multi;

pub use boxed::*;
pub use multi::*;

use parking_lot::Mutex;
use std::sync::Arc;

/// Subscription returned from `Observable::subscribe` to allow cancelling a
/// running stream before it terminates on its own.
pub trait Subscription {
  /// Release every resource this subscription owns.
  fn unsubscribe(self);

  fn is_closed(&self) -> bool;

  /// Activates "RAII" behavior for this subscription. That means
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately, which is probably not what you
  /// want!
  fn unsubscribe_when_dropped(self) -> SubscriptionGuard<Self>
  where
    Self: Sized,
  {
    SubscriptionGuard(Some(self))
  }
}

/// The unit subscription owns nothing and is always closed. Synchronous
/// sources return it once they have finished emitting.
impl Subscription for () {
  #[inline]
  fn unsubscribe(self) {}

  #[inline]
  fn is_closed(&self) -> bool { true }
}

impl<S: Subscription> Subscription for Option<S> {
  fn unsubscribe(self) {
    if let Some(s) = self {
      s.unsubscribe()
    }
  }

  fn is_closed(&self) -> bool { self.as_ref().is_none_or(Subscription::is_closed) }
}

/// A pair of subscriptions released together, the first one first.
///
/// Stages that own a resource of their own next to the upstream handle
/// return `(own, upstream)`.
impl<A: Subscription, B: Subscription> Subscription for (A, B) {
  fn unsubscribe(self) {
    self.0.unsubscribe();
    self.1.unsubscribe();
  }

  fn is_closed(&self) -> bool { self.0.is_closed() && self.1.is_closed() }
}

/// A subscription that runs a closure the first time it is unsubscribed.
#[derive(Clone)]
pub struct ClosureSubscription(Arc<Mutex<Option<Box<dyn FnOnce() + Send>>>>);

impl ClosureSubscription {
  pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
    Self(Arc::new(Mutex::new(Some(Box::new(f)))))
  }
}

impl Subscription for ClosureSubscription {
  fn unsubscribe(self) {
    let teardown = self.0.lock().take();
    if let Some(teardown) = teardown {
      teardown();
    }
  }

  fn is_closed(&self) -> bool { self.0.lock().is_none() }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope
#[must_use]
pub struct SubscriptionGuard<T: Subscription>(Option<T>);

impl<T: Subscription> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(Some(subscription)) }

  /// Defuses the guard and hands the subscription back.
  pub fn into_inner(mut self) -> Option<T> { self.0.take() }
}

impl<T: Subscription> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) {
    if let Some(subscription) = self.0.take() {
      subscription.unsubscribe()
    }
  }
}
