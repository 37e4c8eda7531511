use super::{BoxedSubscription, Subscription};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::Arc;

struct Inner<T> {
  closed: bool,
  teardown: SmallVec<[T; 2]>,
}

impl<T> Default for Inner<T> {
  fn default() -> Self { Inner { closed: false, teardown: SmallVec::new() } }
}

/// A composite subscription owning any number of children.
///
/// Children are released in reverse order of acquisition. A child added after
/// the composite was closed is released on the spot.
#[derive(Clone, Default)]
pub struct MultiSubscription(Arc<Mutex<Inner<BoxedSubscription>>>);

impl MultiSubscription {
  pub fn new() -> Self { Self::default() }

  pub fn add(&self, subscription: impl Subscription + Send + 'static) {
    let subscription = BoxedSubscription::new(subscription);
    let mut inner = self.0.lock();
    if inner.closed {
      drop(inner);
      subscription.unsubscribe();
    } else {
      inner.teardown.retain(|s| !s.is_closed());
      inner.teardown.push(subscription);
    }
  }

  pub fn teardown_size(&self) -> usize { self.0.lock().teardown.len() }
}

impl Subscription for MultiSubscription {
  fn unsubscribe(self) {
    let teardown = {
      let mut inner = self.0.lock();
      if inner.closed {
        return;
      }
      inner.closed = true;
      std::mem::take(&mut inner.teardown)
    };
    for subscription in teardown.into_iter().rev() {
      subscription.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.0.lock().closed }
}

struct SerialInner {
  closed: bool,
  epoch: usize,
  current: Option<BoxedSubscription>,
}

/// A subscription slot holding at most one child at a time.
///
/// Setting a new child releases the previous one. Used by stages that swap
/// their upstream, like `retry` and `on_error_resume_next`.
///
/// A stage that subscribes synchronously may be re-subscribed before its
/// first subscribe call has returned. To keep the stale handle of the outer
/// call from replacing the newer one, callers [`reserve`] a slot before
/// subscribing and fill it with [`set_reserved`]: a handle for an older
/// reservation is released on the spot.
///
/// [`reserve`]: SerialSubscription::reserve
/// [`set_reserved`]: SerialSubscription::set_reserved
#[derive(Clone)]
pub struct SerialSubscription(Arc<Mutex<SerialInner>>);

impl Default for SerialSubscription {
  fn default() -> Self { Self(Arc::new(Mutex::new(SerialInner { closed: false, epoch: 0, current: None }))) }
}

impl SerialSubscription {
  pub fn new() -> Self { Self::default() }

  /// Claim the slot for the next child.
  pub fn reserve(&self) -> usize {
    let mut inner = self.0.lock();
    inner.epoch += 1;
    inner.epoch
  }

  /// Replace the current child.
  pub fn set(&self, subscription: impl Subscription + Send + 'static) {
    let epoch = self.reserve();
    self.set_reserved(epoch, subscription);
  }

  /// Fill the slot claimed by `reserve`.
  pub fn set_reserved(&self, epoch: usize, subscription: impl Subscription + Send + 'static) {
    let subscription = BoxedSubscription::new(subscription);
    let stale = {
      let mut inner = self.0.lock();
      if inner.closed || epoch < inner.epoch {
        Some(subscription)
      } else {
        inner.current.replace(subscription)
      }
    };
    stale.unsubscribe();
  }
}

impl Subscription for SerialSubscription {
  fn unsubscribe(self) {
    let current = {
      let mut inner = self.0.lock();
      inner.closed = true;
      inner.current.take()
    };
    current.unsubscribe();
  }

  fn is_closed(&self) -> bool { self.0.lock().closed }
}
