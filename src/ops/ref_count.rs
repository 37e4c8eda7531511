//! Make a [`ConnectableObservable`] behave like an ordinary observable and
//! automate the way you connect to it.
//!
//! Internally it counts the subscriptions to the observable and connects
//! (only once) when the count goes from 0 to 1. When the count drops back to
//! 0 the connection is disposed and forgotten, so the next subscriber starts
//! a brand-new upstream subscription.
//!
//! Note that `share` is exactly `multicast_with` followed by `ref_count`.

use crate::{
  observable::{ConnectObserver, ConnectableObservable, Connection, CoreObservable, ObservableType},
  observer::Observer,
  subject::SubjectSubscription,
  subscription::Subscription,
};
use parking_lot::ReentrantMutex;
use std::{
  cell::RefCell,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};
use tracing::debug;

#[derive(Default)]
struct RefCountState {
  count: usize,
  connection: Option<Connection>,
}

// Re-entrant: a synchronous source may terminate, and so release a count,
// from inside the `connect` call made while the lock is held.
type SharedState = Arc<ReentrantMutex<RefCell<RefCountState>>>;

pub struct RefCount<S: ObservableType> {
  connectable: ConnectableObservable<S>,
  state: SharedState,
}

impl<S: ObservableType + Clone> Clone for RefCount<S> {
  fn clone(&self) -> Self { Self { connectable: self.connectable.clone(), state: self.state.clone() } }
}

impl<S: ObservableType> RefCount<S> {
  pub(crate) fn new(connectable: ConnectableObservable<S>) -> Self {
    RefCount { connectable, state: Arc::new(ReentrantMutex::new(RefCell::new(RefCountState::default()))) }
  }

  /// Number of subscribers currently holding the connection open.
  pub fn subscriber_count(&self) -> usize { self.state.lock().borrow().count }

  /// `true` while an upstream connection is live.
  pub fn is_connected(&self) -> bool { self.connectable.is_connected() }
}

impl<S: ObservableType> ObservableType for RefCount<S> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, O> CoreObservable<O> for RefCount<S>
where
  S: ObservableType + Clone + CoreObservable<ConnectObserver<<S as ObservableType>::Item, <S as ObservableType>::Err>>,
  S::Unsub: Send + 'static,
  S::Item: Clone + Send + 'static,
  S::Err: Clone + Send + 'static,
  O: Observer<S::Item, S::Err> + Send + 'static,
{
  type Unsub = RefCountSubscription<S::Item, S::Err>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let guard = self.state.lock();
    let first = {
      let mut state = guard.borrow_mut();
      state.count += 1;
      state.count == 1
    };
    let release = RefCountRelease { state: self.state.clone(), released: Arc::new(AtomicBool::new(false)) };
    let subscription = self
      .connectable
      .clone()
      .actual_subscribe(RefCountObserver { observer, release: release.clone() });

    // The observer may already have been terminated by a replayed event.
    let still_counted = guard.borrow().count > 0;
    if first && still_counted {
      debug!("ref_count: 0 -> 1, connecting");
      let connection = self.connectable.connect();
      let mut state = guard.borrow_mut();
      if state.count == 0 {
        drop(state);
        connection.unsubscribe();
      } else {
        state.connection = Some(connection);
      }
    }
    drop(guard);
    RefCountSubscription { subscription, release }
  }
}

/// Gives back one count, once.
struct RefCountRelease {
  state: SharedState,
  released: Arc<AtomicBool>,
}

impl Clone for RefCountRelease {
  fn clone(&self) -> Self { Self { state: self.state.clone(), released: self.released.clone() } }
}

impl RefCountRelease {
  fn release(&self) {
    if self.released.swap(true, Ordering::AcqRel) {
      return;
    }
    let guard = self.state.lock();
    let connection = {
      let mut state = guard.borrow_mut();
      state.count = state.count.saturating_sub(1);
      if state.count == 0 { state.connection.take() } else { None }
    };
    if let Some(connection) = connection {
      debug!("ref_count: 1 -> 0, disconnecting");
      connection.unsubscribe();
    }
  }
}

pub struct RefCountObserver<O> {
  observer: O,
  release: RefCountRelease,
}

impl<Item, Err, O> Observer<Item, Err> for RefCountObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    self.observer.next(value);
    // A downstream `take` or `try_map` may close itself on a value.
    if self.observer.is_closed() {
      self.release.release();
    }
  }

  fn error(self, err: Err) {
    self.observer.error(err);
    self.release.release();
  }

  fn complete(self) {
    self.observer.complete();
    self.release.release();
  }

  #[inline]
  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

/// Subscription of one ref-counted subscriber: detaches it from the subject
/// and gives back its count.
pub struct RefCountSubscription<Item, Err> {
  subscription: SubjectSubscription<Item, Err>,
  release: RefCountRelease,
}

impl<Item, Err> Clone for RefCountSubscription<Item, Err> {
  fn clone(&self) -> Self {
    Self { subscription: self.subscription.clone(), release: self.release.clone() }
  }
}

impl<Item, Err> Subscription for RefCountSubscription<Item, Err> {
  fn unsubscribe(self) {
    self.subscription.unsubscribe();
    self.release.release();
  }

  fn is_closed(&self) -> bool { self.subscription.is_closed() }
}
