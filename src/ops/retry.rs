//! Retry operator implementation
//!
//! On error the source is subscribed again, up to `count` times. Values seen
//! before an error have already been forwarded and are not replayed, so a
//! cold source re-emits them on every attempt.
//!
//! ```rust
//! use parking_lot::Mutex;
//! use rxcore::prelude::*;
//! use std::sync::{
//!   atomic::{AtomicUsize, Ordering},
//!   Arc,
//! };
//!
//! let attempts = Arc::new(AtomicUsize::new(0));
//! let c_attempts = attempts.clone();
//! let source = create(move |s: Subscriber<i32, &'static str>| {
//!   if c_attempts.fetch_add(1, Ordering::SeqCst) < 2 {
//!     s.error("boom");
//!   } else {
//!     s.next(1);
//!     s.complete();
//!   }
//! });
//!
//! let out = Arc::new(Mutex::new(vec![]));
//! let c_out = out.clone();
//! source.retry(3).subscribe_next(move |v| c_out.lock().push(v));
//! assert_eq!(*out.lock(), vec![1]);
//! assert_eq!(attempts.load(Ordering::SeqCst), 3);
//! ```

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  subscription::{SerialSubscription, Subscription},
};
use tracing::debug;

#[derive(Clone)]
pub struct RetryOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

impl<S: ObservableType> ObservableType for RetryOp<S> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, O> CoreObservable<O> for RetryOp<S>
where
  S: CoreObservable<RetryObserver<S, O>> + Clone,
  S::Unsub: Send + 'static,
  O: Observer<S::Item, S::Err>,
{
  type Unsub = SerialSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let serial = SerialSubscription::new();
    let retry = RetryObserver {
      source: self.source,
      observer,
      remaining: self.count,
      serial: serial.clone(),
      resubscribe: RetryObserver::<S, O>::subscribe_source,
    };
    retry.subscribe_source();
    serial
  }
}

/// Observer for the retry operator: holds the source so it can subscribe it
/// again.
pub struct RetryObserver<S, O> {
  source: S,
  observer: O,
  remaining: usize,
  serial: SerialSubscription,
  // a fn pointer keeps `S: CoreObservable<Self>` out of the observer bounds
  resubscribe: fn(Self),
}

impl<S, O> RetryObserver<S, O>
where
  S: CoreObservable<RetryObserver<S, O>> + Clone,
  S::Unsub: Send + 'static,
{
  fn subscribe_source(self) {
    let serial = self.serial.clone();
    let epoch = serial.reserve();
    let upstream = self.source.clone().actual_subscribe(self);
    serial.set_reserved(epoch, upstream);
  }
}

impl<S, O, Item, Err> Observer<Item, Err> for RetryObserver<S, O>
where
  O: Observer<Item, Err>,
{
  #[inline]
  fn next(&mut self, value: Item) { self.observer.next(value) }

  fn error(mut self, err: Err) {
    if self.remaining == 0 || self.serial.is_closed() {
      self.observer.error(err);
      return;
    }
    self.remaining -= 1;
    debug!(remaining = self.remaining, "retry: resubscribing source");
    (self.resubscribe)(self);
  }

  #[inline]
  fn complete(self) { self.observer.complete() }

  #[inline]
  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;
  use parking_lot::Mutex;
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  // A cold source whose n-th subscription emits `n`, then errors until
  // `$succeed_on` is reached.
  macro_rules! failing_source {
    ($attempts:expr, $succeed_on:expr) => {{
      let attempts = $attempts.clone();
      let succeed_on: usize = $succeed_on;
      defer(move || {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        create(move |s: Subscriber<i32, &'static str>| {
          s.next(attempt as i32);
          if attempt < succeed_on {
            s.error("boom");
          } else {
            s.complete();
          }
        })
      })
    }};
  }

  #[test]
  fn resubscribes_until_success() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let events = Arc::new(Mutex::new(vec![]));
    let (c_next, c_err, c_done) = (events.clone(), events.clone(), events.clone());
    failing_source!(attempts, 3).retry(5).subscribe_all(
      move |v| c_next.lock().push(Event::Next(v)),
      move |e| c_err.lock().push(Event::Error(e)),
      move || c_done.lock().push(Event::Completed),
    );
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(
      *events.lock(),
      vec![Event::Next(1), Event::Next(2), Event::Next(3), Event::Completed]
    );
  }

  #[test]
  fn gives_up_after_count() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let events = Arc::new(Mutex::new(vec![]));
    let (c_next, c_err) = (events.clone(), events.clone());
    failing_source!(attempts, usize::MAX).retry(2).subscribe_all(
      move |v| c_next.lock().push(Event::Next(v)),
      move |e| c_err.lock().push(Event::Error(e)),
      || panic!("must not complete"),
    );
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(
      *events.lock(),
      vec![Event::Next(1), Event::Next(2), Event::Next(3), Event::Error("boom")]
    );
  }

  #[test]
  fn unsubscribe_releases_current_attempt() {
    let subject = Subject::<i32, &'static str>::publish();
    let subscription = subject.clone().retry(1).subscribe_next(|_| {});
    assert_eq!(subject.observer_count(), 1);
    subscription.unsubscribe();
    assert_eq!(subject.observer_count(), 0);
  }
}
