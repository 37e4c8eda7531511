use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  subscription::{SerialSubscription, Subscription},
};
use tracing::debug;

/// On error, continue with the observable `func` builds from the error.
///
/// Values of the source are forwarded until it errors. The error itself is
/// swallowed and the downstream observer is handed to the fallback, whose
/// events, including its own terminal event, it receives from then on.
#[derive(Clone)]
pub struct OnErrorResumeNextOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: F,
}

impl<S: ObservableType, F> ObservableType for OnErrorResumeNextOp<S, F> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, F, S2, O> CoreObservable<O> for OnErrorResumeNextOp<S, F>
where
  S: CoreObservable<ResumeObserver<O, F>>,
  S::Unsub: Send + 'static,
  F: FnOnce(S::Err) -> S2,
  S2: CoreObservable<O, Item = S::Item, Err = S::Err>,
  S2::Unsub: Send + 'static,
  O: Observer<S::Item, S::Err>,
{
  type Unsub = SerialSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let serial = SerialSubscription::new();
    let epoch = serial.reserve();
    let resume = ResumeObserver { observer, func: self.func, serial: serial.clone() };
    let upstream = self.source.actual_subscribe(resume);
    serial.set_reserved(epoch, upstream);
    serial
  }
}

pub struct ResumeObserver<O, F> {
  observer: O,
  func: F,
  serial: SerialSubscription,
}

impl<Item, Err, O, F, S2> Observer<Item, Err> for ResumeObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnOnce(Err) -> S2,
  S2: CoreObservable<O, Item = Item, Err = Err>,
  S2::Unsub: Send + 'static,
{
  #[inline]
  fn next(&mut self, value: Item) { self.observer.next(value) }

  fn error(self, err: Err) {
    if self.serial.is_closed() {
      return;
    }
    debug!("on_error_resume_next: switching to fallback");
    let ResumeObserver { observer, func, serial } = self;
    let epoch = serial.reserve();
    let fallback = func(err).actual_subscribe(observer);
    serial.set_reserved(epoch, fallback);
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
  use std::sync::Arc;

  #[test]
  fn switches_to_fallback() {
    let events = Arc::new(Mutex::new(vec![]));
    let (c_next, c_err, c_done) = (events.clone(), events.clone(), events.clone());
    create(|s: Subscriber<i32, &'static str>| {
      s.next(1);
      s.next(2);
      s.error("boom");
    })
    .on_error_resume_next(|_| from_iter(vec![10, 20]))
    .subscribe_all(
      move |v| c_next.lock().push(Event::Next(v)),
      move |e| c_err.lock().push(Event::Error(e)),
      move || c_done.lock().push(Event::Completed),
    );
    assert_eq!(
      *events.lock(),
      vec![Event::Next(1), Event::Next(2), Event::Next(10), Event::Next(20), Event::Completed]
    );
  }

  #[test]
  fn fallback_built_from_error() {
    let out = Arc::new(Mutex::new(vec![]));
    let c_out = out.clone();
    throw::<i32, _>(7)
      .on_error_resume_next(|code| of(code * 100))
      .subscribe_next(move |v| c_out.lock().push(v));
    assert_eq!(*out.lock(), vec![700]);
  }

  #[test]
  fn fallback_error_reaches_downstream() {
    let errors = Arc::new(Mutex::new(vec![]));
    let c_errors = errors.clone();
    throw::<i32, _>("first")
      .on_error_resume_next(|_| throw("second"))
      .subscribe_all(|_| {}, move |e| c_errors.lock().push(e), || {});
    assert_eq!(*errors.lock(), vec!["second"]);
  }

  #[test]
  fn unsubscribe_releases_fallback() {
    let fallback = Subject::<i32, ()>::publish();
    let c_fallback = fallback.clone();
    let subscription = throw::<i32, ()>(())
      .on_error_resume_next(move |_| c_fallback)
      .subscribe_next(|_| {});
    assert_eq!(fallback.observer_count(), 1);
    subscription.unsubscribe();
    assert_eq!(fallback.observer_count(), 0);
  }
}
