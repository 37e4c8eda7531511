use crate::{
  instrument::Instrumentation,
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  subscription::Subscription,
};
use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

#[derive(Clone)]
pub struct InstrumentOp<S> {
  pub(crate) source: S,
  pub(crate) hook: Arc<dyn Instrumentation>,
}

impl<S: ObservableType> ObservableType for InstrumentOp<S> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, O> CoreObservable<O> for InstrumentOp<S>
where
  S: CoreObservable<InstrumentObserver<O>>,
  O: Observer<S::Item, S::Err>,
{
  type Unsub = InstrumentSubscription<S::Unsub>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.hook.on_subscribe();
    let released = Release { hook: self.hook, done: Arc::new(AtomicBool::new(false)) };
    let upstream = self
      .source
      .actual_subscribe(InstrumentObserver { observer, release: released.clone() });
    InstrumentSubscription { upstream, release: released }
  }
}

/// Reports the release of one subscription, once.
#[derive(Clone)]
struct Release {
  hook: Arc<dyn Instrumentation>,
  done: Arc<AtomicBool>,
}

impl Release {
  fn fire(&self) {
    if !self.done.swap(true, Ordering::AcqRel) {
      self.hook.on_release();
    }
  }
}

pub struct InstrumentObserver<O> {
  observer: O,
  release: Release,
}

impl<Item, Err, O> Observer<Item, Err> for InstrumentObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    self.release.hook.on_next();
    self.observer.next(value);
    if self.observer.is_closed() {
      self.release.fire();
    }
  }

  fn error(self, err: Err) {
    self.release.hook.on_error();
    self.observer.error(err);
    self.release.fire();
  }

  fn complete(self) {
    self.release.hook.on_complete();
    self.observer.complete();
    self.release.fire();
  }

  #[inline]
  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

pub struct InstrumentSubscription<U> {
  upstream: U,
  release: Release,
}

impl<U: Clone> Clone for InstrumentSubscription<U> {
  fn clone(&self) -> Self { Self { upstream: self.upstream.clone(), release: self.release.clone() } }
}

impl<U: Subscription> Subscription for InstrumentSubscription<U> {
  fn unsubscribe(self) {
    self.upstream.unsubscribe();
    self.release.fire();
  }

  fn is_closed(&self) -> bool { self.release.done.load(Ordering::Acquire) || self.upstream.is_closed() }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;
  use parking_lot::Mutex;
  use std::sync::Arc;

  #[derive(Default)]
  struct Log(Mutex<Vec<&'static str>>);

  impl Instrumentation for Log {
    fn on_subscribe(&self) { self.0.lock().push("subscribe"); }
    fn on_next(&self) { self.0.lock().push("next"); }
    fn on_error(&self) { self.0.lock().push("error"); }
    fn on_complete(&self) { self.0.lock().push("complete"); }
    fn on_release(&self) { self.0.lock().push("release"); }
  }

  #[test]
  fn reports_full_life_cycle() {
    let log = Arc::new(Log::default());
    let subscription = from_iter::<_, ()>(0..2)
      .instrument(log.clone())
      .subscribe_next(|_| {});
    subscription.unsubscribe();
    assert_eq!(
      *log.0.lock(),
      vec!["subscribe", "next", "next", "complete", "release"]
    );
  }

  #[test]
  fn counter_sees_every_subscription_released() {
    let counter = Arc::new(ResourceCounter::default());
    let subject = Subject::<i32, &'static str>::publish();
    let source = subject.clone().instrument(counter.clone());
    let a = source.clone().subscribe_next(|_| {});
    let _b = source.clone().subscribe_next(|_| {});
    assert_eq!(counter.live(), 2);

    a.clone().unsubscribe();
    a.unsubscribe();
    assert_eq!(counter.live(), 1);

    subject.error("done");
    assert_eq!(counter.live(), 0);
    assert_eq!(counter.total(), 2);
  }

  #[test]
  fn released_when_downstream_stops_itself() {
    let counter = Arc::new(ResourceCounter::default());
    let subject = Subject::<i32, ()>::publish();
    subject.clone().instrument(counter.clone()).take(1).subscribe_next(|_| {});
    assert_eq!(counter.live(), 1);

    subject.next(1);
    subject.next(2);
    assert_eq!(counter.live(), 0);
    assert_eq!(counter.total(), 1);
  }
}
