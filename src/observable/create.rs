use crate::{
  observable::{CoreObservable, ObservableType},
  observer::{BoxedObserver, Observer},
  sink::Subscriber,
  subscription::Subscription,
};
use std::marker::PhantomData;

/// Observable created from a producer function.
///
/// On every subscribe the producer is called with a fresh [`Subscriber`] and
/// returns the teardown of whatever it started. The subscriber is `Clone +
/// Send`, so the producer may hand it to other threads or timers.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let source = create(|subscriber: Subscriber<i32, ()>| {
///   subscriber.next(1);
///   subscriber.next(2);
///   subscriber.complete();
/// });
/// source.subscribe_next(|v| println!("{v}"));
/// ```
pub fn create<F, U, Item, Err>(producer: F) -> Create<F, Item, Err>
where
  F: FnOnce(Subscriber<Item, Err>) -> U,
  U: Subscription + Send + 'static,
{
  Create { producer, _p: PhantomData }
}

pub struct Create<F, Item, Err> {
  producer: F,
  _p: PhantomData<fn() -> (Item, Err)>,
}

impl<F: Clone, Item, Err> Clone for Create<F, Item, Err> {
  fn clone(&self) -> Self { Create { producer: self.producer.clone(), _p: PhantomData } }
}

impl<F, Item, Err> ObservableType for Create<F, Item, Err> {
  type Item = Item;
  type Err = Err;
}

impl<F, U, Item, Err, O> CoreObservable<O> for Create<F, Item, Err>
where
  F: FnOnce(Subscriber<Item, Err>) -> U,
  U: Subscription + Send + 'static,
  O: Observer<Item, Err> + Send + 'static,
  Item: 'static,
  Err: 'static,
{
  type Unsub = Subscriber<Item, Err>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let observer: BoxedObserver<Item, Err> = Box::new(observer);
    let subscriber = Subscriber::new(observer);
    let teardown = (self.producer)(subscriber.clone());
    subscriber.set_teardown(teardown);
    subscriber
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;
  use parking_lot::Mutex;
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  #[test]
  fn producer_emits_in_order() {
    let events = Arc::new(Mutex::new(vec![]));
    let (c_next, c_err, c_comp) = (events.clone(), events.clone(), events.clone());
    create(|s: Subscriber<i32, &str>| {
      s.next(1);
      s.next(2);
      s.complete();
      s.next(3);
      s.error("late");
    })
    .subscribe_all(
      move |v| c_next.lock().push(Event::Next(v)),
      move |e| c_err.lock().push(Event::Error(e)),
      move || c_comp.lock().push(Event::Completed),
    );
    assert_eq!(*events.lock(), vec![Event::Next(1), Event::Next(2), Event::Completed]);
  }

  #[test]
  fn teardown_runs_once_on_unsubscribe() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    let subscription = create(move |_: Subscriber<i32, ()>| {
      ClosureSubscription::new(move || {
        c_hits.fetch_add(1, Ordering::SeqCst);
      })
    })
    .subscribe_next(|_| {});

    subscription.clone().unsubscribe();
    subscription.clone().unsubscribe();
    assert!(subscription.is_closed());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn teardown_runs_when_producer_completes() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    create(move |s: Subscriber<i32, ()>| {
      s.complete();
      ClosureSubscription::new(move || {
        c_hits.fetch_add(1, Ordering::SeqCst);
      })
    })
    .subscribe_next(|_| {});
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn emissions_after_unsubscribe_are_dropped() {
    let slot: Arc<Mutex<Option<Subscriber<i32, ()>>>> = Arc::new(Mutex::new(None));
    let c_slot = slot.clone();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let subscription = create(move |s: Subscriber<i32, ()>| {
      *c_slot.lock() = Some(s);
    })
    .subscribe_next(move |v| c_seen.lock().push(v));

    let subscriber = slot.lock().clone();
    let subscriber = subscriber.unwrap();
    subscriber.next(1);
    subscription.unsubscribe();
    subscriber.next(2);
    assert!(subscriber.is_closed());
    assert_eq!(*seen.lock(), vec![1]);
  }
}
