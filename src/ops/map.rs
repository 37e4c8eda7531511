use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
};
use std::marker::PhantomData;

/// Creates a new stream which calls a closure on each element and uses
/// its return as the value.
///
/// A panic in the closure is not caught: it unwinds through whoever emitted
/// the value. Use [`TryMapOp`] for transforms that can fail.
pub struct MapOp<S, F, B> {
  pub(crate) source: S,
  pub(crate) func: F,
  pub(crate) _p: PhantomData<fn() -> B>,
}

impl<S: Clone, F: Clone, B> Clone for MapOp<S, F, B> {
  fn clone(&self) -> Self {
    MapOp { source: self.source.clone(), func: self.func.clone(), _p: PhantomData }
  }
}

impl<S: ObservableType, F, B> ObservableType for MapOp<S, F, B> {
  type Item = B;
  type Err = S::Err;
}

impl<S, F, B, O> CoreObservable<O> for MapOp<S, F, B>
where
  S: CoreObservable<MapObserver<O, F>>,
  F: FnMut(S::Item) -> B,
  O: Observer<B, S::Err>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self
      .source
      .actual_subscribe(MapObserver { observer, func: self.func })
  }
}

pub struct MapObserver<O, F> {
  observer: O,
  func: F,
}

impl<Item, Err, B, O, F> Observer<Item, Err> for MapObserver<O, F>
where
  O: Observer<B, Err>,
  F: FnMut(Item) -> B,
{
  #[inline]
  fn next(&mut self, value: Item) { self.observer.next((self.func)(value)) }

  #[inline]
  fn error(self, err: Err) { self.observer.error(err) }

  #[inline]
  fn complete(self) { self.observer.complete() }

  #[inline]
  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

/// Like [`MapOp`], but the closure may fail. The first `Err` it returns is
/// forwarded downstream as the stream's error and the stage stops: every
/// later upstream event is ignored.
pub struct TryMapOp<S, F, B> {
  pub(crate) source: S,
  pub(crate) func: F,
  pub(crate) _p: PhantomData<fn() -> B>,
}

impl<S: Clone, F: Clone, B> Clone for TryMapOp<S, F, B> {
  fn clone(&self) -> Self {
    TryMapOp { source: self.source.clone(), func: self.func.clone(), _p: PhantomData }
  }
}

impl<S: ObservableType, F, B> ObservableType for TryMapOp<S, F, B> {
  type Item = B;
  type Err = S::Err;
}

impl<S, F, B, O> CoreObservable<O> for TryMapOp<S, F, B>
where
  S: CoreObservable<TryMapObserver<O, F>>,
  F: FnMut(S::Item) -> Result<B, S::Err>,
  O: Observer<B, S::Err>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self
      .source
      .actual_subscribe(TryMapObserver { observer: Some(observer), func: self.func })
  }
}

pub struct TryMapObserver<O, F> {
  observer: Option<O>,
  func: F,
}

impl<Item, Err, B, O, F> Observer<Item, Err> for TryMapObserver<O, F>
where
  O: Observer<B, Err>,
  F: FnMut(Item) -> Result<B, Err>,
{
  fn next(&mut self, value: Item) {
    if self.observer.is_none() {
      return;
    }
    match (self.func)(value) {
      Ok(v) => self.observer.next(v),
      Err(err) => self.observer.take().error(err),
    }
  }

  #[inline]
  fn error(self, err: Err) { self.observer.error(err) }

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
  #[should_panic(expected = "bad value")]
  fn panic_in_closure_reaches_the_emitter() {
    let subject = Subject::<i32, ()>::publish();
    subject.clone().map(|v: i32| -> i32 { panic!("bad value {v}") }).subscribe_next(|_| {});
    subject.next(1);
  }

  #[test]
  fn primitive_type() {
    let sum = Arc::new(Mutex::new(0));
    let c_sum = sum.clone();
    from_iter::<_, ()>(100..101)
      .map(|v| v * 2)
      .subscribe_next(move |v| *c_sum.lock() += v);
    assert_eq!(*sum.lock(), 200);
  }

  #[test]
  fn map_types_mixed() {
    let out = Arc::new(Mutex::new(vec![]));
    let c_out = out.clone();
    from_iter::<_, ()>(vec!['a', 'b', 'c'])
      .map(|_| 1)
      .map(|v| format!("#{v}"))
      .subscribe_next(move |v| c_out.lock().push(v));
    assert_eq!(*out.lock(), vec!["#1", "#1", "#1"]);
  }

  #[test]
  fn try_map_stops_at_first_failure() {
    let events = Arc::new(Mutex::new(vec![]));
    let c_events = events.clone();
    let e_events = events.clone();
    from_iter(1..10)
      .try_map(|v| if v == 3 { Err("three") } else { Ok(v * 10) })
      .subscribe_all(
        move |v| c_events.lock().push(Event::Next(v)),
        move |e| e_events.lock().push(Event::Error(e)),
        || panic!("must not complete"),
      );
    assert_eq!(
      *events.lock(),
      vec![Event::Next(10), Event::Next(20), Event::Error("three")]
    );
  }

  #[test]
  fn fork_and_shared() {
    let m = of::<_, ()>(0).map(|v| v + 1);
    let hits = Arc::new(Mutex::new(vec![]));
    let c_hits = hits.clone();
    m.clone().subscribe_next(move |v| c_hits.lock().push(v));
    let c_hits = hits.clone();
    m.subscribe_next(move |v| c_hits.lock().push(v));
    assert_eq!(*hits.lock(), vec![1, 1]);
  }
}
