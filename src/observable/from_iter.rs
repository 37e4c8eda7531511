use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
};
use std::marker::PhantomData;

/// Creates an observable that produces values from an iterator.
///
/// Completes when all elements have been emitted. Never emits an error.
/// Emission stops early once the downstream closes.
///
/// # Examples
///
/// ```
/// use rxcore::prelude::*;
///
/// from_iter::<_, ()>(vec![0, 1, 2, 3]).subscribe_next(|v| println!("{},", v));
///
/// // print log:
/// // 0
/// // 1
/// // 2
/// // 3
/// ```
pub fn from_iter<Iter, Err>(iter: Iter) -> FromIter<Iter, Err>
where
  Iter: IntoIterator,
{
  FromIter { iter, _p: PhantomData }
}

/// Emits a single value, then completes.
pub fn of<Item, Err>(value: Item) -> FromIter<std::iter::Once<Item>, Err> {
  from_iter(std::iter::once(value))
}

/// Completes immediately without emitting.
pub fn empty<Item, Err>() -> FromIter<std::iter::Empty<Item>, Err> {
  from_iter(std::iter::empty())
}

pub struct FromIter<Iter, Err> {
  iter: Iter,
  _p: PhantomData<fn() -> Err>,
}

impl<Iter: Clone, Err> Clone for FromIter<Iter, Err> {
  fn clone(&self) -> Self { FromIter { iter: self.iter.clone(), _p: PhantomData } }
}

impl<Iter: IntoIterator, Err> ObservableType for FromIter<Iter, Err> {
  type Item = Iter::Item;
  type Err = Err;
}

impl<Iter, Err, O> CoreObservable<O> for FromIter<Iter, Err>
where
  Iter: IntoIterator,
  O: Observer<Iter::Item, Err>,
{
  type Unsub = ();

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    for v in self.iter {
      if observer.is_closed() {
        return;
      }
      observer.next(v);
    }
    if !observer.is_closed() {
      observer.complete();
    }
  }
}

/// Emits `err` immediately.
pub fn throw<Item, Err>(err: Err) -> Throw<Item, Err> { Throw { err, _p: PhantomData } }

pub struct Throw<Item, Err> {
  err: Err,
  _p: PhantomData<fn() -> Item>,
}

impl<Item, Err: Clone> Clone for Throw<Item, Err> {
  fn clone(&self) -> Self { Throw { err: self.err.clone(), _p: PhantomData } }
}

impl<Item, Err> ObservableType for Throw<Item, Err> {
  type Item = Item;
  type Err = Err;
}

impl<Item, Err, O> CoreObservable<O> for Throw<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = ();

  fn actual_subscribe(self, observer: O) -> Self::Unsub { observer.error(self.err) }
}

/// Never emits and never terminates.
pub fn never<Item, Err>() -> Never<Item, Err> { Never(PhantomData) }

pub struct Never<Item, Err>(PhantomData<fn() -> (Item, Err)>);

impl<Item, Err> Clone for Never<Item, Err> {
  fn clone(&self) -> Self { Never(PhantomData) }
}

impl<Item, Err> ObservableType for Never<Item, Err> {
  type Item = Item;
  type Err = Err;
}

impl<Item, Err, O> CoreObservable<O> for Never<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = ();

  fn actual_subscribe(self, _observer: O) -> Self::Unsub {}
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;
  use parking_lot::Mutex;
  use std::sync::Arc;

  type Log = Arc<Mutex<Vec<Event<i32, &'static str>>>>;

  struct Recorder(Log);

  impl Observer<i32, &'static str> for Recorder {
    fn next(&mut self, value: i32) { self.0.lock().push(Event::Next(value)); }
    fn error(self, err: &'static str) { self.0.lock().push(Event::Error(err)); }
    fn complete(self) { self.0.lock().push(Event::Completed); }
    fn is_closed(&self) -> bool { false }
  }

  fn collect<S>(source: S) -> Vec<Event<i32, &'static str>>
  where
    S: Observable<Item = i32, Err = &'static str>
      + CoreObservable<Sink<Recorder, i32, &'static str>>,
  {
    let log: Log = Arc::new(Mutex::new(vec![]));
    source.subscribe(Recorder(log.clone()));
    let events = log.lock().clone();
    events
  }

  #[test]
  fn from_range() {
    let events = collect(from_iter(0..3));
    assert_eq!(
      events,
      vec![Event::Next(0), Event::Next(1), Event::Next(2), Event::Completed]
    );
  }

  #[test]
  fn of_empty_throw() {
    assert_eq!(collect(of(7)), vec![Event::Next(7), Event::Completed]);
    assert_eq!(collect(empty()), vec![Event::Completed]);
    assert_eq!(collect(throw("boom")), vec![Event::Error("boom")]);
  }

  #[test]
  fn cold_source_restarts_per_subscription() {
    let source = from_iter(vec![1, 2]);
    assert_eq!(collect(source.clone()), collect(source));
  }

  #[test]
  fn stops_when_downstream_closes() {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    from_iter::<_, ()>(0..)
      .take(3)
      .subscribe_next(move |v| c_seen.lock().push(v));
    assert_eq!(*seen.lock(), vec![0, 1, 2]);
  }

  #[test]
  fn never_stays_open() {
    let subscription = never::<i32, ()>().subscribe_next(|_| panic!("never emits"));
    assert!(!subscription.is_closed());
    subscription.clone().unsubscribe();
    assert!(subscription.is_closed());
  }
}
