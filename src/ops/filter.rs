use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
};

/// Emit only those items from an observable which pass a `predicate`.
///
/// A panicking predicate is not caught. Use [`TryFilterOp`] when the
/// predicate can fail.
#[derive(Clone)]
pub struct FilterOp<S, F> {
  pub(crate) source: S,
  pub(crate) predicate: F,
}

impl<S: ObservableType, F> ObservableType for FilterOp<S, F> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, F, O> CoreObservable<O> for FilterOp<S, F>
where
  S: CoreObservable<FilterObserver<O, F>>,
  F: FnMut(&S::Item) -> bool,
  O: Observer<S::Item, S::Err>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self
      .source
      .actual_subscribe(FilterObserver { observer, predicate: self.predicate })
  }
}

pub struct FilterObserver<O, F> {
  observer: O,
  predicate: F,
}

impl<Item, Err, O, F> Observer<Item, Err> for FilterObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnMut(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if (self.predicate)(&value) {
      self.observer.next(value)
    }
  }

  #[inline]
  fn error(self, err: Err) { self.observer.error(err) }

  #[inline]
  fn complete(self) { self.observer.complete() }

  #[inline]
  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

/// Filter with a fallible predicate. The first `Err` becomes the stream error.
#[derive(Clone)]
pub struct TryFilterOp<S, F> {
  pub(crate) source: S,
  pub(crate) predicate: F,
}

impl<S: ObservableType, F> ObservableType for TryFilterOp<S, F> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, F, O> CoreObservable<O> for TryFilterOp<S, F>
where
  S: CoreObservable<TryFilterObserver<O, F>>,
  F: FnMut(&S::Item) -> Result<bool, S::Err>,
  O: Observer<S::Item, S::Err>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(TryFilterObserver {
      observer: Some(observer),
      predicate: self.predicate,
    })
  }
}

pub struct TryFilterObserver<O, F> {
  observer: Option<O>,
  predicate: F,
}

impl<Item, Err, O, F> Observer<Item, Err> for TryFilterObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnMut(&Item) -> Result<bool, Err>,
{
  fn next(&mut self, value: Item) {
    if self.observer.is_none() {
      return;
    }
    match (self.predicate)(&value) {
      Ok(true) => self.observer.next(value),
      Ok(false) => {}
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
