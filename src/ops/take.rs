use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
};

/// Emits only the first `count` values emitted by the source observable.
///
/// If the source emits fewer than `count` values then all of its values are
/// emitted. After that, it completes, regardless if the source completes.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let out = std::sync::Arc::new(parking_lot::Mutex::new(vec![]));
/// let c_out = out.clone();
/// from_iter::<_, ()>(0..10).take(5).subscribe_next(move |v| c_out.lock().push(v));
/// assert_eq!(*out.lock(), vec![0, 1, 2, 3, 4]);
/// ```
#[derive(Clone)]
pub struct TakeOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

impl<S: ObservableType> ObservableType for TakeOp<S> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, O> CoreObservable<O> for TakeOp<S>
where
  S: CoreObservable<TakeObserver<O>>,
  O: Observer<S::Item, S::Err>,
{
  type Unsub = Option<S::Unsub>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    if self.count == 0 {
      observer.complete();
      return None;
    }
    let observer = TakeObserver { observer: Some(observer), remaining: self.count };
    Some(self.source.actual_subscribe(observer))
  }
}

pub struct TakeObserver<O> {
  observer: Option<O>,
  remaining: usize,
}

impl<Item, Err, O> Observer<Item, Err> for TakeObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.remaining == 0 {
      return;
    }
    self.remaining -= 1;
    self.observer.next(value);
    if self.remaining == 0 {
      self.observer.take().complete();
    }
  }

  #[inline]
  fn error(self, err: Err) { self.observer.error(err) }

  #[inline]
  fn complete(self) { self.observer.complete() }

  #[inline]
  fn is_closed(&self) -> bool { self.observer.is_closed() }
}
