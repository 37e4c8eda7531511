use crate::observable::{CoreObservable, ObservableType};

/// Creates an observable that, on every subscription, calls `factory` to
/// build the observable it actually subscribes to.
///
/// The factory runs in the execution context of the subscribe call, which
/// makes `defer` the natural probe for where `subscribe_on` moved it.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// defer(|| {
///   println!("Hi!");
///   of::<_, ()>("Hello!")
/// })
/// .subscribe_next(move |v| println!("{}", v));
/// // Prints: Hi!\nHello!\n
/// ```
pub fn defer<F, S>(factory: F) -> Defer<F>
where
  F: FnOnce() -> S,
  S: ObservableType,
{
  Defer(factory)
}

#[derive(Clone)]
pub struct Defer<F>(F);

impl<F, S> ObservableType for Defer<F>
where
  F: FnOnce() -> S,
  S: ObservableType,
{
  type Item = S::Item;
  type Err = S::Err;
}

impl<F, S, O> CoreObservable<O> for Defer<F>
where
  F: FnOnce() -> S,
  S: CoreObservable<O>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub { (self.0)().actual_subscribe(observer) }
}
