//! Type-erased observables.
//!
//! A chain of operators has a deeply nested concrete type. [`BoxedObservable`]
//! erases it behind a trait object so chains of different shapes can be
//! stored in one field, returned from one function, or kept in a collection.

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::{BoxedObserver, Observer},
  subscription::BoxedSubscription,
};
use std::sync::Arc;

type SubscribeFn<Item, Err> = dyn Fn(BoxedObserver<Item, Err>) -> BoxedSubscription + Send + Sync;

/// An observable of `Item`s whose concrete stage type is erased.
///
/// Cloning shares the erased stage: each subscribe call subscribes a clone
/// of it, so a cold source restarts per subscription as usual.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let sources: Vec<BoxedObservable<i32, ()>> =
///   vec![of(1).box_it(), from_iter(2..4).map(|v| v * 10).box_it()];
/// for source in sources {
///   source.subscribe_next(|v| println!("{v}"));
/// }
/// ```
pub struct BoxedObservable<Item, Err>(Arc<SubscribeFn<Item, Err>>);

impl<Item, Err> Clone for BoxedObservable<Item, Err> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Item: 'static, Err: 'static> BoxedObservable<Item, Err> {
  pub fn new<S>(source: S) -> Self
  where
    S: CoreObservable<BoxedObserver<Item, Err>, Item = Item, Err = Err> + Clone + Send + Sync + 'static,
    S::Unsub: Send + 'static,
  {
    BoxedObservable(Arc::new(move |observer| {
      BoxedSubscription::new(source.clone().actual_subscribe(observer))
    }))
  }
}

impl<Item, Err> ObservableType for BoxedObservable<Item, Err> {
  type Item = Item;
  type Err = Err;
}

impl<Item, Err, O> CoreObservable<O> for BoxedObservable<Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: 'static,
  Err: 'static,
{
  type Unsub = BoxedSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub { (self.0)(Box::new(observer)) }
}
