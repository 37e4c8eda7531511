//! Observable traits and the operator extension trait.
//!
//! A stage is any type implementing [`CoreObservable`] for the observer type
//! handed to it. Stages compose by wrapping: each operator holds its source
//! and, on `actual_subscribe`, wraps the incoming observer in its own observer
//! before subscribing the source with it. Nothing runs until the terminal
//! [`Observable::subscribe`].

mod boxed;
mod connectable;
mod create;
mod defer;
mod from_iter;
mod interval;

pub use boxed::*;
pub use connectable::*;
pub use create::*;
pub use defer::*;
pub use from_iter::*;
pub use interval::*;

use crate::{
  instrument::Instrumentation,
  observer::{BoxedObserver, FnMutObserver, Observer, ObserverAll},
  ops::{
    filter::{FilterOp, TryFilterOp},
    instrument::InstrumentOp,
    map::{MapOp, TryMapOp},
    observe_on::ObserveOnOp,
    on_error::OnErrorResumeNextOp,
    ref_count::RefCount,
    retry::RetryOp,
    share::ShareConfig,
    subscribe_on::SubscribeOnOp,
    take::TakeOp,
  },
  scheduler::Scheduler,
  sink::{Sink, SinkSubscription},
  subject::Subject,
  subscription::Subscription,
};
use std::{marker::PhantomData, sync::Arc};

/// The item and error types a stage emits.
pub trait ObservableType {
  type Item;
  type Err;
}

/// The subscribe capability of a stage for one observer type.
pub trait CoreObservable<O>: ObservableType {
  type Unsub: Subscription;

  /// Wire `observer` to this stage and start it. Returns the handle that
  /// releases everything the subscribe call acquired.
  fn actual_subscribe(self, observer: O) -> Self::Unsub;
}

/// The item type of stage `S`.
pub type ItemOf<S> = <S as ObservableType>::Item;
/// The error type of stage `S`.
pub type ErrOf<S> = <S as ObservableType>::Err;

/// The subscription a terminal `subscribe` of `S` with observer `O` returns.
pub type SubscriptionOf<S, O> =
  SinkSubscription<<S as CoreObservable<Sink<O, ItemOf<S>, ErrOf<S>>>>::Unsub>;

/// Operators and terminal subscribe calls, available on every stage.
pub trait Observable: ObservableType + Sized {
  /// Subscribe `observer` to the stream.
  ///
  /// The observer is wrapped in a root [`Sink`], so it never sees an event
  /// after a terminal one or after the returned subscription is released.
  fn subscribe<O>(self, observer: O) -> SubscriptionOf<Self, O>
  where
    O: Observer<ItemOf<Self>, ErrOf<Self>> + Send + 'static,
    ItemOf<Self>: Send + 'static,
    ErrOf<Self>: Send + 'static,
    Self: CoreObservable<Sink<O, ItemOf<Self>, ErrOf<Self>>>,
  {
    let sink = Sink::new(observer);
    let control = sink.control();
    let upstream = self.actual_subscribe(sink);
    SinkSubscription::new(control, upstream)
  }

  /// Subscribe with a closure receiving every value. Errors are ignored.
  fn subscribe_next<F>(self, next: F) -> SubscriptionOf<Self, FnMutObserver<F>>
  where
    F: FnMut(ItemOf<Self>) + Send + 'static,
    ItemOf<Self>: Send + 'static,
    ErrOf<Self>: Send + 'static,
    Self: CoreObservable<Sink<FnMutObserver<F>, ItemOf<Self>, ErrOf<Self>>>,
  {
    self.subscribe(FnMutObserver(next))
  }

  fn subscribe_all<N, E, C>(
    self, next: N, error: E, complete: C,
  ) -> SubscriptionOf<Self, ObserverAll<N, E, C>>
  where
    N: FnMut(ItemOf<Self>) + Send + 'static,
    E: FnOnce(ErrOf<Self>) + Send + 'static,
    C: FnOnce() + Send + 'static,
    ItemOf<Self>: Send + 'static,
    ErrOf<Self>: Send + 'static,
    Self: CoreObservable<Sink<ObserverAll<N, E, C>, ItemOf<Self>, ErrOf<Self>>>,
  {
    self.subscribe(ObserverAll::new(next, error, complete))
  }

  // ==========================================================================
  // Transformation
  // ==========================================================================

  /// Transform every value with `f`.
  ///
  /// Panics in `f` are not caught; use `try_map` when `f` can fail.
  fn map<B, F>(self, f: F) -> MapOp<Self, F, B>
  where
    F: FnMut(ItemOf<Self>) -> B,
  {
    MapOp { source: self, func: f, _p: PhantomData }
  }

  /// Transform every value with a fallible `f`. The first `Err` is forwarded
  /// as the stream error and the stage stops.
  fn try_map<B, F>(self, f: F) -> TryMapOp<Self, F, B>
  where
    F: FnMut(ItemOf<Self>) -> Result<B, ErrOf<Self>>,
  {
    TryMapOp { source: self, func: f, _p: PhantomData }
  }

  /// Forward only the values satisfying `predicate`.
  ///
  /// Panics in `predicate` are not caught; use `try_filter` when it can fail.
  fn filter<F>(self, predicate: F) -> FilterOp<Self, F>
  where
    F: FnMut(&ItemOf<Self>) -> bool,
  {
    FilterOp { source: self, predicate }
  }

  fn try_filter<F>(self, predicate: F) -> TryFilterOp<Self, F>
  where
    F: FnMut(&ItemOf<Self>) -> Result<bool, ErrOf<Self>>,
  {
    TryFilterOp { source: self, predicate }
  }

  /// Emit the first `count` values, then complete.
  fn take(self, count: usize) -> TakeOp<Self> { TakeOp { source: self, count } }

  // ==========================================================================
  // Recovery
  // ==========================================================================

  /// Re-subscribe the source when it errors, at most `count` times.
  fn retry(self, count: usize) -> RetryOp<Self>
  where
    Self: Clone,
  {
    RetryOp { source: self, count }
  }

  /// On error, continue with the observable built by `f` from the error.
  fn on_error_resume_next<F, S2>(self, f: F) -> OnErrorResumeNextOp<Self, F>
  where
    F: FnOnce(ErrOf<Self>) -> S2,
    S2: ObservableType<Item = ItemOf<Self>, Err = ErrOf<Self>>,
  {
    OnErrorResumeNextOp { source: self, func: f }
  }

  // ==========================================================================
  // Diagnostics
  // ==========================================================================

  /// Report subscribe, every event and release of each subscription to
  /// `hook`.
  fn instrument(self, hook: Arc<dyn Instrumentation>) -> InstrumentOp<Self> {
    InstrumentOp { source: self, hook }
  }

  // ==========================================================================
  // Execution context
  // ==========================================================================

  /// Deliver every downstream event through `scheduler`.
  fn observe_on<SD: Scheduler>(self, scheduler: SD) -> ObserveOnOp<Self, SD> {
    ObserveOnOp { source: self, scheduler }
  }

  /// Run the subscribe call of the upstream chain on `scheduler`.
  fn subscribe_on<SD: Scheduler>(self, scheduler: SD) -> SubscribeOnOp<Self, SD> {
    SubscribeOnOp { source: self, scheduler }
  }

  // ==========================================================================
  // Multicasting
  // ==========================================================================

  /// Multicast through `subject`, shared by every connection.
  fn multicast(self, subject: Subject<ItemOf<Self>, ErrOf<Self>>) -> ConnectableObservable<Self>
  where
    ItemOf<Self>: Clone + Send + 'static,
    ErrOf<Self>: Clone + Send + 'static,
  {
    ConnectableObservable::new(self, move || subject.clone(), SubjectLifetime::SharedForever)
  }

  /// Multicast through subjects built by `factory`, kept per `lifetime`.
  fn multicast_with<F>(self, factory: F, lifetime: SubjectLifetime) -> ConnectableObservable<Self>
  where
    F: Fn() -> Subject<ItemOf<Self>, ErrOf<Self>> + Send + Sync + 'static,
    ItemOf<Self>: Clone + Send + 'static,
    ErrOf<Self>: Clone + Send + 'static,
  {
    ConnectableObservable::new(self, factory, lifetime)
  }

  /// Multicast through a publish subject.
  fn publish(self) -> ConnectableObservable<Self>
  where
    ItemOf<Self>: Clone + Send + 'static,
    ErrOf<Self>: Clone + Send + 'static,
  {
    self.multicast(Subject::publish())
  }

  /// Multicast through a subject replaying the last `count` values.
  fn replay(self, count: usize) -> ConnectableObservable<Self>
  where
    ItemOf<Self>: Clone + Send + 'static,
    ErrOf<Self>: Clone + Send + 'static,
  {
    self.multicast(Subject::replay(count))
  }

  /// Share one upstream subscription among all current subscribers.
  /// Same as `share_with(ShareConfig::default())`.
  fn share(self) -> RefCount<Self>
  where
    Self: Clone,
    ItemOf<Self>: Clone + Send + 'static,
    ErrOf<Self>: Clone + Send + 'static,
  {
    self.share_with(ShareConfig::default())
  }

  fn share_with(self, config: ShareConfig) -> RefCount<Self>
  where
    Self: Clone,
    ItemOf<Self>: Clone + Send + 'static,
    ErrOf<Self>: Clone + Send + 'static,
  {
    let replay = config.replay_size();
    self
      .multicast_with(move || Subject::with_replay(replay), config.subject_lifetime())
      .ref_count()
  }

  // ==========================================================================
  // Type erasure
  // ==========================================================================

  /// Erase the stage type.
  fn box_it(self) -> BoxedObservable<ItemOf<Self>, ErrOf<Self>>
  where
    Self: CoreObservable<BoxedObserver<ItemOf<Self>, ErrOf<Self>>> + Clone + Send + Sync + 'static,
    <Self as CoreObservable<BoxedObserver<ItemOf<Self>, ErrOf<Self>>>>::Unsub: Send + 'static,
    ItemOf<Self>: 'static,
    ErrOf<Self>: 'static,
  {
    BoxedObservable::new(self)
  }
}

impl<T: ObservableType> Observable for T {}
