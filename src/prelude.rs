//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Core traits
pub use crate::observable::{
  CoreObservable, ErrOf, ItemOf, Observable, ObservableType, SubscriptionOf,
};
// Creation
pub use crate::observable::{
  create, defer, empty, from_iter, interval, interval_with_delay, never, of, throw, timer,
  BoxedObservable, Create, Defer, FromIter, Interval, Never, Throw, Timer,
};
// Multicasting
pub use crate::observable::{ConnectObserver, ConnectableObservable, Connection, SubjectLifetime};
pub use crate::ops::{
  ref_count::{RefCount, RefCountSubscription},
  share::ShareConfig,
};
pub use crate::subject::{Subject, SubjectObserver, SubjectSubscription};
// Observers and events
pub use crate::event::Event;
pub use crate::observer::{BoxedObserver, FnMutObserver, Observer, ObserverAll};
pub use crate::sink::{Sink, SinkSubscription, Subscriber};
// Subscription
pub use crate::subscription::*;
// Schedulers
#[cfg(all(feature = "futures-scheduler", not(target_arch = "wasm32")))]
pub use crate::scheduler::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
pub use crate::scheduler::{
  Duration, EventLoopScheduler, ImmediateScheduler, Recorded, RepeatTask, Scheduler, Task,
  TaskHandle, TestObserver, TestScheduler,
};
// Diagnostics
pub use crate::instrument::{Instrumentation, ResourceCounter, TracingInstrumentation};
// Errors
pub use crate::error::RxError;
