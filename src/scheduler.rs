//! Schedulers decide where and when a unit of work runs.
//!
//! The engine treats a scheduler as an opaque capability: it hands over boxed
//! tasks and gets back a [`TaskHandle`] that cancels work not yet run. Nothing
//! in the core blocks waiting on another context; every hand-off between
//! contexts goes through one of the three scheduling primitives.

mod event_loop;
mod immediate;
mod task;
mod test_scheduler;
#[cfg(all(feature = "futures-scheduler", not(target_arch = "wasm32")))]
mod thread_pool;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;

pub use event_loop::*;
pub use immediate::*;
pub use task::{RepeatTask, Task, TaskHandle};
pub(crate) use task::Job;
pub use test_scheduler::*;
#[cfg(all(feature = "futures-scheduler", not(target_arch = "wasm32")))]
pub use thread_pool::*;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::*;

pub use std::time::Duration;

/// An execution context.
///
/// Implementations are cheap handles: cloning a scheduler yields another
/// handle to the same context.
pub trait Scheduler: Clone + Send + Sync + 'static {
  /// Run `task` as soon as the context allows.
  fn schedule(&self, task: Task) -> TaskHandle { self.schedule_after(Duration::ZERO, task) }

  /// Run `task` once `delay` has elapsed.
  fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle;

  /// Run `task` after `initial`, then every `period`, until it returns `false`
  /// or the handle is cancelled.
  fn schedule_periodic(&self, initial: Duration, period: Duration, task: RepeatTask)
  -> TaskHandle;

  /// `true` if the calling code already runs inside this context.
  fn is_current(&self) -> bool;
}
