use crate::subscription::Subscription;
use futures::future::AbortHandle;
use parking_lot::Mutex;
use std::{
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  time::Duration,
};

/// A unit of work run once.
pub type Task = Box<dyn FnOnce() + Send>;

/// A unit of work run on every tick of a periodic schedule. Receives the
/// zero-based tick index and returns `false` to stop repeating.
pub type RepeatTask = Box<dyn FnMut(usize) -> bool + Send>;

struct HandleState {
  cancelled: AtomicBool,
  finished: AtomicBool,
  abort: Mutex<Option<AbortHandle>>,
}

/// Handle of a scheduled task.
///
/// Unsubscribing cancels the task if it has not started yet and stops a
/// periodic task before its next tick. Every clone observes the same state.
#[derive(Clone)]
pub struct TaskHandle(Arc<HandleState>);

impl Default for TaskHandle {
  fn default() -> Self { Self::new() }
}

impl TaskHandle {
  pub fn new() -> Self {
    TaskHandle(Arc::new(HandleState {
      cancelled: AtomicBool::new(false),
      finished: AtomicBool::new(false),
      abort: Mutex::new(None),
    }))
  }

  /// A handle for work that already ran.
  pub fn finished() -> Self {
    let handle = Self::new();
    handle.mark_finished();
    handle
  }

  pub fn is_cancelled(&self) -> bool { self.0.cancelled.load(Ordering::Acquire) }

  pub fn is_finished(&self) -> bool { self.0.finished.load(Ordering::Acquire) }

  pub(crate) fn mark_finished(&self) {
    self.0.finished.store(true, Ordering::Release);
    self.0.abort.lock().take();
  }

  /// Ties a spawned future to this handle. Aborts it right away if the handle
  /// was cancelled in the meantime.
  pub(crate) fn set_abort(&self, abort: AbortHandle) {
    let mut slot = self.0.abort.lock();
    if self.is_cancelled() {
      drop(slot);
      abort.abort();
    } else if !self.is_finished() {
      *slot = Some(abort);
    }
  }

  /// Run `task` unless the handle was cancelled, then mark it finished.
  pub(crate) fn run(&self, task: Task) {
    if !self.is_closed() {
      task();
    }
    self.mark_finished();
  }
}

impl Subscription for TaskHandle {
  fn unsubscribe(self) {
    self.0.cancelled.store(true, Ordering::Release);
    let abort = self.0.abort.lock().take();
    if let Some(abort) = abort {
      abort.abort();
    }
  }

  fn is_closed(&self) -> bool { self.is_cancelled() || self.is_finished() }
}

impl std::fmt::Debug for TaskHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TaskHandle")
      .field("cancelled", &self.is_cancelled())
      .field("finished", &self.is_finished())
      .finish()
  }
}

/// Work kept in a scheduler queue.
pub(crate) enum Job {
  Once(Task),
  Repeat { task: RepeatTask, period: Duration, tick: usize },
}

impl Job {
  /// Run the job once. Returns the job again, with the delay before its next
  /// run, if it repeats.
  pub(crate) fn run(self, handle: &TaskHandle) -> Option<(Job, Duration)> {
    if handle.is_closed() {
      return None;
    }
    match self {
      Job::Once(task) => {
        handle.run(task);
        None
      }
      Job::Repeat { mut task, period, tick } => {
        if task(tick) && !handle.is_closed() {
          Some((Job::Repeat { task, period, tick: tick + 1 }, period))
        } else {
          handle.mark_finished();
          None
        }
      }
    }
  }
}
