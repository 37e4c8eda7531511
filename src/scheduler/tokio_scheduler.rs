use super::{Job, RepeatTask, Scheduler, Task, TaskHandle};
use futures::future::{abortable, FutureExt};
use std::{future::Future, time::Duration};
use tokio::runtime::Handle;
use tracing::trace;

/// Runs work on a tokio runtime.
///
/// `is_current` reports whether the caller runs inside any tokio runtime
/// context; tokio gives no stable way to tell two runtimes apart.
#[derive(Clone, Debug)]
pub struct TokioScheduler {
  handle: Handle,
}

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { TokioScheduler { handle } }

  /// The scheduler of the runtime the caller runs in, if any.
  pub fn current() -> Option<Self> { Handle::try_current().ok().map(Self::new) }

  fn spawn(&self, task_handle: &TaskHandle, fut: impl Future<Output = ()> + Send + 'static) {
    let (fut, abort) = abortable(fut);
    task_handle.set_abort(abort);
    self.handle.spawn(fut.map(|_| ()));
  }
}

impl Scheduler for TokioScheduler {
  fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    trace!(?delay, "tokio schedule");
    let c_handle = handle.clone();
    self.spawn(&handle, async move {
      if !delay.is_zero() {
        tokio::time::sleep(delay).await;
      }
      c_handle.run(task);
    });
    handle
  }

  fn schedule_periodic(&self, initial: Duration, period: Duration, task: RepeatTask) -> TaskHandle {
    let handle = TaskHandle::new();
    trace!(?initial, ?period, "tokio schedule periodic");
    let c_handle = handle.clone();
    self.spawn(&handle, async move {
      tokio::time::sleep(initial).await;
      let mut job = Job::Repeat { task, period, tick: 0 };
      while let Some((next, delay)) = job.run(&c_handle) {
        tokio::time::sleep(delay).await;
        job = next;
      }
    });
    handle
  }

  fn is_current(&self) -> bool { Handle::try_current().is_ok() }
}
