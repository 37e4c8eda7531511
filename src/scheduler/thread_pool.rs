use super::{Job, RepeatTask, Scheduler, Task, TaskHandle};
use crate::error::RxError;
use futures::{
  executor::ThreadPool,
  future::{abortable, FutureExt},
};
use futures_time::task::sleep;
use once_cell::sync::OnceCell;
use std::{
  cell::Cell,
  future::Future,
  sync::atomic::{AtomicUsize, Ordering},
  time::Duration,
};
use tracing::{debug, trace};

static NEXT_POOL_ID: AtomicUsize = AtomicUsize::new(1);
static SHARED_POOL: OnceCell<ThreadPoolScheduler> = OnceCell::new();

thread_local! {
  /// Id of the pool owning the current thread, 0 outside any pool.
  static CURRENT_POOL: Cell<usize> = const { Cell::new(0) };
}

/// Runs work on a `futures` thread pool.
///
/// Tasks may run on any pool thread and in parallel with each other. Delays
/// are driven by `futures-time` timers, so a delayed task does not occupy a
/// pool thread while it waits.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
  id: usize,
}

impl ThreadPoolScheduler {
  /// A pool sized to the number of CPUs.
  pub fn new() -> Result<Self, RxError> { Self::build(None) }

  pub fn with_pool_size(size: usize) -> Result<Self, RxError> { Self::build(Some(size)) }

  /// The process-wide pool, created on first use.
  pub fn shared() -> Result<Self, RxError> {
    SHARED_POOL.get_or_try_init(ThreadPoolScheduler::new).cloned()
  }

  fn build(size: Option<usize>) -> Result<Self, RxError> {
    let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
    let mut builder = ThreadPool::builder();
    builder
      .name_prefix(format!("rx-pool-{id}-"))
      .after_start(move |_| CURRENT_POOL.with(|c| c.set(id)));
    if let Some(size) = size {
      builder.pool_size(size);
    }
    let pool = builder.create().map_err(RxError::ThreadPool)?;
    debug!(id, ?size, "thread pool scheduler created");
    Ok(ThreadPoolScheduler { pool, id })
  }

  fn spawn(&self, handle: &TaskHandle, fut: impl Future<Output = ()> + Send + 'static) {
    let (fut, abort) = abortable(fut);
    handle.set_abort(abort);
    self.pool.spawn_ok(fut.map(|_| ()));
  }
}

impl Scheduler for ThreadPoolScheduler {
  fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    trace!(pool = self.id, ?delay, "schedule");
    let c_handle = handle.clone();
    self.spawn(&handle, async move {
      if !delay.is_zero() {
        sleep(delay.into()).await;
      }
      c_handle.run(task);
    });
    handle
  }

  fn schedule_periodic(&self, initial: Duration, period: Duration, task: RepeatTask) -> TaskHandle {
    let handle = TaskHandle::new();
    trace!(pool = self.id, ?initial, ?period, "schedule periodic");
    let c_handle = handle.clone();
    self.spawn(&handle, async move {
      sleep(initial.into()).await;
      let mut job = Job::Repeat { task, period, tick: 0 };
      while let Some((next, delay)) = job.run(&c_handle) {
        sleep(delay.into()).await;
        job = next;
      }
    });
    handle
  }

  fn is_current(&self) -> bool { CURRENT_POOL.with(|c| c.get() == self.id) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subscription::Subscription;
  use std::sync::mpsc;

  #[test]
  fn runs_on_pool_thread() {
    let scheduler = ThreadPoolScheduler::with_pool_size(2).unwrap();
    let (tx, rx) = mpsc::channel();
    let c_scheduler = scheduler.clone();
    scheduler.schedule(Box::new(move || tx.send(c_scheduler.is_current()).unwrap()));
    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    assert!(!scheduler.is_current());
  }

  #[test]
  fn cancelled_delay_never_runs() {
    let scheduler = ThreadPoolScheduler::shared().unwrap();
    let (tx, rx) = mpsc::channel::<()>();
    let handle = scheduler.schedule_after(Duration::from_millis(50), Box::new(move || tx.send(()).unwrap()));
    handle.clone().unsubscribe();
    assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
    assert!(handle.is_closed());
  }

  #[test]
  fn periodic_ticks_in_order() {
    let scheduler = ThreadPoolScheduler::shared().unwrap();
    let (tx, rx) = mpsc::channel();
    scheduler.schedule_periodic(
      Duration::from_millis(1),
      Duration::from_millis(1),
      Box::new(move |tick| tx.send(tick).is_ok() && tick < 4),
    );
    let ticks: Vec<_> = (0..5).map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap()).collect();
    assert_eq!(ticks, vec![0, 1, 2, 3, 4]);
  }
}
