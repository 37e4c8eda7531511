use super::{Job, RepeatTask, Scheduler, Task, TaskHandle};
use crate::error::RxError;
use parking_lot::{Condvar, Mutex};
use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  sync::{
    atomic::{AtomicUsize, Ordering as AtomicOrdering},
    Arc,
  },
  thread::{self, ThreadId},
  time::{Duration, Instant},
};
use tracing::{debug, trace};

static NEXT_LOOP_ID: AtomicUsize = AtomicUsize::new(0);

struct Entry {
  due: Instant,
  seq: usize,
  job: Job,
  handle: TaskHandle,
}

impl PartialEq for Entry {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Entry {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier due time first, then FIFO by sequence.
    other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
  }
}

#[derive(Default)]
struct LoopState {
  queue: BinaryHeap<Entry>,
  seq: usize,
  shutdown: bool,
}

struct LoopShared {
  state: Mutex<LoopState>,
  wakeup: Condvar,
}

impl LoopShared {
  fn push(&self, due: Instant, job: Job, handle: TaskHandle) {
    let mut state = self.state.lock();
    let seq = state.seq;
    state.seq += 1;
    state.queue.push(Entry { due, seq, job, handle });
    drop(state);
    self.wakeup.notify_one();
  }

  fn run(&self, name: &str) {
    debug!(name, "event loop started");
    let mut state = self.state.lock();
    loop {
      if state.shutdown && state.queue.is_empty() {
        break;
      }
      let now = Instant::now();
      let due = match state.queue.peek() {
        None => {
          self.wakeup.wait(&mut state);
          continue;
        }
        Some(entry) => entry.due,
      };
      if due > now {
        self.wakeup.wait_until(&mut state, due);
        continue;
      }
      let Some(Entry { job, handle, .. }) = state.queue.pop() else {
        continue;
      };
      let again = parking_lot::MutexGuard::unlocked(&mut state, || job.run(&handle));
      if let Some((job, delay)) = again {
        let seq = state.seq;
        state.seq += 1;
        state.queue.push(Entry { due: due + delay, seq, job, handle });
      }
    }
    debug!(name, "event loop stopped");
  }
}

/// Lets the loop thread stop once the last scheduler handle is dropped and
/// its queue ran empty.
struct LoopOwner {
  shared: Arc<LoopShared>,
  thread: ThreadId,
  name: String,
}

impl Drop for LoopOwner {
  fn drop(&mut self) {
    self.shared.state.lock().shutdown = true;
    self.shared.wakeup.notify_all();
  }
}

/// A serial execution context backed by one dedicated, named thread.
///
/// Tasks run one at a time in due-time order, FIFO among tasks due at the
/// same instant. This is the model of a UI thread or a serial dispatch queue:
/// everything scheduled here observes the same thread identity.
///
/// The thread exits once the last clone of the scheduler is dropped and no
/// task is left in its queue. A periodic task keeps the thread alive until it
/// is cancelled or stops itself.
#[derive(Clone)]
pub struct EventLoopScheduler(Arc<LoopOwner>);

impl EventLoopScheduler {
  pub fn new() -> Result<Self, RxError> {
    let id = NEXT_LOOP_ID.fetch_add(1, AtomicOrdering::Relaxed);
    Self::with_name(format!("rx-event-loop-{id}"))
  }

  /// Spawns the loop thread under `name`.
  pub fn with_name(name: impl Into<String>) -> Result<Self, RxError> {
    let name = name.into();
    let shared = Arc::new(LoopShared { state: Mutex::new(LoopState::default()), wakeup: Condvar::new() });
    let c_shared = shared.clone();
    let c_name = name.clone();
    let join = thread::Builder::new()
      .name(name.clone())
      .spawn(move || c_shared.run(&c_name))
      .map_err(|source| RxError::EventLoopSpawn { name: name.clone(), source })?;
    let thread = join.thread().id();
    Ok(EventLoopScheduler(Arc::new(LoopOwner { shared, thread, name })))
  }

  pub fn name(&self) -> &str { &self.0.name }
}

impl std::fmt::Debug for EventLoopScheduler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("EventLoopScheduler").field(&self.0.name).finish()
  }
}

impl Scheduler for EventLoopScheduler {
  fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    trace!(name = %self.0.name, ?delay, "schedule");
    self.0.shared.push(Instant::now() + delay, Job::Once(task), handle.clone());
    handle
  }

  fn schedule_periodic(&self, initial: Duration, period: Duration, task: RepeatTask) -> TaskHandle {
    let handle = TaskHandle::new();
    trace!(name = %self.0.name, ?initial, ?period, "schedule periodic");
    self
      .0
      .shared
      .push(Instant::now() + initial, Job::Repeat { task, period, tick: 0 }, handle.clone());
    handle
  }

  fn is_current(&self) -> bool { thread::current().id() == self.0.thread }
}
