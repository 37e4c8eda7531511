//! Virtual time scheduler for deterministic tests of time-based streams.
//!
//! Time only advances when told to. Due tasks run synchronously on the thread
//! that advances the clock, in due-time order and FIFO among tasks due at the
//! same instant.
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! let scheduler = TestScheduler::new();
//! let observer = scheduler.create_observer();
//! interval(Duration::from_millis(10), scheduler.clone())
//!   .take(2)
//!   .subscribe(observer.clone());
//!
//! scheduler.advance_by(Duration::from_millis(25));
//! assert_eq!(observer.values(), vec![0, 1]);
//! ```

use super::{Job, RepeatTask, Scheduler, Task, TaskHandle};
use crate::{event::Event, observer::Observer};
use parking_lot::Mutex;
use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc, time::Duration};

struct ScheduledTask {
  time: Duration,
  id: usize,
  job: Job,
  handle: TaskHandle,
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool { self.time == other.time && self.id == other.id }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by id
    other.time.cmp(&self.time).then_with(|| other.id.cmp(&self.id))
  }
}

#[derive(Default)]
struct TestSchedulerState {
  now: Duration,
  queue: BinaryHeap<ScheduledTask>,
  next_id: usize,
}

impl TestSchedulerState {
  fn push(&mut self, time: Duration, job: Job, handle: TaskHandle) {
    let id = self.next_id;
    self.next_id += 1;
    self.queue.push(ScheduledTask { time, id, job, handle });
  }
}

/// A scheduler driven by a virtual clock.
///
/// Clones share the clock and the task queue.
#[derive(Clone, Default)]
pub struct TestScheduler(Arc<Mutex<TestSchedulerState>>);

impl TestScheduler {
  pub fn new() -> Self { Self::default() }

  /// Current virtual time, measured from the creation of the scheduler.
  pub fn now(&self) -> Duration { self.0.lock().now }

  /// Number of tasks waiting in the queue, cancelled ones included.
  pub fn pending_count(&self) -> usize { self.0.lock().queue.len() }

  /// Advance the clock by `duration`, running every task due on the way.
  pub fn advance_by(&self, duration: Duration) {
    let target = self.now() + duration;
    self.advance_to(target);
  }

  /// Advance the clock to `time`, running every task due on the way. Does
  /// nothing if `time` lies in the past.
  pub fn advance_to(&self, time: Duration) {
    self.run_until(Some(time));
    let mut state = self.0.lock();
    if state.now < time {
      state.now = time;
    }
  }

  /// Run tasks until the queue is empty, advancing the clock to each task's
  /// due time. Never returns while a periodic task keeps repeating.
  pub fn flush(&self) { self.run_until(None); }

  fn run_until(&self, limit: Option<Duration>) {
    loop {
      let task = {
        let mut state = self.0.lock();
        let stop = state
          .queue
          .peek()
          .is_none_or(|peek| limit.is_some_and(|limit| peek.time > limit));
        if stop {
          return;
        }
        let Some(task) = state.queue.pop() else {
          return;
        };
        state.now = state.now.max(task.time);
        task
      };

      let ScheduledTask { time, job, handle, .. } = task;
      if let Some((job, delay)) = job.run(&handle) {
        self.0.lock().push(time + delay, job, handle);
      }
    }
  }

  /// An observer that records every event it receives with the virtual time
  /// of delivery.
  pub fn create_observer<Item, Err>(&self) -> TestObserver<Item, Err> {
    TestObserver { scheduler: self.clone(), records: Arc::new(Mutex::new(Vec::new())) }
  }
}

impl Scheduler for TestScheduler {
  fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    let mut state = self.0.lock();
    let time = state.now + delay;
    state.push(time, Job::Once(task), handle.clone());
    handle
  }

  fn schedule_periodic(&self, initial: Duration, period: Duration, task: RepeatTask) -> TaskHandle {
    let handle = TaskHandle::new();
    let mut state = self.0.lock();
    let time = state.now + initial;
    state.push(time, Job::Repeat { task, period, tick: 0 }, handle.clone());
    handle
  }

  /// Virtual time has a single context: the thread advancing the clock.
  fn is_current(&self) -> bool { true }
}

/// One event delivered to a [`TestObserver`], stamped with virtual time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded<Item, Err> {
  pub time: Duration,
  pub event: Event<Item, Err>,
}

/// Observer recording `Recorded` events for inspection. Clones share the
/// record.
pub struct TestObserver<Item, Err> {
  scheduler: TestScheduler,
  records: Arc<Mutex<Vec<Recorded<Item, Err>>>>,
}

impl<Item, Err> Clone for TestObserver<Item, Err> {
  fn clone(&self) -> Self {
    TestObserver { scheduler: self.scheduler.clone(), records: self.records.clone() }
  }
}

impl<Item: Clone, Err: Clone> TestObserver<Item, Err> {
  pub fn events(&self) -> Vec<Recorded<Item, Err>> { self.records.lock().clone() }

  /// The values of every `Next` event, in delivery order.
  pub fn values(&self) -> Vec<Item> {
    self
      .records
      .lock()
      .iter()
      .filter_map(|r| r.event.value().cloned())
      .collect()
  }
}

impl<Item, Err> TestObserver<Item, Err> {
  fn record(&self, event: Event<Item, Err>) {
    let time = self.scheduler.now();
    self.records.lock().push(Recorded { time, event });
  }

  pub fn is_completed(&self) -> bool {
    self
      .records
      .lock()
      .last()
      .is_some_and(|r| matches!(r.event, Event::Completed))
  }
}

impl<Item, Err> Observer<Item, Err> for TestObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.record(Event::Next(value)); }

  fn error(self, err: Err) { self.record(Event::Error(err)); }

  fn complete(self) { self.record(Event::Completed); }

  fn is_closed(&self) -> bool { false }
}
