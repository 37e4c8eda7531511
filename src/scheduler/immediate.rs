use super::{Job, RepeatTask, Scheduler, Task, TaskHandle};
use std::{cell::RefCell, collections::VecDeque, time::Duration};

thread_local! {
  /// Tasks scheduled while another immediate task runs on this thread.
  static TRAMPOLINE: RefCell<Option<VecDeque<(Task, TaskHandle)>>> = const { RefCell::new(None) };
}

/// Runs work on the calling thread.
///
/// A task scheduled from inside another immediate task is queued and runs
/// after the current one returns, never recursively, so deep chains of
/// re-scheduling do not grow the stack.
///
/// Delays block the calling thread with `std::thread::sleep`. A periodic
/// schedule keeps the calling thread until its task returns `false` or the
/// handle is cancelled from another thread.
#[derive(Clone, Copy, Default, Debug)]
pub struct ImmediateScheduler;

/// Resets the trampoline even if a task panics.
struct TrampolineGuard;

impl Drop for TrampolineGuard {
  fn drop(&mut self) { TRAMPOLINE.with(|t| *t.borrow_mut() = None); }
}

impl Scheduler for ImmediateScheduler {
  fn schedule(&self, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    let owned = TRAMPOLINE.with(|t| {
      let mut t = t.borrow_mut();
      match t.as_mut() {
        Some(queue) => {
          queue.push_back((task, handle.clone()));
          None
        }
        None => {
          *t = Some(VecDeque::new());
          Some(task)
        }
      }
    });

    if let Some(task) = owned {
      let _guard = TrampolineGuard;
      handle.run(task);
      while let Some((task, handle)) =
        TRAMPOLINE.with(|t| t.borrow_mut().as_mut().and_then(VecDeque::pop_front))
      {
        handle.run(task);
      }
    }
    handle
  }

  fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle {
    if !delay.is_zero() {
      std::thread::sleep(delay);
    }
    self.schedule(task)
  }

  fn schedule_periodic(&self, initial: Duration, period: Duration, task: RepeatTask) -> TaskHandle {
    let handle = TaskHandle::new();
    std::thread::sleep(initial);
    let mut job = Job::Repeat { task, period, tick: 0 };
    while let Some((next, delay)) = job.run(&handle) {
      std::thread::sleep(delay);
      job = next;
    }
    handle
  }

  fn is_current(&self) -> bool { true }
}
