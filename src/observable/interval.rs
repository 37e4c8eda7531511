use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  scheduler::{Duration, Scheduler, TaskHandle},
};
use std::convert::Infallible;

/// Creates an observable which will fire at `period` time into the future,
/// and will repeat every `period` interval after. Emits the tick index,
/// starting from 0, and never completes on its own.
pub fn interval<SD>(period: Duration, scheduler: SD) -> Interval<SD> {
  Interval { initial: period, period, scheduler }
}

/// Like [`interval`], but the first tick fires after `initial`.
pub fn interval_with_delay<SD>(initial: Duration, period: Duration, scheduler: SD) -> Interval<SD> {
  Interval { initial, period, scheduler }
}

#[derive(Clone)]
pub struct Interval<SD> {
  initial: Duration,
  period: Duration,
  scheduler: SD,
}

impl<SD> ObservableType for Interval<SD> {
  type Item = usize;
  type Err = Infallible;
}

impl<SD, O> CoreObservable<O> for Interval<SD>
where
  SD: Scheduler,
  O: Observer<usize, Infallible> + Send + 'static,
{
  type Unsub = TaskHandle;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    self.scheduler.schedule_periodic(
      self.initial,
      self.period,
      Box::new(move |tick| {
        if observer.is_closed() {
          return false;
        }
        observer.next(tick);
        !observer.is_closed()
      }),
    )
  }
}

/// Creates an observable which emits `0` once `delay` has elapsed, then
/// completes.
pub fn timer<SD>(delay: Duration, scheduler: SD) -> Timer<SD> { Timer { delay, scheduler } }

#[derive(Clone)]
pub struct Timer<SD> {
  delay: Duration,
  scheduler: SD,
}

impl<SD> ObservableType for Timer<SD> {
  type Item = usize;
  type Err = Infallible;
}

impl<SD, O> CoreObservable<O> for Timer<SD>
where
  SD: Scheduler,
  O: Observer<usize, Infallible> + Send + 'static,
{
  type Unsub = TaskHandle;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    self.scheduler.schedule_after(
      self.delay,
      Box::new(move || {
        if observer.is_closed() {
          return;
        }
        observer.next(0);
        observer.complete();
      }),
    )
  }
}
