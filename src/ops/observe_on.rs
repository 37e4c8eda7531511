//! `observe_on`: move downstream delivery onto a scheduler.
//!
//! Every subscription owns a queue. Upstream events are appended to it and a
//! single drain task at a time is scheduled to hand them downstream, so
//! delivery order is the arrival order even on a scheduler that runs tasks
//! in parallel.

use crate::{
  event::Event,
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  scheduler::{Scheduler, TaskHandle},
  subscription::Subscription,
};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};
use tracing::trace;

#[derive(Clone)]
pub struct ObserveOnOp<S, SD> {
  pub(crate) source: S,
  pub(crate) scheduler: SD,
}

impl<S: ObservableType, SD> ObservableType for ObserveOnOp<S, SD> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, SD, O, Item, Err> CoreObservable<O> for ObserveOnOp<S, SD>
where
  S: ObservableType<Item = Item, Err = Err> + CoreObservable<ObserveOnObserver<O, SD, Item, Err>>,
  SD: Scheduler,
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Unsub = (ObserveOnSubscription<O, Item, Err>, S::Unsub);

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let shared = Arc::new(Mutex::new(DrainState {
      observer: Some(observer),
      queue: VecDeque::new(),
      scheduled: false,
      disposed: false,
      pending: None,
    }));
    let upstream = self
      .source
      .actual_subscribe(ObserveOnObserver { shared: shared.clone(), scheduler: self.scheduler });
    (ObserveOnSubscription(shared), upstream)
  }
}

struct DrainState<O, Item, Err> {
  observer: Option<O>,
  queue: VecDeque<Event<Item, Err>>,
  scheduled: bool,
  disposed: bool,
  pending: Option<TaskHandle>,
}

type Shared<O, Item, Err> = Arc<Mutex<DrainState<O, Item, Err>>>;

pub struct ObserveOnObserver<O, SD, Item, Err> {
  shared: Shared<O, Item, Err>,
  scheduler: SD,
}

impl<O, SD, Item, Err> ObserveOnObserver<O, SD, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  SD: Scheduler,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn push(&self, event: Event<Item, Err>) {
    {
      let mut state = self.shared.lock();
      if state.disposed {
        return;
      }
      state.queue.push_back(event);
      if state.scheduled {
        return;
      }
      state.scheduled = true;
    }
    trace!("observe_on: scheduling drain");
    let shared = self.shared.clone();
    let handle = self.scheduler.schedule(Box::new(move || drain(&shared)));
    let mut state = self.shared.lock();
    if state.disposed {
      drop(state);
      handle.unsubscribe();
    } else if !handle.is_finished() {
      state.pending = Some(handle);
    }
  }
}

fn drain<O, Item, Err>(shared: &Shared<O, Item, Err>)
where
  O: Observer<Item, Err>,
{
  loop {
    let (event, mut observer) = {
      let mut state = shared.lock();
      let Some(event) = state.queue.pop_front() else {
        state.scheduled = false;
        state.pending = None;
        return;
      };
      let Some(observer) = state.observer.take() else {
        state.queue.clear();
        state.scheduled = false;
        state.pending = None;
        return;
      };
      (event, observer)
    };
    match event {
      Event::Next(value) => {
        observer.next(value);
        let closed = observer.is_closed();
        let mut state = shared.lock();
        if state.disposed || closed {
          state.disposed = true;
          state.queue.clear();
          drop(state);
          drop(observer);
        } else {
          state.observer = Some(observer);
        }
      }
      Event::Error(err) => observer.error(err),
      Event::Completed => observer.complete(),
    }
  }
}

impl<O, SD, Item, Err> Observer<Item, Err> for ObserveOnObserver<O, SD, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  SD: Scheduler,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) { self.push(Event::Next(value)) }

  fn error(self, err: Err) { self.push(Event::Error(err)) }

  fn complete(self) { self.push(Event::Completed) }

  fn is_closed(&self) -> bool { self.shared.lock().disposed }
}

/// Stops delivery of a running `observe_on` stage: the queued events are
/// dropped and a scheduled drain task is cancelled.
pub struct ObserveOnSubscription<O, Item, Err>(Shared<O, Item, Err>);

impl<O, Item, Err> Clone for ObserveOnSubscription<O, Item, Err> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<O, Item, Err> Subscription for ObserveOnSubscription<O, Item, Err> {
  fn unsubscribe(self) {
    let (observer, queue, pending) = {
      let mut state = self.0.lock();
      if state.disposed {
        return;
      }
      state.disposed = true;
      (state.observer.take(), std::mem::take(&mut state.queue), state.pending.take())
    };
    drop(observer);
    drop(queue);
    pending.unsubscribe();
  }

  fn is_closed(&self) -> bool { self.0.lock().disposed }
}
