//! Subjects: observers and observables at once.
//!
//! A [`Subject`] multiplexes the events pushed into it to every attached
//! observer, in attachment order. Its buffer policy decides what a newly
//! attached observer receives first:
//!
//! | Constructor              | New observer receives                           |
//! |--------------------------|-------------------------------------------------|
//! | `Subject::publish()`     | only events emitted after attaching             |
//! | `Subject::behavior(v)`   | the most recent value, then future events       |
//! | `Subject::replay(n)`     | up to the last `n` values, then future events   |
//! | `Subject::async_subject()` | nothing until completion, then the last value |
//!
//! Once terminated, a subject replays its buffer (where the policy keeps one
//! past termination) followed by the same terminal event to every later
//! observer. A subject is never re-completable.

mod subject_subscription;
mod subscribers;

pub use subject_subscription::SubjectSubscription;

use crate::{
  error::RxError,
  event::Event,
  observable::{CoreObservable, ObservableType},
  observer::{BoxedObserver, Observer},
  sink::Subscriber,
};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};
use subscribers::{broadcast, Subscribers};
use tracing::debug;

enum Buffer<Item> {
  Publish,
  Behavior(Item),
  Latest(Option<Item>),
  Replay { capacity: usize, values: VecDeque<Item> },
  Async(Option<Item>),
}

#[derive(Clone)]
enum Terminal<Err> {
  Error(Err),
  Completed,
}

impl<Err> Terminal<Err> {
  fn into_event<Item>(self) -> Event<Item, Err> {
    match self {
      Terminal::Error(e) => Event::Error(e),
      Terminal::Completed => Event::Completed,
    }
  }
}

pub(crate) struct SubjectState<Item, Err> {
  observers: Subscribers<Subscriber<Item, Err>>,
  buffer: Buffer<Item>,
  terminal: Option<Terminal<Err>>,
}

impl<Item, Err> SubjectState<Item, Err> {
  pub(crate) fn detach(&mut self, id: usize) -> Option<Subscriber<Item, Err>> { self.observers.remove(id) }
}

/// A hot multicast stage with a selectable buffer policy.
///
/// Clones share the same state. Events are pushed with the inherent `next`,
/// `error` and `complete` methods, which all take `&self` and leave the
/// handle usable. To feed a subject from a source, subscribe the source with
/// [`Subject::as_observer`].
pub struct Subject<Item, Err> {
  state: Arc<Mutex<SubjectState<Item, Err>>>,
}

impl<Item, Err> Clone for Subject<Item, Err> {
  fn clone(&self) -> Self { Subject { state: self.state.clone() } }
}

impl<Item, Err> Subject<Item, Err> {
  fn with_buffer(buffer: Buffer<Item>) -> Self {
    Subject {
      state: Arc::new(Mutex::new(SubjectState {
        observers: Subscribers::default(),
        buffer,
        terminal: None,
      })),
    }
  }

  /// Emits only what arrives after an observer attached.
  pub fn publish() -> Self { Self::with_buffer(Buffer::Publish) }

  /// Starts with `seed` as its current value; new observers receive the
  /// current value first.
  pub fn behavior(seed: Item) -> Self { Self::with_buffer(Buffer::Behavior(seed)) }

  /// Replays up to the last `count` values to new observers.
  pub fn replay(count: usize) -> Self {
    Self::with_buffer(Buffer::Replay { capacity: count, values: VecDeque::with_capacity(count) })
  }

  /// A subject for a buffer size chosen at runtime: publish for 0, a single
  /// latest-value slot for 1, a bounded replay otherwise.
  pub fn with_replay(count: usize) -> Self {
    match count {
      0 => Self::publish(),
      1 => Self::with_buffer(Buffer::Latest(None)),
      n => Self::replay(n),
    }
  }

  /// Emits nothing until it completes, then only the last value followed by
  /// completion. An error is forwarded alone.
  pub fn async_subject() -> Self { Self::with_buffer(Buffer::Async(None)) }

  /// Number of attached observers that are still open.
  pub fn observer_count(&self) -> usize {
    self
      .state
      .lock()
      .observers
      .iter()
      .filter(|o| !o.is_closed())
      .count()
  }

  pub fn is_terminated(&self) -> bool { self.state.lock().terminal.is_some() }

  /// The observer face of this subject.
  pub fn as_observer(&self) -> SubjectObserver<Item, Err> { SubjectObserver(self.clone()) }

  pub(crate) fn downgrade(&self) -> std::sync::Weak<Mutex<SubjectState<Item, Err>>> {
    Arc::downgrade(&self.state)
  }
}

impl<Item, Err> Subject<Item, Err>
where
  Item: Clone,
{
  /// The current value of a behavior subject.
  ///
  /// Fails with [`RxError::SubjectErrored`] once the subject errored, and
  /// with [`RxError::NoValue`] for every other buffer policy.
  pub fn value(&self) -> Result<Item, RxError> {
    let state = self.state.lock();
    if let Some(Terminal::Error(_)) = state.terminal {
      return Err(RxError::SubjectErrored);
    }
    match &state.buffer {
      Buffer::Behavior(v) => Ok(v.clone()),
      _ => Err(RxError::NoValue),
    }
  }

  pub fn next(&self, value: Item) {
    let observers = {
      let mut state = self.state.lock();
      if state.terminal.is_some() {
        return;
      }
      match &mut state.buffer {
        Buffer::Publish => {}
        Buffer::Behavior(current) => *current = value.clone(),
        Buffer::Latest(latest) => *latest = Some(value.clone()),
        Buffer::Replay { capacity, values } => {
          if *capacity > 0 {
            if values.len() == *capacity {
              values.pop_front();
            }
            values.push_back(value.clone());
          }
        }
        Buffer::Async(last) => {
          *last = Some(value);
          return;
        }
      }
      state.observers.retain(|o| !o.is_closed());
      state.observers.snapshot()
    };
    broadcast(observers, value, |observer, v| observer.next(v));
  }
}

impl<Item, Err> Subject<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  pub fn error(&self, err: Err) {
    let observers: Vec<_> = {
      let mut state = self.state.lock();
      if state.terminal.is_some() {
        return;
      }
      state.terminal = Some(Terminal::Error(err.clone()));
      if let Buffer::Async(last) = &mut state.buffer {
        last.take();
      }
      state.observers.drain().collect()
    };
    debug!(observers = observers.len(), "subject terminated with error");
    broadcast(observers, err, |observer, e| observer.error(e));
  }

  pub fn complete(&self) {
    let (observers, last): (Vec<_>, _) = {
      let mut state = self.state.lock();
      if state.terminal.is_some() {
        return;
      }
      state.terminal = Some(Terminal::Completed);
      let last = match &state.buffer {
        Buffer::Async(last) => last.clone(),
        _ => None,
      };
      (state.observers.drain().collect(), last)
    };
    debug!(observers = observers.len(), "subject completed");
    for observer in observers {
      if let Some(v) = &last {
        observer.next(v.clone());
      }
      observer.complete();
    }
  }

  /// Queue what a newly attached observer must see first: the buffered
  /// values, then the terminal event if the subject already terminated.
  fn replay_into(state: &SubjectState<Item, Err>, sink: &Subscriber<Item, Err>) {
    let terminated = state.terminal.is_some();
    match &state.buffer {
      Buffer::Publish => {}
      Buffer::Behavior(v) => {
        if !terminated {
          sink.enqueue(Event::Next(v.clone()));
        }
      }
      Buffer::Latest(v) => {
        if let Some(v) = v {
          sink.enqueue(Event::Next(v.clone()));
        }
      }
      Buffer::Replay { values, .. } => {
        for v in values {
          sink.enqueue(Event::Next(v.clone()));
        }
      }
      Buffer::Async(last) => {
        if let (Some(Terminal::Completed), Some(v)) = (&state.terminal, last) {
          sink.enqueue(Event::Next(v.clone()));
        }
      }
    }
    if let Some(terminal) = &state.terminal {
      sink.enqueue(terminal.clone().into_event());
    }
  }
}

impl<Item, Err> ObservableType for Subject<Item, Err> {
  type Item = Item;
  type Err = Err;
}

impl<Item, Err, O> CoreObservable<O> for Subject<Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Unsub = SubjectSubscription<Item, Err>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let observer: BoxedObserver<Item, Err> = Box::new(observer);
    let sink = Subscriber::new(observer);
    let id = {
      let mut state = self.state.lock();
      Self::replay_into(&state, &sink);
      if state.terminal.is_none() {
        Some(state.observers.add(sink.clone()))
      } else {
        None
      }
    };
    sink.drain();
    SubjectSubscription::new(self.downgrade(), id, sink)
  }
}

/// Forwards whatever it observes into a [`Subject`].
///
/// Returned by [`Subject::as_observer`]. Its terminal events terminate the
/// subject; other handles to the subject stay usable.
pub struct SubjectObserver<Item, Err>(Subject<Item, Err>);

impl<Item, Err> Clone for SubjectObserver<Item, Err> {
  fn clone(&self) -> Self { SubjectObserver(self.0.clone()) }
}

impl<Item, Err> Observer<Item, Err> for SubjectObserver<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  #[inline]
  fn next(&mut self, value: Item) { self.0.next(value) }

  #[inline]
  fn error(self, err: Err) { self.0.error(err) }

  #[inline]
  fn complete(self) { self.0.complete() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_terminated() }
}
