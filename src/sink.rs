//! Per-subscription delivery state.
//!
//! A [`Sink`] owns the downstream observer of one subscription and is the
//! only path events take into it. It serializes delivery: while one caller is
//! inside the observer, events pushed by re-entrant or concurrent callers are
//! queued and delivered, in arrival order, by the caller already draining.
//! No lock is held while the observer runs, so an observer may dispose its own
//! subscription, or push more events, from inside a callback.
//!
//! The sink accepts at most one terminal event. Once that event is queued,
//! anything pushed afterwards is dropped; once it is delivered, the observer
//! and the teardown are released. Disposing drops the observer and whatever
//! is still queued, so no event reaches the observer after `dispose` returns
//! (except one a concurrent drain is already delivering).

use crate::{
  event::Event,
  observer::{BoxedObserver, Observer},
  subscription::{BoxedSubscription, Subscription},
};
use parking_lot::{Mutex, MutexGuard};
use std::{collections::VecDeque, sync::Arc};

struct SinkState<O, Item, Err> {
  observer: Option<O>,
  queue: VecDeque<Event<Item, Err>>,
  draining: bool,
  /// A terminal event has been accepted, nothing more gets queued.
  terminated: bool,
  /// The terminal event was delivered, or the sink was disposed.
  finished: bool,
  teardown: Option<BoxedSubscription>,
}

struct SinkInner<O, Item, Err> {
  state: Mutex<SinkState<O, Item, Err>>,
}

/// Object-safe control surface of a sink, used by handles that only need to
/// dispose it.
pub(crate) trait SinkControl: Send + Sync {
  fn dispose(&self);
  fn is_closed(&self) -> bool;
}

/// Serialized, cancellable delivery into one observer.
pub struct Sink<O, Item, Err>(Arc<SinkInner<O, Item, Err>>);


impl<O, Item, Err> Clone for Sink<O, Item, Err> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<O, Item, Err> Sink<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  pub fn new(observer: O) -> Self {
    Sink(Arc::new(SinkInner {
      state: Mutex::new(SinkState {
        observer: Some(observer),
        queue: VecDeque::new(),
        draining: false,
        terminated: false,
        finished: false,
        teardown: None,
      }),
    }))
  }

  /// Push one event and deliver everything queued, unless another caller is
  /// already delivering.
  pub fn push(&self, event: Event<Item, Err>) {
    if self.enqueue(event) {
      self.drain();
    }
  }

  /// Queue an event without delivering it. Returns `false` if the sink no
  /// longer accepts events.
  pub(crate) fn enqueue(&self, event: Event<Item, Err>) -> bool {
    let mut state = self.0.state.lock();
    if state.terminated || state.finished {
      return false;
    }
    state.terminated = event.is_terminal();
    state.queue.push_back(event);
    true
  }

  /// Deliver queued events until the queue is empty or the sink finishes.
  pub(crate) fn drain(&self) {
    let mut state = self.0.state.lock();
    if state.draining {
      return;
    }
    state.draining = true;
    while let Some(event) = state.queue.pop_front() {
      let Some(mut observer) = state.observer.take() else {
        state.queue.clear();
        break;
      };
      match event {
        Event::Next(value) => {
          let (observer, downstream_closed) = MutexGuard::unlocked(&mut state, move || {
            observer.next(value);
            let closed = observer.is_closed();
            (observer, closed)
          });
          if state.finished {
            MutexGuard::unlocked(&mut state, move || drop(observer));
            break;
          }
          if downstream_closed {
            // The downstream stage terminated itself, detach from it.
            state.terminated = true;
            state.finished = true;
            state.queue.clear();
            let teardown = state.teardown.take();
            MutexGuard::unlocked(&mut state, move || {
              drop(observer);
              teardown.unsubscribe();
            });
            break;
          }
          state.observer = Some(observer);
        }
        Event::Error(err) => {
          let teardown = Self::finish(&mut state);
          MutexGuard::unlocked(&mut state, move || {
            observer.error(err);
            teardown.unsubscribe();
          });
          break;
        }
        Event::Completed => {
          let teardown = Self::finish(&mut state);
          MutexGuard::unlocked(&mut state, move || {
            observer.complete();
            teardown.unsubscribe();
          });
          break;
        }
      }
    }
    state.draining = false;
  }

  fn finish(state: &mut SinkState<O, Item, Err>) -> Option<BoxedSubscription> {
    state.finished = true;
    state.queue.clear();
    state.teardown.take()
  }

  /// Attach a teardown released when the sink finishes. If the sink already
  /// finished, the teardown is released immediately.
  pub fn set_teardown(&self, teardown: impl Subscription + Send + 'static) {
    let teardown = BoxedSubscription::new(teardown);
    let mut state = self.0.state.lock();
    if state.finished {
      drop(state);
      teardown.unsubscribe();
    } else {
      let previous = state.teardown.replace(teardown);
      drop(state);
      previous.unsubscribe();
    }
  }

  /// Drop the observer and everything queued, then release the teardown.
  pub fn dispose(&self) { self.0.dispose() }

  /// `true` once the sink accepted a terminal event or was disposed.
  pub fn is_closed(&self) -> bool { self.0.is_closed() }

  pub(crate) fn control(&self) -> Arc<dyn SinkControl>
  where
    O: Send + 'static,
    Item: Send + 'static,
    Err: Send + 'static,
  {
    self.0.clone()
  }
}

impl<O, Item, Err> SinkInner<O, Item, Err> {
  fn dispose(&self) {
    let (observer, teardown) = {
      let mut state = self.state.lock();
      if state.finished {
        return;
      }
      state.finished = true;
      state.terminated = true;
      state.queue.clear();
      (state.observer.take(), state.teardown.take())
    };
    drop(observer);
    teardown.unsubscribe();
  }

  fn is_closed(&self) -> bool {
    let state = self.state.lock();
    state.terminated || state.finished
  }
}

impl<O, Item, Err> SinkControl for SinkInner<O, Item, Err>
where
  O: Send,
  Item: Send,
  Err: Send,
{
  fn dispose(&self) { SinkInner::dispose(self) }

  fn is_closed(&self) -> bool { SinkInner::is_closed(self) }
}

impl<O, Item, Err> Observer<Item, Err> for Sink<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  #[inline]
  fn next(&mut self, value: Item) { self.push(Event::Next(value)) }

  #[inline]
  fn error(self, err: Err) { self.push(Event::Error(err)) }

  #[inline]
  fn complete(self) { self.push(Event::Completed) }

  #[inline]
  fn is_closed(&self) -> bool { Sink::is_closed(self) }
}

impl<O, Item, Err> Subscription for Sink<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  #[inline]
  fn unsubscribe(self) { self.dispose() }

  #[inline]
  fn is_closed(&self) -> bool { Sink::is_closed(self) }
}

/// The emitting end of one subscription, handed to `create` producers and
/// kept by subjects for each attached observer.
///
/// All methods take `&self`, so a producer may emit through the same handle,
/// or clones of it, any number of times. Events after the terminal one are
/// dropped.
pub struct Subscriber<Item, Err>(Sink<BoxedObserver<Item, Err>, Item, Err>);

impl<Item, Err> Clone for Subscriber<Item, Err> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Item, Err> Subscriber<Item, Err> {
  pub(crate) fn new(observer: BoxedObserver<Item, Err>) -> Self { Self(Sink::new(observer)) }

  #[inline]
  pub fn next(&self, value: Item) { self.0.push(Event::Next(value)) }

  #[inline]
  pub fn error(&self, err: Err) { self.0.push(Event::Error(err)) }

  #[inline]
  pub fn complete(&self) { self.0.push(Event::Completed) }

  /// `true` once a terminal event was emitted, the downstream closed itself,
  /// or the subscription was released.
  pub fn is_closed(&self) -> bool { self.0.is_closed() }

  /// Attach the teardown released when this subscription ends.
  pub fn set_teardown(&self, teardown: impl Subscription + Send + 'static) {
    self.0.set_teardown(teardown)
  }

  pub fn dispose(&self) { self.0.dispose() }

  pub(crate) fn enqueue(&self, event: Event<Item, Err>) -> bool { self.0.enqueue(event) }

  pub(crate) fn drain(&self) { self.0.drain() }
}

impl<Item, Err> Subscription for Subscriber<Item, Err> {
  #[inline]
  fn unsubscribe(self) { self.0.dispose() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_closed() }
}

/// The subscription returned by a terminal `subscribe`.
///
/// Unsubscribing disposes the root sink first, so nothing more reaches the
/// observer, then releases the upstream subscription.
pub struct SinkSubscription<U> {
  sink: Arc<dyn SinkControl>,
  upstream: Arc<Mutex<Option<U>>>,
}

impl<U> SinkSubscription<U> {
  pub(crate) fn new(sink: Arc<dyn SinkControl>, upstream: U) -> Self {
    Self { sink, upstream: Arc::new(Mutex::new(Some(upstream))) }
  }
}

impl<U> Clone for SinkSubscription<U> {
  fn clone(&self) -> Self { Self { sink: self.sink.clone(), upstream: self.upstream.clone() } }
}

impl<U: Subscription> Subscription for SinkSubscription<U> {
  fn unsubscribe(self) {
    self.sink.dispose();
    let upstream = self.upstream.lock().take();
    upstream.unsubscribe();
  }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}
