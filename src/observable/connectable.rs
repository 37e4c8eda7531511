//! Connectable observables: wiring observers is decoupled from starting the
//! upstream.
//!
//! Subscribing to a [`ConnectableObservable`] only attaches the observer to
//! its internal subject. The source is subscribed by [`connect`], and the
//! resulting [`Connection`] lives on independently of how many observers are
//! attached, including none at all.
//!
//! [`connect`]: ConnectableObservable::connect

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  ops::ref_count::RefCount,
  subject::{Subject, SubjectSubscription},
  subscription::{BoxedSubscription, Subscription},
};
use parking_lot::Mutex;
use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc, Weak,
};
use tracing::debug;

/// How long the subject of a connectable observable lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectLifetime {
  /// One subject for the whole life of the connectable. Its buffer and its
  /// terminal state survive across connections.
  SharedForever,
  /// A fresh subject for every connection. The subject is dropped when the
  /// connection ends, by dispose or by the source terminating.
  #[default]
  WhileConnected,
}

type SubjectFactory<Item, Err> = Arc<dyn Fn() -> Subject<Item, Err> + Send + Sync>;

struct ConnectState<Item, Err> {
  subject: Option<Subject<Item, Err>>,
  connection: Option<Connection>,
  generation: usize,
}

struct ConnectShared<Item, Err> {
  factory: SubjectFactory<Item, Err>,
  lifetime: SubjectLifetime,
  state: Mutex<ConnectState<Item, Err>>,
}

impl<Item, Err> ConnectShared<Item, Err> {
  fn subject(&self) -> Subject<Item, Err> {
    let mut state = self.state.lock();
    match &state.subject {
      Some(subject) => subject.clone(),
      None => {
        let subject = (self.factory)();
        state.subject = Some(subject.clone());
        subject
      }
    }
  }

  /// Forget the connection of `generation`, if it is still the current one.
  fn disconnected(&self, generation: usize) {
    let mut state = self.state.lock();
    if state.generation != generation {
      return;
    }
    state.connection = None;
    let subject = match self.lifetime {
      SubjectLifetime::WhileConnected => state.subject.take(),
      SubjectLifetime::SharedForever => None,
    };
    drop(state);
    drop(subject);
  }
}

/// A multicast stage whose upstream starts only on [`connect`].
///
/// [`connect`]: ConnectableObservable::connect
pub struct ConnectableObservable<S: ObservableType> {
  source: S,
  shared: Arc<ConnectShared<S::Item, S::Err>>,
}

impl<S: ObservableType + Clone> Clone for ConnectableObservable<S> {
  fn clone(&self) -> Self { Self { source: self.source.clone(), shared: self.shared.clone() } }
}

impl<S: ObservableType> ConnectableObservable<S> {
  pub fn new(
    source: S, factory: impl Fn() -> Subject<S::Item, S::Err> + Send + Sync + 'static,
    lifetime: SubjectLifetime,
  ) -> Self {
    ConnectableObservable {
      source,
      shared: Arc::new(ConnectShared {
        factory: Arc::new(factory),
        lifetime,
        state: Mutex::new(ConnectState { subject: None, connection: None, generation: 0 }),
      }),
    }
  }

  pub fn lifetime(&self) -> SubjectLifetime { self.shared.lifetime }

  /// The subject observers are currently attached to.
  pub fn subject(&self) -> Subject<S::Item, S::Err> { self.shared.subject() }

  /// `true` while a connection is live.
  pub fn is_connected(&self) -> bool { self.shared.state.lock().connection.is_some() }

  /// Connect automatically while at least one observer is attached.
  pub fn ref_count(self) -> RefCount<S> { RefCount::new(self) }
}

impl<S> ConnectableObservable<S>
where
  S: ObservableType + Clone + CoreObservable<ConnectObserver<<S as ObservableType>::Item, <S as ObservableType>::Err>>,
  S::Item: Clone + Send + 'static,
  S::Err: Clone + Send + 'static,
  S::Unsub: Send + 'static,
{
  /// Subscribe the internal subject to the source.
  ///
  /// While a connection is live this returns another handle to it instead of
  /// subscribing again.
  pub fn connect(&self) -> Connection {
    let (connection, subject) = {
      let mut state = self.shared.state.lock();
      if let Some(connection) = &state.connection {
        return connection.clone();
      }
      state.generation += 1;
      let generation = state.generation;
      let weak: Weak<ConnectShared<S::Item, S::Err>> = Arc::downgrade(&self.shared);
      let connection = Connection::new(move || {
        if let Some(shared) = weak.upgrade() {
          shared.disconnected(generation);
        }
      });
      state.connection = Some(connection.clone());
      let subject = match &state.subject {
        Some(subject) => subject.clone(),
        None => {
          let subject = (self.shared.factory)();
          state.subject = Some(subject.clone());
          subject
        }
      };
      (connection, subject)
    };
    debug!(lifetime = ?self.shared.lifetime, "connect");
    let observer = ConnectObserver { subject, connection: connection.clone() };
    let upstream = self.source.clone().actual_subscribe(observer);
    connection.attach(upstream);
    connection
  }
}

impl<S: ObservableType> ObservableType for ConnectableObservable<S> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, O> CoreObservable<O> for ConnectableObservable<S>
where
  S: ObservableType,
  O: Observer<S::Item, S::Err> + Send + 'static,
  S::Item: Clone + Send + 'static,
  S::Err: Clone + Send + 'static,
{
  type Unsub = SubjectSubscription<S::Item, S::Err>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub { self.shared.subject().actual_subscribe(observer) }
}

/// Observer subscribed to the source by `connect`: feeds the subject and ends
/// the connection when the source terminates.
pub struct ConnectObserver<Item, Err> {
  subject: Subject<Item, Err>,
  connection: Connection,
}

impl<Item, Err> Observer<Item, Err> for ConnectObserver<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) { self.subject.next(value) }

  fn error(self, err: Err) {
    self.subject.error(err);
    self.connection.unsubscribe();
  }

  fn complete(self) {
    self.subject.complete();
    self.connection.unsubscribe();
  }

  fn is_closed(&self) -> bool { self.connection.is_closed() }
}

struct ConnectionInner {
  closed: AtomicBool,
  upstream: Mutex<Option<BoxedSubscription>>,
  on_close: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

/// A live upstream subscription of a connectable observable.
///
/// Every clone refers to the same connection. Unsubscribing any of them ends
/// it: the connectable forgets it, so the next `connect` starts a fresh
/// upstream subscription, and the upstream is released.
#[derive(Clone)]
pub struct Connection(Arc<ConnectionInner>);

impl Connection {
  fn new(on_close: impl FnOnce() + Send + 'static) -> Self {
    Connection(Arc::new(ConnectionInner {
      closed: AtomicBool::new(false),
      upstream: Mutex::new(None),
      on_close: Mutex::new(Some(Box::new(on_close))),
    }))
  }

  fn attach(&self, upstream: impl Subscription + Send + 'static) {
    let upstream = BoxedSubscription::new(upstream);
    let mut slot = self.0.upstream.lock();
    if self.is_closed() {
      drop(slot);
      upstream.unsubscribe();
    } else {
      *slot = Some(upstream);
    }
  }
}

impl Subscription for Connection {
  fn unsubscribe(self) {
    if self.0.closed.swap(true, Ordering::AcqRel) {
      return;
    }
    debug!("connection closed");
    let on_close = self.0.on_close.lock().take();
    if let Some(on_close) = on_close {
      on_close();
    }
    let upstream = self.0.upstream.lock().take();
    upstream.unsubscribe();
  }

  fn is_closed(&self) -> bool { self.0.closed.load(Ordering::Acquire) }
}

impl std::fmt::Debug for Connection {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Connection").field("closed", &self.is_closed()).finish()
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;
  use parking_lot::Mutex;
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  #[test]
  fn subscribe_does_not_start_upstream() {
    let subscribed = Arc::new(AtomicUsize::new(0));
    let c_subscribed = subscribed.clone();
    let connectable = create(move |s: Subscriber<i32, ()>| {
      c_subscribed.fetch_add(1, Ordering::SeqCst);
      s.next(1);
    })
    .publish();

    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    connectable.clone().subscribe_next(move |v| c_seen.lock().push(v));
    assert_eq!(subscribed.load(Ordering::SeqCst), 0);

    connectable.connect();
    assert_eq!(subscribed.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock(), vec![1]);
  }

  #[test]
  fn connect_while_connected_returns_same_connection() {
    let subscribed = Arc::new(AtomicUsize::new(0));
    let c_subscribed = subscribed.clone();
    let connectable = create(move |_: Subscriber<i32, ()>| {
      c_subscribed.fetch_add(1, Ordering::SeqCst);
    })
    .publish();

    let first = connectable.connect();
    let second = connectable.connect();
    assert_eq!(subscribed.load(Ordering::SeqCst), 1);
    assert!(connectable.is_connected());

    second.unsubscribe();
    assert!(first.is_closed());
    assert!(!connectable.is_connected());

    first.unsubscribe();
    connectable.connect();
    assert_eq!(subscribed.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn connection_survives_zero_observers() {
    let source = Subject::<i32, ()>::publish();
    let connectable = source.clone().publish();
    let connection = connectable.connect();

    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let subscription = connectable.clone().subscribe_next(move |v| c_seen.lock().push(v));
    source.next(1);
    subscription.unsubscribe();
    source.next(2);
    assert_eq!(source.observer_count(), 1);

    let c_seen = seen.clone();
    connectable.clone().subscribe_next(move |v| c_seen.lock().push(v * 10));
    source.next(3);
    assert_eq!(*seen.lock(), vec![1, 30]);

    connection.unsubscribe();
    assert_eq!(source.observer_count(), 0);
  }

  #[test]
  fn source_termination_ends_connection() {
    let subscribed = Arc::new(AtomicUsize::new(0));
    let c_subscribed = subscribed.clone();
    let connectable = defer(move || {
      c_subscribed.fetch_add(1, Ordering::SeqCst);
      from_iter::<_, ()>(vec![1, 2])
    })
    .multicast_with(Subject::publish, SubjectLifetime::WhileConnected);

    let connection = connectable.connect();
    assert!(connection.is_closed());
    assert!(!connectable.is_connected());
    connectable.connect();
    assert_eq!(subscribed.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn shared_forever_keeps_terminated_subject() {
    let connectable = from_iter::<_, ()>(vec![1, 2, 3]).replay(2);
    connectable.connect();

    let seen = Arc::new(Mutex::new(vec![]));
    let (c_next, c_done) = (seen.clone(), seen.clone());
    connectable.subscribe_all(
      move |v| c_next.lock().push(Some(v)),
      |_| {},
      move || c_done.lock().push(None),
    );
    assert_eq!(*seen.lock(), vec![Some(2), Some(3), None]);
  }
}
