//! End-to-end behavior of the engine: sharing, context changes, error
//! forwarding and subscription release across whole chains.

use parking_lot::Mutex;
use rxcore::prelude::*;
use std::{
  sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    mpsc, Arc,
  },
  thread,
};

fn ms(v: u64) -> Duration { Duration::from_millis(v) }

fn thread_name() -> Option<String> { thread::current().name().map(str::to_owned) }

#[test]
fn connect_keeps_running_while_ref_count_restarts() {
  let scheduler = TestScheduler::new();
  let source = interval(ms(10), scheduler.clone());

  // connect(): the upstream survives the only subscriber leaving.
  let connectable = source.clone().publish();
  let connection = connectable.connect();
  let first = scheduler.create_observer();
  let subscription = connectable.clone().subscribe(first.clone());
  scheduler.advance_by(ms(25));
  subscription.unsubscribe();
  scheduler.advance_by(ms(20));
  let late = scheduler.create_observer();
  connectable.subscribe(late.clone());
  scheduler.advance_by(ms(10));
  assert_eq!(first.values(), vec![0, 1]);
  assert_eq!(late.values(), vec![4]);
  connection.unsubscribe();

  // ref_count(): the last subscriber leaving ends the upstream, the next one
  // starts it again from the beginning.
  let scheduler = TestScheduler::new();
  let shared = interval(ms(10), scheduler.clone()).publish().ref_count();
  let first = scheduler.create_observer();
  let subscription = shared.clone().subscribe(first.clone());
  scheduler.advance_by(ms(25));
  subscription.unsubscribe();
  scheduler.advance_by(ms(20));
  let late = scheduler.create_observer();
  shared.subscribe(late.clone());
  scheduler.advance_by(ms(10));
  assert_eq!(first.values(), vec![0, 1]);
  assert_eq!(late.values(), vec![0]);
}

#[test]
fn ref_count_one_zero_one_subscribes_source_twice() {
  let subscribed = Arc::new(AtomicUsize::new(0));
  let c_subscribed = subscribed.clone();
  let shared = defer(move || {
    c_subscribed.fetch_add(1, Ordering::SeqCst);
    never::<i32, ()>()
  })
  .publish()
  .ref_count();

  let first = shared.clone().subscribe_next(|_| {});
  assert_eq!(subscribed.load(Ordering::SeqCst), 1);
  first.unsubscribe();
  assert!(!shared.is_connected());

  let _second = shared.clone().subscribe_next(|_| {});
  assert_eq!(subscribed.load(Ordering::SeqCst), 2);
  assert!(shared.is_connected());
}

#[test]
fn last_observe_on_decides_delivery_context() {
  let x = EventLoopScheduler::with_name("ctx-x").unwrap();
  let y = EventLoopScheduler::with_name("ctx-y").unwrap();
  let z = EventLoopScheduler::with_name("ctx-z").unwrap();
  let log = Arc::new(Mutex::new(vec![]));
  let (c_b, c_c, c_done) = (log.clone(), log.clone(), log.clone());
  let (tx, rx) = mpsc::channel();

  from_iter::<_, ()>(0..5)
    .observe_on(x)
    .map(move |v| {
      c_b.lock().push(("b", thread_name()));
      v
    })
    .observe_on(y)
    .map(move |v| {
      c_c.lock().push(("c", thread_name()));
      v
    })
    .observe_on(z)
    .subscribe_all(
      move |_| c_done.lock().push(("subscriber", thread_name())),
      |_| {},
      move || {
        let _ = tx.send(thread_name());
      },
    );

  let completed_on = rx.recv_timeout(Duration::from_secs(5)).unwrap();
  assert_eq!(completed_on.as_deref(), Some("ctx-z"));
  let log = log.lock();
  assert_eq!(log.len(), 15);
  for (stage, name) in log.iter() {
    let expected = match *stage {
      "b" => "ctx-x",
      "c" => "ctx-y",
      _ => "ctx-z",
    };
    assert_eq!(name.as_deref(), Some(expected), "stage {stage}");
  }
}

#[test]
fn subscribe_on_nearest_to_source_wins() {
  let a = EventLoopScheduler::with_name("ctx-a").unwrap();
  let b = EventLoopScheduler::with_name("ctx-b").unwrap();
  let c = EventLoopScheduler::with_name("ctx-c").unwrap();
  let factory_ran_on = Arc::new(Mutex::new(None));
  let c_factory_ran_on = factory_ran_on.clone();
  let values_on = Arc::new(Mutex::new(vec![]));
  let c_values_on = values_on.clone();
  let (tx, rx) = mpsc::channel();

  defer(move || {
    *c_factory_ran_on.lock() = thread_name();
    from_iter::<_, ()>(0..3)
  })
  .subscribe_on(a)
  .subscribe_on(b)
  .subscribe_on(c)
  .subscribe_all(
    move |_| c_values_on.lock().push(thread_name()),
    |_| {},
    move || {
      let _ = tx.send(());
    },
  );

  rx.recv_timeout(Duration::from_secs(5)).unwrap();
  assert_eq!(factory_ran_on.lock().as_deref(), Some("ctx-a"));
  assert_eq!(*values_on.lock(), vec![Some("ctx-a".to_owned()); 3]);
}

#[test]
fn failing_transform_forwards_one_error() {
  let subject = Subject::<i32, String>::publish();
  let events = Arc::new(Mutex::new(vec![]));
  let (c_next, c_err, c_done) = (events.clone(), events.clone(), events.clone());
  subject
    .clone()
    .try_map(|v| if v == 5 { Err(format!("cannot map {v}")) } else { Ok(v * 10) })
    .subscribe_all(
      move |v| c_next.lock().push(Event::Next(v)),
      move |e| c_err.lock().push(Event::Error(e)),
      move || c_done.lock().push(Event::Completed),
    );

  for v in 1..=8 {
    subject.next(v);
  }
  subject.complete();

  assert_eq!(
    *events.lock(),
    vec![
      Event::Next(10),
      Event::Next(20),
      Event::Next(30),
      Event::Next(40),
      Event::Error("cannot map 5".to_owned()),
    ]
  );
  assert_eq!(subject.observer_count(), 0);
}

#[test]
fn dispose_is_idempotent() {
  let released = Arc::new(AtomicUsize::new(0));
  let c_released = released.clone();
  let source = create(move |_: Subscriber<i32, ()>| {
    let released = c_released.clone();
    ClosureSubscription::new(move || {
      released.fetch_add(1, Ordering::SeqCst);
    })
  });

  let subscription = source.map(|v| v + 1).subscribe_next(|_| {});
  for _ in 0..3 {
    subscription.clone().unsubscribe();
  }
  subscription.unsubscribe();
  assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn late_subscribers_see_buffered_content_and_terminal() {
  fn record<S>(source: S) -> Arc<Mutex<Vec<Event<char, ()>>>>
  where
    S: Observable<Item = char, Err = ()> + CoreObservable<Sink<TestObserver<char, ()>, char, ()>>,
  {
    let observer = TestScheduler::new().create_observer();
    source.subscribe(observer.clone());
    Arc::new(Mutex::new(observer.events().into_iter().map(|r| r.event).collect()))
  }

  let publish = Subject::<char, ()>::publish();
  publish.next('a');
  publish.complete();
  assert_eq!(*record(publish).lock(), vec![Event::Completed]);

  let behavior = Subject::<char, ()>::behavior('a');
  behavior.next('b');
  assert_eq!(*record(behavior.clone()).lock(), vec![Event::Next('b')]);

  let replay = Subject::<char, ()>::replay(2);
  for v in ['a', 'b', 'c'] {
    replay.next(v);
  }
  assert_eq!(*record(replay.clone()).lock(), vec![Event::Next('b'), Event::Next('c')]);
  replay.complete();
  assert_eq!(
    *record(replay).lock(),
    vec![Event::Next('b'), Event::Next('c'), Event::Completed]
  );

  // A cold source restarts instead.
  let cold = from_iter::<_, ()>(vec!['x', 'y']);
  record(cold.clone());
  assert_eq!(
    *record(cold).lock(),
    vec![Event::Next('x'), Event::Next('y'), Event::Completed]
  );
}

#[cfg(feature = "futures-scheduler")]
#[test]
fn observe_on_thread_pool_keeps_order() {
  let pool = ThreadPoolScheduler::with_pool_size(4).unwrap();
  let (tx, rx) = mpsc::channel();
  from_iter::<_, ()>(0..200).observe_on(pool).subscribe_all(
    {
      let tx = tx.clone();
      move |v| {
        let _ = tx.send(Some(v));
      }
    },
    |_| {},
    move || {
      let _ = tx.send(None);
    },
  );
  let mut got = vec![];
  while let Ok(Some(v)) = rx.recv_timeout(Duration::from_secs(5)) {
    got.push(v);
  }
  assert_eq!(got, (0..200).collect::<Vec<_>>());
}

#[test]
fn shared_sources_fan_out_across_threads() {
  let subject = Subject::<usize, ()>::publish();
  let total = Arc::new(AtomicUsize::new(0));
  let subscriptions: Vec<_> = (0..4)
    .map(|_| {
      let total = total.clone();
      subject.clone().subscribe_next(move |v| {
        total.fetch_add(v, Ordering::SeqCst);
      })
    })
    .collect();

  let producers: Vec<_> = (0..4)
    .map(|_| {
      let subject = subject.clone();
      thread::spawn(move || {
        for _ in 0..100 {
          subject.next(1);
        }
      })
    })
    .collect();
  for producer in producers {
    producer.join().unwrap();
  }
  assert_eq!(total.load(Ordering::SeqCst), 4 * 4 * 100);

  for subscription in subscriptions {
    subscription.unsubscribe();
  }
  assert_eq!(subject.observer_count(), 0);
}

#[test]
fn ref_count_settles_after_concurrent_subscribe_and_release() {
  let counter = Arc::new(ResourceCounter::default());
  let source = Subject::<usize, ()>::publish();
  let c_source = source.clone();
  let shared = defer(move || c_source.clone()).instrument(counter.clone()).share();

  let running = Arc::new(AtomicBool::new(true));
  let producer = {
    let source = source.clone();
    let running = running.clone();
    thread::spawn(move || {
      while running.load(Ordering::SeqCst) {
        source.next(1);
      }
    })
  };

  let workers: Vec<_> = (0..4)
    .map(|_| {
      let shared = shared.clone();
      thread::spawn(move || {
        for i in 0..200 {
          if i % 2 == 0 {
            shared.clone().subscribe_next(|_| {}).unsubscribe();
          } else {
            shared.clone().take(1).subscribe_next(|_| {}).unsubscribe();
          }
        }
      })
    })
    .collect();
  for worker in workers {
    worker.join().unwrap();
  }
  running.store(false, Ordering::SeqCst);
  producer.join().unwrap();

  assert_eq!(shared.subscriber_count(), 0);
  assert!(!shared.is_connected());
  assert_eq!(source.observer_count(), 0);
  // Every connection made was torn down again.
  assert_eq!(counter.live(), 0);
  assert!((1..=4 * 200).contains(&counter.total()));
}
