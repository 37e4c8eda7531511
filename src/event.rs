//! The tri-state notification flowing through a pipeline.

use crate::observer::Observer;

/// One notification of a stream: a value, an error, or completion.
///
/// After an `Error` or `Completed` has been delivered on a subscription no
/// further event may follow on that subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<Item, Err> {
  Next(Item),
  Error(Err),
  Completed,
}

impl<Item, Err> Event<Item, Err> {
  #[inline]
  pub fn is_terminal(&self) -> bool { !matches!(self, Event::Next(_)) }

  /// Returns the carried value of a `Next` event.
  #[inline]
  pub fn value(&self) -> Option<&Item> {
    match self {
      Event::Next(v) => Some(v),
      _ => None,
    }
  }

  pub fn map_next<B>(self, f: impl FnOnce(Item) -> B) -> Event<B, Err> {
    match self {
      Event::Next(v) => Event::Next(f(v)),
      Event::Error(e) => Event::Error(e),
      Event::Completed => Event::Completed,
    }
  }

  /// Delivers this event to the observer held in `slot`.
  ///
  /// A terminal event takes the observer out of the slot, so every later
  /// delivery to the same slot is a no-op.
  pub fn deliver<O>(self, slot: &mut Option<O>)
  where
    O: Observer<Item, Err>,
  {
    match self {
      Event::Next(v) => slot.next(v),
      Event::Error(e) => slot.take().error(e),
      Event::Completed => slot.take().complete(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Default)]
  struct Recorder(Vec<Event<i32, &'static str>>);

  impl Observer<i32, &'static str> for &mut Recorder {
    fn next(&mut self, value: i32) { self.0.push(Event::Next(value)); }
    fn error(self, err: &'static str) { self.0.push(Event::Error(err)); }
    fn complete(self) { self.0.push(Event::Completed); }
    fn is_closed(&self) -> bool { false }
  }

  #[test]
  fn deliver_stops_after_terminal() {
    let mut recorder = Recorder::default();
    let mut slot = Some(&mut recorder);
    Event::Next(1).deliver(&mut slot);
    Event::Completed.deliver(&mut slot);
    Event::Next(2).deliver(&mut slot);
    Event::Error("late").deliver(&mut slot);
    assert!(slot.is_none());
    assert_eq!(recorder.0, vec![Event::Next(1), Event::Completed]);
  }

  #[test]
  fn terminal_classification() {
    assert!(!Event::<i32, ()>::Next(1).is_terminal());
    assert!(Event::<i32, ()>::Completed.is_terminal());
    assert!(Event::<i32, ()>::Error(()).is_terminal());
    assert_eq!(Event::<i32, ()>::Next(2).map_next(|v| v * 2), Event::Next(4));
  }
}
