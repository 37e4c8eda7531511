use smallvec::SmallVec;

/// Ordered, id-indexed set of the observers attached to a subject.
///
/// Ids are handed out in increasing order and never reused, so iteration
/// order is attachment order and a stale id can never remove a newer
/// observer.
pub(crate) struct Subscribers<Ob> {
  next_id: usize,
  items: SmallVec<[(usize, Ob); 2]>,
}

impl<Ob> Default for Subscribers<Ob> {
  fn default() -> Self { Self { next_id: 0, items: SmallVec::new() } }
}

impl<Ob> Subscribers<Ob> {
  /// Add an observer and return its unique ID.
  pub fn add(&mut self, observer: Ob) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    self.items.push((id, observer));
    id
  }

  /// Remove an observer by ID.
  pub fn remove(&mut self, id: usize) -> Option<Ob> {
    let pos = self.items.iter().position(|(i, _)| *i == id)?;
    Some(self.items.remove(pos).1)
  }

  pub fn retain(&mut self, mut keep: impl FnMut(&Ob) -> bool) { self.items.retain(|(_, ob)| keep(ob)) }

  #[cfg(test)]
  pub fn len(&self) -> usize { self.items.len() }

  pub fn iter(&self) -> impl Iterator<Item = &Ob> { self.items.iter().map(|(_, ob)| ob) }

  /// Remove every observer, in attachment order.
  pub fn drain(&mut self) -> impl Iterator<Item = Ob> + '_ { self.items.drain(..).map(|(_, ob)| ob) }
}

impl<Ob: Clone> Subscribers<Ob> {
  /// A stable copy of the attached set, iterated while the subject lock is
  /// released.
  pub fn snapshot(&self) -> SmallVec<[Ob; 2]> { self.iter().cloned().collect() }
}

/// Hand `value` to every observer in `observers`, cloning it for all but the
/// last one, which receives the moved value.
pub(crate) fn broadcast<Ob, Item: Clone>(
  observers: impl IntoIterator<Item = Ob>, value: Item, mut deliver: impl FnMut(Ob, Item),
) {
  let mut iter = observers.into_iter().peekable();
  while let Some(observer) = iter.next() {
    if iter.peek().is_some() {
      deliver(observer, value.clone());
    } else {
      deliver(observer, value);
      break;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_keep_attachment_order() {
    let mut subscribers = Subscribers::default();
    let a = subscribers.add("a");
    let b = subscribers.add("b");
    subscribers.add("c");
    assert_eq!(subscribers.remove(b), Some("b"));
    assert_eq!(subscribers.remove(b), None);
    let d = subscribers.add("d");
    assert!(d > a);
    assert_eq!(subscribers.iter().copied().collect::<Vec<_>>(), vec!["a", "c", "d"]);
    assert_eq!(subscribers.len(), 3);
  }

  #[test]
  fn broadcast_reaches_every_observer_in_order() {
    let mut got = vec![];
    broadcast(["x", "y", "z"], String::from("v"), |ob, v| got.push(format!("{ob}:{v}")));
    assert_eq!(got, vec!["x:v", "y:v", "z:v"]);
  }
}
