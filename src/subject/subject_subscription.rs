use super::SubjectState;
use crate::{sink::Subscriber, subscription::Subscription};
use parking_lot::Mutex;
use std::sync::Weak;

/// Subscription handle for a Subject.
///
/// Unsubscribing disposes the observer's sink, so no further event reaches
/// it, then detaches it from the subject. The handle holds the subject
/// weakly: it never keeps a subject alive on its own.
pub struct SubjectSubscription<Item, Err> {
  subject: Weak<Mutex<SubjectState<Item, Err>>>,
  id: Option<usize>,
  sink: Subscriber<Item, Err>,
}

impl<Item, Err> SubjectSubscription<Item, Err> {
  pub(crate) fn new(
    subject: Weak<Mutex<SubjectState<Item, Err>>>, id: Option<usize>, sink: Subscriber<Item, Err>,
  ) -> Self {
    Self { subject, id, sink }
  }
}

impl<Item, Err> Clone for SubjectSubscription<Item, Err> {
  fn clone(&self) -> Self {
    Self { subject: self.subject.clone(), id: self.id, sink: self.sink.clone() }
  }
}

impl<Item, Err> Subscription for SubjectSubscription<Item, Err> {
  fn unsubscribe(self) {
    self.sink.dispose();
    let Some(id) = self.id else { return };
    if let Some(subject) = self.subject.upgrade() {
      let detached = subject.lock().detach(id);
      drop(detached);
    }
  }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}
