use crate::{
  observable::{CoreObservable, ObservableType},
  scheduler::Scheduler,
  subscription::MultiSubscription,
};
use tracing::trace;

/// Runs the subscribe call of the upstream chain as a task on `scheduler`.
///
/// Everything a source does synchronously while being subscribed, which for
/// cold sources means emitting, happens in that context. When a chain holds
/// several `subscribe_on` stages the one closest to the source decides, as it
/// is the last to move the subscribe call.
#[derive(Clone)]
pub struct SubscribeOnOp<S, SD> {
  pub(crate) source: S,
  pub(crate) scheduler: SD,
}

impl<S: ObservableType, SD> ObservableType for SubscribeOnOp<S, SD> {
  type Item = S::Item;
  type Err = S::Err;
}

impl<S, SD, O> CoreObservable<O> for SubscribeOnOp<S, SD>
where
  S: CoreObservable<O> + Send + 'static,
  S::Unsub: Send + 'static,
  SD: Scheduler,
  O: Send + 'static,
{
  type Unsub = MultiSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let subscription = MultiSubscription::new();
    let c_subscription = subscription.clone();
    let source = self.source;
    trace!("subscribe_on: scheduling subscribe");
    let handle = self
      .scheduler
      .schedule(Box::new(move || c_subscription.add(source.actual_subscribe(observer))));
    subscription.add(handle);
    subscription
  }
}
