use crate::observable::SubjectLifetime;

/// Configuration of [`share_with`](crate::observable::Observable::share_with).
///
/// `replay` selects the subject: 0 publishes, 1 keeps only the latest value,
/// more keeps a replay buffer of that size. `lifetime` selects whether the
/// subject and its buffer outlive a connection.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let config = ShareConfig::new().replay(2).lifetime(SubjectLifetime::SharedForever);
/// assert_eq!(config.replay_size(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShareConfig {
  replay: usize,
  lifetime: SubjectLifetime,
}

impl ShareConfig {
  pub fn new() -> Self { Self::default() }

  pub fn replay(mut self, count: usize) -> Self {
    self.replay = count;
    self
  }

  pub fn lifetime(mut self, lifetime: SubjectLifetime) -> Self {
    self.lifetime = lifetime;
    self
  }

  pub fn replay_size(&self) -> usize { self.replay }

  pub fn subject_lifetime(&self) -> SubjectLifetime { self.lifetime }
}
