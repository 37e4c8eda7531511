//! Operational errors of the engine itself.
//!
//! Stream errors travel through the pipeline as the user's `Err` type
//! parameter and never show up here. `RxError` only covers failures of the
//! machinery around the streams: spinning up scheduler threads or reading the
//! current value of a subject.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RxError {
  /// The futures thread pool backing a `ThreadPoolScheduler` could not be
  /// built.
  #[error("failed to create thread pool: {0}")]
  ThreadPool(#[source] std::io::Error),

  /// The dedicated thread of an `EventLoopScheduler` could not be spawned.
  #[error("failed to spawn event loop thread `{name}`: {source}")]
  EventLoopSpawn {
    name: String,
    #[source]
    source: std::io::Error,
  },

  /// The subject terminated with an error, so it no longer has a value.
  #[error("subject terminated with an error")]
  SubjectErrored,

  /// The subject variant keeps no current value, or has not seen one yet.
  #[error("subject holds no current value")]
  NoValue,
}
