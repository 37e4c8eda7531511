//! Operators of the `Observable` trait. Each module holds the stage type an
//! operator returns and the observer it subscribes its source with.

pub mod filter;
pub mod instrument;
pub mod map;
pub mod observe_on;
pub mod on_error;
pub mod ref_count;
pub mod retry;
pub mod share;
pub mod subscribe_on;
pub mod take;
