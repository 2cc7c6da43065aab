//! Retry strategies used by individual bootstrap stages.
//!
//! Two policies live here:
//! - [`BackoffPoller`]: unbounded polling with a doubling, capped,
//!   resetting delay, for a record that may not exist yet
//! - [`BoundedRetry`]: a fixed attempt budget with immediate reattempts

mod backoff;
mod bounded;

pub use backoff::{
    BackoffPoller, PollMachine, PollState, PollSummary, Polled, SawtoothDelay,
    DELAY_CAP_UNITS,
};
pub use bounded::BoundedRetry;
