//! Unbounded backoff polling for configuration that may not exist yet.
//!
//! The poller distinguishes two non-success outcomes: a query that itself
//! fails (transport/storage error) stops polling and surfaces the error; a
//! query that succeeds but returns no record is "not ready" and schedules a
//! reattempt. There is no attempt cap and no external cancellation: the
//! record is a hard dependency with no fallback, so the process waits as
//! long as necessary.

use crate::ports::PortError;
use std::future::Future;
use std::time::Duration;

/// Ceiling for the delay, in time units. A doubled delay that would exceed
/// this resets to 1 unit instead of saturating.
pub const DELAY_CAP_UNITS: u32 = 180;

/// The doubling, capped, resetting delay sequence: 1, 2, 4, …, 128, 1, 2, …
///
/// A deliberate sawtooth rather than a plateau: after 128 the doubled value
/// (256) would exceed [`DELAY_CAP_UNITS`], so the sequence wraps back to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SawtoothDelay {
    units: u32,
}

impl SawtoothDelay {
    /// Starts the sequence at 1 unit.
    #[must_use]
    pub const fn new() -> Self {
        Self { units: 1 }
    }

    /// The delay the next wait will use, in units.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.units
    }

    /// Returns the current delay and advances the sequence: the delay
    /// doubles on every consecutive not-ready outcome and resets to 1 when
    /// the doubled value would exceed the cap.
    pub fn advance(&mut self) -> u32 {
        let delay = self.units;
        let doubled = delay.saturating_mul(2);
        self.units = if doubled > DELAY_CAP_UNITS { 1 } else { doubled };
        delay
    }
}

impl Default for SawtoothDelay {
    fn default() -> Self {
        Self::new()
    }
}

/// The poller's observable states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// A query is in flight.
    Attempting,
    /// The last query returned no record; waiting the given number of
    /// units before requerying.
    Waiting(u32),
    /// A populated record was observed.
    Succeeded,
    /// The query itself failed.
    Failed,
}

/// The polling state machine. Its only transition logic is the sawtooth
/// delay rule; the async driver in [`BackoffPoller`] supplies the timer.
#[derive(Debug)]
pub struct PollMachine {
    state: PollState,
    delay: SawtoothDelay,
    not_ready: u32,
    waited_units: u64,
}

impl PollMachine {
    /// Starts in the attempting state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: PollState::Attempting,
            delay: SawtoothDelay::new(),
            not_ready: 0,
            waited_units: 0,
        }
    }

    /// The query returned no record: transition to waiting and return the
    /// delay, in units, to sleep before the next attempt.
    pub fn observe_empty(&mut self) -> u32 {
        let units = self.delay.advance();
        self.not_ready += 1;
        self.waited_units += u64::from(units);
        self.state = PollState::Waiting(units);
        units
    }

    /// The query returned a populated record.
    pub fn observe_record(&mut self) {
        self.state = PollState::Succeeded;
    }

    /// The query itself failed.
    pub fn observe_error(&mut self) {
        self.state = PollState::Failed;
    }

    /// The wait elapsed; transition back to attempting.
    pub fn resume(&mut self) {
        self.state = PollState::Attempting;
    }

    /// The current state.
    #[must_use]
    pub const fn state(&self) -> PollState {
        self.state
    }

    /// How many not-ready outcomes have been observed.
    #[must_use]
    pub const fn not_ready(&self) -> u32 {
        self.not_ready
    }

    /// Total units waited across all not-ready outcomes.
    #[must_use]
    pub const fn waited_units(&self) -> u64 {
        self.waited_units
    }
}

impl Default for PollMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// What a completed poll waited through, for logs and assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Not-ready outcomes observed before the record appeared.
    pub not_ready: u32,
    /// Total delay slept.
    pub waited: Duration,
}

/// A successfully polled value together with its wait summary.
#[derive(Debug)]
pub struct Polled<T> {
    /// The record that finally appeared.
    pub value: T,
    /// What the poll waited through.
    pub summary: PollSummary,
}

/// Drives a [`PollMachine`] against an async query until a record appears
/// or the query fails.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPoller {
    unit: Duration,
}

impl BackoffPoller {
    /// Creates a poller with the given time unit.
    #[must_use]
    pub const fn new(unit: Duration) -> Self {
        Self { unit }
    }

    /// The production default: one-second units.
    #[must_use]
    pub const fn seconds() -> Self {
        Self::new(Duration::from_secs(1))
    }

    /// The configured time unit.
    #[must_use]
    pub const fn unit(&self) -> Duration {
        self.unit
    }

    /// Polls `query` until it yields a record.
    ///
    /// A query error stops polling immediately and is surfaced untouched; a
    /// `None` result sleeps out the next sawtooth delay and requeries.
    /// Never terminates on a not-ready outcome.
    pub async fn poll<T, F, Fut>(&self, mut query: F) -> Result<Polled<T>, PortError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, PortError>>,
    {
        let mut machine = PollMachine::new();

        loop {
            match query().await {
                Err(err) => {
                    machine.observe_error();
                    return Err(err);
                }
                Ok(Some(value)) => {
                    machine.observe_record();
                    let waited_units =
                        u32::try_from(machine.waited_units()).unwrap_or(u32::MAX);
                    return Ok(Polled {
                        value,
                        summary: PollSummary {
                            not_ready: machine.not_ready(),
                            waited: self.unit.saturating_mul(waited_units),
                        },
                    });
                }
                Ok(None) => {
                    let units = machine.observe_empty();
                    tracing::warn!(
                        retry_in_units = units,
                        not_ready = machine.not_ready(),
                        "record not ready; retrying after backoff"
                    );
                    tokio::time::sleep(self.unit.saturating_mul(units)).await;
                    machine.resume();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn sawtooth_doubles_then_wraps() {
        let mut delay = SawtoothDelay::new();
        let observed: Vec<u32> = (0..10).map(|_| delay.advance()).collect();

        assert_eq!(observed, vec![1, 2, 4, 8, 16, 32, 64, 128, 1, 2]);
    }

    #[test]
    fn sawtooth_never_exceeds_the_cap() {
        let mut delay = SawtoothDelay::new();
        for _ in 0..1000 {
            assert!(delay.advance() <= DELAY_CAP_UNITS);
        }
    }

    #[test]
    fn sawtooth_sequence_matches_the_closed_form() {
        let mut delay = SawtoothDelay::new();
        for n in 0..8u32 {
            assert_eq!(delay.advance(), (1u32 << n).min(128));
        }
    }

    #[test]
    fn machine_transitions_through_waiting_and_back() {
        let mut machine = PollMachine::new();
        assert_eq!(machine.state(), PollState::Attempting);

        let units = machine.observe_empty();
        assert_eq!(units, 1);
        assert_eq!(machine.state(), PollState::Waiting(1));

        machine.resume();
        assert_eq!(machine.state(), PollState::Attempting);

        machine.observe_record();
        assert_eq!(machine.state(), PollState::Succeeded);
    }

    #[test]
    fn machine_accumulates_waits() {
        let mut machine = PollMachine::new();
        for _ in 0..3 {
            machine.observe_empty();
            machine.resume();
        }

        assert_eq!(machine.not_ready(), 3);
        assert_eq!(machine.waited_units(), 1 + 2 + 4);
    }

    #[test]
    fn machine_records_query_failure() {
        let mut machine = PollMachine::new();
        machine.observe_error();
        assert_eq!(machine.state(), PollState::Failed);
    }

    #[tokio::test]
    async fn poll_returns_immediately_when_the_record_exists() {
        let poller = BackoffPoller::new(Duration::from_millis(1));

        let polled = poller
            .poll(|| async { Ok(Some("record")) })
            .await
            .unwrap();

        assert_eq!(polled.value, "record");
        assert_eq!(polled.summary.not_ready, 0);
        assert_eq!(polled.summary.waited, Duration::ZERO);
    }

    #[tokio::test]
    async fn poll_waits_out_not_ready_outcomes() {
        let poller = BackoffPoller::new(Duration::from_millis(1));
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let polled = poller
            .poll(move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                        Ok(None)
                    } else {
                        Ok(Some(42))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(polled.value, 42);
        assert_eq!(polled.summary.not_ready, 3);
        assert_eq!(polled.summary.waited, Duration::from_millis(1 + 2 + 4));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn poll_surfaces_query_errors_without_retrying() {
        let poller = BackoffPoller::new(Duration::from_millis(1));
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<Polled<()>, _> = poller
            .poll(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow::anyhow!("connection refused"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn poll_does_not_give_up_on_a_long_not_ready_run() {
        let poller = BackoffPoller::new(Duration::from_micros(1));
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        // 20 not-ready outcomes span two sawtooth wraps.
        let polled = poller
            .poll(move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 20 {
                        Ok(None)
                    } else {
                        Ok(Some(()))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(polled.summary.not_ready, 20);
    }
}
