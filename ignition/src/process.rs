//! The process boundary: uncaught defects and the bind-window suppression
//! of address-in-use conflicts.
//!
//! Any defect escaping stage logic is logged with its backtrace and the
//! process exits after a short delay so in-flight logs can flush, rather
//! than continuing in a corrupt state.

use crate::ports::PortError;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How long to wait before exiting on an uncaught defect, so logs flush.
pub const EXIT_FLUSH_DELAY: Duration = Duration::from_secs(3);

/// Installs a panic hook that logs the defect and its backtrace, then
/// exits the process after [`EXIT_FLUSH_DELAY`].
pub fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        tracing::error!("uncaught defect: {info}");
        tracing::error!("{backtrace}");
        previous(info);
        std::thread::sleep(EXIT_FLUSH_DELAY);
        std::process::exit(1);
    }));
}

/// How the fatal monitor classified a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Expected and handled locally; not a crash.
    Suppressed,
    /// Fatal to the process.
    Fatal,
}

/// Classifies process-level errors, suppressing address-in-use conflicts
/// while a bind window is open.
///
/// During a listener bind, a prior instance of the same process may still
/// hold the port; that conflict is retried locally and must not be treated
/// as a crash. Suppression is active only while a [`SuppressionWindow`] is
/// alive and is turned off as soon as the window drops, when the listener
/// is confirmed live or the attempt is abandoned.
#[derive(Debug, Default)]
pub struct FatalMonitor {
    suppress_addr_in_use: AtomicBool,
}

impl FatalMonitor {
    /// Creates a monitor with suppression off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the suppression window for the duration of a bind attempt.
    #[must_use]
    pub fn suppression_window(&self) -> SuppressionWindow<'_> {
        self.suppress_addr_in_use.store(true, Ordering::SeqCst);
        SuppressionWindow { monitor: self }
    }

    /// Returns true while a suppression window is open.
    #[must_use]
    pub fn suppressing(&self) -> bool {
        self.suppress_addr_in_use.load(Ordering::SeqCst)
    }

    /// Classifies a process-level error: address-in-use inside an open
    /// window is suppressed, everything else is fatal.
    pub fn report(&self, err: &PortError) -> Disposition {
        if self.suppressing() && is_addr_in_use(err) {
            tracing::debug!(error = %err, "address in use during bind window; suppressed");
            Disposition::Suppressed
        } else {
            tracing::error!(error = %err, "fatal process error");
            Disposition::Fatal
        }
    }
}

/// RAII handle for the bind-attempt suppression window.
#[derive(Debug)]
pub struct SuppressionWindow<'a> {
    monitor: &'a FatalMonitor,
}

impl Drop for SuppressionWindow<'_> {
    fn drop(&mut self) {
        self.monitor
            .suppress_addr_in_use
            .store(false, Ordering::SeqCst);
    }
}

/// Returns true when the error chain bottoms out in an address-in-use
/// I/O error.
#[must_use]
pub fn is_addr_in_use(err: &PortError) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|io_err| io_err.kind() == io::ErrorKind::AddrInUse)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr_in_use_error() -> PortError {
        anyhow::Error::from(io::Error::new(io::ErrorKind::AddrInUse, "port taken"))
            .context("bind failed")
    }

    #[test]
    fn detects_addr_in_use_through_the_chain() {
        assert!(is_addr_in_use(&addr_in_use_error()));
        assert!(!is_addr_in_use(&anyhow::anyhow!("some other failure")));
    }

    #[test]
    fn suppression_is_scoped_to_the_window() {
        let monitor = FatalMonitor::new();
        assert!(!monitor.suppressing());

        {
            let _window = monitor.suppression_window();
            assert!(monitor.suppressing());
            assert_eq!(
                monitor.report(&addr_in_use_error()),
                Disposition::Suppressed
            );
        }

        assert!(!monitor.suppressing());
        assert_eq!(monitor.report(&addr_in_use_error()), Disposition::Fatal);
    }

    #[test]
    fn other_errors_are_fatal_even_inside_the_window() {
        let monitor = FatalMonitor::new();
        let _window = monitor.suppression_window();

        assert_eq!(
            monitor.report(&anyhow::anyhow!("broker unreachable")),
            Disposition::Fatal
        );
    }
}
