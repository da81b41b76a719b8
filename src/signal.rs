//! System signal handling for cancelling in-flight requests.
//!
//! * Unix: SIGTERM and Ctrl-C (SIGINT)
//! * Windows: Ctrl-C only
//!
//! # Example
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use yamusic::signal::Handler;
//!
//! async fn example() {
//!     let cancel = CancellationToken::new();
//!     let signals = Handler::new().unwrap();
//!     tokio::spawn(signals.cancel_on_signal(cancel.clone()));
//! }
//! ```

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::error::Result;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Signal that asked the process to stop.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[expect(clippy::module_name_repetitions)]
pub enum ShutdownSignal {
    /// Interrupt signal (Ctrl-C/SIGINT)
    Interrupt,
    /// Termination signal (SIGTERM)
    Terminate,
}

/// Waits for system signals.
pub struct Handler {
    #[cfg(unix)]
    sigterm: Signal,
}

impl Handler {
    /// Creates a new signal handler.
    ///
    /// # Errors
    ///
    /// Returns error if signal handlers cannot be registered.
    pub fn new() -> Result<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                sigterm: signal(SignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        Ok(Self {})
    }

    /// Waits for the next signal.
    ///
    /// On Windows, this only waits for Ctrl-C and always returns
    /// `ShutdownSignal::Interrupt`.
    pub async fn recv(&mut self) -> ShutdownSignal {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => ShutdownSignal::Interrupt,
                _ = self.sigterm.recv() => ShutdownSignal::Terminate,
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            ShutdownSignal::Interrupt
        }
    }

    /// Cancels `cancel` on the first signal.
    ///
    /// Returns early, without cancelling, when `cancel` fires first.
    pub async fn cancel_on_signal(mut self, cancel: CancellationToken) {
        tokio::select! {
            () = cancel.cancelled() => {}
            signal = self.recv() => {
                info!("received {signal}, cancelling");
                cancel.cancel();
            }
        }
    }
}

/// Formats the shutdown signal in a human-readable form.
impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "Ctrl+C"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}
