//! Single-use completion gate between the driver thread and the main sequence
//!
//! [`handshake`] returns a [`Completer`] for the port callback and a
//! [`Handshake`] for the waiting thread. The gate carries one value over a
//! capacity-1 channel:
//!
//! ```text
//! driver thread                          main thread
//! ─────────────                          ───────────
//! callback(buf 0) ─ try_claim() = true
//!                   show frame ...
//!                   post(frame) ───────> wait() returns frame
//! callback(buf 1) ─ try_claim() = false
//!                   ignored, counted
//! ```
//!
//! Only the first completion claims the gate. Later ones are refused at
//! [`Completer::try_claim`] and counted, so the main thread can report them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the completion handshake
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeError {
    /// Every completer was dropped without posting
    #[error("completer dropped without posting")]
    Closed,

    /// Nothing was posted within the timeout
    #[error("no completion within {0:?}")]
    TimedOut(Duration),

    /// The gate already carries a value
    #[error("completion already posted")]
    AlreadyPosted,

    /// The waiting side is gone
    #[error("waiter dropped before the post")]
    NoWaiter,
}

#[derive(Debug, Default)]
struct Gate {
    claimed: AtomicBool,
    ignored: AtomicUsize,
}

/// Create a connected completer and waiter
pub fn handshake<T>() -> (Completer<T>, Handshake<T>) {
    let (tx, rx) = mpsc::sync_channel(1);
    let gate = Arc::new(Gate::default());
    debug!("Completion handshake created");
    (
        Completer {
            tx,
            gate: gate.clone(),
        },
        Handshake { rx, gate },
    )
}

/// Posting half, moved into the port callback
#[derive(Debug)]
pub struct Completer<T> {
    tx: SyncSender<T>,
    gate: Arc<Gate>,
}

impl<T> Completer<T> {
    /// Claim the gate for this completion
    ///
    /// Returns `true` exactly once across all completions. Every later call
    /// returns `false` and is counted as ignored.
    pub fn try_claim(&self) -> bool {
        let won = self
            .gate
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if !won {
            let ignored = self.gate.ignored.fetch_add(1, Ordering::AcqRel) + 1;
            warn!("Ignoring completion after the first ({} ignored so far)", ignored);
        }
        won
    }

    /// Post the claimed completion, waking the waiter
    ///
    /// Never blocks.
    pub fn post(&self, value: T) -> Result<(), HandshakeError> {
        match self.tx.try_send(value) {
            Ok(()) => {
                debug!("Completion posted");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(HandshakeError::AlreadyPosted),
            Err(TrySendError::Disconnected(_)) => Err(HandshakeError::NoWaiter),
        }
    }
}

/// Waiting half, kept by the main sequence
#[derive(Debug)]
pub struct Handshake<T> {
    rx: Receiver<T>,
    gate: Arc<Gate>,
}

impl<T> Handshake<T> {
    /// Block until the completion is posted
    pub fn wait(&self) -> Result<T, HandshakeError> {
        self.rx.recv().map_err(|_| HandshakeError::Closed)
    }

    /// Block until the completion is posted or `timeout` passes
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, HandshakeError> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => HandshakeError::TimedOut(timeout),
            RecvTimeoutError::Disconnected => HandshakeError::Closed,
        })
    }

    /// Whether a completion has claimed the gate
    #[must_use]
    pub fn is_claimed(&self) -> bool {
        self.gate.claimed.load(Ordering::Acquire)
    }

    /// Completions refused so far
    #[must_use]
    pub fn ignored(&self) -> usize {
        self.gate.ignored.load(Ordering::Acquire)
    }

    /// Destroy the handshake and return how many completions were ignored
    pub fn close(self) -> usize {
        let ignored = self.ignored();
        debug!("Completion handshake destroyed ({} ignored)", ignored);
        ignored
    }
}
