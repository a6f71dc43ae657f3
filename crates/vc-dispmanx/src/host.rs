//! Platform bring-up, `bcm_host_init` / `bcm_host_deinit`
//!
//! Both calls must happen exactly once and bracket every other VideoCore
//! call in the process. [`HostSession`] enforces the pairing: it initializes
//! on creation and deinitializes on [`HostSession::end`] or on drop,
//! whichever comes first.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

/// Platform bring-up and teardown
pub trait Host {
    /// `bcm_host_init`
    fn init(&self);

    /// `bcm_host_deinit`
    fn deinit(&self);
}

/// An initialized platform
#[derive(Debug)]
pub struct HostSession<H: Host> {
    host: H,
    active: bool,
}

impl<H: Host> HostSession<H> {
    /// Initialize the platform
    pub fn start(host: H) -> Self {
        host.init();
        info!("Platform initialized");
        Self { host, active: true }
    }

    /// The host behind this session
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Deinitialize the platform
    pub fn end(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.active {
            self.active = false;
            self.host.deinit();
            info!("Platform deinitialized");
        }
    }
}

impl<H: Host> Drop for HostSession<H> {
    fn drop(&mut self) {
        if self.active {
            debug!("Host session dropped without end(), deinitializing");
        }
        self.shutdown();
    }
}

#[derive(Debug, Default)]
struct HostCounters {
    init: AtomicUsize,
    deinit: AtomicUsize,
}

/// Host that only counts calls
///
/// Clones share their counters.
#[derive(Debug, Clone, Default)]
pub struct SimHost {
    counters: Arc<HostCounters>,
}

impl SimHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `init` calls so far
    #[must_use]
    pub fn init_count(&self) -> usize {
        self.counters.init.load(Ordering::SeqCst)
    }

    /// Number of `deinit` calls so far
    #[must_use]
    pub fn deinit_count(&self) -> usize {
        self.counters.deinit.load(Ordering::SeqCst)
    }

    /// Whether the platform is currently initialized
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.init_count() > self.deinit_count()
    }
}

impl Host for SimHost {
    fn init(&self) {
        self.counters.init.fetch_add(1, Ordering::SeqCst);
    }

    fn deinit(&self) {
        self.counters.deinit.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_end() {
        let host = SimHost::new();
        let session = HostSession::start(host.clone());
        assert!(host.is_initialized());

        session.end();
        assert_eq!(host.init_count(), 1);
        assert_eq!(host.deinit_count(), 1);
        assert!(!host.is_initialized());
    }

    #[test]
    fn test_session_drop_deinits_once() {
        let host = SimHost::new();
        {
            let _session = HostSession::start(host.clone());
        }
        assert_eq!(host.deinit_count(), 1);
    }
}
