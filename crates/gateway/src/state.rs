use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use cb_bus::{BusCorrelator, MessageBus};
use cb_domain::config::Config;
use cb_sessions::SessionStore;

use crate::runtime::{SessionLockMap, TurnDriver};

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    // ── Bus ───────────────────────────────────────────────────────────
    pub bus: Arc<dyn MessageBus>,
    pub correlator: Arc<BusCorrelator>,

    // ── Sessions & turns ──────────────────────────────────────────────
    pub sessions: Arc<SessionStore>,
    pub session_locks: Arc<SessionLockMap>,
    pub driver: Arc<TurnDriver>,

    /// Cancelled once on SIGINT/SIGTERM.
    pub shutdown: CancellationToken,
}
