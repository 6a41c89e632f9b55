//! Core runtime: per-user turn locks, tool dispatch and the turn driver
//! that ties the session store, model and operations service together.

pub mod session_lock;
pub mod tools;
pub mod turn;

pub use session_lock::{SessionBusy, SessionLockMap};
pub use tools::{build_tool_definitions, ToolDispatcher};
pub use turn::{ModelSettings, TurnDriver, TurnOutcome};
