//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Publish first table → Bind listener → Serve
//!
//! Reload (reload.rs):
//!     Change notification → Load → Normalize → Build → Atomic swap
//!
//! Shutdown (shutdown.rs):
//!     Signal / STOP command → Stop accepting → Drain in-flight → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then listener
//! - Errors during startup or reload map to process exit codes

pub mod reload;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use reload::ReloadController;
pub use shutdown::Shutdown;
pub use startup::FatalError;
