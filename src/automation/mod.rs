//! Controller automation driven by what is on screen.
//!
//! This module provides:
//! - Frame classification against reference images (`detection`)
//! - Virtual controller input with frame-based timing (`input`, `vjoy`)
//! - Fixed action sequences (`actions`)
//! - Frame archival (`backup`)
//! - The per-iteration state machine and the run loop (`state`, `runner`)

pub mod actions;
pub mod backup;
pub mod config;
pub mod detection;
pub mod input;
pub mod runner;
pub mod state;
#[cfg(windows)]
pub mod vjoy;

// Entry points used by the Windows binary
#[cfg(windows)]
pub use config::load_config;
#[cfg(windows)]
pub use runner::run_automation;
#[cfg(windows)]
pub use state::AutomationContext;
#[cfg(windows)]
pub use vjoy::VJoyDriver;
