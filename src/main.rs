//! Image to Input
//!
//! Watches a game window and answers what it shows with virtual controller
//! input: each frame is compared against reference images and a match
//! triggers a fixed button sequence on a vJoy device.

// The capture and driver backends are Windows-only; elsewhere only the tests use the core
#![cfg_attr(not(windows), allow(dead_code))]

mod automation;
mod capture;
mod logging;
mod paths;

use anyhow::Result;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = paths::ensure_directories() {
        eprintln!("Failed to create log directory: {}", e);
    }
    logging::init_logging(&paths::get_logs_dir());
    logging::install_panic_hook();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(windows)]
fn run() -> Result<()> {
    use automation::{run_automation, AutomationContext, VJoyDriver};
    use capture::{find_process_window, GdiScreen, Win32Windows};

    let config = automation::load_config();
    let base_dir = paths::get_exe_dir();

    let classifier = config.build_classifier(base_dir)?;
    let driver = VJoyDriver::load(&config.vjoy_dll_path)?;
    let process = find_process_window(&config.process_name);

    let windows = Win32Windows;
    let mut ctx = AutomationContext::new(
        &config,
        classifier,
        GdiScreen::new(windows),
        windows,
        config.backup_path(base_dir),
    );

    run_automation(
        &mut ctx,
        driver,
        config.device_id,
        &config.process_name,
        process,
    )?;
    Ok(())
}

#[cfg(not(windows))]
fn run() -> Result<()> {
    anyhow::bail!("Screen capture and the vJoy driver are only available on Windows")
}
