//! Automation runner - main entry point for the automation loop.
//!
//! Acquires the virtual device, validates the target process, runs the
//! state machine until the process exits, and releases the device on every
//! exit path.

use std::thread;
use thiserror::Error;

use crate::automation::backup::BackupState;
use crate::automation::input::{ControllerError, InputDriver, VirtualController};
use crate::automation::state::{AutomationContext, Lifecycle, RunSummary};
use crate::capture::{FrameSource, TargetProcess, WindowSystem};

/// Loop-fatal failures.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error(transparent)]
    Device(#[from] ControllerError),

    #[error("Process {0} not found")]
    ProcessNotFound(String),
}

/// Runs the automation loop until the monitored process exits.
///
/// Order of events:
/// 1. acquire the device (on failure nothing else happens)
/// 2. check the process was found (if not, release and stop)
/// 3. focus the process window and open the backup directory
/// 4. iterate while the process is alive
/// 5. release the device
///
/// A failed release is logged and never replaces the loop's own result.
pub fn run_automation<D, P, F, W>(
    ctx: &mut AutomationContext<F, W>,
    driver: D,
    device_id: u32,
    process_name: &str,
    process: Option<P>,
) -> Result<RunSummary, AutomationError>
where
    D: InputDriver,
    P: TargetProcess,
    F: FrameSource,
    W: WindowSystem,
{
    let mut controller = VirtualController::acquire(driver, device_id)?;
    ctx.lifecycle = Lifecycle::DeviceAcquired;

    let result = match process {
        Some(process) => {
            ctx.lifecycle = Lifecycle::Running;
            run_until_exit(ctx, &mut controller, &process);
            Ok(ctx.summary)
        }
        None => Err(AutomationError::ProcessNotFound(process_name.to_string())),
    };

    if let Err(e) = controller.release() {
        tracing::error!("{}", e);
    }
    ctx.lifecycle = Lifecycle::DeviceReleased;

    result
}

fn run_until_exit<D, P, F, W>(
    ctx: &mut AutomationContext<F, W>,
    controller: &mut VirtualController<D>,
    process: &P,
) where
    D: InputDriver,
    P: TargetProcess,
    F: FrameSource,
    W: WindowSystem,
{
    let window = process.main_window();

    // Give the window time to show up after activation
    if !ctx.windows.bring_to_foreground(window) {
        tracing::warn!("Could not bring window {:?} to the foreground", window);
    }
    thread::sleep(ctx.focus_delay);
    if ctx.windows.foreground_window() != window {
        tracing::warn!("Target window is not in the foreground; captures may show other windows");
    }

    if let Some(dir) = ctx.backup_dir.clone() {
        match BackupState::open(&dir) {
            Ok(backup) => {
                tracing::info!(
                    "Backing up frames to {} (next id {})",
                    backup.dir().display(),
                    backup.next_id()
                );
                ctx.backup = Some(backup);
            }
            Err(e) => tracing::warn!("Backup disabled: {:#}", e),
        }
    }

    tracing::info!(
        "Monitoring with {} reference(s), margin {}, device {}",
        ctx.classifier.triggers().len(),
        ctx.classifier.margin(),
        controller.device()
    );

    // Liveness is only checked between iterations
    while !process.has_exited() {
        ctx.step(controller, window);
    }

    tracing::info!(
        "Process exited after {} iterations ({} attacks, {} heals, {} idle, {} capture failures)",
        ctx.summary.iterations,
        ctx.summary.attacks,
        ctx.summary.heals,
        ctx.summary.idle,
        ctx.summary.capture_failures
    );
}
