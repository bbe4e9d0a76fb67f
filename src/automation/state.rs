//! Automation state machine for the perception-action loop.
//!
//! Each iteration sequences through: Capturing → Classifying → Attacking /
//! Healing / Idle. No state is carried from one iteration to the next.

use std::fmt;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::automation::actions::Action;
use crate::automation::backup::BackupState;
use crate::automation::config::{AutomationConfig, CaptureTarget};
use crate::automation::detection::Classifier;
use crate::automation::input::{InputDriver, VirtualController};
use crate::capture::{CaptureRegion, Frame, FrameSource, WindowHandle, WindowSystem};

/// Per-iteration states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Between iterations, or no action taken
    Idle,
    /// Reading a frame from the target window
    Capturing,
    /// Comparing the frame against the references
    Classifying,
    /// Running the attack sequence
    Attacking,
    /// Running the heal sequence
    Healing,
}

impl LoopState {
    fn performing(action: Action) -> Self {
        match action {
            Action::Attack => LoopState::Attacking,
            Action::Heal => LoopState::Healing,
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Idle => write!(f, "Idle"),
            LoopState::Capturing => write!(f, "Capturing"),
            LoopState::Classifying => write!(f, "Classifying"),
            LoopState::Attacking => write!(f, "Attacking"),
            LoopState::Healing => write!(f, "Healing"),
        }
    }
}

/// Virtual device lifecycle around the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    DeviceAcquired,
    Running,
    DeviceReleased,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Uninitialized => write!(f, "Uninitialized"),
            Lifecycle::DeviceAcquired => write!(f, "Device acquired"),
            Lifecycle::Running => write!(f, "Running"),
            Lifecycle::DeviceReleased => write!(f, "Device released"),
        }
    }
}

/// What one iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Performed(Action),
    NoAction,
    /// No usable frame this iteration; classification was skipped
    CaptureFailed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Performed(action) => write!(f, "{}", action),
            Outcome::NoAction => write!(f, "No action"),
            Outcome::CaptureFailed => write!(f, "Capture failed"),
        }
    }
}

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub attacks: u64,
    pub heals: u64,
    pub idle: u64,
    pub capture_failures: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: Outcome) {
        self.iterations += 1;
        match outcome {
            Outcome::Performed(Action::Attack) => self.attacks += 1,
            Outcome::Performed(Action::Heal) => self.heals += 1,
            Outcome::NoAction => self.idle += 1,
            Outcome::CaptureFailed => self.capture_failures += 1,
        }
    }
}

/// Automation context holding state, the classifier and the collaborators.
pub struct AutomationContext<F: FrameSource, W: WindowSystem> {
    /// Current per-iteration state
    pub state: LoopState,
    /// Device lifecycle state
    pub lifecycle: Lifecycle,
    pub summary: RunSummary,
    pub(crate) classifier: Classifier,
    pub(crate) frames: F,
    pub(crate) windows: W,
    capture_target: CaptureTarget,
    capture_region: Option<CaptureRegion>,
    pub(crate) focus_delay: Duration,
    capture_retry: Duration,
    pub(crate) backup_dir: Option<PathBuf>,
    pub(crate) backup: Option<BackupState>,
}

impl<F: FrameSource, W: WindowSystem> AutomationContext<F, W> {
    /// Creates a new automation context.
    ///
    /// `backup_dir` is opened when the loop starts running, not here.
    pub fn new(
        config: &AutomationConfig,
        classifier: Classifier,
        frames: F,
        windows: W,
        backup_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            state: LoopState::Idle,
            lifecycle: Lifecycle::Uninitialized,
            summary: RunSummary::default(),
            classifier,
            frames,
            windows,
            capture_target: config.capture_target,
            capture_region: config.capture_region,
            focus_delay: Duration::from_millis(config.focus_delay_ms),
            capture_retry: Duration::from_millis(config.capture_retry_ms),
            backup_dir,
            backup: None,
        }
    }

    /// Runs one capture-classify-act iteration.
    ///
    /// A started action always runs to completion.
    pub fn step<D: InputDriver>(
        &mut self,
        controller: &mut VirtualController<D>,
        process_window: WindowHandle,
    ) -> Outcome {
        self.state = LoopState::Capturing;
        let outcome = match self.capture(process_window) {
            Some(frame) => {
                self.archive(&frame);
                self.state = LoopState::Classifying;
                match self.classifier.classify(&frame).map(|t| t.action) {
                    Some(action) => {
                        self.state = LoopState::performing(action);
                        action.perform(controller);
                        Outcome::Performed(action)
                    }
                    None => Outcome::NoAction,
                }
            }
            None => {
                thread::sleep(self.capture_retry);
                Outcome::CaptureFailed
            }
        };
        self.state = LoopState::Idle;
        self.summary.record(outcome);
        tracing::info!("{}", outcome);
        outcome
    }

    /// Captures the configured window. Failed and zero-area captures yield
    /// `None` so they never reach the classifier.
    fn capture(&mut self, process_window: WindowHandle) -> Option<Frame> {
        let window = match self.capture_target {
            CaptureTarget::ProcessWindow => process_window,
            CaptureTarget::Foreground => self.windows.foreground_window(),
            CaptureTarget::Desktop => self.windows.desktop_window(),
        };
        let result = match &self.capture_region {
            Some(region) => self.frames.capture_region(window, region),
            None => self.frames.capture(window),
        };
        match result {
            Ok(frame) if frame.width() > 0 && frame.height() > 0 => Some(frame),
            Ok(frame) => {
                tracing::warn!(
                    "Capture returned an empty frame ({}x{})",
                    frame.width(),
                    frame.height()
                );
                None
            }
            Err(e) => {
                tracing::warn!("Capture failed: {}", e);
                None
            }
        }
    }

    fn archive(&mut self, frame: &Frame) {
        let Some(backup) = self.backup.as_mut() else {
            return;
        };
        match backup.save_if_changed(frame) {
            Ok(Some(path)) => tracing::debug!("Backup saved: {}", path.display()),
            Ok(None) => {}
            Err(e) => tracing::warn!("Backup failed: {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(format!("{}", LoopState::Idle), "Idle");
        assert_eq!(format!("{}", LoopState::Attacking), "Attacking");
        assert_eq!(format!("{}", Lifecycle::DeviceReleased), "Device released");
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Performed(Action::Attack).to_string(), "Attack");
        assert_eq!(Outcome::Performed(Action::Heal).to_string(), "Heal");
        assert_eq!(Outcome::NoAction.to_string(), "No action");
        assert_eq!(Outcome::CaptureFailed.to_string(), "Capture failed");
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::default();
        summary.record(Outcome::Performed(Action::Attack));
        summary.record(Outcome::NoAction);
        summary.record(Outcome::NoAction);
        summary.record(Outcome::CaptureFailed);

        assert_eq!(
            summary,
            RunSummary {
                iterations: 4,
                attacks: 1,
                heals: 0,
                idle: 2,
                capture_failures: 1,
            }
        );
    }
}
