//! Screen capture of the target application window.
//!
//! This module provides:
//! - Frame and reference image types (`frame`)
//! - Capture rectangle computation (`region`)
//! - Window system and process access (`window`, Windows only)
//! - GDI screen capture (`screenshot`, Windows only)

pub mod frame;
pub mod region;
#[cfg(windows)]
pub mod screenshot;
#[cfg(windows)]
pub mod window;

use thiserror::Error;

pub use frame::{Frame, ReferenceImage};
pub use region::{CaptureRegion, WindowRect};
#[cfg(windows)]
pub use screenshot::GdiScreen;
#[cfg(windows)]
pub use window::{find_process_window, Win32Windows};

/// Platform-neutral window handle. Converted to `HWND` at the Win32 boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// Reasons a frame could not be captured.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Invalid window handle {0:?}")]
    InvalidWindow(WindowHandle),

    #[error("Capture area is empty ({width}x{height})")]
    ZeroArea { width: i64, height: i64 },

    #[error("Capture region offset ({offset_x}, {offset_y}) is off screen")]
    OffsetOutOfRange { offset_x: i32, offset_y: i32 },

    #[error("Screen read failed: {0}")]
    Screen(String),
}

/// Window system operations consumed by the automation loop.
pub trait WindowSystem {
    fn foreground_window(&self) -> WindowHandle;

    fn desktop_window(&self) -> WindowHandle;

    /// Returns the window's bounding rectangle, or `None` if the handle is invalid.
    fn window_bounds(&self, window: WindowHandle) -> Option<WindowRect>;

    /// Activates the window. Returns false if the system refused.
    fn bring_to_foreground(&self, window: WindowHandle) -> bool;
}

/// Produces frames of a window on demand. Implementations keep no state
/// between calls.
pub trait FrameSource {
    /// Captures the window's whole bounding rectangle.
    fn capture(&mut self, window: WindowHandle) -> Result<Frame, CaptureError>;

    /// Captures a sub-region anchored at the window's top-left plus offset.
    fn capture_region(
        &mut self,
        window: WindowHandle,
        region: &CaptureRegion,
    ) -> Result<Frame, CaptureError>;
}

/// The monitored external process.
pub trait TargetProcess {
    fn main_window(&self) -> WindowHandle;

    fn has_exited(&self) -> bool;
}

/// Compares an executable file name against the configured process name.
///
/// Case-insensitive; the `.exe` suffix is optional on either side.
pub fn process_name_matches(exe_name: &str, wanted: &str) -> bool {
    fn stem(name: &str) -> String {
        let lower = name.trim().to_lowercase();
        lower
            .strip_suffix(".exe")
            .map(str::to_string)
            .unwrap_or(lower)
    }
    let wanted = stem(wanted);
    !wanted.is_empty() && stem(exe_name) == wanted
}
