//! Virtual controller input.
//!
//! `VirtualController` owns one acquired device slot and turns button
//! presses and holds into timed driver calls. The driver itself (vJoy on
//! Windows) sits behind the `InputDriver` trait.

use std::fmt;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Frame rate used when an action does not ask for a specific one.
pub const DEFAULT_FPS: u32 = 30;

/// Controller buttons, numbered as the virtual driver expects (1-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    A = 1,
    B = 2,
    X = 3,
    Y = 4,
    L1 = 5,
    R1 = 6,
    L2 = 7,
    R2 = 8,
}

impl Button {
    pub fn id(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Errors from the device lifecycle.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Error acquiring virtual device {device}. Error code: {code}")]
    Acquisition { device: u32, code: u32 },

    #[error("Error releasing virtual device {device}. Error code: {code}")]
    Release { device: u32, code: u32 },

    #[error("Virtual input driver unavailable: {0}")]
    DriverUnavailable(String),
}

/// Raw virtual input driver calls.
///
/// Each call reports success as a bool; after a failed call `last_error`
/// returns the driver/OS error code.
pub trait InputDriver {
    fn acquire(&mut self, device: u32) -> bool;

    fn set_button(&mut self, device: u32, button: u8, pressed: bool) -> bool;

    fn release(&mut self, device: u32) -> bool;

    fn last_error(&self) -> u32;
}

/// Milliseconds per logical frame, rounded down.
pub fn frame_ms(fps: u32) -> u64 {
    1000 / u64::from(fps.max(1))
}

/// Exclusive claim on one virtual controller slot.
///
/// Created by `acquire`, given back by `release`. If the controller is
/// dropped without being released (for example while unwinding from a
/// panic) the slot is released in `drop`; either way the driver sees
/// exactly one release call.
pub struct VirtualController<D: InputDriver> {
    driver: D,
    device: u32,
    released: bool,
}

impl<D: InputDriver> VirtualController<D> {
    /// Claims the device. The driver is dropped if the claim fails.
    pub fn acquire(mut driver: D, device: u32) -> Result<Self, ControllerError> {
        if !driver.acquire(device) {
            return Err(ControllerError::Acquisition {
                device,
                code: driver.last_error(),
            });
        }
        tracing::info!("Acquired virtual device {}", device);
        Ok(Self {
            driver,
            device,
            released: false,
        })
    }

    pub fn device(&self) -> u32 {
        self.device
    }

    /// Presses the buttons for one frame at the default frame rate.
    pub fn press(&mut self, buttons: &[Button]) {
        self.press_with_fps(buttons, DEFAULT_FPS);
    }

    /// Presses the buttons together for one frame, then releases them and
    /// waits one more frame.
    ///
    /// The wait after release keeps the release from being dropped by the
    /// receiving application when the next input follows immediately.
    pub fn press_with_fps(&mut self, buttons: &[Button], fps: u32) {
        let frame = Duration::from_millis(frame_ms(fps));
        self.set_all(buttons, true);
        thread::sleep(frame);
        self.set_all(buttons, false);
        thread::sleep(frame);
    }

    /// Holds the buttons for `frames` frames, then releases them and waits
    /// one more frame.
    pub fn hold(&mut self, buttons: &[Button], frames: u32, fps: u32) {
        let frame_ms = frame_ms(fps);
        self.set_all(buttons, true);
        thread::sleep(Duration::from_millis(frame_ms * u64::from(frames)));
        self.set_all(buttons, false);
        thread::sleep(Duration::from_millis(frame_ms));
    }

    fn set_all(&mut self, buttons: &[Button], pressed: bool) {
        for &button in buttons {
            if !self.driver.set_button(self.device, button.id(), pressed) {
                tracing::warn!(
                    "Failed to set button {} {} on device {}. Error code: {}",
                    button,
                    if pressed { "down" } else { "up" },
                    self.device,
                    self.driver.last_error()
                );
            }
        }
    }

    /// Gives the device back. Never retried on failure.
    pub fn release(mut self) -> Result<(), ControllerError> {
        self.release_device()
    }

    fn release_device(&mut self) -> Result<(), ControllerError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        if !self.driver.release(self.device) {
            return Err(ControllerError::Release {
                device: self.device,
                code: self.driver.last_error(),
            });
        }
        tracing::info!("Released virtual device {}", self.device);
        Ok(())
    }
}

impl<D: InputDriver> Drop for VirtualController<D> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("Virtual device {} dropped without release", self.device);
            if let Err(e) = self.release_device() {
                tracing::error!("{}", e);
            }
        }
    }
}
