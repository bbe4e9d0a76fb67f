//! vJoy virtual joystick driver.
//!
//! `vJoyInterface.dll` is loaded at runtime so the program starts (and can
//! report a useful error) on machines without vJoy installed.

use windows::core::{s, HSTRING, PCSTR};
use windows::Win32::Foundation::{FreeLibrary, GetLastError, BOOL, HMODULE};
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

use crate::automation::input::{ControllerError, InputDriver};

type AcquireVjdFn = unsafe extern "C" fn(rid: u32) -> BOOL;
type SetBtnFn = unsafe extern "C" fn(value: BOOL, rid: u32, nbtn: u8) -> BOOL;
type ReleaseVjdFn = unsafe extern "C" fn(rid: u32) -> BOOL;

/// `InputDriver` backed by the vJoy interface library.
pub struct VJoyDriver {
    module: HMODULE,
    acquire_vjd: AcquireVjdFn,
    set_btn: SetBtnFn,
    release_vjd: ReleaseVjdFn,
    last_error: u32,
}

impl VJoyDriver {
    /// Loads the interface library and resolves its entry points.
    pub fn load(dll_path: &str) -> Result<Self, ControllerError> {
        let module = unsafe { LoadLibraryW(&HSTRING::from(dll_path)) }.map_err(|e| {
            ControllerError::DriverUnavailable(format!("Failed to load {}: {}", dll_path, e))
        })?;

        match unsafe { Self::bind(module) } {
            Ok(driver) => {
                tracing::info!("Loaded vJoy interface from {}", dll_path);
                Ok(driver)
            }
            Err(e) => {
                let _ = unsafe { FreeLibrary(module) };
                Err(e)
            }
        }
    }

    unsafe fn bind(module: HMODULE) -> Result<Self, ControllerError> {
        unsafe {
            let acquire = proc_address(module, s!("AcquireVJD"), "AcquireVJD")?;
            let set_btn = proc_address(module, s!("SetBtn"), "SetBtn")?;
            let release = proc_address(module, s!("ReleaseVJD"), "ReleaseVJD")?;

            Ok(Self {
                module,
                acquire_vjd: std::mem::transmute::<unsafe extern "system" fn() -> isize, AcquireVjdFn>(
                    acquire,
                ),
                set_btn: std::mem::transmute::<unsafe extern "system" fn() -> isize, SetBtnFn>(
                    set_btn,
                ),
                release_vjd: std::mem::transmute::<unsafe extern "system" fn() -> isize, ReleaseVjdFn>(
                    release,
                ),
                last_error: 0,
            })
        }
    }

    /// Records the thread's last error after a failed call.
    fn check(&mut self, ok: BOOL) -> bool {
        if ok.as_bool() {
            return true;
        }
        self.last_error = unsafe { GetLastError() }.0;
        false
    }
}

unsafe fn proc_address(
    module: HMODULE,
    symbol: PCSTR,
    name: &str,
) -> Result<unsafe extern "system" fn() -> isize, ControllerError> {
    unsafe { GetProcAddress(module, symbol) }.ok_or_else(|| {
        ControllerError::DriverUnavailable(format!("vJoy interface has no {} export", name))
    })
}

impl InputDriver for VJoyDriver {
    fn acquire(&mut self, device: u32) -> bool {
        let ok = unsafe { (self.acquire_vjd)(device) };
        self.check(ok)
    }

    fn set_button(&mut self, device: u32, button: u8, pressed: bool) -> bool {
        let ok = unsafe { (self.set_btn)(BOOL::from(pressed), device, button) };
        self.check(ok)
    }

    fn release(&mut self, device: u32) -> bool {
        let ok = unsafe { (self.release_vjd)(device) };
        self.check(ok)
    }

    fn last_error(&self) -> u32 {
        self.last_error
    }
}

impl Drop for VJoyDriver {
    fn drop(&mut self) {
        let _ = unsafe { FreeLibrary(self.module) };
    }
}
