//! Win32 window and process access.

use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;

use windows::Win32::Foundation::{
    CloseHandle, BOOL, HANDLE, HWND, LPARAM, RECT, TRUE, WAIT_OBJECT_0,
};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, WaitForSingleObject, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_SYNCHRONIZE,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetDesktopWindow, GetForegroundWindow, GetWindowRect, GetWindowTextLengthW,
    GetWindowTextW, GetWindowThreadProcessId, IsWindowVisible, SetForegroundWindow,
};

use super::{process_name_matches, TargetProcess, WindowHandle, WindowRect, WindowSystem};

pub(crate) fn to_hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as *mut std::ffi::c_void)
}

fn from_hwnd(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as isize)
}

/// `WindowSystem` backed by user32.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Windows;

impl WindowSystem for Win32Windows {
    fn foreground_window(&self) -> WindowHandle {
        from_hwnd(unsafe { GetForegroundWindow() })
    }

    fn desktop_window(&self) -> WindowHandle {
        from_hwnd(unsafe { GetDesktopWindow() })
    }

    fn window_bounds(&self, window: WindowHandle) -> Option<WindowRect> {
        if window.is_null() {
            return None;
        }
        let mut rect = RECT::default();
        unsafe { GetWindowRect(to_hwnd(window), &mut rect) }.ok()?;
        Some(WindowRect {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
        })
    }

    fn bring_to_foreground(&self, window: WindowHandle) -> bool {
        unsafe { SetForegroundWindow(to_hwnd(window)).as_bool() }
    }
}

/// A running process found through one of its visible windows.
///
/// Holds a synchronisable process handle, closed on drop.
#[derive(Debug)]
pub struct Win32Process {
    pub pid: u32,
    pub name: String,
    hwnd: HWND,
    handle: HANDLE,
}

impl TargetProcess for Win32Process {
    fn main_window(&self) -> WindowHandle {
        from_hwnd(self.hwnd)
    }

    fn has_exited(&self) -> bool {
        // Signaled means the process has terminated.
        unsafe { WaitForSingleObject(self.handle, 0) == WAIT_OBJECT_0 }
    }
}

impl Drop for Win32Process {
    fn drop(&mut self) {
        let _ = unsafe { CloseHandle(self.handle) };
    }
}

/// Finds the main window of the process whose executable name matches
/// `process_name` (case-insensitive, `.exe` optional) by enumerating all
/// visible titled windows.
///
/// Returns `None` if no such process is running.
pub fn find_process_window(process_name: &str) -> Option<Win32Process> {
    struct EnumData<'a> {
        wanted: &'a str,
        found: Option<Win32Process>,
    }

    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let data = &mut *(lparam.0 as *mut EnumData);

            if !IsWindowVisible(hwnd).as_bool() {
                return TRUE;
            }

            let title_len = GetWindowTextLengthW(hwnd);
            if title_len <= 0 {
                return TRUE;
            }
            let mut title_buf: Vec<u16> = vec![0; (title_len + 1) as usize];
            GetWindowTextW(hwnd, &mut title_buf);
            let title = OsString::from_wide(&title_buf[..title_len as usize])
                .to_string_lossy()
                .to_string();

            let mut process_id: u32 = 0;
            GetWindowThreadProcessId(hwnd, Some(&mut process_id));
            if process_id == 0 {
                return TRUE;
            }

            let Ok(handle) = OpenProcess(
                PROCESS_QUERY_LIMITED_INFORMATION | PROCESS_SYNCHRONIZE,
                false,
                process_id,
            ) else {
                tracing::debug!("  [{}] \"{}\" - failed to open process", process_id, title);
                return TRUE;
            };

            let mut name_buf: Vec<u16> = vec![0; 1024];
            let mut len = name_buf.len() as u32;
            let result = QueryFullProcessImageNameW(
                handle,
                PROCESS_NAME_WIN32,
                windows::core::PWSTR(name_buf.as_mut_ptr()),
                &mut len,
            );
            if result.is_err() || len == 0 {
                tracing::debug!(
                    "  [{}] \"{}\" - failed to get process name",
                    process_id,
                    title
                );
                let _ = CloseHandle(handle);
                return TRUE;
            }

            let full_path = OsString::from_wide(&name_buf[..len as usize])
                .to_string_lossy()
                .to_string();
            let exe_name = full_path
                .rsplit('\\')
                .next()
                .unwrap_or(&full_path)
                .to_string();

            tracing::debug!("  [{}] {} - \"{}\"", process_id, exe_name, title);

            if process_name_matches(&exe_name, data.wanted) {
                data.found = Some(Win32Process {
                    pid: process_id,
                    name: exe_name,
                    hwnd,
                    handle,
                });
                return BOOL(0); // Stop enumeration
            }

            let _ = CloseHandle(handle);
            TRUE
        }
    }

    tracing::info!("Searching for {} window...", process_name);
    let mut data = EnumData {
        wanted: process_name,
        found: None,
    };
    unsafe {
        // EnumWindows reports FALSE when the callback stops early, which is expected
        let _ = EnumWindows(Some(enum_callback), LPARAM(&mut data as *mut _ as isize));
    }

    if let Some(process) = &data.found {
        tracing::info!(
            "Found process \"{}\" (pid {}) window {:?}",
            process.name,
            process.pid,
            process.hwnd
        );
    }
    data.found
}
