//! Screen capture using GDI.
//!
//! Copies the on-screen pixels under a window's rectangle (what the user
//! sees, including anything overlapping it) into a `Frame`.

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HBITMAP, HDC,
    HGDIOBJ, SRCCOPY,
};

use super::region::{capture_rect, ScreenRect};
use super::{CaptureError, CaptureRegion, Frame, FrameSource, WindowHandle, WindowSystem};

/// `FrameSource` that reads the screen through GDI, using a `WindowSystem`
/// for window bounds.
pub struct GdiScreen<W: WindowSystem> {
    windows: W,
}

impl<W: WindowSystem> GdiScreen<W> {
    pub fn new(windows: W) -> Self {
        Self { windows }
    }

    fn capture_with(
        &self,
        window: WindowHandle,
        region: Option<&CaptureRegion>,
    ) -> Result<Frame, CaptureError> {
        let bounds = self
            .windows
            .window_bounds(window)
            .ok_or(CaptureError::InvalidWindow(window))?;
        let rect = capture_rect(bounds, region)?;
        copy_from_screen(rect)
    }
}

impl<W: WindowSystem> FrameSource for GdiScreen<W> {
    fn capture(&mut self, window: WindowHandle) -> Result<Frame, CaptureError> {
        self.capture_with(window, None)
    }

    fn capture_region(
        &mut self,
        window: WindowHandle,
        region: &CaptureRegion,
    ) -> Result<Frame, CaptureError> {
        self.capture_with(window, Some(region))
    }
}

/// GDI objects created for one copy, released in reverse order on drop.
struct GdiCopy {
    screen_dc: HDC,
    mem_dc: HDC,
    bitmap: HBITMAP,
    previous: HGDIOBJ,
}

impl Drop for GdiCopy {
    fn drop(&mut self) {
        unsafe {
            if !self.previous.is_invalid() {
                SelectObject(self.mem_dc, self.previous);
            }
            if !self.bitmap.is_invalid() {
                let _ = DeleteObject(self.bitmap);
            }
            if !self.mem_dc.is_invalid() {
                let _ = DeleteDC(self.mem_dc);
            }
            ReleaseDC(HWND::default(), self.screen_dc);
        }
    }
}

/// Copies a screen rectangle into an RGBA frame.
fn copy_from_screen(rect: ScreenRect) -> Result<Frame, CaptureError> {
    let (Ok(width), Ok(height)) = (i32::try_from(rect.width), i32::try_from(rect.height)) else {
        return Err(CaptureError::Screen(format!(
            "Capture area too large ({}x{})",
            rect.width, rect.height
        )));
    };

    let mut copy = unsafe {
        let screen_dc = GetDC(HWND::default());
        if screen_dc.is_invalid() {
            return Err(CaptureError::Screen("GetDC failed".to_string()));
        }
        GdiCopy {
            screen_dc,
            mem_dc: CreateCompatibleDC(screen_dc),
            bitmap: HBITMAP::default(),
            previous: HGDIOBJ::default(),
        }
    };
    if copy.mem_dc.is_invalid() {
        return Err(CaptureError::Screen("CreateCompatibleDC failed".to_string()));
    }

    unsafe {
        copy.bitmap = CreateCompatibleBitmap(copy.screen_dc, width, height);
        if copy.bitmap.is_invalid() {
            return Err(CaptureError::Screen(
                "CreateCompatibleBitmap failed".to_string(),
            ));
        }
        copy.previous = SelectObject(copy.mem_dc, copy.bitmap);

        BitBlt(
            copy.mem_dc,
            0,
            0,
            width,
            height,
            copy.screen_dc,
            rect.x,
            rect.y,
            SRCCOPY,
        )
        .map_err(|e| CaptureError::Screen(format!("BitBlt failed: {}", e)))?;
    }

    // Negative height requests a top-down DIB so rows come out in frame order
    let mut info = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width,
            biHeight: -height,
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut bgra = vec![0u8; rect.width as usize * rect.height as usize * 4];

    let lines = unsafe {
        // The bitmap must not be selected into a DC while GetDIBits reads it
        SelectObject(copy.mem_dc, copy.previous);
        copy.previous = HGDIOBJ::default();
        GetDIBits(
            copy.mem_dc,
            copy.bitmap,
            0,
            rect.height,
            Some(bgra.as_mut_ptr() as *mut std::ffi::c_void),
            &mut info,
            DIB_RGB_COLORS,
        )
    };
    if lines != height {
        return Err(CaptureError::Screen(format!(
            "GetDIBits returned {} of {} lines",
            lines, height
        )));
    }

    bgra_to_frame(rect.width, rect.height, bgra)
}

/// Converts a BGRA buffer to an opaque RGBA frame.
///
/// GDI leaves the alpha byte undefined (usually zero) for screen copies.
fn bgra_to_frame(width: u32, height: u32, mut buffer: Vec<u8>) -> Result<Frame, CaptureError> {
    for pixel in buffer.chunks_exact_mut(4) {
        pixel.swap(0, 2);
        pixel[3] = 255;
    }
    Frame::from_raw(width, height, buffer)
        .ok_or_else(|| CaptureError::Screen("Pixel buffer size mismatch".to_string()))
}
