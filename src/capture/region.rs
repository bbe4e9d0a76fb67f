//! Capture rectangle computation.
//!
//! Turns window bounds (and an optional sub-region) into the absolute screen
//! rectangle that gets copied. Kept free of Win32 calls so it can be tested
//! on any platform.

use serde::{Deserialize, Serialize};

use super::CaptureError;

/// Window bounds in screen coordinates, as reported by `GetWindowRect`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// A sub-region anchored at the window's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    /// Horizontal offset from the window's left edge (pixels)
    pub offset_x: i32,
    /// Vertical offset from the window's top edge (pixels)
    pub offset_y: i32,
    pub width: u32,
    pub height: u32,
}

/// Absolute screen rectangle to copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Computes the screen rectangle for a capture.
///
/// Without a region the whole window rectangle is used. With a region the
/// rectangle starts at the window's top-left plus the offset and has the
/// region's size, regardless of the window's own size.
///
/// Returns `CaptureError::ZeroArea` if either dimension is not positive and
/// `CaptureError::OffsetOutOfRange` if the offset leaves screen coordinates.
pub fn capture_rect(
    bounds: WindowRect,
    region: Option<&CaptureRegion>,
) -> Result<ScreenRect, CaptureError> {
    let (x, y, width, height) = match region {
        Some(region) => {
            let (x, y) = region_origin(bounds, region)?;
            (x, y, i64::from(region.width), i64::from(region.height))
        }
        None => (
            bounds.left,
            bounds.top,
            i64::from(bounds.right) - i64::from(bounds.left),
            i64::from(bounds.bottom) - i64::from(bounds.top),
        ),
    };

    if width <= 0 || height <= 0 {
        return Err(CaptureError::ZeroArea { width, height });
    }

    Ok(ScreenRect {
        x,
        y,
        width: width as u32,
        height: height as u32,
    })
}

fn region_origin(
    bounds: WindowRect,
    region: &CaptureRegion,
) -> Result<(i32, i32), CaptureError> {
    bounds
        .left
        .checked_add(region.offset_x)
        .zip(bounds.top.checked_add(region.offset_y))
        .ok_or(CaptureError::OffsetOutOfRange {
            offset_x: region.offset_x,
            offset_y: region.offset_y,
        })
}
