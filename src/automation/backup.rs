//! Archival of captured frames.
//!
//! Frames are saved as `1.png`, `2.png`, ... in the backup directory. A
//! frame identical to the last saved one is skipped. Numbering resumes after
//! the highest existing file so earlier runs are never overwritten.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::frame::{frames_identical, Frame};

/// Backup directory state owned by the automation loop.
#[derive(Debug)]
pub struct BackupState {
    dir: PathBuf,
    next_id: u32,
    previous: Option<Frame>,
}

impl BackupState {
    /// Opens the backup directory, creating it if needed, and recovers the
    /// last saved frame and the next file number.
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create backup directory {}", dir.display()))?;
            return Ok(Self {
                dir: dir.to_path_buf(),
                next_id: 1,
                previous: None,
            });
        }

        let last_id = highest_backup_id(dir)?;
        let next_id = match last_id {
            Some(id) => id.checked_add(1).with_context(|| {
                format!("Backup numbering exhausted in {}", dir.display())
            })?,
            None => 1,
        };
        let previous = match last_id {
            Some(id) => {
                let path = dir.join(format!("{}.png", id));
                match image::open(&path) {
                    Ok(img) => Some(img.to_rgba8()),
                    Err(e) => {
                        tracing::warn!("Could not load last backup {}: {}", path.display(), e);
                        None
                    }
                }
            }
            None => None,
        };

        Ok(Self {
            dir: dir.to_path_buf(),
            next_id,
            previous,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Saves the frame unless it equals the previously saved one.
    ///
    /// Returns the path written, or `None` when the frame was skipped.
    pub fn save_if_changed(&mut self, frame: &Frame) -> Result<Option<PathBuf>> {
        if let Some(previous) = &self.previous {
            if frames_identical(previous, frame) {
                return Ok(None);
            }
        }

        let following = self
            .next_id
            .checked_add(1)
            .context("Backup numbering exhausted")?;
        let path = self.dir.join(format!("{}.png", self.next_id));
        frame
            .save(&path)
            .with_context(|| format!("Failed to save backup {}", path.display()))?;
        self.previous = Some(frame.clone());
        self.next_id = following;
        Ok(Some(path))
    }
}

/// Finds the largest numeric `<n>.png` file name in the directory.
fn highest_backup_id(dir: &Path) -> Result<Option<u32>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read backup directory {}", dir.display()))?;

    let mut highest = None;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_png = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if !is_png {
            continue;
        }
        let Some(id) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<u32>().ok())
        else {
            continue;
        };
        highest = highest.max(Some(id));
    }
    Ok(highest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use tempfile::tempdir;

    fn solid(value: u8) -> Frame {
        ImageBuffer::from_pixel(3, 2, Rgba([value, value, value, 255]))
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempdir().unwrap();
        let backup_dir = dir.path().join("target.exe");

        let state = BackupState::open(&backup_dir).unwrap();

        assert!(backup_dir.is_dir());
        assert_eq!(state.next_id(), 1);
        assert_eq!(state.dir(), backup_dir.as_path());
    }

    #[test]
    fn test_save_skips_identical_frames() {
        let dir = tempdir().unwrap();
        let mut state = BackupState::open(dir.path()).unwrap();

        let first = state.save_if_changed(&solid(10)).unwrap();
        assert_eq!(first, Some(dir.path().join("1.png")));
        assert_eq!(state.save_if_changed(&solid(10)).unwrap(), None);

        let second = state.save_if_changed(&solid(20)).unwrap();
        assert_eq!(second, Some(dir.path().join("2.png")));
        assert_eq!(state.next_id(), 3);
    }

    #[test]
    fn test_resume_numbering_and_previous_frame() {
        let dir = tempdir().unwrap();
        solid(1).save(dir.path().join("2.png")).unwrap();
        solid(7).save(dir.path().join("11.png")).unwrap();
        solid(3).save(dir.path().join("notes.png")).unwrap();
        fs::write(dir.path().join("99.txt"), "ignored").unwrap();

        let mut state = BackupState::open(dir.path()).unwrap();
        assert_eq!(state.next_id(), 12);

        // Same as 11.png, so nothing new is written
        assert_eq!(state.save_if_changed(&solid(7)).unwrap(), None);
        assert_eq!(
            state.save_if_changed(&solid(8)).unwrap(),
            Some(dir.path().join("12.png"))
        );
    }

    #[test]
    fn test_resize_counts_as_change() {
        let dir = tempdir().unwrap();
        let mut state = BackupState::open(dir.path()).unwrap();

        state.save_if_changed(&solid(5)).unwrap();
        let wider: Frame = ImageBuffer::from_pixel(6, 1, Rgba([5, 5, 5, 255]));
        assert!(state.save_if_changed(&wider).unwrap().is_some());
    }

    #[test]
    fn test_open_fails_when_numbering_exhausted() {
        let dir = tempdir().unwrap();
        solid(1).save(dir.path().join(format!("{}.png", u32::MAX))).unwrap();

        let err = BackupState::open(dir.path()).unwrap_err();
        assert!(err.to_string().contains("numbering exhausted"));
    }

    #[test]
    fn test_save_fails_at_last_id() {
        let dir = tempdir().unwrap();
        solid(1)
            .save(dir.path().join(format!("{}.png", u32::MAX - 1)))
            .unwrap();

        let mut state = BackupState::open(dir.path()).unwrap();
        assert_eq!(state.next_id(), u32::MAX);

        assert!(state.save_if_changed(&solid(2)).is_err());
        assert!(!dir.path().join(format!("{}.png", u32::MAX)).exists());
        assert_eq!(state.next_id(), u32::MAX);
    }
}
