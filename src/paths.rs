//! Filesystem locations: the executable's directory, logs and frame backups.
//!
//! Everything the tool writes lives next to the executable except frame
//! backups, which default to the user's Pictures folder.

use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the default backup directory: `<Pictures>/<process_name>/`
///
/// Falls back to `<exe_dir>/backups/<process_name>/` when the system has no
/// pictures folder.
pub fn default_backup_dir(process_name: &str) -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| get_exe_dir().join("backups"))
        .join(process_name)
}

/// Ensures the log directory exists. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backup_dir_ends_with_process_name() {
        let dir = default_backup_dir("dolphin.exe");
        assert!(dir.ends_with("dolphin.exe"));
    }

    #[test]
    fn test_logs_dir_under_exe_dir() {
        assert!(get_logs_dir().starts_with(get_exe_dir()));
    }
}
