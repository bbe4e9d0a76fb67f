//! Configuration types for automation.
//!
//! Loads settings from config.json next to the executable. Provides the
//! target process, virtual device, reference triggers, capture area and
//! timing parameters.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::automation::actions::Action;
use crate::automation::detection::{Classifier, Trigger};
use crate::capture::{CaptureRegion, ReferenceImage};

/// A reference image file and the action it triggers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Display name used in logs
    pub name: String,
    /// Path to the reference PNG (relative paths are resolved against the executable directory)
    pub reference: String,
    /// Action performed when the reference matches
    pub action: Action,
}

/// Which window is captured each iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureTarget {
    /// Main window of the monitored process
    #[default]
    ProcessWindow,
    /// Whatever window currently has focus
    Foreground,
    /// The whole desktop
    Desktop,
}

/// Complete automation configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Executable name of the monitored process (".exe" optional)
    pub process_name: String,
    /// Virtual device slot, 1 is the first device
    pub device_id: u32,
    /// Location of vJoyInterface.dll
    pub vjoy_dll_path: String,
    /// Per-channel color tolerance when comparing against references
    pub margin: u8,
    /// Reference triggers, checked in order; the first match wins
    pub triggers: Vec<TriggerConfig>,
    /// Window to capture
    pub capture_target: CaptureTarget,
    /// Optional sub-region of the window; whole window when absent
    pub capture_region: Option<CaptureRegion>,
    /// Wait after bringing the target window to the foreground (milliseconds)
    pub focus_delay_ms: u64,
    /// Wait before retrying after a failed capture (milliseconds)
    pub capture_retry_ms: u64,
    /// Save changed frames to the backup directory
    pub backup_enabled: bool,
    /// Backup directory; defaults to `<Pictures>/<process_name>`
    pub backup_dir: Option<String>,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            process_name: "Process name (edit me!)".to_string(),
            device_id: 1,
            vjoy_dll_path: r"C:\Program Files\vJoy\x64\vJoyInterface.dll".to_string(),
            margin: 5,
            triggers: vec![
                TriggerConfig {
                    name: "enemy preparing attack".to_string(),
                    reference: "references/enemy_preparing_attack.png".to_string(),
                    action: Action::Attack,
                },
                TriggerConfig {
                    name: "enemy defending".to_string(),
                    reference: "references/enemy_defending.png".to_string(),
                    action: Action::Heal,
                },
            ],
            capture_target: CaptureTarget::ProcessWindow,
            capture_region: None,
            focus_delay_ms: 200,
            capture_retry_ms: 100,
            backup_enabled: true,
            backup_dir: None,
        }
    }
}

impl AutomationConfig {
    /// Loads every trigger's reference image and builds the classifier.
    ///
    /// Fails if any reference cannot be read or decoded.
    pub fn build_classifier(&self, base_dir: &Path) -> Result<Classifier> {
        let triggers = self
            .triggers
            .iter()
            .map(|trigger| -> Result<Trigger> {
                let path = resolve_path(base_dir, &trigger.reference);
                Ok(Trigger {
                    reference: ReferenceImage::load(&trigger.name, &path)?,
                    action: trigger.action,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Classifier::new(triggers, self.margin))
    }

    /// Directory captured frames are archived in, if backup is enabled.
    pub fn backup_path(&self, base_dir: &Path) -> Option<PathBuf> {
        if !self.backup_enabled {
            return None;
        }
        match &self.backup_dir {
            Some(dir) => Some(resolve_path(base_dir, dir)),
            None => Some(crate::paths::default_backup_dir(&self.process_name)),
        }
    }
}

/// Resolves a configured path against a base directory unless it is absolute.
pub fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Loads configuration from the given file or returns defaults.
pub fn load_config_from(config_path: &Path) -> AutomationConfig {
    tracing::info!("Looking for config at: {}", config_path.display());

    if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Config loaded from {}", config_path.display());
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config.json: {}. Using defaults.", e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config.json: {}. Using defaults.", e);
            }
        }
    } else {
        tracing::info!("config.json not found. Using default config.");
    }

    AutomationConfig::default()
}

/// Loads config.json from the executable's directory.
pub fn load_config() -> AutomationConfig {
    load_config_from(&crate::paths::get_exe_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AutomationConfig::default();
        assert_eq!(config.device_id, 1);
        assert_eq!(config.margin, 5);
        assert_eq!(config.triggers.len(), 2);
        assert_eq!(config.triggers[0].action, Action::Attack);
        assert_eq!(config.triggers[1].action, Action::Heal);
        assert_eq!(config.focus_delay_ms, 200);
        assert_eq!(config.capture_target, CaptureTarget::ProcessWindow);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{
            "process_name": "dolphin.exe",
            "margin": 8,
            "capture_target": "foreground",
            "capture_region": { "offset_x": 8, "offset_y": 31, "width": 640, "height": 480 }
        }"#;
        let config: AutomationConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.process_name, "dolphin.exe");
        assert_eq!(config.margin, 8);
        assert_eq!(config.capture_target, CaptureTarget::Foreground);
        assert_eq!(config.capture_region.unwrap().width, 640);
        assert_eq!(config.device_id, 1);
        assert_eq!(config.triggers.len(), 2);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = AutomationConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AutomationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.triggers, config.triggers);
        assert_eq!(parsed.vjoy_dll_path, config.vjoy_dll_path);
    }

    #[test]
    fn test_load_config_falls_back_on_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let config = load_config_from(&path);
        assert_eq!(config.margin, AutomationConfig::default().margin);
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json"));
        assert_eq!(config.device_id, 1);
    }

    #[test]
    fn test_backup_path() {
        let base = Path::new("base");
        let mut config = AutomationConfig {
            backup_dir: Some("backups".to_string()),
            ..Default::default()
        };
        assert_eq!(config.backup_path(base), Some(base.join("backups")));

        config.backup_enabled = false;
        assert_eq!(config.backup_path(base), None);
    }

    #[test]
    fn test_build_classifier_keeps_trigger_order() {
        let dir = tempdir().unwrap();
        let refs = dir.path().join("references");
        fs::create_dir_all(&refs).unwrap();
        let attack: RgbaImage = ImageBuffer::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let defend: RgbaImage = ImageBuffer::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        attack.save(refs.join("enemy_preparing_attack.png")).unwrap();
        defend.save(refs.join("enemy_defending.png")).unwrap();

        let classifier = AutomationConfig::default()
            .build_classifier(dir.path())
            .unwrap();

        assert_eq!(classifier.margin(), 5);
        let names: Vec<&str> = classifier
            .triggers()
            .iter()
            .map(|t| t.reference.name.as_str())
            .collect();
        assert_eq!(names, vec!["enemy preparing attack", "enemy defending"]);
        assert_eq!(classifier.classify(&defend).unwrap().action, Action::Heal);
    }

    #[test]
    fn test_build_classifier_missing_reference() {
        let dir = tempdir().unwrap();
        assert!(AutomationConfig::default()
            .build_classifier(dir.path())
            .is_err());
    }
}
