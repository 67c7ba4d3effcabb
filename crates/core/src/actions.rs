//! OS side effects: opening URLs and files, system volume
//!
//! Both are collaborators behind traits so the dispatch path can run
//! without touching the desktop (`--dry-run`, tests).

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

// ============================================================================
// Launcher
// ============================================================================

/// Opens a URL or file with the platform's default handler
pub trait Launcher: Send + Sync {
    fn open(&self, target: &str) -> Result<()>;
}

pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn open(&self, target: &str) -> Result<()> {
        debug!(target, "opening");
        open::that(target).with_context(|| format!("Failed to open {}", target))
    }
}

/// Records targets instead of opening them
#[derive(Default)]
pub struct RecordingLauncher {
    opened: Mutex<Vec<String>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl Launcher for RecordingLauncher {
    fn open(&self, target: &str) -> Result<()> {
        self.opened
            .lock()
            .map_err(|_| anyhow!("launcher log poisoned"))?
            .push(target.to_string());
        Ok(())
    }
}

// ============================================================================
// Volume
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeAction {
    Mute,
    Unmute,
    Up,
    Down,
}

impl VolumeAction {
    pub fn announcement(&self) -> &'static str {
        match self {
            VolumeAction::Mute => "Muting volume",
            VolumeAction::Unmute => "Unmuting volume",
            VolumeAction::Up => "Increasing volume",
            VolumeAction::Down => "Decreasing volume",
        }
    }
}

pub trait VolumeControl: Send + Sync {
    fn apply(&self, action: VolumeAction) -> Result<()>;
}

/// Shells out to the platform mixer: nircmd on Windows, osascript on macOS,
/// amixer elsewhere.
pub struct SystemVolume;

impl SystemVolume {
    fn command(action: VolumeAction) -> (&'static str, Vec<String>) {
        if cfg!(target_os = "windows") {
            let args = match action {
                VolumeAction::Mute => ["mutesysvolume", "1"],
                VolumeAction::Unmute => ["mutesysvolume", "0"],
                VolumeAction::Up => ["changesysvolume", "2000"],
                VolumeAction::Down => ["changesysvolume", "-2000"],
            };
            ("nircmd.exe", args.iter().map(|s| s.to_string()).collect())
        } else if cfg!(target_os = "macos") {
            let script = match action {
                VolumeAction::Mute => "set volume with output muted",
                VolumeAction::Unmute => "set volume without output muted",
                VolumeAction::Up => {
                    "set volume output volume ((output volume of (get volume settings)) + 6)"
                }
                VolumeAction::Down => {
                    "set volume output volume ((output volume of (get volume settings)) - 6)"
                }
            };
            ("osascript", vec!["-e".to_string(), script.to_string()])
        } else {
            let arg = match action {
                VolumeAction::Mute => "mute",
                VolumeAction::Unmute => "unmute",
                VolumeAction::Up => "3%+",
                VolumeAction::Down => "3%-",
            };
            (
                "amixer",
                vec!["-q".to_string(), "sset".to_string(), "Master".to_string(), arg.to_string()],
            )
        }
    }
}

impl VolumeControl for SystemVolume {
    fn apply(&self, action: VolumeAction) -> Result<()> {
        let (program, args) = Self::command(action);
        let output = Command::new(program)
            .args(&args)
            .output()
            .map_err(|e| anyhow!("Failed to execute {}: {}", program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("{} error: {}", program, stderr.trim()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingVolume {
    applied: Mutex<Vec<VolumeAction>>,
}

impl RecordingVolume {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&self) -> Vec<VolumeAction> {
        self.applied.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl VolumeControl for RecordingVolume {
    fn apply(&self, action: VolumeAction) -> Result<()> {
        self.applied
            .lock()
            .map_err(|_| anyhow!("volume log poisoned"))?
            .push(action);
        Ok(())
    }
}

// ============================================================================
// Music
// ============================================================================

/// First regular file in `dir`, by name
pub fn first_track(dir: &Path) -> Result<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read music directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();

    files.sort();
    files
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No music files in {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_launcher() {
        let launcher = RecordingLauncher::new();
        launcher.open("https://www.google.com").unwrap();
        assert_eq!(launcher.opened(), vec!["https://www.google.com"]);
    }

    #[test]
    fn test_volume_commands() {
        let (program, args) = SystemVolume::command(VolumeAction::Mute);
        assert!(!program.is_empty());
        assert!(!args.is_empty());
        assert_eq!(VolumeAction::Down.announcement(), "Decreasing volume");
    }

    #[test]
    fn test_first_track_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.mp3"), b"").unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"").unwrap();
        std::fs::create_dir(dir.path().join("0-subdir")).unwrap();

        let track = first_track(dir.path()).unwrap();
        assert_eq!(track.file_name().unwrap(), "a.mp3");
    }

    #[test]
    fn test_first_track_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(first_track(dir.path()).is_err());
    }
}
