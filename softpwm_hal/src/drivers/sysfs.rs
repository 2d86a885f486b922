//! Linux sysfs GPIO driver.
//!
//! Drives lines through the legacy `/sys/class/gpio` userspace interface:
//!
//! ```text
//! <root>/export            write "<line>" to create <root>/gpio<line>
//! <root>/gpio<line>/direction   "in" | "low" | "high"
//! <root>/gpio<line>/value       "0" | "1"
//! <root>/unexport          write "<line>" to remove it again
//! ```
//!
//! The `value` file of every claimed line stays open for the lifetime of
//! the claim, so `set()` is a single positional write with no path lookup.
//!
//! A line whose `gpio<line>` directory already exists is owned by someone
//! else and is refused, unless the driver was built with
//! [`SysfsDriver::adopting_exported`]. Adopted lines are left exported on
//! release.

use parking_lot::RwLock;
use softpwm_common::config::DriverConfig;
use softpwm_common::error::HalError;
use softpwm_common::line::{Direction, Level, LineDriver, LineHandle, LineId};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// One claimed sysfs line.
struct SysfsLine {
    /// Open `value` file
    value: File,
    /// Whether the claim created the gpio directory (and must remove it)
    exported: bool,
    /// Failed writes since the claim
    write_failures: AtomicU64,
}

/// Line driver backed by `/sys/class/gpio`.
pub struct SysfsDriver {
    root: PathBuf,
    adopt_exported: bool,
    lines: RwLock<HashMap<LineId, SysfsLine>>,
}

impl SysfsDriver {
    /// Create a driver rooted at `root` (normally `/sys/class/gpio`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            adopt_exported: false,
            lines: RwLock::new(HashMap::new()),
        }
    }

    /// Also claim lines that are already exported.
    pub fn adopting_exported(mut self, adopt: bool) -> Self {
        self.adopt_exported = adopt;
        self
    }

    /// Sysfs root this driver operates on.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn line_dir(&self, line: LineId) -> PathBuf {
        self.root.join(format!("gpio{line}"))
    }

    fn write_control(&self, file: &str, line: LineId) -> Result<(), HalError> {
        let path = self.root.join(file);
        fs::write(&path, line.to_string())
            .map_err(|e| HalError::Resource(format!("line {line}: write {path:?}: {e}")))
    }

    /// Configure the exported line and open its value file.
    fn open_line(&self, line: LineId, direction: Direction) -> Result<File, HalError> {
        let dir = self.line_dir(line);

        let direction_text = match direction {
            Direction::Input => "in",
            Direction::Output { initial: Level::Low } => "low",
            Direction::Output { initial: Level::High } => "high",
        };
        fs::write(dir.join("direction"), direction_text)
            .map_err(|e| HalError::Resource(format!("line {line}: set direction: {e}")))?;

        let writable = matches!(direction, Direction::Output { .. });
        OpenOptions::new()
            .read(true)
            .write(writable)
            .open(dir.join("value"))
            .map_err(|e| HalError::Resource(format!("line {line}: open value: {e}")))
    }
}

impl LineDriver for SysfsDriver {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn claim(&self, line: LineId, direction: Direction) -> Result<LineHandle, HalError> {
        let mut lines = self.lines.write();
        if lines.contains_key(&line) {
            return Err(HalError::Resource(format!("line {line} already claimed")));
        }

        let exported = if self.line_dir(line).exists() {
            if !self.adopt_exported {
                return Err(HalError::Resource(format!(
                    "gpio{line} already exported by another owner"
                )));
            }
            debug!("gpio{} already exported, adopting", line);
            false
        } else {
            self.write_control("export", line)?;
            true
        };

        let value = match self.open_line(line, direction) {
            Ok(value) => value,
            Err(e) => {
                if exported {
                    if let Err(undo) = self.write_control("unexport", line) {
                        warn!("Failed to unexport gpio{} after failed claim: {}", line, undo);
                    }
                }
                return Err(e);
            }
        };

        lines.insert(
            line,
            SysfsLine {
                value,
                exported,
                write_failures: AtomicU64::new(0),
            },
        );
        info!("gpio{} claimed as {:?}", line, direction);
        Ok(LineHandle::new(line))
    }

    fn release(&self, handle: LineHandle) {
        let line = handle.line();
        let Some(state) = self.lines.write().remove(&line) else {
            warn!("Release of unclaimed gpio{}", line);
            return;
        };

        let failures = state.write_failures.load(Ordering::Relaxed);
        if failures > 0 {
            warn!("gpio{}: {} value writes failed while claimed", line, failures);
        }
        drop(state.value);

        if state.exported {
            if let Err(e) = self.write_control("unexport", line) {
                warn!("Failed to unexport gpio{}: {}", line, e);
            }
        }
        debug!("gpio{} released", line);
    }

    fn set(&self, handle: &LineHandle, level: Level) {
        let lines = self.lines.read();
        if let Some(state) = lines.get(&handle.line()) {
            let byte: &[u8] = if level.is_high() { b"1" } else { b"0" };
            if state.value.write_at(byte, 0).is_err() {
                state.write_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn get(&self, handle: &LineHandle) -> Result<Level, HalError> {
        let line = handle.line();
        let lines = self.lines.read();
        let state = lines
            .get(&line)
            .ok_or_else(|| HalError::Resource(format!("gpio{line} not claimed")))?;

        let mut buf = [0u8; 1];
        state
            .value
            .read_at(&mut buf, 0)
            .map_err(|e| HalError::Resource(format!("gpio{line}: read value: {e}")))?;
        Ok(Level::from_bool(buf[0] == b'1'))
    }
}

/// Factory function to create a sysfs driver instance.
pub fn create_driver(config: &DriverConfig) -> Arc<dyn LineDriver> {
    Arc::new(SysfsDriver::new(config.sysfs_root.clone()).adopting_exported(config.adopt_exported))
}
