//! # Calibration Module
//!
//! Captures the head yaw/pitch that counts as "looking straight ahead".
//!
//! ## Gesture
//!
//! Hold the left grip (shift) and raise both controllers above the head:
//!
//! | Condition | Value |
//! |-----------|-------|
//! | Shift held | left grip |
//! | Both hands above head by more than | 0.15 (configurable) |
//! | Time since last attempt | at least 1.0 s (configurable) |
//!
//! On success the head's current yaw and pitch become the new reference and
//! are saved through a [`CalibrationStore`]. The in-memory reference only
//! changes after the save succeeds.
//!
//! ## Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use vrpad_bridge::tracking::calibration::{CalibrationEngine, JsonFileStore};
//!
//! let store = JsonFileStore::new("calibration.json");
//! let engine = CalibrationEngine::new(Box::new(store), Duration::from_secs(1), 0.15);
//! println!("reference: {:?}", engine.reference());
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::controller::state::Pose;
use crate::error::{BridgeError, Result};

/// Head orientation treated as zero offset, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReference {
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub pitch: f64,
}

impl CalibrationReference {
    #[must_use]
    pub fn new(yaw: f64, pitch: f64) -> Self {
        Self { yaw, pitch }
    }

    /// Head offset from this reference as `(yaw, pitch)`.
    #[must_use]
    pub fn offset(&self, head: &Pose) -> (f64, f64) {
        (head.yaw - self.yaw, head.pitch - self.pitch)
    }
}

/// Persistence for the calibration reference
#[cfg_attr(test, mockall::automock)]
pub trait CalibrationStore: Send {
    /// Read the saved reference, `None` if nothing was saved yet
    fn load(&self) -> Result<Option<CalibrationReference>>;

    /// Replace the saved reference
    fn save(&self, reference: &CalibrationReference) -> Result<()>;
}

/// Stores the reference as `{"yaw": .., "pitch": ..}` in a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl CalibrationStore for JsonFileStore {
    fn load(&self) -> Result<Option<CalibrationReference>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        let reference = serde_json::from_str(&contents)?;
        Ok(Some(reference))
    }

    /// Writes to a temporary file in the same directory, then renames it
    /// over the target so readers never see a partial record.
    fn save(&self, reference: &CalibrationReference) -> Result<()> {
        let mut temp = NamedTempFile::new_in(self.directory())?;
        serde_json::to_writer(&mut temp, reference)?;
        temp.flush()?;
        temp.persist(&self.path).map_err(|e| BridgeError::Io(e.error))?;
        Ok(())
    }
}

/// Whether a reference is in effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    /// Running against the `{0, 0}` reference.
    Uncalibrated,
    /// A reference was loaded or captured.
    Calibrated,
}

/// Gesture detection and reference ownership
pub struct CalibrationEngine {
    store: Box<dyn CalibrationStore>,
    reference: CalibrationReference,
    state: CalibrationState,
    last_attempt: Option<Instant>,
    cooldown: Duration,
    gesture_margin: f64,
}

impl std::fmt::Debug for CalibrationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibrationEngine")
            .field("reference", &self.reference)
            .field("state", &self.state)
            .field("cooldown", &self.cooldown)
            .field("gesture_margin", &self.gesture_margin)
            .finish_non_exhaustive()
    }
}

impl CalibrationEngine {
    /// Create an engine and load the saved reference
    ///
    /// A missing or unreadable record leaves the engine uncalibrated with a
    /// `{0, 0}` reference.
    ///
    /// # Arguments
    ///
    /// * `store` - Where the reference is persisted
    /// * `cooldown` - Minimum time between two calibrations
    /// * `gesture_margin` - How far above the head both hands must be
    pub fn new(store: Box<dyn CalibrationStore>, cooldown: Duration, gesture_margin: f64) -> Self {
        let (reference, state) = match store.load() {
            Ok(Some(reference)) => {
                info!(
                    "Calibration loaded: yaw {:.1}, pitch {:.1}",
                    reference.yaw, reference.pitch
                );
                (reference, CalibrationState::Calibrated)
            }
            Ok(None) => {
                info!("No saved calibration, raise both hands with the left grip held to calibrate");
                (CalibrationReference::default(), CalibrationState::Uncalibrated)
            }
            Err(e) => {
                warn!("Failed to load calibration: {}. Starting uncalibrated", e);
                (CalibrationReference::default(), CalibrationState::Uncalibrated)
            }
        };

        Self {
            store,
            reference,
            state,
            last_attempt: None,
            cooldown,
            gesture_margin,
        }
    }

    #[must_use]
    pub fn reference(&self) -> CalibrationReference {
        self.reference
    }

    #[must_use]
    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Returns true if both hands are above the head by more than the margin.
    ///
    /// Any missing pose means no gesture.
    #[must_use]
    pub fn gesture_detected(&self, head: Option<&Pose>, left: Option<&Pose>, right: Option<&Pose>) -> bool {
        let (Some(head), Some(left), Some(right)) = (head, left, right) else {
            return false;
        };
        let threshold = head.height() + self.gesture_margin;
        left.height() > threshold && right.height() > threshold
    }

    /// Run one frame of calibration
    ///
    /// # Arguments
    ///
    /// * `now` - Frame timestamp
    /// * `shift` - Left grip state
    /// * `head`, `left`, `right` - Current poses
    ///
    /// # Returns
    ///
    /// * `Some(reference)` - A new reference was captured and saved
    /// * `None` - Nothing changed this frame
    pub fn check(
        &mut self,
        now: Instant,
        shift: bool,
        head: Option<&Pose>,
        left: Option<&Pose>,
        right: Option<&Pose>,
    ) -> Option<CalibrationReference> {
        if !shift {
            return None;
        }

        if let Some(last) = self.last_attempt {
            if now.saturating_duration_since(last) < self.cooldown {
                return None;
            }
        }

        if !self.gesture_detected(head, left, right) {
            return None;
        }
        let head = head?;

        let captured = CalibrationReference::new(head.yaw, head.pitch);
        self.last_attempt = Some(now);

        match self.store.save(&captured) {
            Ok(()) => {
                self.reference = captured;
                self.state = CalibrationState::Calibrated;
                info!(
                    "Calibration complete and saved: yaw {:.1}, pitch {:.1}",
                    captured.yaw, captured.pitch
                );
                Some(captured)
            }
            Err(e) => {
                warn!("Failed to save calibration: {}. Keeping previous reference", e);
                debug!("Calibration retry available after {:?}", self.cooldown);
                None
            }
        }
    }
}
