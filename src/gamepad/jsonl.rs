//! # JSON Lines Report Sink
//!
//! An [`OutputSink`] that writes every committed report as one JSON object
//! per line, either to a file (appended) or to stdout.
//!
//! ```text
//! {"frame":12,"left_stick":{"x":0.0,"y":-0.5},"right_stick":{"x":0.12,"y":0.0},"left_trigger":0.0,"right_trigger":1.0,"buttons":["cross","left_shoulder"],"dpad":"none"}
//! ```
//!
//! Button names use the active backend's vocabulary. XInput has no hat, so
//! its D-pad also shows up as `dpad_up`/`dpad_down`/`dpad_left`/`dpad_right`
//! entries after the face and shoulder buttons. Stick and trigger
//! values are written as staged, so DS4 reports show inverted Y and 8-bit
//! trigger steps.

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use super::backend::Backend;
use super::report::{Button, DpadDirection, GamepadOutputState, Stick, StickPosition, TriggerSide};
use super::sink::OutputSink;
use crate::error::{BridgeError, Result};

/// Where reports are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportTarget {
    /// Standard output
    Stdout,
    /// Append to a file, creating it if needed
    File(PathBuf),
}

impl ReportTarget {
    /// Parses a command line value; `-` means stdout.
    #[must_use]
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            ReportTarget::Stdout
        } else {
            ReportTarget::File(PathBuf::from(arg))
        }
    }
}

#[derive(Serialize)]
struct ReportLine<'a> {
    frame: u64,
    left_stick: StickPosition,
    right_stick: StickPosition,
    left_trigger: f64,
    right_trigger: f64,
    buttons: Vec<&'a str>,
    dpad: String,
}

/// Report sink writing JSON Lines
pub struct JsonlReportSink {
    target: ReportTarget,
    backend: Backend,
    writer: Box<dyn AsyncWrite + Unpin + Send>,
    staged: GamepadOutputState,
    frame: u64,
}

impl std::fmt::Debug for JsonlReportSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlReportSink")
            .field("target", &self.target)
            .field("backend", &self.backend)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

impl JsonlReportSink {
    /// Open the destination and write a neutral report
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::OutputDevice`] if the destination cannot be
    /// opened or written.
    pub async fn open(target: ReportTarget, backend: Backend) -> Result<Self> {
        let writer = Self::open_writer(&target).await?;
        let mut sink = Self {
            target,
            backend,
            writer,
            staged: GamepadOutputState::default(),
            frame: 0,
        };
        sink.write_staged().await?;
        info!("{} report sink ready ({:?})", sink.backend, sink.target);
        Ok(sink)
    }

    /// Wrap an arbitrary writer. Used by tests.
    pub fn with_writer(
        target: ReportTarget,
        backend: Backend,
        writer: Box<dyn AsyncWrite + Unpin + Send>,
    ) -> Self {
        Self {
            target,
            backend,
            writer,
            staged: GamepadOutputState::default(),
            frame: 0,
        }
    }

    /// Number of reports committed so far
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    async fn open_writer(target: &ReportTarget) -> Result<Box<dyn AsyncWrite + Unpin + Send>> {
        match target {
            ReportTarget::Stdout => Ok(Box::new(tokio::io::stdout())),
            ReportTarget::File(path) => {
                let file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await
                    .map_err(|e| {
                        BridgeError::OutputDevice(format!("Failed to open {}: {}", path.display(), e))
                    })?;
                Ok(Box::new(file))
            }
        }
    }

    fn encode(&self) -> Result<String> {
        let mut buttons: Vec<&str> = self
            .staged
            .buttons
            .iter()
            .map(|b| self.backend.button_name(b))
            .collect();
        if self.backend == Backend::XInput {
            let (up, down, left, right) = self.staged.dpad.components();
            let pressed = [(up, "dpad_up"), (down, "dpad_down"), (left, "dpad_left"), (right, "dpad_right")];
            buttons.extend(pressed.iter().filter(|(on, _)| *on).map(|(_, name)| *name));
        }

        let line = ReportLine {
            frame: self.frame,
            left_stick: self.staged.left_stick,
            right_stick: self.staged.right_stick,
            left_trigger: self.staged.left_trigger,
            right_trigger: self.staged.right_trigger,
            buttons,
            dpad: self.staged.dpad.to_string(),
        };
        let mut json = serde_json::to_string(&line)
            .map_err(|e| BridgeError::OutputDevice(format!("Failed to encode report: {}", e)))?;
        json.push('\n');
        Ok(json)
    }

    async fn write_staged(&mut self) -> Result<()> {
        let line = self.encode()?;
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| BridgeError::OutputDevice(format!("Failed to write report: {}", e)))?;
        self.writer
            .flush()
            .await
            .map_err(|e| BridgeError::OutputDevice(format!("Failed to flush report: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl OutputSink for JsonlReportSink {
    fn press(&mut self, button: Button) {
        self.staged.buttons.insert(button);
    }

    fn release(&mut self, button: Button) {
        self.staged.buttons.remove(button);
    }

    fn set_trigger(&mut self, side: TriggerSide, value: f64) {
        self.staged.set_trigger(side, value);
    }

    fn set_stick(&mut self, stick: Stick, x: f64, y: f64) {
        let position = StickPosition::new(x, y);
        match stick {
            Stick::Left => self.staged.left_stick = position,
            Stick::Right => self.staged.right_stick = position,
        }
    }

    fn set_dpad(&mut self, direction: DpadDirection) {
        self.staged.dpad = direction;
    }

    async fn commit(&mut self) -> Result<()> {
        self.frame += 1;
        self.write_staged().await
    }

    async fn reinitialize(&mut self) -> Result<()> {
        debug!("Reopening report destination {:?}", self.target);
        self.writer = Self::open_writer(&self.target).await?;
        self.staged = GamepadOutputState::default();
        self.write_staged().await
    }
}
