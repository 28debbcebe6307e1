//! # Replay Tracking Source
//!
//! Plays back a recorded session so the pipeline can run without a
//! tracking runtime.
//!
//! One JSON object per line, every field optional:
//!
//! ```text
//! {"head": {"position": [0.0, 1.6, 0.0], "yaw": 12.0, "pitch": -3.0},
//!  "left": {"pose": {"position": [-0.2, 1.0, 0.1]}, "inputs": {"grip_button": true}},
//!  "right": {"inputs": {"joystick_x": 0.4, "button_pressed": 128}}}
//! ```
//!
//! A hand without `inputs` is a sensor gap for that frame. Once the file is
//! exhausted every sample is `None`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use super::{haptic_pulse_us, TrackingSource};
use crate::controller::state::{ControllerSnapshot, Hand, Pose};
use crate::error::{BridgeError, Result};

/// One hand's entry in a replay frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HandFrame {
    #[serde(default)]
    pub pose: Option<Pose>,
    #[serde(default)]
    pub inputs: Option<ControllerSnapshot>,
}

/// One recorded frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    #[serde(default)]
    pub head: Option<Pose>,
    #[serde(default)]
    pub left: Option<HandFrame>,
    #[serde(default)]
    pub right: Option<HandFrame>,
}

impl ReplayFrame {
    /// Entry for one hand, if recorded.
    #[must_use]
    pub fn hand(&self, hand: Hand) -> Option<HandFrame> {
        match hand {
            Hand::Left => self.left,
            Hand::Right => self.right,
        }
    }
}

/// Tracking source backed by recorded frames
#[derive(Debug)]
pub struct ReplaySource {
    frames: Vec<ReplayFrame>,
    /// Index of the current frame plus one; 0 before the first frame.
    cursor: AtomicUsize,
}

impl ReplaySource {
    /// Load a JSON Lines recording
    ///
    /// Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, or
    /// [`BridgeError::Tracking`] naming the first line that fails to parse.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let source = Self::parse(&contents)?;
        info!("Loaded {} replay frames from {}", source.len(), path.display());
        Ok(source)
    }

    /// Parse JSON Lines text into a source
    pub fn parse(contents: &str) -> Result<Self> {
        let mut frames = Vec::new();
        for (number, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let frame = serde_json::from_str(line).map_err(|e| {
                BridgeError::Tracking(format!("replay line {}: {}", number + 1, e))
            })?;
            frames.push(frame);
        }
        Ok(Self::from_frames(frames))
    }

    #[must_use]
    pub fn from_frames(frames: Vec<ReplayFrame>) -> Self {
        Self {
            frames,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Number of recorded frames
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn current(&self) -> Option<&ReplayFrame> {
        match self.cursor.load(Ordering::Acquire) {
            0 => None,
            n => self.frames.get(n - 1),
        }
    }
}

#[async_trait]
impl TrackingSource for ReplaySource {
    fn begin_frame(&self) {
        // Saturate so an exhausted replay stays exhausted
        let _ = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_add(1)));
    }

    fn has_head_sensor(&self) -> bool {
        self.frames.iter().any(|f| f.head.is_some())
    }

    fn sample(&self, hand: Hand) -> Option<ControllerSnapshot> {
        self.current()?.hand(hand)?.inputs
    }

    fn hand_pose(&self, hand: Hand) -> Option<Pose> {
        self.current()?.hand(hand)?.pose
    }

    fn sample_head(&self) -> Option<Pose> {
        self.current()?.head
    }

    async fn trigger_haptic(&self, hand: Hand, strength: f64, duration: Duration) -> Result<()> {
        debug!(
            "Haptic pulse on {} controller: {} us for {:?}",
            hand,
            haptic_pulse_us(strength),
            duration
        );
        tokio::time::sleep(duration).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDING: &str = r#"
{"head": {"position": [0.0, 1.6, 0.0], "yaw": 12.0, "pitch": -3.0}, "left": {"pose": {"position": [-0.2, 1.0, 0.1]}, "inputs": {"grip_button": true}}}

{"head": {"yaw": 13.0}, "right": {"inputs": {"joystick_x": 0.4, "button_pressed": 128}}}
"#;

    #[test]
    fn test_parse_skips_blank_lines() {
        let source = ReplaySource::parse(RECORDING).unwrap();
        assert_eq!(source.len(), 2);
        assert!(source.has_head_sensor());
    }

    #[test]
    fn test_nothing_before_first_frame() {
        let source = ReplaySource::parse(RECORDING).unwrap();
        assert_eq!(source.sample_head(), None);
        assert_eq!(source.sample(Hand::Left), None);
    }

    #[test]
    fn test_frames_advance() {
        let source = ReplaySource::parse(RECORDING).unwrap();

        source.begin_frame();
        assert_eq!(source.sample_head().unwrap().yaw, 12.0);
        assert_eq!(source.hand_pose(Hand::Left).unwrap().height(), 1.0);
        assert!(source.sample(Hand::Left).unwrap().grip_button);
        assert_eq!(source.sample(Hand::Right), None);

        source.begin_frame();
        assert_eq!(source.sample_head().unwrap().yaw, 13.0);
        assert_eq!(source.sample_head().unwrap().pitch, 0.0);
        let right = source.sample(Hand::Right).unwrap();
        assert_eq!(right.joystick_x, 0.4);
        assert_eq!(right.button_pressed, 128);
        assert_eq!(source.sample(Hand::Left), None);
    }

    #[test]
    fn test_exhausted_replay_returns_none() {
        let source = ReplaySource::parse(RECORDING).unwrap();
        for _ in 0..5 {
            source.begin_frame();
        }
        assert_eq!(source.sample_head(), None);
        assert_eq!(source.sample(Hand::Right), None);
        assert_eq!(source.hand_pose(Hand::Left), None);
    }

    #[test]
    fn test_parse_error_names_line() {
        let result = ReplaySource::parse("{}\n{\"head\": 5}\n");
        match result {
            Err(BridgeError::Tracking(msg)) => assert!(msg.contains("line 2"), "{}", msg),
            other => panic!("Expected Tracking error, got: {:?}", other),
        }
    }

    #[test]
    fn test_no_head_sensor() {
        let source = ReplaySource::parse("{\"left\": {}}\n").unwrap();
        assert!(!source.has_head_sensor());
        assert!(!ReplaySource::from_frames(Vec::new()).has_head_sensor());
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(RECORDING.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let source = ReplaySource::load(temp_file.path()).unwrap();
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let result = ReplaySource::load("/nonexistent/vrpad/replay.jsonl");
        assert!(matches!(result, Err(BridgeError::Io(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_haptic_waits_for_duration() {
        let source = ReplaySource::from_frames(Vec::new());
        let start = tokio::time::Instant::now();
        source
            .trigger_haptic(Hand::Left, 1.0, Duration::from_millis(500))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
