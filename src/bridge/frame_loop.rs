//! # Frame Loop
//!
//! Fixed-rate driver: sample the tracking runtime, run the session, push the
//! report to the output device, then sleep out the rest of the period.
//!
//! | Step | On failure |
//! |------|-----------|
//! | Head sensor check (startup) | fatal |
//! | Neutral report (startup) | fatal after one reinitialize |
//! | Haptic acknowledgment | logged, detached task |
//! | Commit | one reinitialize + restore, then fatal |

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::session::{FrameInput, FrameOutput, Session};
use crate::config::Config;
use crate::controller::state::{Hand, HandPair};
use crate::error::{BridgeError, Result};
use crate::gamepad::report::{GamepadOutputState, Stick, TriggerSide};
use crate::gamepad::sink::{commit_with_retry, OutputSink};
use crate::mapping::engine::OutputAction;
use crate::tracking::TrackingSource;

/// Number of frames between status log messages
const LOG_INTERVAL_FRAMES: u64 = 720;

/// Time left in the period after `elapsed`, never negative.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use vrpad_bridge::bridge::frame_loop::pacing_delay;
///
/// let period = Duration::from_millis(14);
/// assert_eq!(pacing_delay(period, Duration::from_millis(4)), Duration::from_millis(10));
/// assert_eq!(pacing_delay(period, Duration::from_millis(20)), Duration::ZERO);
/// ```
#[must_use]
pub fn pacing_delay(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

/// Converts a rate in Hz to a frame period.
#[must_use]
pub fn frame_period(rate_hz: f64) -> Duration {
    Duration::from_secs_f64(1.0 / rate_hz)
}

/// Haptic pulse sent on both controllers after a calibration
#[derive(Debug, Clone, Copy, PartialEq)]
struct Acknowledgment {
    strength: f64,
    duration: Duration,
}

/// Fixed-rate bridge between a tracking source and an output device
pub struct FrameLoop<T, O>
where
    T: TrackingSource + 'static,
    O: OutputSink,
{
    tracking: Arc<T>,
    sink: O,
    session: Session,
    period: Duration,
    refractory: Duration,
    acknowledgment: Acknowledgment,
    frames: u64,
}

impl<T, O> FrameLoop<T, O>
where
    T: TrackingSource + 'static,
    O: OutputSink,
{
    /// Initialize the loop
    ///
    /// Verifies the head sensor and commits a neutral report.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No head sensor is present ([`BridgeError::HeadsetNotFound`])
    /// - The output device rejects the neutral report twice
    pub async fn new(tracking: Arc<T>, mut sink: O, session: Session, config: &Config) -> Result<Self> {
        if !tracking.has_head_sensor() {
            error!("No head-mounted display detected");
            return Err(BridgeError::HeadsetNotFound);
        }

        let neutral = GamepadOutputState::default();
        sink.restore(&neutral);
        commit_with_retry(&mut sink, &neutral).await?;

        let period = frame_period(config.bridge.rate_hz);
        info!(
            "{} bridge ready at {} Hz ({:?} per frame)",
            session.backend(),
            config.bridge.rate_hz,
            period
        );

        Ok(Self {
            tracking,
            sink,
            session,
            period,
            refractory: Duration::from_millis(config.calibration.refractory_ms),
            acknowledgment: Acknowledgment {
                strength: config.calibration.haptic_strength,
                duration: Duration::from_millis(config.calibration.haptic_duration_ms),
            },
            frames: 0,
        })
    }

    /// Frames completed so far
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn sink(&self) -> &O {
        &self.sink
    }

    /// Run one frame without pacing
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::OutputDevice`] when the report cannot be
    /// committed even after reinitializing the device.
    pub async fn step(&mut self) -> Result<FrameOutput> {
        let now = Instant::now();
        self.tracking.begin_frame();

        let input = FrameInput {
            hands: HandPair::new(self.tracking.sample(Hand::Left), self.tracking.sample(Hand::Right)),
            hand_poses: HandPair::new(
                self.tracking.hand_pose(Hand::Left),
                self.tracking.hand_pose(Hand::Right),
            ),
            head: self.tracking.sample_head(),
        };

        let output = self.session.process(&input, now);

        if output.calibrated.is_some() {
            self.acknowledge_calibration();
            tokio::time::sleep(self.refractory).await;
        }

        for action in &output.actions {
            match *action {
                OutputAction::Press(button) => self.sink.press(button),
                OutputAction::Release(button) => self.sink.release(button),
                // Triggers are written from the converted report below
                OutputAction::SetTrigger(..) => {}
            }
        }

        let report = &output.report;
        self.sink.set_stick(Stick::Left, report.left_stick.x, report.left_stick.y);
        self.sink.set_stick(Stick::Right, report.right_stick.x, report.right_stick.y);
        self.sink.set_trigger(TriggerSide::Left, report.left_trigger);
        self.sink.set_trigger(TriggerSide::Right, report.right_trigger);
        self.sink.set_dpad(report.dpad);

        commit_with_retry(&mut self.sink, report).await?;

        self.frames += 1;
        if self.frames % LOG_INTERVAL_FRAMES == 0 {
            debug!("Processed {} frames", self.frames);
        }

        Ok(output)
    }

    /// Run frames at the configured rate
    ///
    /// # Arguments
    ///
    /// * `limit` - Stop after this many frames; run until an error if `None`
    ///
    /// # Returns
    ///
    /// * `Result<u64>` - Total frames processed
    pub async fn run(&mut self, limit: Option<u64>) -> Result<u64> {
        info!("Starting frame loop");

        loop {
            if matches!(limit, Some(limit) if self.frames >= limit) {
                break;
            }

            let start = Instant::now();
            self.step().await?;
            tokio::time::sleep(pacing_delay(self.period, start.elapsed())).await;
        }

        info!("Frame loop finished after {} frames", self.frames);
        Ok(self.frames)
    }

    /// Pulse both controllers on a detached task
    fn acknowledge_calibration(&self) {
        let tracking = Arc::clone(&self.tracking);
        let Acknowledgment { strength, duration } = self.acknowledgment;

        tokio::spawn(async move {
            let (left, right) = tokio::join!(
                tracking.trigger_haptic(Hand::Left, strength, duration),
                tracking.trigger_haptic(Hand::Right, strength, duration)
            );
            for (hand, result) in [(Hand::Left, left), (Hand::Right, right)] {
                if let Err(e) = result {
                    warn!("Haptic feedback failed on {} controller: {}", hand, e);
                }
            }
        });
    }
}
