//! # Tracking Module
//!
//! Input side of the bridge: the tracking runtime that reports hand
//! controllers and the head sensor, and calibration of the head reference.
//!
//! This module handles:
//! - The [`TrackingSource`] abstraction sampled once per frame
//! - Haptic acknowledgment pulses
//! - Calibration gesture detection and reference persistence
//! - Replaying recorded sessions from JSON Lines

pub mod calibration;
pub mod replay;

use async_trait::async_trait;
use std::time::Duration;

use crate::controller::state::{ControllerSnapshot, Hand, Pose};
use crate::error::Result;

/// Longest haptic pulse the runtime accepts, in microseconds.
pub const HAPTIC_PULSE_MAX_US: u16 = 3999;

/// Converts a 0.0 to 1.0 haptic strength into a pulse length.
///
/// # Examples
///
/// ```
/// use vrpad_bridge::tracking::haptic_pulse_us;
///
/// assert_eq!(haptic_pulse_us(1.0), 3999);
/// assert_eq!(haptic_pulse_us(0.5), 1999);
/// assert_eq!(haptic_pulse_us(2.0), 3999);
/// ```
#[must_use]
pub fn haptic_pulse_us(strength: f64) -> u16 {
    (strength.clamp(0.0, 1.0) * f64::from(HAPTIC_PULSE_MAX_US)) as u16
}

/// Trait for tracking runtimes
///
/// Shared between the frame loop and detached haptic tasks, so every
/// method takes `&self`.
#[async_trait]
pub trait TrackingSource: Send + Sync {
    /// Latch the next frame of data. Called once at the top of each cycle.
    fn begin_frame(&self);

    /// Whether a head-mounted sensor is present
    fn has_head_sensor(&self) -> bool;

    /// Button and axis state of one hand, `None` if the controller is
    /// missing this frame
    fn sample(&self, hand: Hand) -> Option<ControllerSnapshot>;

    /// Pose of one hand controller
    fn hand_pose(&self, hand: Hand) -> Option<Pose>;

    /// Pose of the head sensor
    fn sample_head(&self) -> Option<Pose>;

    /// Pulse one controller's haptics, then wait out `duration`
    async fn trigger_haptic(&self, hand: Hand, strength: f64, duration: Duration) -> Result<()>;
}
