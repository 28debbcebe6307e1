//! # Controller State Module
//!
//! Per-frame readings of the tracked hand controllers and the head sensor.
//!
//! A [`ControllerSnapshot`] is captured fresh every frame for each hand and
//! never mutated afterwards. The frame loop keeps the previous pair around
//! purely for edge detection.
//!
//! ## Named inputs
//!
//! | Name | Kind | Range |
//! |------|------|-------|
//! | `trigger` | analog | 0.0 to 1.0 |
//! | `trackpad_x`, `trackpad_y` | analog | -1.0 to 1.0 |
//! | `joystick_x`, `joystick_y` | analog | -1.0 to 1.0 |
//! | `grip_button` | digital | bool |
//! | `menu_button` | digital | bool |
//! | `trackpad_pressed` | digital | bool |
//! | `joystick_pressed` | digital | bool |
//! | `button_pressed` | bitmask | u64 |
//!
//! ## Usage
//!
//! ```
//! use vrpad_bridge::controller::state::{AnalogInput, AxisSource, ControllerSnapshot, Hand, HandPair};
//!
//! let mut left = ControllerSnapshot::default();
//! left.joystick_x = 0.5;
//! let hands = HandPair::new(left, ControllerSnapshot::default());
//!
//! let source: AxisSource = "left_controller:joystick_x".parse().unwrap();
//! assert_eq!(source.hand, Hand::Left);
//! assert_eq!(source.input, AnalogInput::JoystickX);
//! assert_eq!(source.read(&hands), 0.5);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which hand a controller is held in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Hand {
    /// Left hand controller.
    Left,
    /// Right hand controller.
    Right,
}

impl Hand {
    /// Both hands, left first.
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    /// Configuration key for this hand (`left_controller` / `right_controller`).
    #[must_use]
    pub fn config_key(self) -> &'static str {
        match self {
            Hand::Left => "left_controller",
            Hand::Right => "right_controller",
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hand::Left => f.write_str("left"),
            Hand::Right => f.write_str("right"),
        }
    }
}

/// A value held once per hand.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HandPair<T> {
    /// Left hand value.
    pub left: T,
    /// Right hand value.
    pub right: T,
}

impl<T> HandPair<T> {
    /// Creates a pair from left and right values.
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    /// Returns the value for one hand.
    pub fn get(&self, hand: Hand) -> &T {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }
}

/// Tracked pose of a device.
///
/// Position is in tracking-space length units with `y` pointing up.
/// Angles are in degrees. Roll is carried but never used by the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// `[x, y, z]` position, `y` is vertical.
    #[serde(default)]
    pub position: [f64; 3],
    /// Yaw in degrees.
    #[serde(default)]
    pub yaw: f64,
    /// Pitch in degrees.
    #[serde(default)]
    pub pitch: f64,
    /// Roll in degrees.
    #[serde(default)]
    pub roll: f64,
}

impl Pose {
    /// Vertical position of the device.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.position[1]
    }
}

/// One frame's readings from a tracked hand controller.
///
/// The default snapshot has every axis at rest and every button released.
/// It stands in for the "previous frame" before the first real sample, so a
/// button already held on the very first frame still produces a press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSnapshot {
    /// Analog trigger, 0.0 (released) to 1.0 (fully pulled).
    pub trigger: f64,
    /// Trackpad X, -1.0 (left) to 1.0 (right).
    pub trackpad_x: f64,
    /// Trackpad Y, -1.0 (down) to 1.0 (up).
    pub trackpad_y: f64,
    /// Thumbstick X, -1.0 (left) to 1.0 (right).
    pub joystick_x: f64,
    /// Thumbstick Y, -1.0 (down) to 1.0 (up).
    pub joystick_y: f64,
    /// Grip button. On the left hand this is also the shift key.
    pub grip_button: bool,
    /// Application menu button.
    pub menu_button: bool,
    /// Trackpad click.
    pub trackpad_pressed: bool,
    /// Thumbstick click.
    pub joystick_pressed: bool,
    /// Raw pressed-button bitmask as reported by the tracking runtime.
    pub button_pressed: u64,
}

impl ControllerSnapshot {
    /// Reads an analog input by kind.
    #[must_use]
    pub fn analog(&self, input: AnalogInput) -> f64 {
        match input {
            AnalogInput::Trigger => self.trigger,
            AnalogInput::TrackpadX => self.trackpad_x,
            AnalogInput::TrackpadY => self.trackpad_y,
            AnalogInput::JoystickX => self.joystick_x,
            AnalogInput::JoystickY => self.joystick_y,
        }
    }
}

/// Analog inputs that can feed a stick axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogInput {
    /// `trigger`
    Trigger,
    /// `trackpad_x`
    TrackpadX,
    /// `trackpad_y`
    TrackpadY,
    /// `joystick_x`
    JoystickX,
    /// `joystick_y`
    JoystickY,
}

impl FromStr for AnalogInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trigger" => Ok(AnalogInput::Trigger),
            "trackpad_x" => Ok(AnalogInput::TrackpadX),
            "trackpad_y" => Ok(AnalogInput::TrackpadY),
            "joystick_x" => Ok(AnalogInput::JoystickX),
            "joystick_y" => Ok(AnalogInput::JoystickY),
            other => Err(format!("unknown analog input '{}'", other)),
        }
    }
}

/// Where a stick axis reads its raw value from.
///
/// Written in configuration as `"left_controller:joystick_x"`. A bare input
/// name such as `"joystick_x"` reads from the left hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct AxisSource {
    /// Hand to read from.
    pub hand: Hand,
    /// Analog input on that hand.
    pub input: AnalogInput,
}

impl AxisSource {
    /// Creates a source for one hand's analog input.
    #[must_use]
    pub fn new(hand: Hand, input: AnalogInput) -> Self {
        Self { hand, input }
    }

    /// Reads the raw value from the current snapshots.
    #[must_use]
    pub fn read(&self, hands: &HandPair<ControllerSnapshot>) -> f64 {
        hands.get(self.hand).analog(self.input)
    }
}

impl FromStr for AxisSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((controller, input)) => {
                let hand = match controller {
                    "left_controller" => Hand::Left,
                    "right_controller" => Hand::Right,
                    other => return Err(format!("unknown controller '{}'", other)),
                };
                Ok(Self::new(hand, input.parse()?))
            }
            None => Ok(Self::new(Hand::Left, s.parse()?)),
        }
    }
}

impl TryFrom<String> for AxisSource {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
