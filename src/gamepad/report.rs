//! # Gamepad Output State
//!
//! The complete virtual-controller report composed once per frame.
//!
//! Sticks, triggers and the D-pad are rebuilt from neutral every frame.
//! Buttons accumulate edge-triggered press/release actions, so a held button
//! stays set until its release edge arrives.

use serde::Serialize;
use std::fmt;

/// Physical gamepad buttons shared by every backend.
///
/// Face buttons are named by position; the backend decides whether the
/// south button is called `a` or `cross`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Button {
    /// A / Cross
    South,
    /// B / Circle
    East,
    /// X / Square
    West,
    /// Y / Triangle
    North,
    /// Left shoulder bumper.
    LeftShoulder,
    /// Right shoulder bumper.
    RightShoulder,
    /// Left stick click.
    LeftThumb,
    /// Right stick click.
    RightThumb,
    /// Back / Share
    Back,
    /// Start / Options
    Start,
}

impl Button {
    /// Every button, in bit order.
    pub const ALL: [Button; 10] = [
        Button::South,
        Button::East,
        Button::West,
        Button::North,
        Button::LeftShoulder,
        Button::RightShoulder,
        Button::LeftThumb,
        Button::RightThumb,
        Button::Back,
        Button::Start,
    ];

    #[inline]
    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of currently held buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonSet(u16);

impl ButtonSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self(0)
    }

    /// Marks a button as held.
    pub fn insert(&mut self, button: Button) {
        self.0 |= button.bit();
    }

    /// Marks a button as released.
    pub fn remove(&mut self, button: Button) {
        self.0 &= !button.bit();
    }

    /// Returns true if the button is held.
    #[must_use]
    pub fn contains(&self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    /// Returns true if no button is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates over held buttons in bit order.
    pub fn iter(&self) -> impl Iterator<Item = Button> + '_ {
        Button::ALL.into_iter().filter(move |b| self.contains(*b))
    }
}

/// Analog stick selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stick {
    /// Left analog stick.
    Left,
    /// Right analog stick.
    Right,
}

/// Analog trigger selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TriggerSide {
    /// Left trigger (L2 / LT).
    Left,
    /// Right trigger (R2 / RT).
    Right,
}

/// D-pad state: neutral or one of eight compass directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DpadDirection {
    /// Nothing pressed.
    #[default]
    None,
    /// Up
    North,
    /// Up + right
    NorthEast,
    /// Right
    East,
    /// Down + right
    SouthEast,
    /// Down
    South,
    /// Down + left
    SouthWest,
    /// Left
    West,
    /// Up + left
    NorthWest,
}

impl DpadDirection {
    /// Returns `(up, down, left, right)` for devices with four D-pad buttons.
    #[must_use]
    pub fn components(self) -> (bool, bool, bool, bool) {
        use DpadDirection::*;
        let up = matches!(self, North | NorthEast | NorthWest);
        let down = matches!(self, South | SouthEast | SouthWest);
        let left = matches!(self, West | NorthWest | SouthWest);
        let right = matches!(self, East | NorthEast | SouthEast);
        (up, down, left, right)
    }
}

impl fmt::Display for DpadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DpadDirection::None => "none",
            DpadDirection::North => "north",
            DpadDirection::NorthEast => "northeast",
            DpadDirection::East => "east",
            DpadDirection::SouthEast => "southeast",
            DpadDirection::South => "south",
            DpadDirection::SouthWest => "southwest",
            DpadDirection::West => "west",
            DpadDirection::NorthWest => "northwest",
        };
        f.write_str(name)
    }
}

/// Stick deflection, each axis -1.0 to 1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StickPosition {
    /// Horizontal deflection.
    pub x: f64,
    /// Vertical deflection.
    pub y: f64,
}

impl StickPosition {
    /// Creates a stick position.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Full virtual-controller report.
///
/// # Examples
///
/// ```
/// use vrpad_bridge::gamepad::report::{Button, DpadDirection, GamepadOutputState};
///
/// let mut state = GamepadOutputState::default();
/// state.buttons.insert(Button::South);
///
/// let frame = state.next_frame();
/// assert!(frame.buttons.contains(Button::South)); // Held across frames
/// assert_eq!(frame.dpad, DpadDirection::None);    // Rebuilt from neutral
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GamepadOutputState {
    /// Left analog stick.
    pub left_stick: StickPosition,
    /// Right analog stick.
    pub right_stick: StickPosition,
    /// Left trigger, 0.0 to 1.0.
    pub left_trigger: f64,
    /// Right trigger, 0.0 to 1.0.
    pub right_trigger: f64,
    /// Held buttons.
    pub buttons: ButtonSet,
    /// D-pad direction.
    pub dpad: DpadDirection,
}

impl GamepadOutputState {
    /// Starts the next frame: keeps held buttons, resets everything else.
    #[must_use]
    pub fn next_frame(&self) -> Self {
        Self {
            buttons: self.buttons,
            ..Self::default()
        }
    }

    /// Sets one trigger value.
    pub fn set_trigger(&mut self, side: TriggerSide, value: f64) {
        match side {
            TriggerSide::Left => self.left_trigger = value,
            TriggerSide::Right => self.right_trigger = value,
        }
    }

    /// Returns one trigger value.
    #[must_use]
    pub fn trigger(&self, side: TriggerSide) -> f64 {
        match side {
            TriggerSide::Left => self.left_trigger,
            TriggerSide::Right => self.right_trigger,
        }
    }
}
