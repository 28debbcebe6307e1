//! # Backend Descriptor
//!
//! Describes what the emulated virtual controller looks like.
//!
//! | Physical | XInput | DS4 |
//! |----------|--------|-----|
//! | South | `a` | `cross` |
//! | East | `b` | `circle` |
//! | West | `x` | `square` |
//! | North | `y` | `triangle` |
//! | Back | `back` | `share` |
//! | Start | `start` | `options` |
//! | Thumbs | `left_thumb` / `right_thumb` | same |
//! | Shoulders | `left_shoulder` / `right_shoulder` | same |
//! | Triggers | `left_trigger` / `right_trigger` | same |
//!
//! DS4 reports triggers as 8-bit integers and expects stick Y pointing down;
//! XInput takes float triggers and stick Y pointing up.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use super::report::{Button, GamepadOutputState, TriggerSide};

/// Physical output a logical input can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Digital button.
    Button(Button),
    /// Analog trigger.
    Trigger(TriggerSide),
}

/// Kind of virtual controller being emulated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Backend {
    /// DualShock 4 style device.
    #[default]
    #[serde(rename = "ds4", alias = "DS4")]
    Ds4,
    /// Xbox 360 style device.
    #[serde(rename = "xinput", alias = "XINPUT", alias = "XInput")]
    XInput,
}

impl Backend {
    /// Resolves a configured target name in this backend's vocabulary.
    ///
    /// # Examples
    ///
    /// ```
    /// use vrpad_bridge::gamepad::backend::{Backend, Target};
    /// use vrpad_bridge::gamepad::report::Button;
    ///
    /// assert_eq!(Backend::XInput.target_by_name("a"), Some(Target::Button(Button::South)));
    /// assert_eq!(Backend::Ds4.target_by_name("cross"), Some(Target::Button(Button::South)));
    /// assert_eq!(Backend::Ds4.target_by_name("a"), None);
    /// ```
    #[must_use]
    pub fn target_by_name(&self, name: &str) -> Option<Target> {
        let shared = match name {
            "left_trigger" => Some(Target::Trigger(TriggerSide::Left)),
            "right_trigger" => Some(Target::Trigger(TriggerSide::Right)),
            "left_shoulder" => Some(Target::Button(Button::LeftShoulder)),
            "right_shoulder" => Some(Target::Button(Button::RightShoulder)),
            "left_thumb" => Some(Target::Button(Button::LeftThumb)),
            "right_thumb" => Some(Target::Button(Button::RightThumb)),
            _ => None,
        };
        if shared.is_some() {
            return shared;
        }

        let button = match (self, name) {
            (Backend::XInput, "a") | (Backend::Ds4, "cross") => Button::South,
            (Backend::XInput, "b") | (Backend::Ds4, "circle") => Button::East,
            (Backend::XInput, "x") | (Backend::Ds4, "square") => Button::West,
            (Backend::XInput, "y") | (Backend::Ds4, "triangle") => Button::North,
            (Backend::XInput, "back") | (Backend::Ds4, "share") => Button::Back,
            (Backend::XInput, "start") | (Backend::Ds4, "options") => Button::Start,
            _ => return None,
        };
        Some(Target::Button(button))
    }

    /// Name of a button in this backend's vocabulary.
    #[must_use]
    pub fn button_name(&self, button: Button) -> &'static str {
        match (self, button) {
            (Backend::XInput, Button::South) => "a",
            (Backend::XInput, Button::East) => "b",
            (Backend::XInput, Button::West) => "x",
            (Backend::XInput, Button::North) => "y",
            (Backend::XInput, Button::Back) => "back",
            (Backend::XInput, Button::Start) => "start",
            (Backend::Ds4, Button::South) => "cross",
            (Backend::Ds4, Button::East) => "circle",
            (Backend::Ds4, Button::West) => "square",
            (Backend::Ds4, Button::North) => "triangle",
            (Backend::Ds4, Button::Back) => "share",
            (Backend::Ds4, Button::Start) => "options",
            (_, Button::LeftShoulder) => "left_shoulder",
            (_, Button::RightShoulder) => "right_shoulder",
            (_, Button::LeftThumb) => "left_thumb",
            (_, Button::RightThumb) => "right_thumb",
        }
    }

    /// Converts a normalized trigger value into the device's resolution.
    ///
    /// DS4 triggers are 8-bit, so the value is truncated to a multiple of
    /// 1/255. XInput keeps the float.
    #[must_use]
    pub fn trigger_value(&self, value: f64) -> f64 {
        let value = value.clamp(0.0, 1.0);
        match self {
            Backend::Ds4 => (value * 255.0).floor() / 255.0,
            Backend::XInput => value,
        }
    }

    /// Converts an up-positive stick Y into the device's orientation.
    #[must_use]
    pub fn stick_y(&self, y: f64) -> f64 {
        match self {
            Backend::Ds4 => -y,
            Backend::XInput => y,
        }
    }

    /// Converts a composed report into what the device expects.
    #[must_use]
    pub fn device_report(&self, state: &GamepadOutputState) -> GamepadOutputState {
        let mut report = *state;
        report.left_stick.y = self.stick_y(state.left_stick.y);
        report.right_stick.y = self.stick_y(state.right_stick.y);
        report.left_trigger = self.trigger_value(state.left_trigger);
        report.right_trigger = self.trigger_value(state.right_trigger);
        report
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ds4" => Ok(Backend::Ds4),
            "xinput" => Ok(Backend::XInput),
            other => Err(format!("unknown backend '{}' (expected ds4 or xinput)", other)),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Ds4 => f.write_str("DS4"),
            Backend::XInput => f.write_str("XInput"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_names_round_trip_through_lookup() {
        for backend in [Backend::Ds4, Backend::XInput] {
            for button in Button::ALL {
                let name = backend.button_name(button);
                assert_eq!(
                    backend.target_by_name(name),
                    Some(Target::Button(button)),
                    "{} {}",
                    backend,
                    name
                );
            }
        }
    }

    #[test]
    fn test_vocabularies_do_not_mix() {
        assert_eq!(Backend::Ds4.target_by_name("a"), None);
        assert_eq!(Backend::Ds4.target_by_name("start"), None);
        assert_eq!(Backend::XInput.target_by_name("triangle"), None);
        assert_eq!(Backend::XInput.target_by_name("share"), None);
    }

    #[test]
    fn test_trigger_targets_shared() {
        for backend in [Backend::Ds4, Backend::XInput] {
            assert_eq!(
                backend.target_by_name("left_trigger"),
                Some(Target::Trigger(TriggerSide::Left))
            );
            assert_eq!(
                backend.target_by_name("right_trigger"),
                Some(Target::Trigger(TriggerSide::Right))
            );
        }
    }

    #[test]
    fn test_unknown_target() {
        assert_eq!(Backend::XInput.target_by_name("guide"), None);
        assert_eq!(Backend::XInput.target_by_name(""), None);
    }

    #[test]
    fn test_ds4_trigger_quantized_to_8_bit() {
        assert_eq!(Backend::Ds4.trigger_value(1.0), 1.0);
        assert_eq!(Backend::Ds4.trigger_value(0.0), 0.0);
        assert_eq!(Backend::Ds4.trigger_value(0.5), 127.0 / 255.0);
    }

    #[test]
    fn test_xinput_trigger_keeps_float() {
        assert_eq!(Backend::XInput.trigger_value(0.5), 0.5);
        assert_eq!(Backend::XInput.trigger_value(1.5), 1.0);
        assert_eq!(Backend::XInput.trigger_value(-0.2), 0.0);
    }

    #[test]
    fn test_stick_y_orientation() {
        assert_eq!(Backend::Ds4.stick_y(0.5), -0.5);
        assert_eq!(Backend::XInput.stick_y(0.5), 0.5);
    }

    #[test]
    fn test_device_report() {
        use crate::gamepad::report::StickPosition;

        let mut state = GamepadOutputState::default();
        state.left_stick = StickPosition::new(0.3, 0.5);
        state.right_stick = StickPosition::new(-0.2, -1.0);
        state.set_trigger(TriggerSide::Left, 0.5);
        state.buttons.insert(Button::North);

        let ds4 = Backend::Ds4.device_report(&state);
        assert_eq!(ds4.left_stick, StickPosition::new(0.3, -0.5));
        assert_eq!(ds4.right_stick, StickPosition::new(-0.2, 1.0));
        assert_eq!(ds4.left_trigger, 127.0 / 255.0);
        assert!(ds4.buttons.contains(Button::North));

        assert_eq!(Backend::XInput.device_report(&state), state);
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("ds4".parse::<Backend>(), Ok(Backend::Ds4));
        assert_eq!("XInput".parse::<Backend>(), Ok(Backend::XInput));
        assert!("switch".parse::<Backend>().is_err());
    }

    #[test]
    fn test_backend_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            backend: Backend,
        }
        let ds4: Wrapper = toml::from_str(r#"backend = "ds4""#).unwrap();
        let xinput: Wrapper = toml::from_str(r#"backend = "XINPUT""#).unwrap();
        assert_eq!(ds4.backend, Backend::Ds4);
        assert_eq!(xinput.backend, Backend::XInput);
    }
}
