//! # Binding Tables
//!
//! Resolves the configured `input = { target, bit }` entries into typed
//! bindings for the active backend.
//!
//! | Logical input | Kind | Valid target |
//! |---------------|------|--------------|
//! | `trigger` | continuous | trigger |
//! | `grip_button`, `menu_button` | discrete | button |
//! | `trackpad_pressed`, `joystick_pressed` | discrete | button |
//! | `ButtonPressed_A/B/X/Y` | bitmask | button |
//!
//! Entries that cannot be used (unknown input, unknown target, kind
//! mismatch) are logged and kept disabled. Loading never fails.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::config::{BackendMappings, BindingConfig, SideBindings};
use crate::controller::state::{ControllerSnapshot, Hand, HandPair};
use crate::gamepad::backend::{Backend, Target};

/// Face button reported through the `button_pressed` bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FaceButton {
    A,
    B,
    X,
    Y,
}

impl FaceButton {
    /// Default bit index in the tracking runtime's pressed mask.
    ///
    /// A and X share bit 7, B and Y share bit 1; each sits on a different
    /// hand's controller.
    #[must_use]
    pub fn default_bit(self) -> u32 {
        match self {
            FaceButton::A | FaceButton::X => 7,
            FaceButton::B | FaceButton::Y => 1,
        }
    }
}

/// How a logical input is read and applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Analog value forwarded every frame.
    Continuous,
    /// Boolean field, edge-triggered.
    Discrete,
    /// Bit in `button_pressed`, edge-triggered.
    Bitmask,
}

/// A named input on one hand controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogicalInput {
    Trigger,
    GripButton,
    MenuButton,
    TrackpadPressed,
    JoystickPressed,
    ButtonPressed(FaceButton),
}

impl LogicalInput {
    #[must_use]
    pub fn kind(self) -> InputKind {
        match self {
            LogicalInput::Trigger => InputKind::Continuous,
            LogicalInput::ButtonPressed(_) => InputKind::Bitmask,
            _ => InputKind::Discrete,
        }
    }

    /// Reads the digital state of this input.
    ///
    /// `bit` is only consulted for bitmask inputs. The trigger counts as
    /// pressed when it is above zero.
    #[must_use]
    pub fn is_pressed(self, snapshot: &ControllerSnapshot, bit: u32) -> bool {
        match self {
            LogicalInput::Trigger => snapshot.trigger > 0.0,
            LogicalInput::GripButton => snapshot.grip_button,
            LogicalInput::MenuButton => snapshot.menu_button,
            LogicalInput::TrackpadPressed => snapshot.trackpad_pressed,
            LogicalInput::JoystickPressed => snapshot.joystick_pressed,
            LogicalInput::ButtonPressed(_) => {
                bit < 64 && snapshot.button_pressed & (1u64 << bit) != 0
            }
        }
    }
}

impl FromStr for LogicalInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trigger" => Ok(LogicalInput::Trigger),
            "grip_button" => Ok(LogicalInput::GripButton),
            "menu_button" => Ok(LogicalInput::MenuButton),
            "trackpad_pressed" => Ok(LogicalInput::TrackpadPressed),
            "joystick_pressed" => Ok(LogicalInput::JoystickPressed),
            "ButtonPressed_A" => Ok(LogicalInput::ButtonPressed(FaceButton::A)),
            "ButtonPressed_B" => Ok(LogicalInput::ButtonPressed(FaceButton::B)),
            "ButtonPressed_X" => Ok(LogicalInput::ButtonPressed(FaceButton::X)),
            "ButtonPressed_Y" => Ok(LogicalInput::ButtonPressed(FaceButton::Y)),
            other => Err(format!("unknown input '{}'", other)),
        }
    }
}

impl fmt::Display for LogicalInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalInput::Trigger => f.write_str("trigger"),
            LogicalInput::GripButton => f.write_str("grip_button"),
            LogicalInput::MenuButton => f.write_str("menu_button"),
            LogicalInput::TrackpadPressed => f.write_str("trackpad_pressed"),
            LogicalInput::JoystickPressed => f.write_str("joystick_pressed"),
            LogicalInput::ButtonPressed(b) => write!(f, "ButtonPressed_{:?}", b),
        }
    }
}

/// One resolved binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingSpec {
    /// Physical output, if one was configured and exists on the backend.
    pub target: Option<Target>,
    /// True iff `target` is set and matches the input kind.
    pub enabled: bool,
    /// Bit index for bitmask inputs.
    pub bit: Option<u32>,
}

impl BindingSpec {
    /// A binding that never fires.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            target: None,
            enabled: false,
            bit: None,
        }
    }
}

/// Logical input → binding, for both hands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTable {
    pub hands: HandPair<BTreeMap<LogicalInput, BindingSpec>>,
}

impl MappingTable {
    /// Builds a table from configuration for one backend
    ///
    /// # Arguments
    ///
    /// * `config` - Raw per-hand entries
    /// * `backend` - Backend whose target vocabulary is used
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use vrpad_bridge::config::{BindingConfig, SideBindings};
    /// use vrpad_bridge::controller::state::Hand;
    /// use vrpad_bridge::gamepad::backend::Backend;
    /// use vrpad_bridge::mapping::binding::{LogicalInput, MappingTable};
    ///
    /// let mut left = BTreeMap::new();
    /// left.insert("grip_button".to_string(), BindingConfig::to_target("left_shoulder"));
    /// let config = SideBindings { left_controller: left, right_controller: BTreeMap::new() };
    ///
    /// let table = MappingTable::from_config(&config, Backend::XInput);
    /// assert!(table.get(Hand::Left, LogicalInput::GripButton).unwrap().enabled);
    /// ```
    #[must_use]
    pub fn from_config(config: &SideBindings, backend: Backend) -> Self {
        Self {
            hands: HandPair::new(
                resolve_side(Hand::Left, &config.left_controller, backend),
                resolve_side(Hand::Right, &config.right_controller, backend),
            ),
        }
    }

    /// Returns the binding for one input, if configured.
    #[must_use]
    pub fn get(&self, hand: Hand, input: LogicalInput) -> Option<&BindingSpec> {
        self.hands.get(hand).get(&input)
    }

    /// Enabled bindings for one hand, in stable input order.
    pub fn enabled(&self, hand: Hand) -> impl Iterator<Item = (LogicalInput, &BindingSpec)> + '_ {
        self.hands
            .get(hand)
            .iter()
            .filter(|(_, spec)| spec.enabled)
            .map(|(input, spec)| (*input, spec))
    }
}

fn resolve_side(
    hand: Hand,
    entries: &BTreeMap<String, BindingConfig>,
    backend: Backend,
) -> BTreeMap<LogicalInput, BindingSpec> {
    let mut table = BTreeMap::new();

    for (name, raw) in entries {
        let input: LogicalInput = match name.parse() {
            Ok(input) => input,
            Err(e) => {
                warn!("Ignoring {} mapping: {}", hand.config_key(), e);
                continue;
            }
        };
        table.insert(input, resolve_binding(hand, input, raw, backend));
    }

    table
}

fn resolve_binding(hand: Hand, input: LogicalInput, raw: &BindingConfig, backend: Backend) -> BindingSpec {
    if !raw.enabled {
        debug!("{}.{} switched off", hand.config_key(), input);
        return BindingSpec::disabled();
    }

    let Some(target_name) = raw.target.as_deref() else {
        debug!("{}.{} has no target", hand.config_key(), input);
        return BindingSpec::disabled();
    };

    let Some(target) = backend.target_by_name(target_name) else {
        warn!(
            "{}.{}: '{}' is not a {} output, binding disabled",
            hand.config_key(),
            input,
            target_name,
            backend
        );
        return BindingSpec::disabled();
    };

    let kind_ok = match (input.kind(), target) {
        (InputKind::Continuous, Target::Trigger(_)) => true,
        (InputKind::Discrete | InputKind::Bitmask, Target::Button(_)) => true,
        _ => false,
    };
    if !kind_ok {
        warn!(
            "{}.{} cannot drive '{}', binding disabled",
            hand.config_key(),
            input,
            target_name
        );
        return BindingSpec::disabled();
    }

    let bit = match input {
        LogicalInput::ButtonPressed(face) => Some(raw.bit.unwrap_or_else(|| face.default_bit())),
        _ => {
            if raw.bit.is_some() {
                warn!("{}.{}: bit is only used by ButtonPressed inputs", hand.config_key(), input);
            }
            None
        }
    };

    BindingSpec {
        target: Some(target),
        enabled: true,
        bit,
    }
}

/// Normal and shift tables for the active backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mappings {
    pub normal: MappingTable,
    pub shift: MappingTable,
}

impl Mappings {
    /// Builds both tables
    ///
    /// A shift-table binding on the left grip is never used, since that
    /// input is the shift key and always resolves against the normal table.
    #[must_use]
    pub fn from_config(config: &BackendMappings, backend: Backend) -> Self {
        let shift = MappingTable::from_config(&config.shift_buttons, backend);
        if shift
            .get(Hand::Left, LogicalInput::GripButton)
            .is_some_and(|spec| spec.enabled)
        {
            warn!("left_controller.grip_button is the shift key; its shift_buttons binding is ignored");
        }

        Self {
            normal: MappingTable::from_config(&config.buttons, backend),
            shift,
        }
    }

    /// Table for the current shift state.
    #[must_use]
    pub fn select(&self, shift: bool) -> &MappingTable {
        if shift {
            &self.shift
        } else {
            &self.normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamepad::report::{Button, TriggerSide};

    fn entry(target: &str) -> BindingConfig {
        BindingConfig::to_target(target)
    }

    fn side(left: &[(&str, BindingConfig)], right: &[(&str, BindingConfig)]) -> SideBindings {
        SideBindings {
            left_controller: left.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            right_controller: right.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }

    // ==================== Parse Tests ====================

    #[test]
    fn test_parse_logical_inputs() {
        assert_eq!("trigger".parse::<LogicalInput>(), Ok(LogicalInput::Trigger));
        assert_eq!("grip_button".parse::<LogicalInput>(), Ok(LogicalInput::GripButton));
        assert_eq!(
            "ButtonPressed_Y".parse::<LogicalInput>(),
            Ok(LogicalInput::ButtonPressed(FaceButton::Y))
        );
        assert!("ButtonPressed_Z".parse::<LogicalInput>().is_err());
        assert!("Trigger".parse::<LogicalInput>().is_err());
    }

    #[test]
    fn test_display_matches_config_names() {
        for name in ["trigger", "grip_button", "menu_button", "ButtonPressed_B"] {
            let input: LogicalInput = name.parse().unwrap();
            assert_eq!(input.to_string(), name);
        }
    }

    #[test]
    fn test_default_bits() {
        assert_eq!(FaceButton::A.default_bit(), 7);
        assert_eq!(FaceButton::X.default_bit(), 7);
        assert_eq!(FaceButton::B.default_bit(), 1);
        assert_eq!(FaceButton::Y.default_bit(), 1);
    }

    #[test]
    fn test_is_pressed_bitmask() {
        let mut snapshot = ControllerSnapshot::default();
        snapshot.button_pressed = 1 << 7;
        let a = LogicalInput::ButtonPressed(FaceButton::A);
        assert!(a.is_pressed(&snapshot, 7));
        assert!(!a.is_pressed(&snapshot, 1));
        assert!(!a.is_pressed(&snapshot, 64));
    }

    // ==================== Table Tests ====================

    #[test]
    fn test_resolves_valid_bindings() {
        let config = side(
            &[("grip_button", entry("left_shoulder")), ("trigger", entry("left_trigger"))],
            &[("ButtonPressed_A", entry("cross"))],
        );
        let table = MappingTable::from_config(&config, Backend::Ds4);

        let grip = table.get(Hand::Left, LogicalInput::GripButton).unwrap();
        assert!(grip.enabled);
        assert_eq!(grip.target, Some(Target::Button(Button::LeftShoulder)));

        let trigger = table.get(Hand::Left, LogicalInput::Trigger).unwrap();
        assert_eq!(trigger.target, Some(Target::Trigger(TriggerSide::Left)));

        let a = table
            .get(Hand::Right, LogicalInput::ButtonPressed(FaceButton::A))
            .unwrap();
        assert_eq!(a.target, Some(Target::Button(Button::South)));
        assert_eq!(a.bit, Some(7));
    }

    #[test]
    fn test_bit_override() {
        let config = side(
            &[],
            &[(
                "ButtonPressed_A",
                BindingConfig {
                    bit: Some(2),
                    ..entry("a")
                },
            )],
        );
        let table = MappingTable::from_config(&config, Backend::XInput);
        let a = table
            .get(Hand::Right, LogicalInput::ButtonPressed(FaceButton::A))
            .unwrap();
        assert_eq!(a.bit, Some(2));
    }

    #[test]
    fn test_missing_target_is_disabled() {
        let config = side(&[("menu_button", BindingConfig::default())], &[]);
        let table = MappingTable::from_config(&config, Backend::XInput);
        assert_eq!(
            table.get(Hand::Left, LogicalInput::MenuButton),
            Some(&BindingSpec::disabled())
        );
        assert_eq!(table.enabled(Hand::Left).count(), 0);
    }

    #[test]
    fn test_switched_off_binding_is_disabled() {
        let config = side(
            &[(
                "grip_button",
                BindingConfig {
                    enabled: false,
                    ..entry("left_shoulder")
                },
            )],
            &[],
        );
        let table = MappingTable::from_config(&config, Backend::XInput);
        assert!(!table.get(Hand::Left, LogicalInput::GripButton).unwrap().enabled);
    }

    #[test]
    fn test_wrong_backend_vocabulary_is_disabled() {
        let config = side(&[("grip_button", entry("cross"))], &[]);
        let table = MappingTable::from_config(&config, Backend::XInput);
        assert!(!table.get(Hand::Left, LogicalInput::GripButton).unwrap().enabled);
    }

    #[test]
    fn test_kind_mismatch_is_disabled() {
        let config = side(
            &[("trigger", entry("left_shoulder"))],
            &[("grip_button", entry("right_trigger"))],
        );
        let table = MappingTable::from_config(&config, Backend::Ds4);
        assert!(!table.get(Hand::Left, LogicalInput::Trigger).unwrap().enabled);
        assert!(!table.get(Hand::Right, LogicalInput::GripButton).unwrap().enabled);
    }

    #[test]
    fn test_unknown_input_is_skipped() {
        let config = side(&[("thumbwheel", entry("left_shoulder"))], &[]);
        let table = MappingTable::from_config(&config, Backend::Ds4);
        assert!(table.hands.left.is_empty());
    }

    #[test]
    fn test_enabled_iterates_in_stable_order() {
        let config = side(
            &[
                ("joystick_pressed", entry("left_thumb")),
                ("trigger", entry("left_trigger")),
                ("grip_button", entry("left_shoulder")),
            ],
            &[],
        );
        let table = MappingTable::from_config(&config, Backend::XInput);
        let order: Vec<_> = table.enabled(Hand::Left).map(|(input, _)| input).collect();
        assert_eq!(
            order,
            vec![
                LogicalInput::Trigger,
                LogicalInput::GripButton,
                LogicalInput::JoystickPressed
            ]
        );
    }

    #[test]
    fn test_select_by_shift() {
        let config = BackendMappings {
            buttons: side(&[("grip_button", entry("left_shoulder"))], &[]),
            shift_buttons: side(&[("grip_button", entry("back"))], &[]),
        };
        let mappings = Mappings::from_config(&config, Backend::XInput);
        assert_eq!(
            mappings.select(false).get(Hand::Left, LogicalInput::GripButton).unwrap().target,
            Some(Target::Button(Button::LeftShoulder))
        );
        assert_eq!(
            mappings.select(true).get(Hand::Left, LogicalInput::GripButton).unwrap().target,
            Some(Target::Button(Button::Back))
        );
    }

    #[test]
    fn test_default_config_tables_fully_enabled() {
        let config = crate::config::Config::default();
        for backend in [Backend::Ds4, Backend::XInput] {
            let mappings = Mappings::from_config(config.mappings.for_backend(backend), backend);
            for table in [&mappings.normal, &mappings.shift] {
                for hand in Hand::BOTH {
                    assert!(table.hands.get(hand).values().all(|spec| spec.enabled));
                }
            }
        }
    }
}
