//! # Mapping Engine
//!
//! Turns the difference between two frames of controller snapshots into
//! output actions.
//!
//! - Continuous inputs set their trigger every frame.
//! - Discrete and bitmask inputs press on a rising edge and release on a
//!   falling edge. A held input produces nothing after its first frame.
//!
//! Actions come out left hand first, then right hand, and in table order
//! within each hand.
//!
//! The left grip selects the shift table for every other input, but its own
//! binding always comes from the normal table.

use crate::controller::state::{ControllerSnapshot, Hand, HandPair};
use crate::gamepad::backend::Target;
use crate::gamepad::report::{Button, GamepadOutputState, TriggerSide};

use super::binding::{BindingSpec, InputKind, LogicalInput, Mappings};

/// The left grip doubles as the shift key.
const SHIFT_KEY: (Hand, LogicalInput) = (Hand::Left, LogicalInput::GripButton);

/// One change to apply to the output report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputAction {
    /// Button went down this frame.
    Press(Button),
    /// Button came up this frame.
    Release(Button),
    /// Trigger value for this frame.
    SetTrigger(TriggerSide, f64),
}

impl OutputAction {
    /// Applies the action to a report.
    pub fn apply(&self, state: &mut GamepadOutputState) {
        match *self {
            OutputAction::Press(button) => state.buttons.insert(button),
            OutputAction::Release(button) => state.buttons.remove(button),
            OutputAction::SetTrigger(side, value) => state.set_trigger(side, value),
        }
    }
}

/// Resolves one frame of actions
///
/// Every input uses the table selected by `shift`, except the shift key
/// itself, which always uses the normal table. Holding the left grip then
/// presses and releases its normal binding even though it switches the
/// table for everything else.
///
/// # Arguments
///
/// * `mappings` - Normal and shift tables
/// * `shift` - Current shift state
/// * `current` - This frame's snapshots
/// * `previous` - Last frame's snapshots
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use vrpad_bridge::config::{BindingConfig, SideBindings};
/// use vrpad_bridge::controller::state::{ControllerSnapshot, HandPair};
/// use vrpad_bridge::gamepad::backend::Backend;
/// use vrpad_bridge::gamepad::report::Button;
/// use vrpad_bridge::mapping::binding::{MappingTable, Mappings};
/// use vrpad_bridge::mapping::engine::{resolve_frame, OutputAction};
///
/// let mut right = BTreeMap::new();
/// right.insert("menu_button".to_string(), BindingConfig::to_target("start"));
/// let normal = MappingTable::from_config(
///     &SideBindings { left_controller: BTreeMap::new(), right_controller: right },
///     Backend::XInput,
/// );
/// let mappings = Mappings { normal, shift: MappingTable::default() };
///
/// let previous = HandPair::<ControllerSnapshot>::default();
/// let mut current = previous;
/// current.right.menu_button = true;
///
/// assert_eq!(
///     resolve_frame(&mappings, false, &current, &previous),
///     vec![OutputAction::Press(Button::Start)]
/// );
/// assert!(resolve_frame(&mappings, false, &current, &current).is_empty());
/// assert!(resolve_frame(&mappings, true, &current, &previous).is_empty());
/// ```
#[must_use]
pub fn resolve_frame(
    mappings: &Mappings,
    shift: bool,
    current: &HandPair<ControllerSnapshot>,
    previous: &HandPair<ControllerSnapshot>,
) -> Vec<OutputAction> {
    let active = mappings.select(shift);
    let mut actions = Vec::new();

    for hand in Hand::BOTH {
        let mut bindings: Vec<(LogicalInput, &BindingSpec)> = active
            .enabled(hand)
            .filter(|(input, _)| !is_shift_key(hand, *input))
            .collect();
        if hand == SHIFT_KEY.0 {
            if let Some(spec) = mappings.normal.get(hand, SHIFT_KEY.1).filter(|spec| spec.enabled) {
                bindings.push((SHIFT_KEY.1, spec));
                bindings.sort_by_key(|(input, _)| *input);
            }
        }
        resolve_hand(bindings.into_iter(), current.get(hand), previous.get(hand), &mut actions);
    }

    actions
}

/// Returns true for the input that toggles shift mode.
fn is_shift_key(hand: Hand, input: LogicalInput) -> bool {
    (hand, input) == SHIFT_KEY
}

fn resolve_hand<'a>(
    bindings: impl Iterator<Item = (LogicalInput, &'a BindingSpec)>,
    now: &ControllerSnapshot,
    before: &ControllerSnapshot,
    actions: &mut Vec<OutputAction>,
) {
    for (input, spec) in bindings {
        let Some(target) = spec.target else {
            continue;
        };

        match (input.kind(), target) {
            (InputKind::Continuous, Target::Trigger(side)) => {
                actions.push(OutputAction::SetTrigger(side, now.trigger));
            }
            (InputKind::Discrete | InputKind::Bitmask, Target::Button(button)) => {
                let bit = spec.bit.unwrap_or(0);
                let is_down = input.is_pressed(now, bit);
                let was_down = input.is_pressed(before, bit);
                if is_down && !was_down {
                    actions.push(OutputAction::Press(button));
                } else if !is_down && was_down {
                    actions.push(OutputAction::Release(button));
                }
            }
            // Mismatched bindings are disabled at load
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BindingConfig, SideBindings};
    use crate::gamepad::backend::Backend;
    use crate::mapping::binding::MappingTable;
    use std::collections::BTreeMap;

    fn table(left: &[(&str, &str)], right: &[(&str, &str)]) -> MappingTable {
        let to_map = |entries: &[(&str, &str)]| -> BTreeMap<String, BindingConfig> {
            entries
                .iter()
                .map(|(input, target)| (input.to_string(), BindingConfig::to_target(target)))
                .collect()
        };
        MappingTable::from_config(
            &SideBindings {
                left_controller: to_map(left),
                right_controller: to_map(right),
            },
            Backend::XInput,
        )
    }

    /// Resolves against `table` with shift off
    fn resolve(
        table: &MappingTable,
        current: &HandPair<ControllerSnapshot>,
        previous: &HandPair<ControllerSnapshot>,
    ) -> Vec<OutputAction> {
        let mappings = Mappings {
            normal: table.clone(),
            shift: MappingTable::default(),
        };
        resolve_frame(&mappings, false, current, previous)
    }

    fn frames_with_grip(sequence: &[bool]) -> Vec<HandPair<ControllerSnapshot>> {
        sequence
            .iter()
            .map(|&down| {
                let mut pair = HandPair::<ControllerSnapshot>::default();
                pair.left.grip_button = down;
                pair
            })
            .collect()
    }

    // ==================== Edge Detection Tests ====================

    #[test]
    fn test_press_hold_release_sequence() {
        let table = table(&[("grip_button", "left_shoulder")], &[]);
        let frames = frames_with_grip(&[false, true, true, false]);

        let mut previous = HandPair::default();
        let mut emitted = Vec::new();
        for frame in &frames {
            emitted.push(resolve(&table, frame, &previous));
            previous = *frame;
        }

        assert!(emitted[0].is_empty());
        assert_eq!(emitted[1], vec![OutputAction::Press(Button::LeftShoulder)]);
        assert!(emitted[2].is_empty());
        assert_eq!(emitted[3], vec![OutputAction::Release(Button::LeftShoulder)]);
    }

    #[test]
    fn test_held_from_first_frame() {
        let table = table(&[("grip_button", "left_shoulder")], &[]);
        let frames = frames_with_grip(&[true, true]);

        let first = resolve(&table, &frames[0], &HandPair::default());
        let second = resolve(&table, &frames[1], &frames[0]);

        assert_eq!(first, vec![OutputAction::Press(Button::LeftShoulder)]);
        assert!(second.is_empty());
    }

    #[test]
    fn test_bitmask_edges() {
        let table = table(&[], &[("ButtonPressed_A", "a"), ("ButtonPressed_B", "b")]);
        let previous = HandPair::<ControllerSnapshot>::default();
        let mut current = previous;
        current.right.button_pressed = (1 << 7) | (1 << 1);

        let pressed = resolve(&table, &current, &previous);
        assert_eq!(
            pressed,
            vec![OutputAction::Press(Button::South), OutputAction::Press(Button::East)]
        );

        let mut released = current;
        released.right.button_pressed = 1 << 1;
        assert_eq!(
            resolve(&table, &released, &current),
            vec![OutputAction::Release(Button::South)]
        );
    }

    #[test]
    fn test_trigger_forwarded_every_frame() {
        let table = table(&[("trigger", "left_trigger")], &[]);
        let mut current = HandPair::<ControllerSnapshot>::default();
        current.left.trigger = 0.4;

        let actions = resolve(&table, &current, &current);
        assert_eq!(actions, vec![OutputAction::SetTrigger(TriggerSide::Left, 0.4)]);
    }

    #[test]
    fn test_left_hand_actions_first() {
        let table = table(
            &[("menu_button", "back")],
            &[("menu_button", "start")],
        );
        let previous = HandPair::<ControllerSnapshot>::default();
        let mut current = previous;
        current.left.menu_button = true;
        current.right.menu_button = true;

        assert_eq!(
            resolve(&table, &current, &previous),
            vec![OutputAction::Press(Button::Back), OutputAction::Press(Button::Start)]
        );
    }

    #[test]
    fn test_disabled_binding_is_skipped() {
        let table = table(&[("grip_button", "cross")], &[]);
        let frames = frames_with_grip(&[true]);
        assert!(resolve(&table, &frames[0], &HandPair::default()).is_empty());
    }

    #[test]
    fn test_unbound_input_is_ignored() {
        let table = table(&[], &[]);
        let frames = frames_with_grip(&[true]);
        assert!(resolve(&table, &frames[0], &HandPair::default()).is_empty());
    }

    // ==================== Shift Key Tests ====================

    fn mappings(normal: &[(&str, &str)], shift: &[(&str, &str)]) -> Mappings {
        Mappings {
            normal: table(normal, &[]),
            shift: table(shift, &[]),
        }
    }

    fn run_frames(mappings: &Mappings, frames: &[HandPair<ControllerSnapshot>]) -> Vec<Vec<OutputAction>> {
        let mut previous = HandPair::default();
        frames
            .iter()
            .map(|frame| {
                let actions = resolve_frame(mappings, frame.left.grip_button, frame, &previous);
                previous = *frame;
                actions
            })
            .collect()
    }

    #[test]
    fn test_shift_key_uses_normal_binding() {
        let mappings = mappings(&[("grip_button", "left_shoulder")], &[]);
        let emitted = run_frames(&mappings, &frames_with_grip(&[false, true, true, false]));

        assert_eq!(
            emitted,
            vec![
                vec![],
                vec![OutputAction::Press(Button::LeftShoulder)],
                vec![],
                vec![OutputAction::Release(Button::LeftShoulder)],
            ]
        );
    }

    #[test]
    fn test_shift_key_ignores_shift_binding() {
        let mappings = mappings(&[], &[("grip_button", "left_shoulder")]);
        let emitted = run_frames(&mappings, &frames_with_grip(&[false, true, false]));
        assert!(emitted.iter().all(Vec::is_empty));
    }

    #[test]
    fn test_other_inputs_follow_shift() {
        let mappings = mappings(
            &[("grip_button", "left_shoulder"), ("menu_button", "start")],
            &[("menu_button", "back")],
        );
        let mut frame = HandPair::<ControllerSnapshot>::default();
        frame.left.grip_button = true;
        frame.left.menu_button = true;

        assert_eq!(
            resolve_frame(&mappings, true, &frame, &HandPair::default()),
            vec![OutputAction::Press(Button::LeftShoulder), OutputAction::Press(Button::Back)]
        );
        assert!(is_shift_key(Hand::Left, LogicalInput::GripButton));
        assert!(!is_shift_key(Hand::Right, LogicalInput::GripButton));
    }

    // ==================== Apply Tests ====================

    #[test]
    fn test_apply_actions() {
        let mut state = GamepadOutputState::default();
        OutputAction::Press(Button::North).apply(&mut state);
        OutputAction::SetTrigger(TriggerSide::Right, 0.9).apply(&mut state);
        assert!(state.buttons.contains(Button::North));
        assert_eq!(state.right_trigger, 0.9);

        OutputAction::Release(Button::North).apply(&mut state);
        assert!(state.buttons.is_empty());
    }
}
