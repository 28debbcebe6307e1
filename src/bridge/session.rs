//! # Session
//!
//! Long-lived pipeline state and the per-frame transformation from tracked
//! input to a gamepad report.
//!
//! ## Frame pipeline
//!
//! 1. Fill sensor gaps with the previous snapshot
//! 2. Read shift (left grip) and run the calibration check
//! 3. Left stick: conditioned axes, or the D-pad while shift is held
//! 4. Buttons and triggers from the active mapping table, dropping presses
//!    of held buttons and releases of buttons that are up
//! 5. Right stick: head offset blended with the right controller axis
//! 6. Convert to the backend's device conventions
//!
//! The session holds no locks and does no I/O apart from saving a new
//! calibration reference.

use tokio::time::Instant;
use tracing::debug;

use crate::config::{AxisConfig, Config, HeadTrackingConfig};
use crate::controller::conditioning::{clamp_and_normalize, clamp_unit, deadzone, sensitivity, AxisConditioner};
use crate::controller::dpad::{quantize, DPAD_THRESHOLD};
use crate::controller::filter::Smoother;
use crate::controller::state::{AnalogInput, AxisSource, ControllerSnapshot, Hand, HandPair, Pose};
use crate::gamepad::backend::Backend;
use crate::gamepad::report::{GamepadOutputState, StickPosition};
use crate::mapping::binding::Mappings;
use crate::mapping::engine::{resolve_frame, OutputAction};
use crate::tracking::calibration::{CalibrationEngine, CalibrationReference, CalibrationStore};
use std::time::Duration;

/// Everything sampled from the tracking runtime for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    /// Controller state per hand, `None` on a sensor gap.
    pub hands: HandPair<Option<ControllerSnapshot>>,
    /// Controller poses per hand.
    pub hand_poses: HandPair<Option<Pose>>,
    /// Head sensor pose.
    pub head: Option<Pose>,
}

/// Result of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    /// Full report in device convention.
    pub report: GamepadOutputState,
    /// Button and trigger actions resolved this frame, in order.
    pub actions: Vec<OutputAction>,
    /// New reference, if calibration completed this frame.
    pub calibrated: Option<CalibrationReference>,
}

/// One output stick axis with its source and conditioning
#[derive(Debug, Clone, Copy)]
struct StickAxis {
    enabled: bool,
    source: AxisSource,
    conditioner: AxisConditioner,
}

impl StickAxis {
    fn from_config(config: &AxisConfig, fallback: AxisSource) -> Self {
        Self {
            enabled: config.enabled,
            source: config.source_or(fallback),
            conditioner: AxisConditioner::new(config.deadzone, config.sensitivity),
        }
    }

    fn conditioned(&self, hands: &HandPair<ControllerSnapshot>) -> f64 {
        if self.enabled {
            self.conditioner.apply(self.source.read(hands))
        } else {
            0.0
        }
    }

    fn raw(&self, hands: &HandPair<ControllerSnapshot>) -> f64 {
        if self.enabled {
            clamp_unit(self.source.read(hands))
        } else {
            0.0
        }
    }
}

/// Pipeline state owned by the frame loop
pub struct Session {
    backend: Backend,
    mappings: Mappings,
    left_x: StickAxis,
    left_y: StickAxis,
    right_x: StickAxis,
    right_y: StickAxis,
    head: HeadTrackingConfig,
    yaw_smoother: Smoother,
    pitch_smoother: Smoother,
    calibration: CalibrationEngine,
    previous: HandPair<ControllerSnapshot>,
    state: GamepadOutputState,
    shift: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend)
            .field("calibration", &self.calibration)
            .field("shift", &self.shift)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build a session from configuration
    ///
    /// Loads the calibration reference through `store` and resolves the
    /// mapping tables for the configured backend.
    pub fn new(config: &Config, store: Box<dyn CalibrationStore>) -> Self {
        let backend = config.bridge.backend;
        let head = config.head_tracking.clone();

        let calibration = CalibrationEngine::new(
            store,
            Duration::from_millis(config.calibration.cooldown_ms),
            config.calibration.gesture_margin,
        );

        Self {
            backend,
            mappings: Mappings::from_config(config.mappings.for_backend(backend), backend),
            left_x: StickAxis::from_config(
                &config.left_stick.x,
                AxisSource::new(Hand::Left, AnalogInput::JoystickX),
            ),
            left_y: StickAxis::from_config(
                &config.left_stick.y,
                AxisSource::new(Hand::Left, AnalogInput::JoystickY),
            ),
            right_x: StickAxis::from_config(
                &config.right_stick.x,
                AxisSource::new(Hand::Right, AnalogInput::JoystickX),
            ),
            right_y: StickAxis::from_config(
                &config.right_stick.y,
                AxisSource::new(Hand::Right, AnalogInput::JoystickY),
            ),
            yaw_smoother: Smoother::new(head.smoothing_yaw),
            pitch_smoother: Smoother::new(head.smoothing_pitch),
            head,
            calibration,
            previous: HandPair::default(),
            state: GamepadOutputState::default(),
            shift: false,
        }
    }

    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    #[must_use]
    pub fn calibration(&self) -> &CalibrationEngine {
        &self.calibration
    }

    /// Whether shift was held on the last processed frame
    #[must_use]
    pub fn shift_active(&self) -> bool {
        self.shift
    }

    /// Process one frame
    ///
    /// # Arguments
    ///
    /// * `input` - This frame's samples
    /// * `now` - Frame timestamp, used for the calibration cooldown
    pub fn process(&mut self, input: &FrameInput, now: Instant) -> FrameOutput {
        let current = HandPair::new(
            input.hands.left.unwrap_or(self.previous.left),
            input.hands.right.unwrap_or(self.previous.right),
        );

        let shift = current.left.grip_button;
        if shift != self.shift {
            debug!("Shift mode {}", if shift { "on" } else { "off" });
        }

        let calibrated = self.calibration.check(
            now,
            shift,
            input.head.as_ref(),
            input.hand_poses.left.as_ref(),
            input.hand_poses.right.as_ref(),
        );

        let mut state = self.state.next_frame();

        let left_x = self.left_x.conditioned(&current);
        let left_y = self.left_y.conditioned(&current);
        if shift {
            state.dpad = quantize(left_x, left_y, DPAD_THRESHOLD);
        } else {
            state.left_stick = StickPosition::new(left_x, left_y);
        }

        // Only press what is up and release what is down
        let mut actions = Vec::new();
        for action in resolve_frame(&self.mappings, shift, &current, &self.previous) {
            let applies = match action {
                OutputAction::Press(button) => !state.buttons.contains(button),
                OutputAction::Release(button) => state.buttons.contains(button),
                OutputAction::SetTrigger(..) => true,
            };
            if applies {
                action.apply(&mut state);
                actions.push(action);
            } else {
                debug!("Dropping {:?}, button already in that state", action);
            }
        }

        state.right_stick = self.right_stick(&current, input.head.as_ref());

        self.state = state;
        self.previous = current;
        self.shift = shift;

        FrameOutput {
            report: self.backend.device_report(&state),
            actions,
            calibrated,
        }
    }

    fn right_stick(&mut self, hands: &HandPair<ControllerSnapshot>, head: Option<&Pose>) -> StickPosition {
        if !self.head.enabled {
            return StickPosition::new(self.right_x.raw(hands), self.right_y.raw(hands));
        }

        let (hmd_x, hmd_y) = self.head_offset(head);
        let controller_x = self.right_x.conditioned(hands);
        let controller_y = self.right_y.conditioned(hands);

        StickPosition::new(
            clamp_unit(self.head.blend_hmd * hmd_x + self.head.blend_controller * controller_x),
            clamp_unit(self.head.blend_hmd * hmd_y + self.head.blend_controller * controller_y),
        )
    }

    /// Normalized head offset from the calibration reference.
    ///
    /// A missing head pose contributes nothing and leaves the smoothers
    /// untouched.
    fn head_offset(&mut self, head: Option<&Pose>) -> (f64, f64) {
        let Some(head) = head else {
            return (0.0, 0.0);
        };
        let (yaw, pitch) = self.calibration.reference().offset(head);
        let range = self.head.range_degrees;

        let x = if self.head.yaw_enabled {
            let shaped = sensitivity(deadzone(yaw, self.head.deadzone_yaw), self.head.sensitivity_yaw);
            clamp_and_normalize(self.yaw_smoother.smooth(shaped), range)
        } else {
            0.0
        };

        let y = if self.head.pitch_enabled {
            let shaped = sensitivity(deadzone(pitch, self.head.deadzone_pitch), self.head.sensitivity_pitch);
            clamp_and_normalize(self.pitch_smoother.smooth(shaped), range)
        } else {
            0.0
        };

        (x, y)
    }
}
