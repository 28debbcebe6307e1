//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field has a built-in default, so an empty file (or no
//! file at all) is a valid configuration. [`Config::load_or_default`] never
//! blocks startup: unreadable or invalid files are logged and replaced by
//! the defaults.

use serde::de::Error;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::controller::state::{AnalogInput, AxisSource, Hand};
use crate::error::{BridgeError, Result};
use crate::gamepad::backend::Backend;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeConfig,

    #[serde(default = "default_left_stick")]
    pub left_stick: StickConfig,

    #[serde(default = "default_right_stick")]
    pub right_stick: StickConfig,

    #[serde(default)]
    pub head_tracking: HeadTrackingConfig,

    #[serde(default)]
    pub calibration: CalibrationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub mappings: MappingsConfig,
}

/// Frame loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BridgeConfig {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,
}

/// Both axes of one output stick
#[derive(Debug, Deserialize, Clone)]
pub struct StickConfig {
    #[serde(default)]
    pub x: AxisConfig,

    #[serde(default)]
    pub y: AxisConfig,
}

/// One output stick axis
#[derive(Debug, Deserialize, Clone)]
pub struct AxisConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Input feeding this axis, e.g. `"right_controller:joystick_x"`.
    #[serde(default)]
    pub source: Option<AxisSource>,

    #[serde(default = "default_axis_deadzone")]
    pub deadzone: f64,

    #[serde(default = "default_axis_sensitivity")]
    pub sensitivity: f64,
}

/// Head tracking configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HeadTrackingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub yaw_enabled: bool,

    #[serde(default = "default_true")]
    pub pitch_enabled: bool,

    #[serde(default = "default_head_sensitivity")]
    pub sensitivity_yaw: f64,

    #[serde(default = "default_head_sensitivity")]
    pub sensitivity_pitch: f64,

    #[serde(default = "default_head_deadzone")]
    pub deadzone_yaw: f64,

    #[serde(default = "default_head_deadzone")]
    pub deadzone_pitch: f64,

    #[serde(default = "default_smoothing")]
    pub smoothing_yaw: f64,

    #[serde(default = "default_smoothing")]
    pub smoothing_pitch: f64,

    #[serde(default = "default_range_degrees")]
    pub range_degrees: f64,

    #[serde(default = "default_blend_hmd")]
    pub blend_hmd: f64,

    #[serde(default = "default_blend_controller")]
    pub blend_controller: f64,
}

/// Calibration gesture configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    #[serde(default = "default_calibration_path")]
    pub path: String,

    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    #[serde(default = "default_gesture_margin")]
    pub gesture_margin: f64,

    #[serde(default = "default_refractory_ms")]
    pub refractory_ms: u64,

    #[serde(default = "default_haptic_strength")]
    pub haptic_strength: f64,

    #[serde(default = "default_haptic_duration_ms")]
    pub haptic_duration_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for the log file. No file log when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
}

/// Button mappings per backend
#[derive(Debug, Deserialize, Clone)]
pub struct MappingsConfig {
    #[serde(default = "default_ds4_mappings")]
    pub ds4: BackendMappings,

    #[serde(default = "default_xinput_mappings")]
    pub xinput: BackendMappings,
}

/// Normal and shift tables for one backend
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BackendMappings {
    #[serde(default)]
    pub buttons: SideBindings,

    #[serde(default)]
    pub shift_buttons: SideBindings,
}

/// Logical input name → binding, per hand
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SideBindings {
    #[serde(default)]
    pub left_controller: BTreeMap<String, BindingConfig>,

    #[serde(default)]
    pub right_controller: BTreeMap<String, BindingConfig>,
}

/// A single binding as written in the file
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BindingConfig {
    /// Physical output name in the backend's vocabulary.
    #[serde(default)]
    pub target: Option<String>,

    /// Bit index override for `ButtonPressed_*` inputs.
    #[serde(default)]
    pub bit: Option<u32>,

    /// Set to false to switch the binding off without removing it.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

// Default value functions
fn default_true() -> bool { true }
fn default_rate_hz() -> f64 { 72.0 }

fn default_axis_deadzone() -> f64 { 0.1 }
fn default_axis_sensitivity() -> f64 { 1.0 }

fn default_head_sensitivity() -> f64 { 1.5 }
fn default_head_deadzone() -> f64 { 0.1 }
fn default_smoothing() -> f64 { 0.2 }
fn default_range_degrees() -> f64 { 45.0 }
fn default_blend_hmd() -> f64 { 0.7 }
fn default_blend_controller() -> f64 { 0.3 }

fn default_calibration_path() -> String { "calibration.json".to_string() }
fn default_cooldown_ms() -> u64 { 1000 }
fn default_gesture_margin() -> f64 { 0.15 }
fn default_refractory_ms() -> u64 { 100 }
fn default_haptic_strength() -> f64 { 1.0 }
fn default_haptic_duration_ms() -> u64 { 500 }

fn default_log_level() -> String { "info".to_string() }

fn default_left_stick() -> StickConfig {
    StickConfig {
        x: AxisConfig::from_source(AxisSource::new(Hand::Left, AnalogInput::JoystickX)),
        y: AxisConfig::from_source(AxisSource::new(Hand::Left, AnalogInput::JoystickY)),
    }
}

fn default_right_stick() -> StickConfig {
    StickConfig {
        x: AxisConfig::from_source(AxisSource::new(Hand::Right, AnalogInput::JoystickX)),
        y: AxisConfig::from_source(AxisSource::new(Hand::Right, AnalogInput::JoystickY)),
    }
}

fn bind(entries: &[(&str, &str)]) -> BTreeMap<String, BindingConfig> {
    entries
        .iter()
        .map(|(input, target)| ((*input).to_string(), BindingConfig::to_target(target)))
        .collect()
}

fn default_ds4_mappings() -> BackendMappings {
    BackendMappings {
        buttons: SideBindings {
            left_controller: bind(&[
                ("trigger", "left_trigger"),
                ("joystick_pressed", "left_thumb"),
                ("ButtonPressed_X", "square"),
                ("ButtonPressed_Y", "triangle"),
            ]),
            right_controller: bind(&[
                ("trigger", "right_trigger"),
                ("grip_button", "right_shoulder"),
                ("joystick_pressed", "right_thumb"),
                ("ButtonPressed_A", "cross"),
                ("ButtonPressed_B", "circle"),
            ]),
        },
        shift_buttons: SideBindings {
            left_controller: bind(&[("joystick_pressed", "share")]),
            right_controller: bind(&[
                ("trigger", "right_trigger"),
                ("joystick_pressed", "options"),
            ]),
        },
    }
}

fn default_xinput_mappings() -> BackendMappings {
    BackendMappings {
        buttons: SideBindings {
            left_controller: bind(&[
                ("trigger", "left_trigger"),
                ("joystick_pressed", "left_thumb"),
                ("ButtonPressed_X", "x"),
                ("ButtonPressed_Y", "y"),
            ]),
            right_controller: bind(&[
                ("trigger", "right_trigger"),
                ("grip_button", "right_shoulder"),
                ("joystick_pressed", "right_thumb"),
                ("ButtonPressed_A", "a"),
                ("ButtonPressed_B", "b"),
            ]),
        },
        shift_buttons: SideBindings {
            left_controller: bind(&[("joystick_pressed", "back")]),
            right_controller: bind(&[
                ("trigger", "right_trigger"),
                ("joystick_pressed", "start"),
            ]),
        },
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bridge: BridgeConfig::default(),
            left_stick: default_left_stick(),
            right_stick: default_right_stick(),
            head_tracking: HeadTrackingConfig::default(),
            calibration: CalibrationConfig::default(),
            logging: LoggingConfig::default(),
            mappings: MappingsConfig::default(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            rate_hz: default_rate_hz(),
        }
    }
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            target: None,
            bit: None,
            enabled: true,
        }
    }
}

impl BindingConfig {
    /// Binding to a named target with the default bit.
    #[must_use]
    pub fn to_target(target: &str) -> Self {
        Self {
            target: Some(target.to_string()),
            ..Self::default()
        }
    }
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: None,
            deadzone: default_axis_deadzone(),
            sensitivity: default_axis_sensitivity(),
        }
    }
}

impl AxisConfig {
    fn from_source(source: AxisSource) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }

    /// Configured source, or `fallback` when the file leaves it out.
    #[must_use]
    pub fn source_or(&self, fallback: AxisSource) -> AxisSource {
        self.source.unwrap_or(fallback)
    }
}

impl Default for HeadTrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            yaw_enabled: true,
            pitch_enabled: true,
            sensitivity_yaw: default_head_sensitivity(),
            sensitivity_pitch: default_head_sensitivity(),
            deadzone_yaw: default_head_deadzone(),
            deadzone_pitch: default_head_deadzone(),
            smoothing_yaw: default_smoothing(),
            smoothing_pitch: default_smoothing(),
            range_degrees: default_range_degrees(),
            blend_hmd: default_blend_hmd(),
            blend_controller: default_blend_controller(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            path: default_calibration_path(),
            cooldown_ms: default_cooldown_ms(),
            gesture_margin: default_gesture_margin(),
            refractory_ms: default_refractory_ms(),
            haptic_strength: default_haptic_strength(),
            haptic_duration_ms: default_haptic_duration_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

impl Default for MappingsConfig {
    fn default() -> Self {
        Self {
            ds4: default_ds4_mappings(),
            xinput: default_xinput_mappings(),
        }
    }
}

impl MappingsConfig {
    /// Returns the tables for one backend.
    #[must_use]
    pub fn for_backend(&self, backend: Backend) -> &BackendMappings {
        match backend {
            Backend::Ds4 => &self.ds4,
            Backend::XInput => &self.xinput,
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vrpad_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to built-in defaults
    ///
    /// A missing file is expected and logged at info. An unreadable or
    /// invalid file is logged at warn. Neither stops startup.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => {
                info!("Config loaded from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to load config file {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if !self.bridge.rate_hz.is_finite() || self.bridge.rate_hz < 1.0 || self.bridge.rate_hz > 1000.0 {
            return Err(invalid("rate_hz must be between 1 and 1000"));
        }

        // Validate stick axes
        for (name, axis) in [
            ("left_stick.x", &self.left_stick.x),
            ("left_stick.y", &self.left_stick.y),
            ("right_stick.x", &self.right_stick.x),
            ("right_stick.y", &self.right_stick.y),
        ] {
            if !(0.0..1.0).contains(&axis.deadzone) {
                return Err(invalid(format!("{}.deadzone must be between 0.0 and 1.0", name)));
            }
            if !axis.sensitivity.is_finite() {
                return Err(invalid(format!("{}.sensitivity must be finite", name)));
            }
        }

        let head = &self.head_tracking;

        for (name, value) in [
            ("deadzone_yaw", head.deadzone_yaw),
            ("deadzone_pitch", head.deadzone_pitch),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{} must be a non-negative number", name)));
            }
        }

        for (name, value) in [
            ("sensitivity_yaw", head.sensitivity_yaw),
            ("sensitivity_pitch", head.sensitivity_pitch),
        ] {
            if !value.is_finite() {
                return Err(invalid(format!("{} must be finite", name)));
            }
        }

        // Validate smoothing factors
        for (name, value) in [
            ("smoothing_yaw", head.smoothing_yaw),
            ("smoothing_pitch", head.smoothing_pitch),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(format!("{} must be in (0.0, 1.0]", name)));
            }
        }

        if !head.range_degrees.is_finite() || head.range_degrees < 0.0 || head.range_degrees > 180.0 {
            return Err(invalid("range_degrees must be between 0 and 180"));
        }

        for (name, value) in [
            ("blend_hmd", head.blend_hmd),
            ("blend_controller", head.blend_controller),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{} must be a non-negative number", name)));
            }
        }

        // Validate calibration
        if self.calibration.path.is_empty() {
            return Err(invalid("calibration path cannot be empty"));
        }

        if self.calibration.cooldown_ms > 60000 {
            return Err(invalid("cooldown_ms must be at most 60000"));
        }

        if self.calibration.refractory_ms > 1000 {
            return Err(invalid("refractory_ms must be at most 1000"));
        }

        if !self.calibration.gesture_margin.is_finite() || self.calibration.gesture_margin < 0.0 {
            return Err(invalid("gesture_margin must be a non-negative number"));
        }

        if !(0.0..=1.0).contains(&self.calibration.haptic_strength) {
            return Err(invalid("haptic_strength must be between 0.0 and 1.0"));
        }

        if self.calibration.haptic_duration_ms > 5000 {
            return Err(invalid("haptic_duration_ms must be at most 5000"));
        }

        // Validate log level
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("log level must be one of: trace, debug, info, warn, error"));
        }

        // Validate bit overrides (button_pressed is a 64-bit mask)
        for mappings in [&self.mappings.ds4, &self.mappings.xinput] {
            for side in [&mappings.buttons, &mappings.shift_buttons] {
                for (input, binding) in side.left_controller.iter().chain(side.right_controller.iter()) {
                    if matches!(binding.bit, Some(bit) if bit > 63) {
                        return Err(invalid(format!("bit for {} must be between 0 and 63", input)));
                    }
                }
            }
        }

        Ok(())
    }
}
