//! # Axis Conditioning Module
//!
//! Applies deadzones, sensitivity scaling and clamping to analog inputs.
//!
//! ## Deadzone
//!
//! The deadzone is a hard cutoff: values whose magnitude is below the
//! threshold become 0.0, everything else passes through unchanged. The
//! remaining range is NOT rescaled.
//!
//! ## Pipeline order
//!
//! 1. [`deadzone`]
//! 2. [`sensitivity`]
//! 3. [`clamp_unit`] (sticks) or [`clamp_and_normalize`] (head angles)
//!
//! Sensitivity runs after the deadzone so jitter below the threshold never
//! contributes, while a scaled signal may still saturate at the clamp.
//!
//! ## Usage
//!
//! ```
//! use vrpad_bridge::controller::conditioning::AxisConditioner;
//!
//! let axis = AxisConditioner::new(0.1, 2.0);
//!
//! assert_eq!(axis.apply(0.05), 0.0); // Inside deadzone
//! assert_eq!(axis.apply(0.3), 0.6);  // Scaled
//! assert_eq!(axis.apply(0.8), 1.0);  // Saturated
//! ```

/// Zeroes `value` when its magnitude is below `threshold`.
///
/// # Examples
///
/// ```
/// use vrpad_bridge::controller::conditioning::deadzone;
///
/// assert_eq!(deadzone(0.09, 0.1), 0.0);
/// assert_eq!(deadzone(0.1, 0.1), 0.1);
/// assert_eq!(deadzone(-0.5, 0.1), -0.5);
/// ```
#[must_use]
#[inline]
pub fn deadzone(value: f64, threshold: f64) -> f64 {
    if value.abs() < threshold {
        0.0
    } else {
        value
    }
}

/// Scales `value` by `factor`. The result is not bounded.
#[must_use]
#[inline]
pub fn sensitivity(value: f64, factor: f64) -> f64 {
    value * factor
}

/// Clamps `value` to -1.0..=1.0.
#[must_use]
#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(-1.0, 1.0)
}

/// Clamps `value` to `[-range, range]` and divides by `range`.
///
/// Returns 0.0 when `range_degrees` is zero.
///
/// # Examples
///
/// ```
/// use vrpad_bridge::controller::conditioning::clamp_and_normalize;
///
/// assert_eq!(clamp_and_normalize(22.5, 45.0), 0.5);
/// assert_eq!(clamp_and_normalize(-90.0, 45.0), -1.0);
/// assert_eq!(clamp_and_normalize(10.0, 0.0), 0.0);
/// ```
#[must_use]
pub fn clamp_and_normalize(value: f64, range_degrees: f64) -> f64 {
    let range = range_degrees.abs();
    if range == 0.0 {
        return 0.0;
    }
    value.clamp(-range, range) / range
}

/// Deadzone and sensitivity settings for one stick axis.
///
/// [`AxisConditioner::apply`] runs deadzone, sensitivity and the unit clamp
/// in that order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisConditioner {
    deadzone: f64,
    sensitivity: f64,
}

impl Default for AxisConditioner {
    fn default() -> Self {
        Self {
            deadzone: 0.1,
            sensitivity: 1.0,
        }
    }
}

impl AxisConditioner {
    /// Creates a conditioner. A negative deadzone is treated as zero.
    #[must_use]
    pub fn new(deadzone: f64, sensitivity: f64) -> Self {
        Self {
            deadzone: deadzone.max(0.0),
            sensitivity,
        }
    }

    /// Creates a pass-through conditioner (no deadzone, unit sensitivity).
    #[must_use]
    pub fn linear() -> Self {
        Self {
            deadzone: 0.0,
            sensitivity: 1.0,
        }
    }

    /// Returns the configured deadzone.
    #[must_use]
    pub fn deadzone(&self) -> f64 {
        self.deadzone
    }

    /// Returns the configured sensitivity factor.
    #[must_use]
    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    /// Runs deadzone, sensitivity and clamp on a raw axis value.
    #[must_use]
    pub fn apply(&self, input: f64) -> f64 {
        clamp_unit(sensitivity(deadzone(input, self.deadzone), self.sensitivity))
    }
}
