//! # D-Pad Quantization
//!
//! Maps a 2D stick position onto one of nine D-pad states (neutral plus
//! eight compass octants). Used for the left stick while shift is held.
//!
//! Each axis is tested independently against the threshold with a strict
//! `>` comparison, so a value sitting exactly on the threshold does not
//! count as deflected.

use crate::gamepad::report::DpadDirection;

/// Default per-axis deflection needed to register a D-pad direction.
pub const DPAD_THRESHOLD: f64 = 0.7;

/// Quantizes a stick position into a D-pad direction.
///
/// `y` is up-positive.
///
/// # Examples
///
/// ```
/// use vrpad_bridge::controller::dpad::{quantize, DPAD_THRESHOLD};
/// use vrpad_bridge::gamepad::report::DpadDirection;
///
/// assert_eq!(quantize(0.8, 0.8, DPAD_THRESHOLD), DpadDirection::NorthEast);
/// assert_eq!(quantize(0.0, 0.0, DPAD_THRESHOLD), DpadDirection::None);
/// assert_eq!(quantize(0.7, 0.0, DPAD_THRESHOLD), DpadDirection::None);
/// ```
#[must_use]
pub fn quantize(x: f64, y: f64, threshold: f64) -> DpadDirection {
    let right = x > threshold;
    let left = x < -threshold;

    if y > threshold {
        if right {
            DpadDirection::NorthEast
        } else if left {
            DpadDirection::NorthWest
        } else {
            DpadDirection::North
        }
    } else if y < -threshold {
        if right {
            DpadDirection::SouthEast
        } else if left {
            DpadDirection::SouthWest
        } else {
            DpadDirection::South
        }
    } else if right {
        DpadDirection::East
    } else if left {
        DpadDirection::West
    } else {
        DpadDirection::None
    }
}
