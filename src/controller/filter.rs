//! # Smoothing Filter
//!
//! Single-pole exponential smoother for head-tracking angles.
//!
//! `output = alpha * sample + (1 - alpha) * last`
//!
//! - `alpha = 1.0`: pass-through
//! - `alpha -> 0.0`: very long memory

/// Exponential smoother over a scalar stream.
///
/// # Examples
///
/// ```
/// use vrpad_bridge::controller::filter::Smoother;
///
/// let mut smoother = Smoother::new(0.5);
/// assert_eq!(smoother.smooth(10.0), 5.0);
/// assert_eq!(smoother.smooth(10.0), 7.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoother {
    alpha: f64,
    last: f64,
}

/// Smallest accepted alpha; keeps the filter from freezing entirely.
const MIN_ALPHA: f64 = 1e-6;

impl Default for Smoother {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl Smoother {
    /// Creates a smoother starting at 0.0. `alpha` is clamped to (0, 1].
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha.is_nan() { 1.0 } else { alpha.clamp(MIN_ALPHA, 1.0) };
        Self { alpha, last: 0.0 }
    }

    /// Returns the smoothing factor.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Returns the last output.
    #[must_use]
    pub fn last(&self) -> f64 {
        self.last
    }

    /// Feeds one sample and returns the smoothed value.
    pub fn smooth(&mut self, sample: f64) -> f64 {
        self.last = self.alpha * sample + (1.0 - self.alpha) * self.last;
        self.last
    }
}
