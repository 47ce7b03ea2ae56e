//! Parameter smoothing for click-free gain, trim and crossfade changes.
//!
//! [`Smoother`] ramps from its current value to a published target over a
//! fixed time. The law is linear per sample: each ramp reaches its target in
//! a bounded number of samples, so a settled gain stage is exact.
//!
//! ```ignore
//! let mut smoother = Smoother::new(SmoothingStyle::Linear(5.0));
//! smoother.set_sample_rate(48000.0);
//! smoother.reset(1.0);
//! smoother.set_target(0.5);
//! let value = smoother.next(); // per sample
//! ```
//!
//! # Thread Safety
//!
//! `Smoother` needs `&mut self` to advance and belongs to the audio thread.
//! Targets reach it from the control thread through the atomic
//! [`Parameter`](crate::parameters::Parameter) storage.

/// Smoothing algorithm selection.
///
/// The `f64` payload is the ramp time in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SmoothingStyle {
    /// No smoothing - value changes instantly.
    #[default]
    None,

    /// Linear interpolation that reaches the target after the given time.
    Linear(f64),
}

/// A per-sample parameter value smoother.
#[derive(Debug, Clone)]
pub struct Smoother {
    style: SmoothingStyle,
    sample_rate: f64,

    current: f64,
    target: f64,

    step_size: f64,
    steps_remaining: u32,
}

impl Smoother {
    /// Create a new smoother with the given style.
    ///
    /// Sample rate must be set before use via [`set_sample_rate()`](Self::set_sample_rate).
    pub fn new(style: SmoothingStyle) -> Self {
        Self {
            style,
            sample_rate: 0.0,
            current: 0.0,
            target: 0.0,
            step_size: 0.0,
            steps_remaining: 0,
        }
    }

    /// Linear smoother over `ms` milliseconds.
    pub fn linear(ms: f64) -> Self {
        Self::new(SmoothingStyle::Linear(ms))
    }

    /// Get the smoothing style.
    pub fn style(&self) -> SmoothingStyle {
        self.style
    }

    /// Set the sample rate.
    ///
    /// An in-flight ramp snaps to its target; callers reset the smoother
    /// right after a sample-rate change anyway.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        let target = self.target;
        self.reset(target);
    }

    /// Number of samples a full ramp takes at the current sample rate.
    pub fn ramp_samples(&self) -> u32 {
        match self.style {
            SmoothingStyle::None => 0,
            SmoothingStyle::Linear(ms) => {
                let samples = (ms * self.sample_rate / 1000.0).round();
                if samples.is_finite() && samples >= 1.0 {
                    samples.min(u32::MAX as f64) as u32
                } else {
                    1
                }
            }
        }
    }

    /// Set a new target value.
    ///
    /// Called at the start of each block with the latest published value.
    /// Re-publishing the current target leaves an in-flight ramp untouched.
    pub fn set_target(&mut self, target: f64) {
        if (self.target - target).abs() < 1e-10 {
            return;
        }
        self.target = target;

        match self.style {
            SmoothingStyle::None => {
                self.current = target;
            }
            SmoothingStyle::Linear(_) => {
                self.steps_remaining = self.ramp_samples();
                self.step_size = (target - self.current) / self.steps_remaining as f64;
            }
        }
    }

    /// Reset immediately to a value (no smoothing).
    ///
    /// Use on prepare and after loading state to avoid ramping in from a
    /// stale value.
    pub fn reset(&mut self, value: f64) {
        self.current = value;
        self.target = value;
        self.steps_remaining = 0;
        self.step_size = 0.0;
    }

    /// Advance one sample and return the new current value.
    #[inline]
    pub fn next(&mut self) -> f64 {
        match self.style {
            SmoothingStyle::None => self.target,
            SmoothingStyle::Linear(_) => {
                if self.steps_remaining > 0 {
                    self.steps_remaining -= 1;
                    self.current = if self.steps_remaining == 0 {
                        self.target
                    } else if self.step_size > 0.0 {
                        (self.current + self.step_size).min(self.target)
                    } else {
                        (self.current + self.step_size).max(self.target)
                    };
                }
                self.current
            }
        }
    }

    /// Get current smoothed value without advancing.
    #[inline]
    pub fn current(&self) -> f64 {
        match self.style {
            SmoothingStyle::None => self.target,
            SmoothingStyle::Linear(_) => self.current,
        }
    }

    /// Get the target value.
    #[inline]
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Largest change a single [`next()`](Self::next) can make on the
    /// current ramp.
    #[inline]
    pub fn step_size(&self) -> f64 {
        self.step_size.abs()
    }

    /// Skip forward by n samples. Equivalent to calling `next()` n times.
    pub fn skip(&mut self, samples: usize) {
        if let SmoothingStyle::Linear(_) = self.style {
            let skip_count = samples.min(self.steps_remaining as usize) as u32;
            if skip_count == 0 {
                return;
            }
            self.steps_remaining -= skip_count;
            if self.steps_remaining == 0 {
                self.current = self.target;
            } else {
                let next = self.current + self.step_size * skip_count as f64;
                self.current = if self.step_size > 0.0 {
                    next.min(self.target)
                } else {
                    next.max(self.target)
                };
            }
        }
    }

    /// Returns true if still ramping toward the target.
    #[inline]
    pub fn is_smoothing(&self) -> bool {
        match self.style {
            SmoothingStyle::None => false,
            SmoothingStyle::Linear(_) => self.steps_remaining > 0,
        }
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new(SmoothingStyle::None)
    }
}
