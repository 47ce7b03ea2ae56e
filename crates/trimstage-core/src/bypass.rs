//! Click-free bypass through a smoothed wet/dry crossfade.
//!
//! Toggling bypass never switches the signal path abruptly. A linear
//! [`Smoother`] ramps a wet amount between 1.0 (processed) and 0.0 (dry), and
//! every sample of the block is mixed as
//!
//! ```text
//! out = dry * dry_gain + processed * wet_gain
//! ```
//!
//! With the wet amount settled at 0.0 the output is an exact copy of the
//! input, so a bypassed stage is bit-transparent.
//!
//! # Overview
//!
//! - [`BypassState`] - Active, Bypassed, or transitioning
//! - [`BypassAction`] - What the signal path should do with this block
//! - [`CrossfadeCurve`] - Mapping from wet amount to gain pair
//! - [`WetDryMix`] - The smoothed crossfade itself

use crate::smoothing::Smoother;

// =============================================================================
// BypassState
// =============================================================================

/// Current state of the crossfade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassState {
    /// Fully processed.
    Active,
    /// Crossfading toward dry.
    RampingToBypassed,
    /// Fully dry.
    Bypassed,
    /// Crossfading toward processed.
    RampingToActive,
}

// =============================================================================
// BypassAction
// =============================================================================

/// What the signal path should do with the current block.
///
/// Returned by [`WetDryMix::begin()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassAction {
    /// Fully bypassed. Copy dry to output, skip the gain stages.
    Passthrough,

    /// Fully active. Apply the gain stages, no mixing.
    Process,

    /// Transitioning. Apply the gain stages and mix with dry per sample.
    ProcessAndCrossfade,
}

// =============================================================================
// CrossfadeCurve
// =============================================================================

/// Crossfade curve shape for bypass transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossfadeCurve {
    /// Linear crossfade: `wet_gain = w`, `dry_gain = 1 - w`.
    #[default]
    Linear,

    /// Equal-power crossfade. Holds loudness constant for uncorrelated
    /// signals during the transition.
    EqualPower,

    /// Smoothstep (`3w^2 - 2w^3`) applied to the linear law.
    SCurve,
}

impl CrossfadeCurve {
    /// Wet and dry gains for a wet amount `w` in `[0, 1]`.
    ///
    /// Every curve returns exactly `(0.0, 1.0)` at `w = 0` and `(1.0, 0.0)`
    /// at `w = 1`.
    #[inline]
    pub fn gains(&self, w: f64) -> (f64, f64) {
        let w = w.clamp(0.0, 1.0);
        match self {
            CrossfadeCurve::Linear => (w, 1.0 - w),
            CrossfadeCurve::EqualPower => {
                if w <= 0.0 {
                    (0.0, 1.0)
                } else if w >= 1.0 {
                    (1.0, 0.0)
                } else {
                    let angle = w * std::f64::consts::FRAC_PI_2;
                    (angle.sin(), angle.cos())
                }
            }
            CrossfadeCurve::SCurve => {
                let smooth = w * w * (3.0 - 2.0 * w);
                (smooth, 1.0 - smooth)
            }
        }
    }
}

// =============================================================================
// WetDryMix
// =============================================================================

/// Smoothed wet/dry crossfade used to implement bypass.
///
/// # Usage Pattern
///
/// ```ignore
/// match mix.begin(is_bypassed) {
///     BypassAction::Passthrough => copy_dry_to_output(),
///     BypassAction::Process => apply_gain(),
///     BypassAction::ProcessAndCrossfade => {
///         for each sample {
///             let (wet, dry) = mix.next_gains();
///             out = dry_sample * dry + processed * wet;
///         }
///     }
/// }
/// ```
///
/// # Real-Time Safety
///
/// No heap allocations; safe in audio callbacks.
#[derive(Debug, Clone)]
pub struct WetDryMix {
    wet: Smoother,
    curve: CrossfadeCurve,
}

impl WetDryMix {
    /// Create a crossfade ramping over `crossfade_ms` milliseconds.
    pub fn new(crossfade_ms: f64, curve: CrossfadeCurve) -> Self {
        let mut wet = Smoother::linear(crossfade_ms);
        wet.reset(1.0);
        Self { wet, curve }
    }

    /// Set the sample rate. The crossfade snaps to its current target.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.wet.set_sample_rate(sample_rate);
    }

    /// Snap to fully bypassed or fully active without a ramp.
    pub fn reset(&mut self, bypassed: bool) {
        self.wet.reset(if bypassed { 0.0 } else { 1.0 });
    }

    /// Crossfade curve in use.
    pub fn curve(&self) -> CrossfadeCurve {
        self.curve
    }

    /// Current wet amount (1.0 = processed, 0.0 = dry).
    #[inline]
    pub fn wet_amount(&self) -> f64 {
        self.wet.current()
    }

    /// Largest per-sample change of the wet amount on the current ramp.
    #[inline]
    pub fn max_step(&self) -> f64 {
        self.wet.step_size()
    }

    /// Current crossfade state.
    pub fn state(&self) -> BypassState {
        let target_dry = self.wet.target() <= 0.0;
        match (self.wet.is_smoothing(), target_dry) {
            (false, true) => BypassState::Bypassed,
            (false, false) => BypassState::Active,
            (true, true) => BypassState::RampingToBypassed,
            (true, false) => BypassState::RampingToActive,
        }
    }

    /// Publish the bypass switch for this block and decide how to process it.
    ///
    /// Reversing direction mid-ramp continues from the current wet amount.
    pub fn begin(&mut self, bypassed: bool) -> BypassAction {
        self.wet.set_target(if bypassed { 0.0 } else { 1.0 });

        match self.state() {
            BypassState::Bypassed => BypassAction::Passthrough,
            BypassState::Active => BypassAction::Process,
            BypassState::RampingToBypassed | BypassState::RampingToActive => {
                BypassAction::ProcessAndCrossfade
            }
        }
    }

    /// Advance one sample and return `(wet_gain, dry_gain)`.
    #[inline]
    pub fn next_gains(&mut self) -> (f64, f64) {
        let w = self.wet.next();
        self.curve.gains(w)
    }
}

impl Default for WetDryMix {
    /// 2 ms linear crossfade.
    fn default() -> Self {
        Self::new(2.0, CrossfadeCurve::Linear)
    }
}
