//! Peak metering with attack/release ballistics.
//!
//! The audio thread owns a [`PeakMeter`] per measuring point (input and
//! output). Once per block it folds the block peak into an envelope:
//!
//! ```text
//! env = env * a + peak * (1 - a)      a = attack if peak > env, else release
//! ```
//!
//! The per-sample coefficients are `exp(-1 / (tau * fs))`. A block of `n`
//! samples applies `coeff^n`, the block-rate equivalent of running the
//! per-sample law over a block with a constant peak. The result is clamped to
//! `[0, 1]` and published through an [`AtomicF32`] that the UI polls through
//! [`MeterLevels`].
//!
//! Unlike the [`Smoother`](crate::Smoother), the envelope never lands exactly
//! on its target; tiny residues are flushed to zero.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use atomic_float::AtomicF32;

use crate::sample::Sample;

/// Envelope values below this are flushed to zero (about -140 dBFS).
const FLUSH_THRESHOLD: f32 = 1e-7;

// =============================================================================
// MeterBallistics
// =============================================================================

/// Attack and release time constants in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterBallistics {
    pub attack_ms: f64,
    pub release_ms: f64,
}

impl MeterBallistics {
    /// Plugin ballistics: fast attack, readable 200 ms fall.
    pub const PLUGIN: Self = Self::new(5.0, 200.0);

    /// Standalone host ballistics.
    pub const STANDALONE: Self = Self::new(10.0, 300.0);

    pub const fn new(attack_ms: f64, release_ms: f64) -> Self {
        Self {
            attack_ms,
            release_ms,
        }
    }
}

impl Default for MeterBallistics {
    fn default() -> Self {
        Self::PLUGIN
    }
}

/// Per-sample one-pole coefficient for a time constant in milliseconds.
///
/// Zero or negative times give 0.0 (envelope jumps to the peak).
#[inline]
pub fn one_pole_coefficient(sample_rate: f64, time_ms: f64) -> f64 {
    let tau = time_ms / 1000.0;
    if tau > 0.0 && sample_rate > 0.0 {
        (-1.0 / (tau * sample_rate)).exp()
    } else {
        0.0
    }
}

// =============================================================================
// PeakMeter
// =============================================================================

/// Envelope follower over block peaks. Audio thread only.
#[derive(Debug)]
pub struct PeakMeter {
    ballistics: MeterBallistics,
    attack_coeff: f64,
    release_coeff: f64,

    // Coefficients raised to the last block length
    block_len: usize,
    block_attack: f32,
    block_release: f32,

    envelope: f32,
    level: Arc<AtomicF32>,
}

impl PeakMeter {
    /// Create a meter publishing to `level`.
    ///
    /// Call [`set_sample_rate()`](Self::set_sample_rate) before the first block.
    pub fn new(ballistics: MeterBallistics, level: Arc<AtomicF32>) -> Self {
        Self {
            ballistics,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            block_len: 0,
            block_attack: 0.0,
            block_release: 0.0,
            envelope: 0.0,
            level,
        }
    }

    /// Ballistics in use.
    pub fn ballistics(&self) -> MeterBallistics {
        self.ballistics
    }

    /// Recompute coefficients for a new sample rate and reset the envelope.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.attack_coeff = one_pole_coefficient(sample_rate, self.ballistics.attack_ms);
        self.release_coeff = one_pole_coefficient(sample_rate, self.ballistics.release_ms);
        self.block_len = 0;
        self.reset();
    }

    /// Drop the envelope to zero.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.level.store(0.0, Ordering::Relaxed);
    }

    /// Current envelope value.
    #[inline]
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Fold the peak of a block of `num_samples` samples into the envelope
    /// and publish the result.
    #[inline]
    pub fn process_block(&mut self, peak: f32, num_samples: usize) -> f32 {
        if num_samples == 0 {
            return self.envelope;
        }
        if num_samples != self.block_len {
            self.block_len = num_samples;
            self.block_attack = self.attack_coeff.powf(num_samples as f64) as f32;
            self.block_release = self.release_coeff.powf(num_samples as f64) as f32;
        }

        let peak = if peak.is_nan() { 0.0 } else { peak.clamp(0.0, 1.0) };
        let a = if peak > self.envelope {
            self.block_attack
        } else {
            self.block_release
        };

        let mut env = self.envelope * a + peak * (1.0 - a);
        if env < FLUSH_THRESHOLD {
            env = 0.0;
        }
        self.envelope = env.clamp(0.0, 1.0);
        self.level.store(self.envelope, Ordering::Relaxed);
        self.envelope
    }
}

/// Largest absolute sample across all channels.
#[inline]
pub fn block_peak<'a, S: Sample>(channels: impl IntoIterator<Item = &'a [S]>) -> f32 {
    let mut peak = S::ZERO;
    for channel in channels {
        for &sample in channel {
            peak = peak.max(sample.abs());
        }
    }
    peak.to_f32()
}

// =============================================================================
// MeterLevels
// =============================================================================

/// Read side of the input and output meters. Cheap to clone; hand one to
/// every UI component that draws a meter.
#[derive(Debug, Clone, Default)]
pub struct MeterLevels {
    input: Arc<AtomicF32>,
    output: Arc<AtomicF32>,
}

impl MeterLevels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Smoothed input level, 0..1. Non-blocking.
    #[inline]
    pub fn input_level(&self) -> f32 {
        self.input.load(Ordering::Relaxed)
    }

    /// Smoothed output level, 0..1. Non-blocking.
    #[inline]
    pub fn output_level(&self) -> f32 {
        self.output.load(Ordering::Relaxed)
    }

    pub(crate) fn input_cell(&self) -> Arc<AtomicF32> {
        Arc::clone(&self.input)
    }

    pub(crate) fn output_cell(&self) -> Arc<AtomicF32> {
        Arc::clone(&self.output)
    }
}
