//! Gain stage configuration and host setup.
//!
//! [`GainStageConfig`] chooses the shape of the stage (one gain or separate
//! trim/output faders), the smoothing times, meter ballistics and MIDI-CC
//! mapping. It is fixed for the lifetime of a plugin instance.
//! [`AudioSetup`] carries what the host negotiates at prepare time.
//!
//! # Example
//!
//! ```ignore
//! use trimstage_core::{GainStageConfig, MeterBallistics, StageLayout};
//!
//! pub static CONFIG: GainStageConfig = GainStageConfig::plugin()
//!     .with_layout(StageLayout::TrimAndOutput)
//!     .with_meter(MeterBallistics::new(10.0, 300.0));
//! ```

use crate::bypass::CrossfadeCurve;
use crate::error::{PluginError, PluginResult};
use crate::meter::MeterBallistics;
use crate::midi_cc::MidiCcConfig;

// =============================================================================
// StageLayout
// =============================================================================

/// Which gain stages the signal path runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageLayout {
    /// One gain parameter.
    #[default]
    SingleGain,
    /// Independent input trim and output level, applied multiplicatively.
    TrimAndOutput,
}

// =============================================================================
// GainStageConfig
// =============================================================================

/// Static configuration of a gain stage instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainStageConfig {
    /// Gain stage shape.
    pub layout: StageLayout,
    /// Ramp time of the gain/trim smoothers, in milliseconds.
    pub gain_smoothing_ms: f64,
    /// Ramp time of the bypass crossfade, in milliseconds.
    pub bypass_crossfade_ms: f64,
    /// Bypass crossfade curve.
    pub crossfade_curve: CrossfadeCurve,
    /// Meter attack/release.
    pub meter: MeterBallistics,
    /// MIDI-CC mapping, `None` to ignore MIDI input.
    pub midi_cc: Option<MidiCcConfig>,
}

impl GainStageConfig {
    /// Plugin defaults: single gain, 5 ms smoothing, 2 ms bypass crossfade,
    /// 5/200 ms meter, no MIDI.
    pub const fn plugin() -> Self {
        Self {
            layout: StageLayout::SingleGain,
            gain_smoothing_ms: 5.0,
            bypass_crossfade_ms: 2.0,
            crossfade_curve: CrossfadeCurve::Linear,
            meter: MeterBallistics::PLUGIN,
            midi_cc: None,
        }
    }

    /// Standalone host defaults: trim and output faders, 10 ms smoothing,
    /// 10/300 ms meter, CC 11/7/1 mapping.
    pub const fn standalone() -> Self {
        Self {
            layout: StageLayout::TrimAndOutput,
            gain_smoothing_ms: 10.0,
            bypass_crossfade_ms: 2.0,
            crossfade_curve: CrossfadeCurve::Linear,
            meter: MeterBallistics::STANDALONE,
            midi_cc: Some(MidiCcConfig::trim_and_output()),
        }
    }

    /// Set the gain stage shape.
    pub const fn with_layout(mut self, layout: StageLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the gain smoothing time.
    pub const fn with_gain_smoothing_ms(mut self, ms: f64) -> Self {
        self.gain_smoothing_ms = ms;
        self
    }

    /// Set the bypass crossfade time.
    pub const fn with_bypass_crossfade_ms(mut self, ms: f64) -> Self {
        self.bypass_crossfade_ms = ms;
        self
    }

    /// Set the crossfade curve.
    pub const fn with_crossfade_curve(mut self, curve: CrossfadeCurve) -> Self {
        self.crossfade_curve = curve;
        self
    }

    /// Set the meter ballistics.
    pub const fn with_meter(mut self, meter: MeterBallistics) -> Self {
        self.meter = meter;
        self
    }

    /// Enable MIDI-CC mapping. See [`MidiCcConfig::for_layout`] for the stock
    /// assignments of each layout.
    pub const fn with_midi_cc(mut self, midi_cc: MidiCcConfig) -> Self {
        self.midi_cc = Some(midi_cc);
        self
    }

    /// Reject MIDI-CC assignments that would have no audible effect.
    pub fn validate(&self) -> PluginResult<()> {
        let inactive = self
            .midi_cc
            .and_then(|midi_cc| midi_cc.inactive_assignment(self.layout));
        match inactive {
            Some((controller, target)) => Err(PluginError::InactiveCcTarget { controller, target }),
            None => Ok(()),
        }
    }
}

impl Default for GainStageConfig {
    fn default() -> Self {
        Self::plugin()
    }
}

// =============================================================================
// Bus Layout
// =============================================================================

/// Main bus channel counts offered by the host. Zero means disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusLayout {
    /// Number of channels on the main input bus
    pub main_input_channels: u32,
    /// Number of channels on the main output bus
    pub main_output_channels: u32,
}

impl BusLayout {
    /// Create a mono (1 in, 1 out) layout.
    pub const fn mono() -> Self {
        Self {
            main_input_channels: 1,
            main_output_channels: 1,
        }
    }

    /// Create a stereo (2 in, 2 out) layout.
    pub const fn stereo() -> Self {
        Self {
            main_input_channels: 2,
            main_output_channels: 2,
        }
    }

    /// True for matching, enabled mono or stereo buses.
    pub const fn is_supported(&self) -> bool {
        self.main_input_channels == self.main_output_channels
            && (self.main_input_channels == 1 || self.main_input_channels == 2)
    }

    /// Accept the layout or explain why not.
    pub fn validate(&self) -> PluginResult<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(PluginError::UnsupportedLayout {
                inputs: self.main_input_channels,
                outputs: self.main_output_channels,
            })
        }
    }

    /// Number of channels the signal path processes.
    pub const fn channels(&self) -> usize {
        self.main_output_channels as usize
    }
}

impl Default for BusLayout {
    fn default() -> Self {
        Self::stereo()
    }
}

// =============================================================================
// AudioSetup
// =============================================================================

/// Audio configuration negotiated with the host at prepare time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSetup {
    /// Sample rate in Hz (e.g., 44100.0, 48000.0, 96000.0)
    pub sample_rate: f64,
    /// Maximum number of samples per process() call
    pub max_block_size: usize,
    /// Main bus layout
    pub layout: BusLayout,
}

impl AudioSetup {
    /// Stereo setup.
    pub const fn new(sample_rate: f64, max_block_size: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            layout: BusLayout::stereo(),
        }
    }

    /// Replace the bus layout.
    pub const fn with_layout(mut self, layout: BusLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Check everything a processor needs before allocating for it.
    pub fn validate(&self) -> PluginResult<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(PluginError::InvalidSampleRate(self.sample_rate));
        }
        if self.max_block_size == 0 {
            return Err(PluginError::InvalidBlockSize);
        }
        self.layout.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_layouts() {
        assert!(BusLayout::mono().is_supported());
        assert!(BusLayout::stereo().is_supported());

        let mismatched = BusLayout {
            main_input_channels: 1,
            main_output_channels: 2,
        };
        assert_eq!(
            mismatched.validate(),
            Err(PluginError::UnsupportedLayout {
                inputs: 1,
                outputs: 2
            })
        );

        let disabled = BusLayout {
            main_input_channels: 0,
            main_output_channels: 0,
        };
        assert!(!disabled.is_supported());

        let surround = BusLayout {
            main_input_channels: 6,
            main_output_channels: 6,
        };
        assert!(!surround.is_supported());
    }

    #[test]
    fn setup_validation() {
        assert!(AudioSetup::new(48000.0, 512).validate().is_ok());
        assert_eq!(
            AudioSetup::new(0.0, 512).validate(),
            Err(PluginError::InvalidSampleRate(0.0))
        );
        assert!(AudioSetup::new(f64::NAN, 512).validate().is_err());
        assert_eq!(
            AudioSetup::new(48000.0, 0).validate(),
            Err(PluginError::InvalidBlockSize)
        );
    }

    #[test]
    fn cc_targets_must_match_layout() {
        use crate::midi_cc::CcTarget;

        assert!(GainStageConfig::standalone().validate().is_ok());
        let single = GainStageConfig::plugin()
            .with_midi_cc(MidiCcConfig::for_layout(StageLayout::SingleGain));
        assert!(single.validate().is_ok());

        let mismatched = GainStageConfig::plugin().with_midi_cc(MidiCcConfig::trim_and_output());
        assert_eq!(
            mismatched.validate(),
            Err(PluginError::InactiveCcTarget {
                controller: 11,
                target: CcTarget::InputTrim
            })
        );
    }

    #[test]
    fn presets_differ_where_variants_differ() {
        let plugin = GainStageConfig::plugin();
        let standalone = GainStageConfig::standalone();
        assert_eq!(plugin.layout, StageLayout::SingleGain);
        assert_eq!(standalone.layout, StageLayout::TrimAndOutput);
        assert_eq!(plugin.gain_smoothing_ms, 5.0);
        assert_eq!(standalone.gain_smoothing_ms, 10.0);
        assert!(plugin.midi_cc.is_none());
        assert!(standalone.midi_cc.is_some());
    }
}
