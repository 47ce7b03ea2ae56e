//! # trimstage
//!
//! Real-time gain/trim stage with click-free bypass and peak metering.
//!
//! ## Architecture
//!
//! ```text
//! UI / host automation ──Controller──> GainStageParameters (atomics)
//!                                              │
//! audio callback ──Buffer + MidiBuffer──> GainStageProcessor ──> MeterLevels
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trimstage::prelude::*;
//!
//! let plugin = GainStagePlugin::new(GainStageConfig::plugin());
//! let controller = plugin.controller();
//! let mut processor = plugin.prepare(AudioSetup::new(48000.0, 512))?;
//!
//! // UI thread
//! controller.set_target(GAIN_ID, 0.8);
//!
//! // Audio thread
//! let mut buffer = Buffer::new([&mut left[..], &mut right[..]], 2, 512);
//! processor.process(&mut buffer, &midi);
//!
//! // UI timer
//! let level = controller.input_level();
//! ```

// Re-export sub-crates
pub use trimstage_core as core;
pub use trimstage_utils as utils;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use trimstage::prelude::*;
/// ```
pub mod prelude {
    pub use trimstage_core::{
        // Lifecycle
        AudioSetup, BusLayout, Controller, GainStageConfig, GainStagePlugin, GainStageProcessor,
        ProcessorState, StageLayout,
        // Buffers
        Buffer, Sample,
        // Parameters
        AutomationSink, GainStageParameters, NoAutomation, Parameter, ParameterId,
        ParameterInfo, ParameterStore, ParameterValue, BYPASS_ID, GAIN_ID, IN_TRIM_ID,
        MIDI_CHANNEL_ID, OUT_VOL_ID,
        // Smoothing, bypass and metering
        BypassState, CrossfadeCurve, MeterBallistics, MeterLevels, Smoother, SmoothingStyle,
        // MIDI
        cc, CcTarget, ControlChange, MidiBuffer, MidiCcConfig, MidiEvent, MidiEventKind,
        // Error types
        PluginError, PluginResult, StateError,
    };
}
