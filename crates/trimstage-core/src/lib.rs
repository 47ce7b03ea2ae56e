//! # trimstage-core
//!
//! Real-time signal path of the trimstage gain/trim plugin.
//!
//! The crate is host-agnostic: a plugin wrapper or standalone audio host
//! drives it with [`GainStagePlugin::prepare()`], per-block
//! [`GainStageProcessor::process()`] calls and
//! [`GainStageProcessor::unprepare()`]. The UI talks to it through a
//! [`Controller`].
//!
//! ## Main Types
//!
//! - [`GainStagePlugin`] - Unprepared plugin, holds config and parameters
//! - [`GainStageProcessor`] - Prepared signal path, owned by the audio thread
//! - [`Controller`] - Lock-free control-side handle
//! - [`GainStageParameters`] - Atomic parameter store
//! - [`Smoother`] - Linear per-sample ramp
//! - [`PeakMeter`] / [`MeterLevels`] - Input and output metering
//! - [`WetDryMix`] - Click-free bypass crossfade
//! - [`MidiCcMapper`] - MIDI CC to parameter mapping
//! - [`Buffer`] - In-place audio buffer
//! - [`PluginError`] / [`StateError`] - Error types

pub mod buffer;
pub mod bypass;
pub mod config;
pub mod error;
pub mod meter;
pub mod midi;
pub mod midi_cc;
pub mod parameters;
pub mod plugin;
pub mod processor;
pub mod sample;
pub mod smoothing;
pub mod state;
pub mod types;

// Re-exports for convenience
pub use buffer::Buffer;
pub use bypass::{BypassAction, BypassState, CrossfadeCurve, WetDryMix};
pub use config::{AudioSetup, BusLayout, GainStageConfig, StageLayout};
pub use error::{PluginError, PluginResult, StateError};
pub use meter::{block_peak, one_pole_coefficient, MeterBallistics, MeterLevels, PeakMeter};
pub use midi::{
    cc, ControlChange, MidiBuffer, MidiChannel, MidiEvent, MidiEventKind, NoteOff, NoteOn,
    PitchBend, ProgramChange, MAX_MIDI_EVENTS,
};
pub use midi_cc::{CcTarget, MidiCcConfig, MidiCcMapper, MAX_CC_ASSIGNMENTS};
pub use parameters::{
    channel_filter_from_normalized, channel_filter_to_normalized, ids, AutomationSink,
    GainStageParameters, NoAutomation, Parameter, ParameterFlags, ParameterInfo, ParameterKind,
    ParameterStore, BYPASS_ID, GAIN_ID, IN_TRIM_ID, MIDI_CHANNEL_ID, OUT_VOL_ID,
};
pub use plugin::{Controller, GainStagePlugin};
pub use processor::{DryBuffer, GainStageProcessor, ProcessorState};
pub use sample::Sample;
pub use smoothing::{Smoother, SmoothingStyle};
pub use state::{load_state, save_state, STATE_MAGIC, STATE_VERSION};
pub use types::{ParameterId, ParameterValue, MAX_CHANNELS};
