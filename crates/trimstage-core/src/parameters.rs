//! Parameter store shared between the control and audio threads.
//!
//! Every parameter is a normalized `f32` in `[0, 1]` held in an
//! [`AtomicF32`]. The control thread (UI gesture, host automation or the
//! MIDI-CC mapper) publishes targets with [`Parameter::set_target`]; the
//! audio thread reads them once per block with [`Parameter::target`]. There
//! are no locks and no allocation on either side: out-of-range input is
//! clamped and quantized, never rejected.
//!
//! # Choosing Between `GainStageParameters` and `ParameterStore`
//!
//! - **[`GainStageParameters`]**: the concrete parameter set with named
//!   fields. The signal path reads it directly.
//! - **[`ParameterStore`]**: ID-based access for host-facing code that only
//!   knows numeric [`ParameterId`]s (automation lanes, state blobs).

use std::sync::atomic::{AtomicBool, Ordering};

use atomic_float::AtomicF32;
use trimstage_utils::fnv1a_32;

use crate::config::StageLayout;
use crate::types::{ParameterId, ParameterValue};

// =============================================================================
// Identifiers
// =============================================================================

/// String identifiers, as stored in state blobs.
pub mod ids {
    pub const GAIN: &str = "gain";
    pub const BYPASS: &str = "bypass";
    pub const IN_TRIM: &str = "inTrim";
    pub const OUT_VOL: &str = "outVol";
    pub const MIDI_CHANNEL: &str = "midiChannel";
}

/// Numeric ID of the single-stage gain parameter.
pub const GAIN_ID: ParameterId = fnv1a_32(ids::GAIN);
/// Numeric ID of the bypass switch.
pub const BYPASS_ID: ParameterId = fnv1a_32(ids::BYPASS);
/// Numeric ID of the input trim.
pub const IN_TRIM_ID: ParameterId = fnv1a_32(ids::IN_TRIM);
/// Numeric ID of the output level.
pub const OUT_VOL_ID: ParameterId = fnv1a_32(ids::OUT_VOL);
/// Numeric ID of the MIDI channel filter.
pub const MIDI_CHANNEL_ID: ParameterId = fnv1a_32(ids::MIDI_CHANNEL);

/// Number of MIDI channel filter positions: omni plus channels 1-16.
const MIDI_CHANNEL_POSITIONS: u32 = 16;

// =============================================================================
// Metadata
// =============================================================================

/// How a parameter value is presented on a control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Linear amplitude factor, shown in dB.
    Gain,
    /// On/off switch.
    Toggle,
    /// MIDI channel filter, 0 = omni, 1-16 = channel.
    MidiChannel,
}

/// Flags controlling parameter behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParameterFlags {
    /// Parameter is the bypass switch.
    pub is_bypass: bool,
    /// Parameter only takes discrete positions.
    pub is_discrete: bool,
}

/// Metadata describing a single parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    /// Unique numeric identifier.
    pub id: ParameterId,
    /// Stable string identifier (state blob key).
    pub identifier: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Unit label.
    pub units: &'static str,
    /// Default normalized value.
    pub default: ParameterValue,
    /// Number of quantization steps across `[0, 1]`. 0 = continuous.
    pub steps: u32,
    /// Presentation.
    pub kind: ParameterKind,
    /// Behavioral flags.
    pub flags: ParameterFlags,
}

impl ParameterInfo {
    /// Continuous gain-like parameter.
    pub const fn gain(
        identifier: &'static str,
        name: &'static str,
        default: ParameterValue,
        steps: u32,
    ) -> Self {
        Self {
            id: fnv1a_32(identifier),
            identifier,
            name,
            units: "dB",
            default,
            steps,
            kind: ParameterKind::Gain,
            flags: ParameterFlags {
                is_bypass: false,
                is_discrete: false,
            },
        }
    }

    /// Bypass switch.
    pub const fn bypass() -> Self {
        Self {
            id: BYPASS_ID,
            identifier: ids::BYPASS,
            name: "Bypass",
            units: "",
            default: 0.0,
            steps: 1,
            kind: ParameterKind::Toggle,
            flags: ParameterFlags {
                is_bypass: true,
                is_discrete: true,
            },
        }
    }

    /// MIDI channel filter (omni by default).
    pub const fn midi_channel() -> Self {
        Self {
            id: MIDI_CHANNEL_ID,
            identifier: ids::MIDI_CHANNEL,
            name: "MIDI Channel",
            units: "",
            default: 0.0,
            steps: MIDI_CHANNEL_POSITIONS,
            kind: ParameterKind::MidiChannel,
            flags: ParameterFlags {
                is_bypass: false,
                is_discrete: true,
            },
        }
    }

    /// Clamp to `[0, 1]` and snap to the quantization step.
    #[inline]
    pub fn quantize(&self, value: ParameterValue) -> ParameterValue {
        // NaN from a broken control surface lands on the default
        if value.is_nan() {
            return self.default;
        }
        let clamped = value.clamp(0.0, 1.0);
        if self.steps > 0 {
            let steps = self.steps as ParameterValue;
            ((clamped * steps).round() / steps).clamp(0.0, 1.0)
        } else {
            clamped
        }
    }
}

// =============================================================================
// Automation gestures
// =============================================================================

/// Receiver for edit gestures, so host automation recording sees UI and
/// MIDI-CC edits the same way.
///
/// Calls may arrive on the audio thread (MIDI-CC mapping), so
/// implementations must not block or allocate.
pub trait AutomationSink: Send + Sync {
    /// An edit of `id` is starting.
    fn begin_edit(&self, id: ParameterId);

    /// `id` now holds `value`.
    fn perform_edit(&self, id: ParameterId, value: ParameterValue);

    /// The edit of `id` is over.
    fn end_edit(&self, id: ParameterId);
}

/// Sink that drops every gesture.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAutomation;

impl AutomationSink for NoAutomation {
    fn begin_edit(&self, _id: ParameterId) {}
    fn perform_edit(&self, _id: ParameterId, _value: ParameterValue) {}
    fn end_edit(&self, _id: ParameterId) {}
}

// =============================================================================
// Parameter
// =============================================================================

/// A normalized parameter with atomic storage.
#[derive(Debug)]
pub struct Parameter {
    info: ParameterInfo,
    value: AtomicF32,
}

impl Parameter {
    /// Create a parameter holding its default value.
    pub fn new(info: ParameterInfo) -> Self {
        let value = AtomicF32::new(info.default);
        Self { info, value }
    }

    /// Parameter metadata.
    #[inline]
    pub fn info(&self) -> &ParameterInfo {
        &self.info
    }

    /// Numeric ID.
    #[inline]
    pub fn id(&self) -> ParameterId {
        self.info.id
    }

    /// Latest published target. Lock-free.
    #[inline]
    pub fn target(&self) -> ParameterValue {
        self.value.load(Ordering::Relaxed)
    }

    /// Publish a new target, clamped and quantized. Returns the stored value.
    #[inline]
    pub fn set_target(&self, value: ParameterValue) -> ParameterValue {
        let value = self.info.quantize(value);
        self.value.store(value, Ordering::Relaxed);
        value
    }

    /// Publish a new target wrapped in a begin/perform/end gesture.
    pub fn set_with_gesture(
        &self,
        value: ParameterValue,
        sink: &dyn AutomationSink,
    ) -> ParameterValue {
        let id = self.id();
        sink.begin_edit(id);
        let stored = self.set_target(value);
        sink.perform_edit(id, stored);
        sink.end_edit(id);
        stored
    }

    /// Restore the default value.
    pub fn reset_to_default(&self) {
        self.value.store(self.info.default, Ordering::Relaxed);
    }

    /// Target interpreted as a switch.
    #[inline]
    pub fn is_on(&self) -> bool {
        self.target() >= 0.5
    }

    /// Format the current target for display.
    pub fn display(&self) -> String {
        self.display_value(self.target())
    }

    /// Format a normalized value for display.
    pub fn display_value(&self, value: ParameterValue) -> String {
        match self.info.kind {
            ParameterKind::Gain => {
                if value <= 0.0 {
                    "-inf dB".to_string()
                } else {
                    format!("{:.1} dB", 20.0 * value.log10())
                }
            }
            ParameterKind::Toggle => {
                let label = if value >= 0.5 { "On" } else { "Off" };
                label.to_string()
            }
            ParameterKind::MidiChannel => match channel_filter_from_normalized(value) {
                None => "Omni".to_string(),
                Some(channel) => format!("Ch {}", channel),
            },
        }
    }
}

/// Decode a normalized channel filter: `None` = omni, `Some(1..=16)`.
#[inline]
pub fn channel_filter_from_normalized(value: ParameterValue) -> Option<u8> {
    let position = (value.clamp(0.0, 1.0) * MIDI_CHANNEL_POSITIONS as ParameterValue).round() as u8;
    if position == 0 {
        None
    } else {
        Some(position)
    }
}

/// Encode a channel filter (`0` = omni, `1..=16`) as a normalized value.
#[inline]
pub fn channel_filter_to_normalized(channel: u8) -> ParameterValue {
    channel.min(16) as ParameterValue / MIDI_CHANNEL_POSITIONS as ParameterValue
}

// =============================================================================
// ParameterStore Trait
// =============================================================================

/// ID-based access to a parameter collection.
///
/// `Send + Sync` because the same store is read by the audio thread and
/// written by the UI, host automation and MIDI threads.
pub trait ParameterStore: Send + Sync {
    /// Number of parameters exposed to the host.
    fn count(&self) -> usize;

    /// Parameter by index (0 to count-1).
    fn parameter(&self, index: usize) -> Option<&Parameter>;

    /// Parameter info by index.
    fn info(&self, index: usize) -> Option<&ParameterInfo> {
        self.parameter(index).map(Parameter::info)
    }

    /// Find a parameter by ID.
    fn by_id(&self, id: ParameterId) -> Option<&Parameter> {
        (0..self.count())
            .filter_map(|i| self.parameter(i))
            .find(|p| p.id() == id)
    }

    /// Find a parameter by its string identifier.
    fn by_identifier(&self, identifier: &str) -> Option<&Parameter> {
        (0..self.count())
            .filter_map(|i| self.parameter(i))
            .find(|p| p.info().identifier == identifier)
    }

    /// Latest target for `id`. Unknown IDs read as 0.0.
    fn target(&self, id: ParameterId) -> ParameterValue {
        self.by_id(id).map_or(0.0, Parameter::target)
    }

    /// Publish a target for `id`. Unknown IDs are ignored.
    fn set_target(&self, id: ParameterId, value: ParameterValue) {
        if let Some(parameter) = self.by_id(id) {
            parameter.set_target(value);
        }
    }
}

// =============================================================================
// GainStageParameters
// =============================================================================

/// The full parameter set of the gain stage.
///
/// All five parameters always exist; [`StageLayout`] and the MIDI setting
/// decide which ones the host sees through [`ParameterStore`].
#[derive(Debug)]
pub struct GainStageParameters {
    /// Single-stage gain, linear 0..1.
    pub gain: Parameter,
    /// Bypass switch.
    pub bypass: Parameter,
    /// Input trim, linear 0..1.
    pub in_trim: Parameter,
    /// Output level, linear 0..1.
    pub out_vol: Parameter,
    /// MIDI channel filter.
    pub midi_channel: Parameter,

    layout: StageLayout,
    midi_enabled: bool,
    reload_pending: AtomicBool,
}

impl GainStageParameters {
    /// Build the parameter set for a layout.
    pub fn new(layout: StageLayout, midi_enabled: bool) -> Self {
        Self {
            gain: Parameter::new(ParameterInfo::gain(ids::GAIN, "Gain", 0.5, 10_000)),
            bypass: Parameter::new(ParameterInfo::bypass()),
            in_trim: Parameter::new(ParameterInfo::gain(ids::IN_TRIM, "Input Trim", 1.0, 100)),
            out_vol: Parameter::new(ParameterInfo::gain(ids::OUT_VOL, "Output", 1.0, 100)),
            midi_channel: Parameter::new(ParameterInfo::midi_channel()),
            layout,
            midi_enabled,
            reload_pending: AtomicBool::new(false),
        }
    }

    /// Which gain stages are active.
    pub fn layout(&self) -> StageLayout {
        self.layout
    }

    /// Whether the MIDI channel filter is exposed.
    pub fn midi_enabled(&self) -> bool {
        self.midi_enabled
    }

    /// Current channel filter: `None` = omni, `Some(1..=16)`.
    #[inline]
    pub fn channel_filter(&self) -> Option<u8> {
        channel_filter_from_normalized(self.midi_channel.target())
    }

    /// Restore every parameter to its default and request a smoother reset.
    pub fn reset_to_defaults(&self) {
        for parameter in self.all() {
            parameter.reset_to_default();
        }
        self.mark_reloaded();
    }

    /// Ask the audio thread to snap smoothers and meters at the next block
    /// instead of ramping toward freshly loaded values.
    pub fn mark_reloaded(&self) {
        self.reload_pending.store(true, Ordering::Release);
    }

    /// Consume a pending reload request. Audio thread only.
    #[inline]
    pub fn take_reload(&self) -> bool {
        self.reload_pending.swap(false, Ordering::Acquire)
    }

    fn all(&self) -> [&Parameter; 5] {
        [
            &self.gain,
            &self.bypass,
            &self.in_trim,
            &self.out_vol,
            &self.midi_channel,
        ]
    }

    fn gain_count(&self) -> usize {
        match self.layout {
            StageLayout::SingleGain => 1,
            StageLayout::TrimAndOutput => 2,
        }
    }

    fn exposed(&self, index: usize) -> Option<&Parameter> {
        match (self.layout, index) {
            (StageLayout::SingleGain, 0) => Some(&self.gain),
            (StageLayout::TrimAndOutput, 0) => Some(&self.in_trim),
            (StageLayout::TrimAndOutput, 1) => Some(&self.out_vol),
            _ => match index - self.gain_count() {
                0 => Some(&self.bypass),
                1 if self.midi_enabled => Some(&self.midi_channel),
                _ => None,
            },
        }
    }
}

impl Default for GainStageParameters {
    fn default() -> Self {
        Self::new(StageLayout::SingleGain, false)
    }
}

impl ParameterStore for GainStageParameters {
    fn count(&self) -> usize {
        self.gain_count() + 1 + usize::from(self.midi_enabled)
    }

    fn parameter(&self, index: usize) -> Option<&Parameter> {
        self.exposed(index)
    }
}
