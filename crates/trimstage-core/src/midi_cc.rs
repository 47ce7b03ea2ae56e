//! MIDI CC to parameter mapping.
//!
//! [`MidiCcConfig`] is pure configuration: which controller drives which
//! gain stage. [`MidiCcMapper`] applies it to the events of one block on the
//! audio thread. Each accepted controller message becomes an ordinary
//! parameter edit wrapped in a begin/perform/end gesture, exactly like a
//! fader move in the UI, so a host recording automation sees the same thing
//! either way.
//!
//! ```ignore
//! let config = MidiCcConfig::new()
//!     .with(cc::EXPRESSION, CcTarget::InputTrim)
//!     .with(cc::VOLUME, CcTarget::OutputLevel);
//! ```

use crate::config::StageLayout;
use crate::midi::{cc, MidiBuffer, MidiEventKind};
use crate::parameters::{AutomationSink, GainStageParameters, Parameter};

/// Maximum number of controller assignments.
pub const MAX_CC_ASSIGNMENTS: usize = 8;

/// Parameter a controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcTarget {
    /// Single-stage gain.
    Gain,
    /// Input trim.
    InputTrim,
    /// Output level.
    OutputLevel,
}

impl CcTarget {
    /// Whether the signal path reads this target in `layout`.
    pub const fn is_active(self, layout: StageLayout) -> bool {
        match self {
            CcTarget::Gain => matches!(layout, StageLayout::SingleGain),
            CcTarget::InputTrim | CcTarget::OutputLevel => {
                matches!(layout, StageLayout::TrimAndOutput)
            }
        }
    }

    fn parameter(self, params: &GainStageParameters) -> &Parameter {
        match self {
            CcTarget::Gain => &params.gain,
            CcTarget::InputTrim => &params.in_trim,
            CcTarget::OutputLevel => &params.out_vol,
        }
    }
}

// =============================================================================
// MidiCcConfig
// =============================================================================

/// Controller assignments, fixed-size so the config is `Copy` and can live
/// in a `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiCcConfig {
    assignments: [Option<(u8, CcTarget)>; MAX_CC_ASSIGNMENTS],
}

#[allow(clippy::new_without_default)]
impl MidiCcConfig {
    /// Empty configuration.
    pub const fn new() -> Self {
        Self {
            assignments: [None; MAX_CC_ASSIGNMENTS],
        }
    }

    /// CC 11 drives the input trim, CC 7 and CC 1 the output level.
    pub const fn trim_and_output() -> Self {
        Self::new()
            .with(cc::EXPRESSION, CcTarget::InputTrim)
            .with(cc::VOLUME, CcTarget::OutputLevel)
            .with(cc::MOD_WHEEL, CcTarget::OutputLevel)
    }

    /// CC 7 and CC 1 drive the single gain.
    pub const fn single_gain() -> Self {
        Self::new()
            .with(cc::VOLUME, CcTarget::Gain)
            .with(cc::MOD_WHEEL, CcTarget::Gain)
    }

    /// Stock assignments for a stage layout.
    pub const fn for_layout(layout: StageLayout) -> Self {
        match layout {
            StageLayout::SingleGain => Self::single_gain(),
            StageLayout::TrimAndOutput => Self::trim_and_output(),
        }
    }

    /// Assign a controller. An existing assignment of the same controller is
    /// replaced; assignments beyond [`MAX_CC_ASSIGNMENTS`] are dropped.
    pub const fn with(mut self, controller: u8, target: CcTarget) -> Self {
        let controller = controller & 0x7F;
        let mut i = 0;
        while i < MAX_CC_ASSIGNMENTS {
            match self.assignments[i] {
                Some((existing, _)) if existing == controller => {
                    self.assignments[i] = Some((controller, target));
                    return self;
                }
                None => {
                    self.assignments[i] = Some((controller, target));
                    return self;
                }
                _ => {}
            }
            i += 1;
        }
        self
    }

    /// Target assigned to `controller`, if any.
    #[inline]
    pub fn target_for(&self, controller: u8) -> Option<CcTarget> {
        self.assignments
            .iter()
            .flatten()
            .find(|(c, _)| *c == controller)
            .map(|(_, target)| *target)
    }

    /// Number of assigned controllers.
    pub fn len(&self) -> usize {
        self.assignments.iter().flatten().count()
    }

    /// True when no controller is assigned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First assignment whose target `layout` never reads.
    pub fn inactive_assignment(&self, layout: StageLayout) -> Option<(u8, CcTarget)> {
        self.assignments
            .iter()
            .flatten()
            .copied()
            .find(|(_, target)| !target.is_active(layout))
    }
}

// =============================================================================
// MidiCcMapper
// =============================================================================

/// Applies [`MidiCcConfig`] to incoming events. Real-time safe.
#[derive(Debug, Clone, Copy)]
pub struct MidiCcMapper {
    config: MidiCcConfig,
}

impl MidiCcMapper {
    pub fn new(config: MidiCcConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MidiCcConfig {
        &self.config
    }

    /// Map the control changes in `events` onto parameter targets.
    ///
    /// Only events whose channel passes the `midi_channel` filter are used
    /// (omni accepts every channel). Values are quantized to the target's
    /// step. Returns the number of edits made.
    pub fn apply(
        &self,
        events: &MidiBuffer,
        params: &GainStageParameters,
        sink: &dyn AutomationSink,
    ) -> usize {
        if self.config.is_empty() {
            return 0;
        }
        let filter = params.channel_filter();
        let mut edits = 0;

        for event in events.iter() {
            let MidiEventKind::ControlChange(change) = event.event else {
                continue;
            };
            if let Some(channel) = filter {
                if change.channel + 1 != channel {
                    continue;
                }
            }
            if let Some(target) = self.config.target_for(change.controller) {
                target.parameter(params).set_with_gesture(change.value, sink);
                edits += 1;
            }
        }
        edits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MidiEvent;
    use crate::parameters::{channel_filter_to_normalized, NoAutomation};

    fn params() -> GainStageParameters {
        GainStageParameters::new(StageLayout::TrimAndOutput, true)
    }

    #[test]
    fn default_assignments() {
        let config = MidiCcConfig::trim_and_output();
        assert_eq!(config.target_for(11), Some(CcTarget::InputTrim));
        assert_eq!(config.target_for(7), Some(CcTarget::OutputLevel));
        assert_eq!(config.target_for(1), Some(CcTarget::OutputLevel));
        assert_eq!(config.target_for(64), None);
        assert_eq!(config.len(), 3);
    }

    #[test]
    fn layout_defaults_only_drive_active_stages() {
        for layout in [StageLayout::SingleGain, StageLayout::TrimAndOutput] {
            let config = MidiCcConfig::for_layout(layout);
            assert!(!config.is_empty());
            assert_eq!(config.inactive_assignment(layout), None);
        }
        let mismatched = MidiCcConfig::trim_and_output();
        assert_eq!(
            mismatched.inactive_assignment(StageLayout::SingleGain),
            Some((cc::EXPRESSION, CcTarget::InputTrim))
        );
    }

    #[test]
    fn reassignment_replaces() {
        let config = MidiCcConfig::new()
            .with(7, CcTarget::Gain)
            .with(7, CcTarget::OutputLevel);
        assert_eq!(config.len(), 1);
        assert_eq!(config.target_for(7), Some(CcTarget::OutputLevel));
    }

    #[test]
    fn omni_maps_every_channel() {
        let params = params();
        let mapper = MidiCcMapper::new(MidiCcConfig::trim_and_output());
        let mut events = MidiBuffer::new();
        events.push(MidiEvent::from_bytes(0, &[0xB5, 11, 0]).unwrap());
        events.push(MidiEvent::from_bytes(8, &[0xB9, 7, 64]).unwrap());

        assert_eq!(mapper.apply(&events, &params, &NoAutomation), 2);
        assert_eq!(params.in_trim.target(), 0.0);
        // 64/127 quantized to 0.01
        assert!((params.out_vol.target() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn channel_filter_rejects_other_channels() {
        let params = params();
        params.midi_channel.set_target(channel_filter_to_normalized(2));
        let mapper = MidiCcMapper::new(MidiCcConfig::trim_and_output());

        let mut events = MidiBuffer::new();
        // Channel 1 (status nibble 0) is filtered out
        events.push(MidiEvent::from_bytes(0, &[0xB0, 7, 0]).unwrap());
        // Channel 2 (status nibble 1) passes
        events.push(MidiEvent::from_bytes(0, &[0xB1, 11, 127]).unwrap());

        assert_eq!(mapper.apply(&events, &params, &NoAutomation), 1);
        assert_eq!(params.out_vol.target(), 1.0);
        assert_eq!(params.in_trim.target(), 1.0);
    }

    #[test]
    fn later_events_win() {
        let params = params();
        let mapper = MidiCcMapper::new(MidiCcConfig::trim_and_output());
        let mut events = MidiBuffer::new();
        events.push(MidiEvent::from_bytes(0, &[0xB0, 11, 127]).unwrap());
        events.push(MidiEvent::from_bytes(100, &[0xB0, 11, 0]).unwrap());
        events.push(MidiEvent::from_bytes(200, &[0x90, 60, 100]).unwrap());

        assert_eq!(mapper.apply(&events, &params, &NoAutomation), 2);
        assert_eq!(params.in_trim.target(), 0.0);
    }
}
