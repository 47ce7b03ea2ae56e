//! Plugin lifecycle and the control-side handle.
//!
//! The gain stage follows a two-phase lifecycle:
//!
//! ```text
//! GainStagePlugin ──prepare(AudioSetup)──> GainStageProcessor
//!        ^                                        │
//!        └──────────────unprepare()───────────────┘
//! ```
//!
//! [`GainStagePlugin`] is the unprepared (or released) state. It owns the
//! configuration and the shared parameters but nothing sample-rate
//! dependent. [`GainStagePlugin::prepare()`] validates the host setup and
//! returns a [`GainStageProcessor`] with its smoothers, meters and dry buffer
//! sized for that setup. Because the parameters live behind an `Arc`, a
//! released plugin carries its values into the next `prepare()`.
//!
//! [`Controller`] is the handle the UI and the host's non-real-time side use.
//! It can be cloned freely and stays valid across prepare/unprepare cycles.

use std::sync::Arc;

use crate::config::{AudioSetup, GainStageConfig};
use crate::error::PluginResult;
use crate::meter::MeterLevels;
use crate::parameters::{AutomationSink, GainStageParameters, NoAutomation, ParameterStore};
use crate::processor::GainStageProcessor;
use crate::state;
use crate::types::{ParameterId, ParameterValue};

// =============================================================================
// GainStagePlugin
// =============================================================================

/// The gain stage in its unprepared state.
///
/// Cloning is cheap and shares the parameters, which lets a host keep a copy
/// around when a `prepare()` attempt might be rejected.
#[derive(Clone)]
pub struct GainStagePlugin {
    pub(crate) config: GainStageConfig,
    pub(crate) params: Arc<GainStageParameters>,
    pub(crate) levels: MeterLevels,
    pub(crate) automation: Arc<dyn AutomationSink>,
}

impl GainStagePlugin {
    /// Create a plugin with default parameter values.
    pub fn new(config: GainStageConfig) -> Self {
        let params = GainStageParameters::new(config.layout, config.midi_cc.is_some());
        Self {
            config,
            params: Arc::new(params),
            levels: MeterLevels::new(),
            automation: Arc::new(NoAutomation),
        }
    }

    /// Route MIDI-CC edit gestures to `sink`.
    pub fn with_automation(mut self, sink: Arc<dyn AutomationSink>) -> Self {
        self.automation = sink;
        self
    }

    /// Static configuration.
    pub fn config(&self) -> &GainStageConfig {
        &self.config
    }

    /// Shared parameters.
    pub fn parameters(&self) -> &Arc<GainStageParameters> {
        &self.params
    }

    /// Control-side handle.
    pub fn controller(&self) -> Controller {
        Controller::new(
            Arc::clone(&self.params),
            self.levels.clone(),
            Arc::clone(&self.automation),
        )
    }

    /// Transition to the prepared state.
    ///
    /// Rejects unsupported bus layouts and invalid sample rates or block
    /// sizes. This is the only place a layout is checked; the per-block path
    /// assumes a validated setup.
    pub fn prepare(self, setup: AudioSetup) -> PluginResult<GainStageProcessor> {
        if let Err(err) = setup.validate() {
            log::warn!("rejecting audio setup {:?}: {}", setup, err);
            return Err(err);
        }
        if let Err(err) = self.config.validate() {
            log::warn!("rejecting gain stage config: {}", err);
            return Err(err);
        }
        log::debug!(
            "preparing gain stage: {} Hz, {} samples, {} channels, {:?}",
            setup.sample_rate,
            setup.max_block_size,
            setup.layout.channels(),
            self.config.layout
        );
        Ok(GainStageProcessor::new(self, setup))
    }
}

impl Default for GainStagePlugin {
    fn default() -> Self {
        Self::new(GainStageConfig::default())
    }
}

impl std::fmt::Debug for GainStagePlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GainStagePlugin")
            .field("config", &self.config)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Non-real-time handle for UI and host code.
///
/// Every method is lock-free and safe to call while the audio thread
/// processes. None of them wait on the audio thread.
#[derive(Clone)]
pub struct Controller {
    params: Arc<GainStageParameters>,
    levels: MeterLevels,
    automation: Arc<dyn AutomationSink>,
}

impl Controller {
    pub(crate) fn new(
        params: Arc<GainStageParameters>,
        levels: MeterLevels,
        automation: Arc<dyn AutomationSink>,
    ) -> Self {
        Self {
            params,
            levels,
            automation,
        }
    }

    /// Shared parameters.
    pub fn parameters(&self) -> &GainStageParameters {
        &self.params
    }

    /// Publish a target for `id` as a complete edit gesture, so the host
    /// records UI changes as automation. Values are clamped and quantized;
    /// unknown IDs are ignored.
    pub fn set_target(&self, id: ParameterId, value: ParameterValue) {
        if let Some(parameter) = self.params.by_id(id) {
            parameter.set_with_gesture(value, &*self.automation);
        }
    }

    /// Latest target for `id`.
    pub fn target(&self, id: ParameterId) -> ParameterValue {
        self.params.target(id)
    }

    /// Smoothed input level, 0..1.
    pub fn input_level(&self) -> f32 {
        self.levels.input_level()
    }

    /// Smoothed output level, 0..1.
    pub fn output_level(&self) -> f32 {
        self.levels.output_level()
    }

    /// Meter read handle for UI components.
    pub fn levels(&self) -> &MeterLevels {
        &self.levels
    }

    /// Serialize every exposed parameter.
    pub fn save_state(&self) -> Vec<u8> {
        state::save_state(&*self.params)
    }

    /// Restore parameters from a state blob.
    ///
    /// On success the audio thread snaps its smoothers and meters at the
    /// next block instead of ramping from the previous values. A rejected
    /// blob leaves every parameter untouched.
    pub fn load_state(&self, data: &[u8]) -> PluginResult<usize> {
        let applied = state::load_state(&*self.params, data)?;
        // Targets are already visible here: a block that runs before the flag
        // is raised starts a ramp toward them, and the next block snaps.
        self.params.mark_reloaded();
        log::info!("loaded state: {} parameters", applied);
        Ok(applied)
    }

    /// Restore every parameter to its default.
    pub fn reset_to_defaults(&self) {
        self.params.reset_to_defaults();
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("params", &self.params)
            .field("levels", &self.levels)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::config::{BusLayout, StageLayout};
    use crate::error::{PluginError, StateError};
    use crate::midi_cc::{CcTarget, MidiCcConfig};
    use crate::parameters::{BYPASS_ID, GAIN_ID, IN_TRIM_ID};

    #[derive(Default)]
    struct GestureLog {
        begins: AtomicUsize,
        performs: AtomicUsize,
        ends: AtomicUsize,
    }

    impl AutomationSink for GestureLog {
        fn begin_edit(&self, _id: ParameterId) {
            self.begins.fetch_add(1, Ordering::Relaxed);
        }

        fn perform_edit(&self, _id: ParameterId, _value: ParameterValue) {
            self.performs.fetch_add(1, Ordering::Relaxed);
        }

        fn end_edit(&self, _id: ParameterId) {
            self.ends.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn default_plugin_is_single_gain() {
        let plugin = GainStagePlugin::default();
        assert_eq!(plugin.config().layout, StageLayout::SingleGain);
        assert_eq!(plugin.parameters().count(), 2);
    }

    #[test]
    fn prepare_rejects_unsupported_layouts() {
        let plugin = GainStagePlugin::default();
        let setup = AudioSetup::new(48000.0, 512).with_layout(BusLayout {
            main_input_channels: 2,
            main_output_channels: 1,
        });
        let err = plugin.clone().prepare(setup).err();
        assert_eq!(
            err,
            Some(PluginError::UnsupportedLayout {
                inputs: 2,
                outputs: 1
            })
        );
        assert!(plugin.prepare(AudioSetup::new(48000.0, 512)).is_ok());
    }

    #[test]
    fn controller_publishes_targets() {
        let plugin = GainStagePlugin::default();
        let controller = plugin.controller();
        controller.set_target(GAIN_ID, 0.25);
        controller.set_target(BYPASS_ID, 1.0);
        controller.set_target(IN_TRIM_ID, 0.1);

        assert_eq!(plugin.parameters().gain.target(), 0.25);
        assert!(plugin.parameters().bypass.is_on());
        // inTrim is not exposed by a single-gain plugin
        assert_eq!(controller.target(IN_TRIM_ID), 0.0);
        assert_eq!(plugin.parameters().in_trim.target(), 1.0);
    }

    #[test]
    fn controller_state_round_trip_requests_reload() {
        let source = GainStagePlugin::default().controller();
        source.set_target(GAIN_ID, 0.8);
        let blob = source.save_state();

        let plugin = GainStagePlugin::default();
        let target = plugin.controller();
        assert_eq!(target.load_state(&blob), Ok(2));
        assert_eq!(target.target(GAIN_ID), 0.8);
        assert!(plugin.parameters().take_reload());

        assert_eq!(
            target.load_state(b"nope"),
            Err(PluginError::State(StateError::BadMagic))
        );
        assert!(!plugin.parameters().take_reload());
    }

    #[test]
    fn controller_edits_reach_the_host_as_gestures() {
        let log = Arc::new(GestureLog::default());
        let plugin = GainStagePlugin::default().with_automation(log.clone());
        let controller = plugin.controller();

        controller.set_target(GAIN_ID, 0.5);
        // Not exposed by a single-gain plugin
        controller.set_target(IN_TRIM_ID, 0.5);
        assert_eq!(log.begins.load(Ordering::Relaxed), 1);
        assert_eq!(log.performs.load(Ordering::Relaxed), 1);
        assert_eq!(log.ends.load(Ordering::Relaxed), 1);

        let processor = plugin.prepare(AudioSetup::new(48000.0, 512)).expect("valid setup");
        processor.controller().set_target(BYPASS_ID, 1.0);
        assert_eq!(log.ends.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn prepare_rejects_cc_targets_outside_the_layout() {
        let plugin = GainStagePlugin::new(
            GainStageConfig::plugin().with_midi_cc(MidiCcConfig::trim_and_output()),
        );
        assert_eq!(
            plugin.prepare(AudioSetup::new(48000.0, 512)).err(),
            Some(PluginError::InactiveCcTarget {
                controller: 11,
                target: CcTarget::InputTrim
            })
        );

        let plugin = GainStagePlugin::new(
            GainStageConfig::plugin()
                .with_midi_cc(MidiCcConfig::for_layout(StageLayout::SingleGain)),
        );
        assert!(plugin.prepare(AudioSetup::new(48000.0, 512)).is_ok());
    }
}
