//! The real-time signal path.
//!
//! Each block runs these steps:
//!
//! 1. Silence output-only channels.
//! 2. Map incoming MIDI control changes onto parameter targets.
//! 3. Consume a pending state reload (snap smoothers, zero meters).
//! 4. Snapshot the parameter targets into the smoothers.
//! 5. Copy the input into the dry buffer and meter it.
//! 6. Per sample: advance the gain and crossfade smoothers and write
//!    `dry * dry_gain + dry * gain * wet_gain`.
//! 7. Meter the output.
//!
//! # Real-Time Safety
//!
//! Nothing on this path locks, logs, or returns an error. The dry buffer is
//! sized in `prepare()`; a host exceeding the negotiated block size makes it
//! grow once, never shrink.

use std::sync::Arc;

use crate::buffer::Buffer;
use crate::bypass::{BypassAction, BypassState, WetDryMix};
use crate::config::{AudioSetup, GainStageConfig, StageLayout};
use crate::error::PluginResult;
use crate::meter::{block_peak, MeterLevels, PeakMeter};
use crate::midi::MidiBuffer;
use crate::midi_cc::MidiCcMapper;
use crate::parameters::{AutomationSink, GainStageParameters};
use crate::plugin::{Controller, GainStagePlugin};
use crate::sample::Sample;
use crate::smoothing::Smoother;
use crate::state;

// =============================================================================
// ProcessorState
// =============================================================================

/// Where a prepared processor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// Prepared, no block processed yet.
    Prepared,
    /// At least one block processed since `prepare()`.
    Processing,
}

// =============================================================================
// DryBuffer
// =============================================================================

/// Copy of the unprocessed input for the wet/dry crossfade.
///
/// Stored as `f64` so both host precisions round-trip exactly. Channels are
/// laid out back to back with a stride of [`capacity()`](Self::capacity)
/// frames.
#[derive(Debug, Clone, Default)]
pub struct DryBuffer {
    data: Vec<f64>,
    stride: usize,
    max_channels: usize,
    channels: usize,
    frames: usize,
}

impl DryBuffer {
    /// Preallocate `channels * frames` samples.
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            data: vec![0.0; channels * frames],
            stride: frames,
            max_channels: channels,
            channels: 0,
            frames: 0,
        }
    }

    /// Frames per channel the buffer holds without growing.
    pub fn capacity(&self) -> usize {
        self.stride
    }

    /// Channels the buffer holds without growing.
    pub fn max_channels(&self) -> usize {
        self.max_channels
    }

    /// Grow to hold at least `channels * frames`. Never shrinks.
    pub fn reserve(&mut self, channels: usize, frames: usize) {
        if channels <= self.max_channels && frames <= self.stride {
            return;
        }
        self.stride = self.stride.max(frames);
        self.max_channels = self.max_channels.max(channels);
        self.data = vec![0.0; self.stride * self.max_channels];
    }

    /// Copy the input channels of `buffer`.
    pub fn capture<S: Sample>(&mut self, buffer: &Buffer<'_, S>) {
        let channels = buffer.num_input_channels();
        let frames = buffer.num_samples();
        self.reserve(channels, frames);

        for (ch, input) in buffer.inputs().enumerate() {
            let start = ch * self.stride;
            for (dry, &sample) in self.data[start..start + frames].iter_mut().zip(input) {
                *dry = sample.to_f64();
            }
        }
        self.channels = channels;
        self.frames = frames;
    }

    /// Captured samples of `channel`. Empty past the captured channels.
    #[inline]
    pub fn channel(&self, channel: usize) -> &[f64] {
        if channel >= self.channels {
            return &[];
        }
        let start = channel * self.stride;
        &self.data[start..start + self.frames]
    }
}

// =============================================================================
// GainStages
// =============================================================================

/// Smoothed gain for the configured stage layout.
#[derive(Debug, Clone)]
struct GainStages {
    layout: StageLayout,
    gain: Smoother,
    in_trim: Smoother,
    out_vol: Smoother,
}

impl GainStages {
    fn new(layout: StageLayout, smoothing_ms: f64) -> Self {
        Self {
            layout,
            gain: Smoother::linear(smoothing_ms),
            in_trim: Smoother::linear(smoothing_ms),
            out_vol: Smoother::linear(smoothing_ms),
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.gain.set_sample_rate(sample_rate);
        self.in_trim.set_sample_rate(sample_rate);
        self.out_vol.set_sample_rate(sample_rate);
    }

    fn set_targets(&mut self, params: &GainStageParameters) {
        match self.layout {
            StageLayout::SingleGain => self.gain.set_target(params.gain.target() as f64),
            StageLayout::TrimAndOutput => {
                self.in_trim.set_target(params.in_trim.target() as f64);
                self.out_vol.set_target(params.out_vol.target() as f64);
            }
        }
    }

    fn reset(&mut self, params: &GainStageParameters) {
        self.gain.reset(params.gain.target() as f64);
        self.in_trim.reset(params.in_trim.target() as f64);
        self.out_vol.reset(params.out_vol.target() as f64);
    }

    #[inline]
    fn next(&mut self) -> f64 {
        match self.layout {
            StageLayout::SingleGain => self.gain.next(),
            StageLayout::TrimAndOutput => self.in_trim.next() * self.out_vol.next(),
        }
    }

    fn skip(&mut self, samples: usize) {
        self.gain.skip(samples);
        self.in_trim.skip(samples);
        self.out_vol.skip(samples);
    }

    fn current(&self) -> f64 {
        match self.layout {
            StageLayout::SingleGain => self.gain.current(),
            StageLayout::TrimAndOutput => self.in_trim.current() * self.out_vol.current(),
        }
    }
}

// =============================================================================
// GainStageProcessor
// =============================================================================

/// The gain stage in its prepared state. Owned by the audio thread.
pub struct GainStageProcessor {
    config: GainStageConfig,
    params: Arc<GainStageParameters>,
    levels: MeterLevels,
    automation: Arc<dyn AutomationSink>,

    setup: AudioSetup,
    state: ProcessorState,
    stages: GainStages,
    mix: WetDryMix,
    input_meter: PeakMeter,
    output_meter: PeakMeter,
    dry: DryBuffer,
    midi_cc: Option<MidiCcMapper>,
}

impl GainStageProcessor {
    pub(crate) fn new(plugin: GainStagePlugin, setup: AudioSetup) -> Self {
        let GainStagePlugin {
            config,
            params,
            levels,
            automation,
        } = plugin;

        let mut stages = GainStages::new(config.layout, config.gain_smoothing_ms);
        stages.set_sample_rate(setup.sample_rate);
        let mut mix = WetDryMix::new(config.bypass_crossfade_ms, config.crossfade_curve);
        mix.set_sample_rate(setup.sample_rate);
        let mut input_meter = PeakMeter::new(config.meter, levels.input_cell());
        input_meter.set_sample_rate(setup.sample_rate);
        let mut output_meter = PeakMeter::new(config.meter, levels.output_cell());
        output_meter.set_sample_rate(setup.sample_rate);

        let mut processor = Self {
            config,
            params,
            levels,
            automation,
            setup,
            state: ProcessorState::Prepared,
            stages,
            mix,
            input_meter,
            output_meter,
            dry: DryBuffer::new(setup.layout.channels(), setup.max_block_size),
            midi_cc: config.midi_cc.map(MidiCcMapper::new),
        };
        processor.snap_to_targets();
        // A reload requested while released is covered by the snap above
        processor.params.take_reload();
        processor
    }

    /// Release audio resources and return to the unprepared state.
    pub fn unprepare(self) -> GainStagePlugin {
        log::debug!("releasing gain stage ({:?})", self.state);
        GainStagePlugin {
            config: self.config,
            params: self.params,
            levels: self.levels,
            automation: self.automation,
        }
    }

    /// Lifecycle state.
    pub fn state(&self) -> ProcessorState {
        self.state
    }

    /// Setup this processor was prepared with.
    pub fn setup(&self) -> &AudioSetup {
        &self.setup
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

    /// Current bypass crossfade state.
    pub fn bypass_state(&self) -> BypassState {
        self.mix.state()
    }

    /// Current wet amount of the bypass crossfade.
    pub fn wet_amount(&self) -> f64 {
        self.mix.wet_amount()
    }

    /// Largest per-sample change of the bypass crossfade.
    pub fn crossfade_step(&self) -> f64 {
        self.mix.max_step()
    }

    /// Current smoothed linear gain (product of both stages in
    /// [`StageLayout::TrimAndOutput`]).
    pub fn current_gain(&self) -> f64 {
        self.stages.current()
    }

    /// Dry buffer capacity in frames per channel.
    pub fn dry_capacity(&self) -> usize {
        self.dry.capacity()
    }

    /// Serialize every exposed parameter.
    pub fn save_state(&self) -> Vec<u8> {
        state::save_state(&*self.params)
    }

    /// Restore parameters and snap straight to them.
    ///
    /// Called by hosts that load state between blocks on the audio thread.
    pub fn load_state(&mut self, data: &[u8]) -> PluginResult<usize> {
        let applied = state::load_state(&*self.params, data)?;
        self.params.take_reload();
        self.snap_to_targets();
        Ok(applied)
    }

    /// Process one block of single-precision audio in place.
    pub fn process(&mut self, buffer: &mut Buffer<'_, f32>, midi: &MidiBuffer) {
        self.process_block(buffer, midi);
    }

    /// Process one block of double-precision audio in place.
    pub fn process_f64(&mut self, buffer: &mut Buffer<'_, f64>, midi: &MidiBuffer) {
        self.process_block(buffer, midi);
    }

    fn snap_to_targets(&mut self) {
        self.stages.reset(&self.params);
        self.mix.reset(self.params.bypass.is_on());
        self.input_meter.reset();
        self.output_meter.reset();
    }

    fn process_block<S: Sample>(&mut self, buffer: &mut Buffer<'_, S>, midi: &MidiBuffer) {
        self.state = ProcessorState::Processing;
        buffer.clear_extra_outputs();

        if let Some(mapper) = &self.midi_cc {
            mapper.apply(midi, &self.params, &*self.automation);
        }
        if self.params.take_reload() {
            self.snap_to_targets();
        }

        self.stages.set_targets(&self.params);
        let action = self.mix.begin(self.params.bypass.is_on());

        let num_samples = buffer.num_samples();
        let num_channels = buffer.num_input_channels();

        self.dry.capture(buffer);
        let input_peak = block_peak((0..num_channels).map(|ch| self.dry.channel(ch)));
        self.input_meter.process_block(input_peak, num_samples);

        match action {
            BypassAction::Passthrough => {
                // Buffer still holds the input; keep the gain ramps moving
                self.stages.skip(num_samples);
            }
            BypassAction::Process => {
                for i in 0..num_samples {
                    let gain = self.stages.next();
                    for ch in 0..num_channels {
                        let dry = self.dry.channel(ch)[i];
                        buffer.channel_mut(ch)[i] = S::from_f64(dry * gain);
                    }
                }
            }
            BypassAction::ProcessAndCrossfade => {
                for i in 0..num_samples {
                    let gain = self.stages.next();
                    let (wet, dry_gain) = self.mix.next_gains();
                    for ch in 0..num_channels {
                        let dry = self.dry.channel(ch)[i];
                        let processed = dry * gain;
                        buffer.channel_mut(ch)[i] = S::from_f64(dry * dry_gain + processed * wet);
                    }
                }
            }
        }

        let output_peak = block_peak(buffer.inputs());
        self.output_meter.process_block(output_peak, num_samples);
    }
}

impl std::fmt::Debug for GainStageProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GainStageProcessor")
            .field("config", &self.config)
            .field("setup", &self.setup)
            .field("state", &self.state)
            .field("bypass", &self.mix.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusLayout;
    use crate::midi::MidiEvent;
    use crate::midi_cc::MidiCcConfig;
    use approx::assert_abs_diff_eq;

    const SR: f64 = 48000.0;

    fn prepare(config: GainStageConfig) -> GainStageProcessor {
        GainStagePlugin::new(config)
            .prepare(AudioSetup::new(SR, 64))
            .unwrap()
    }

    fn run(processor: &mut GainStageProcessor, left: &mut [f32], right: &mut [f32]) {
        let n = left.len();
        let mut buffer = Buffer::new([left, right], 2, n);
        processor.process(&mut buffer, &MidiBuffer::new());
    }

    #[test]
    fn prepare_snaps_to_targets() {
        let plugin = GainStagePlugin::default();
        plugin.parameters().gain.set_target(0.25);
        let processor = plugin.prepare(AudioSetup::new(SR, 64)).unwrap();
        assert_eq!(processor.state(), ProcessorState::Prepared);
        assert_abs_diff_eq!(processor.current_gain(), 0.25, epsilon = 1e-7);
        assert_eq!(processor.bypass_state(), BypassState::Active);
    }

    #[test]
    fn settled_gain_scales_input() {
        let mut processor = prepare(GainStageConfig::plugin());
        let mut left = [0.8f32; 64];
        let mut right = [-0.4f32; 64];
        run(&mut processor, &mut left, &mut right);

        assert_eq!(processor.state(), ProcessorState::Processing);
        assert!(left.iter().all(|&s| s == 0.4));
        assert!(right.iter().all(|&s| s == -0.2));
    }

    #[test]
    fn settled_bypass_is_bit_exact() {
        let plugin = GainStagePlugin::default();
        plugin.parameters().gain.set_target(0.1234);
        plugin.parameters().bypass.set_target(1.0);
        let mut processor = plugin.prepare(AudioSetup::new(SR, 64)).unwrap();

        let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.37).sin() * 0.9).collect();
        let mut left = input.clone();
        let mut right = input.clone();
        run(&mut processor, &mut left, &mut right);
        assert_eq!(left, input);
        assert_eq!(right, input);
    }

    #[test]
    fn gain_change_ramps_without_overshoot() {
        let mut processor = prepare(GainStageConfig::plugin());
        processor.parameters().gain.set_target(1.0);

        // 5 ms at 48 kHz = 240 samples
        let mut prev = 0.5f32;
        for _ in 0..4 {
            let mut left = [1.0f32; 64];
            let mut right = [1.0f32; 64];
            run(&mut processor, &mut left, &mut right);
            for &s in &left {
                assert!(s >= prev && s <= 1.0);
                prev = s;
            }
        }
        assert_eq!(prev, 1.0);
    }

    #[test]
    fn trim_and_output_multiply() {
        let config = GainStageConfig::plugin().with_layout(StageLayout::TrimAndOutput);
        let plugin = GainStagePlugin::new(config);
        plugin.parameters().in_trim.set_target(0.5);
        plugin.parameters().out_vol.set_target(0.5);
        let mut processor = plugin.prepare(AudioSetup::new(SR, 64)).unwrap();

        let mut left = [1.0f32; 64];
        let mut right = [1.0f32; 64];
        run(&mut processor, &mut left, &mut right);
        assert!(left.iter().all(|&s| s == 0.25));
    }

    #[test]
    fn bypass_toggle_crossfades_to_input() {
        let mut processor = prepare(GainStageConfig::plugin());
        processor.parameters().bypass.set_target(1.0);

        // 2 ms at 48 kHz = 96 samples: two blocks of crossfade
        let mut left = [0.6f32; 64];
        let mut right = [0.6f32; 64];
        run(&mut processor, &mut left, &mut right);
        assert_eq!(processor.bypass_state(), BypassState::RampingToBypassed);
        assert!(left[0] > 0.3 && left[63] < 0.6);

        let mut left = [0.6f32; 64];
        let mut right = [0.6f32; 64];
        run(&mut processor, &mut left, &mut right);
        assert_eq!(processor.bypass_state(), BypassState::Bypassed);
        assert_eq!(left[63], 0.6);
    }

    #[test]
    fn oversized_block_grows_dry_buffer() {
        let mut processor = prepare(GainStageConfig::plugin());
        assert_eq!(processor.dry_capacity(), 64);

        let mut left = vec![1.0f32; 200];
        let mut right = vec![1.0f32; 200];
        run(&mut processor, &mut left, &mut right);
        assert_eq!(processor.dry_capacity(), 200);
        assert!(left.iter().all(|&s| s == 0.5));

        let mut left = [1.0f32; 16];
        let mut right = [1.0f32; 16];
        run(&mut processor, &mut left, &mut right);
        assert_eq!(processor.dry_capacity(), 200);
    }

    #[test]
    fn mono_and_extra_outputs() {
        let mut processor = GainStagePlugin::default()
            .prepare(AudioSetup::new(SR, 32).with_layout(BusLayout::mono()))
            .unwrap();
        let mut main = [1.0f32; 32];
        let mut extra = [0.9f32; 32];
        let mut buffer = Buffer::new([&mut main[..], &mut extra[..]], 1, 32);
        processor.process(&mut buffer, &MidiBuffer::new());
        assert!(main.iter().all(|&s| s == 0.5));
        assert!(extra.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn double_precision_path() {
        let mut processor = prepare(GainStageConfig::plugin());
        let mut left = [0.3f64; 64];
        let mut right = [0.3f64; 64];
        let mut buffer = Buffer::new([&mut left[..], &mut right[..]], 2, 64);
        processor.process_f64(&mut buffer, &MidiBuffer::new());
        assert!(left.iter().all(|&s| s == 0.15));
    }

    #[test]
    fn midi_cc_applies_in_the_same_block() {
        let config = GainStageConfig::plugin().with_midi_cc(MidiCcConfig::single_gain());
        let mut processor = prepare(config);

        let mut midi = MidiBuffer::new();
        midi.push(MidiEvent::from_bytes(0, &[0xB0, 7, 127]).unwrap());
        let mut left = [1.0f32; 64];
        let mut right = [1.0f32; 64];
        let mut buffer = Buffer::new([&mut left[..], &mut right[..]], 2, 64);
        processor.process(&mut buffer, &midi);

        assert_eq!(processor.parameters().gain.target(), 1.0);
        // Ramp toward the new target has started
        assert!(left[63] > 0.5);
    }

    #[test]
    fn load_state_snaps_without_ramp() {
        let source = GainStagePlugin::default();
        source.parameters().gain.set_target(0.9);
        let blob = source.controller().save_state();

        let mut processor = prepare(GainStageConfig::plugin());
        assert_eq!(processor.load_state(&blob), Ok(2));
        assert_abs_diff_eq!(processor.current_gain(), 0.9, epsilon = 1e-7);

        let mut left = [1.0f32; 64];
        let mut right = [1.0f32; 64];
        run(&mut processor, &mut left, &mut right);
        assert!(left.iter().all(|&s| (s - 0.9).abs() < 1e-6));
    }

    #[test]
    fn controller_reload_snaps_at_next_block() {
        let mut processor = prepare(GainStageConfig::plugin());
        let controller = processor.controller();

        let source = GainStagePlugin::default();
        source.parameters().gain.set_target(0.2);
        controller.load_state(&source.controller().save_state()).unwrap();

        let mut left = [1.0f32; 64];
        let mut right = [1.0f32; 64];
        run(&mut processor, &mut left, &mut right);
        assert!(left.iter().all(|&s| (s - 0.2).abs() < 1e-6));
    }

    #[test]
    fn unprepare_keeps_parameters() {
        let mut processor = prepare(GainStageConfig::plugin());
        processor.parameters().gain.set_target(0.7);
        let mut left = [1.0f32; 64];
        let mut right = [1.0f32; 64];
        run(&mut processor, &mut left, &mut right);

        let plugin = processor.unprepare();
        assert_eq!(plugin.parameters().gain.target(), 0.7);
        let processor = plugin.prepare(AudioSetup::new(96000.0, 128)).unwrap();
        assert_eq!(processor.state(), ProcessorState::Prepared);
        assert_abs_diff_eq!(processor.current_gain(), 0.7, epsilon = 1e-6);
    }
}
