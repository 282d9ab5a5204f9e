//! # Loveless Chorus — An AU/VST3/CLAP Chorus & Flanger Plugin
//!
//! A modulated-delay effect built with [nih-plug](https://github.com/robbert-vdh/nih-plug).
//! One engine, two voicings: a chorus sweeping a 5-30 ms delay and a
//! flanger sweeping 1-5 ms.
//!
//! ## Signal Flow (per channel)
//!
//! ```text
//! Input ──┬─────────────────────────────────────── × (1 - dry/wet) ──┐
//!         │                                                          │
//!         └──►(+)──► [Delay Line] ──► read at delay(t) ──┬── × dry/wet ──►(+)──► Output
//!              ▲                          ▲              │
//!              │                          │              │
//!              │                 LFO (sine, rate) × depth│
//!              │                 mapped to mode window   │
//!              │                                         │
//!              └──────────────── × feedback ◄────────────┘
//! ```
//!
//! The right channel reads the same LFO shifted by the phase-offset
//! parameter, which is where the stereo width comes from.

pub mod dsp;
pub mod params;
pub mod state;

use std::num::NonZeroU32;
use std::sync::Arc;

use dsp::engine::ChorusEngine;
use nih_plug::prelude::*;
use nih_plug::wrapper::state::PluginState;
use params::ChorusParams;

/// The plugin as the host sees it.
///
/// `params` is shared with the host and UI through an `Arc`; `engine`
/// belongs to the audio thread and is only touched from `initialize()`,
/// `reset()` and `process()`.
pub struct LovelessChorus {
    params: Arc<ChorusParams>,
    engine: ChorusEngine,
}

impl Default for LovelessChorus {
    fn default() -> Self {
        Self {
            params: Arc::new(ChorusParams::default()),
            // Unprepared until initialize() tells us the sample rate.
            engine: ChorusEngine::new(),
        }
    }
}

impl Plugin for LovelessChorus {
    const NAME: &'static str = "Loveless Chorus";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Stereo is the real thing. Mono runs the left path alone, so it gets
    // chorus/flanger but no stereo spread.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // The engine reads parameters every sample, so let automation land on
    // the exact sample it was drawn at.
    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Called on saved state before nih-plug applies it to the parameters,
    /// whether it comes from the host's project file or a preset. Malformed
    /// or missing values are replaced with defaults and numbers clamped, so
    /// a bad preset loads as something sensible instead of half-applying.
    /// See [`state::filter_plugin_state()`].
    fn filter_state(saved: &mut PluginState) {
        state::filter_plugin_state(saved);
    }

    /// Allocate the delay lines for this sample rate.
    ///
    /// Returning `false` tells the host we can't run in this
    /// configuration; the only way that happens is a nonsense sample rate
    /// or running out of memory for the buffers.
    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        if let Err(err) = self
            .engine
            .prepare(buffer_config.sample_rate, buffer_config.max_buffer_size as usize)
        {
            nih_error!("Could not prepare the chorus engine: {err}");
            return false;
        }

        self.engine.set_settings(self.params.current_settings());
        true
    }

    /// Playback stopped or the plugin was bypassed: drop the old echoes
    /// and restart the LFO so the next play starts clean.
    fn reset(&mut self) {
        self.engine.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        // `iter_samples()` walks the buffer one frame at a time: each step
        // hands us that sample for every channel at once, which is exactly
        // what a stereo engine wants.
        for mut channel_samples in buffer.iter_samples() {
            // Read every parameter once for this sample. The smoothed ones
            // (dry/wet, depth, feedback) step their ramp forward by one
            // sample here, so a knob turn glides instead of clicking. Each
            // value is read atomically on its own; they don't have to agree
            // with each other to the sample.
            self.engine.set_settings(self.params.next_settings());

            // Pull out up to two channels. The engine always works in
            // stereo pairs and replaces the samples in place with its
            // output.
            let mut channels = channel_samples.iter_mut();
            match (channels.next(), channels.next()) {
                (Some(left), Some(right)) => {
                    (*left, *right) = self.engine.process_frame(*left, *right);
                }
                // Mono: feed the one channel to both sides and keep the
                // left output. The right path runs but goes unheard.
                (Some(mono), None) => {
                    (*mono, _) = self.engine.process_frame(*mono, *mono);
                }
                _ => {}
            }
        }

        // Tell the host how long we keep ringing once the input goes
        // silent, so it doesn't put us to sleep while echoes are still
        // coming out of the feedback loop.
        ProcessStatus::Tail(self.engine.tail_samples())
    }
}

impl ClapPlugin for LovelessChorus {
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-chorus-v1";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A stereo chorus and flanger, built for learning DSP");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Chorus,
        ClapFeature::Flanger,
    ];
}

impl Vst3Plugin for LovelessChorus {
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssChorus_v001";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Modulation];
}

nih_export_clap!(LovelessChorus);
nih_export_vst3!(LovelessChorus);

// AUv2 entry point for Logic Pro, wrapping the CLAP build.
#[cfg(target_os = "macos")]
clap_wrapper::export_auv2!();
