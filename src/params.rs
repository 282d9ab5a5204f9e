//! # Plugin Parameters
//!
//! The knobs the host sees. Each has a stable string id (`#[id = "..."]`)
//! used to save and recall presets; these match the keys written by
//! [`crate::state`], so never change them.
//!
//! nih-plug stores every value atomically. The UI thread and host
//! automation write them whenever they like while the audio thread reads
//! each one once per sample, so a single read can never see a half-written
//! value. The ranges here match [`crate::dsp::settings`], and the engine
//! clamps again anyway.
//!
//! ## Smoothing
//!
//! Dry/wet, depth and feedback are gain-like: a sudden jump is audible as
//! a click, so they ramp over 20 ms. Rate and phase offset only steer the
//! LFO, which is already continuous, and the mode is a switch.

use nih_plug::prelude::*;

use crate::dsp::settings::{
    ChorusSettings, EffectMode, DEFAULT_DEPTH, DEFAULT_DRY_WET, DEFAULT_FEEDBACK,
    DEFAULT_PHASE_OFFSET, DEFAULT_RATE_HZ, DEPTH_RANGE, DRY_WET_RANGE, FEEDBACK_RANGE,
    PHASE_OFFSET_RANGE, RATE_RANGE,
};

const SMOOTHING_MS: f32 = 20.0;

#[derive(Params)]
pub struct ChorusParams {
    /// **Dry/Wet** — balance between the untouched input and the
    /// modulated delay. 50% gives the classic chorus sound; 100% wet
    /// gives pure vibrato.
    #[id = "drywet"]
    pub dry_wet: FloatParam,

    /// **Depth** — how far the LFO sweeps through the mode's delay
    /// window. At 0% the delay sits still in the middle of it.
    #[id = "depth"]
    pub depth: FloatParam,

    /// **Rate** — LFO speed in Hz.
    #[id = "rate"]
    pub rate: FloatParam,

    /// **Phase Offset** — how far ahead in the LFO cycle the right
    /// channel runs. 0% is mono modulation, 25% a quarter cycle (wide).
    #[id = "phaseoffset"]
    pub phase_offset: FloatParam,

    /// **Feedback** — how much of the delayed signal is sent back in.
    /// Capped at 98% so the loop always decays.
    #[id = "feedback"]
    pub feedback: FloatParam,

    /// **Type** — chorus (5-30 ms) or flanger (1-5 ms).
    #[id = "type"]
    pub mode: EnumParam<EffectMode>,
}

impl Default for ChorusParams {
    fn default() -> Self {
        Self {
            dry_wet: FloatParam::new(
                "Dry/Wet",
                DEFAULT_DRY_WET,
                FloatRange::Linear {
                    min: *DRY_WET_RANGE.start(),
                    max: *DRY_WET_RANGE.end(),
                },
            )
            .with_unit("%")
            .with_smoother(SmoothingStyle::Linear(SMOOTHING_MS))
            .with_value_to_string(formatters::v2s_f32_percentage(1))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            depth: FloatParam::new(
                "Depth",
                DEFAULT_DEPTH,
                FloatRange::Linear {
                    min: *DEPTH_RANGE.start(),
                    max: *DEPTH_RANGE.end(),
                },
            )
            .with_unit("%")
            .with_smoother(SmoothingStyle::Linear(SMOOTHING_MS))
            .with_value_to_string(formatters::v2s_f32_percentage(1))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            rate: FloatParam::new(
                "Rate",
                DEFAULT_RATE_HZ,
                FloatRange::Skewed {
                    min: *RATE_RANGE.start(),
                    max: *RATE_RANGE.end(),
                    // More knob travel for the slow, lush end of the range.
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_unit(" Hz")
            .with_step_size(0.01),

            phase_offset: FloatParam::new(
                "Phase Offset",
                DEFAULT_PHASE_OFFSET,
                FloatRange::Linear {
                    min: *PHASE_OFFSET_RANGE.start(),
                    max: *PHASE_OFFSET_RANGE.end(),
                },
            )
            .with_unit("%")
            .with_value_to_string(formatters::v2s_f32_percentage(1))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            feedback: FloatParam::new(
                "Feedback",
                DEFAULT_FEEDBACK,
                FloatRange::Linear {
                    min: *FEEDBACK_RANGE.start(),
                    max: *FEEDBACK_RANGE.end(),
                },
            )
            .with_unit("%")
            .with_smoother(SmoothingStyle::Linear(SMOOTHING_MS))
            .with_value_to_string(formatters::v2s_f32_percentage(1))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            mode: EnumParam::new("Type", EffectMode::default()),
        }
    }
}

impl ChorusParams {
    /// Read every parameter once, stepping the smoothers by one sample.
    /// Call exactly once per sample from the audio thread.
    pub fn next_settings(&self) -> ChorusSettings {
        ChorusSettings::clamped(
            self.dry_wet.smoothed.next(),
            self.depth.smoothed.next(),
            self.rate.value(),
            self.phase_offset.value(),
            self.feedback.smoothed.next(),
            self.mode.value(),
        )
    }

    /// Current target values without touching the smoothers.
    pub fn current_settings(&self) -> ChorusSettings {
        ChorusSettings::clamped(
            self.dry_wet.value(),
            self.depth.value(),
            self.rate.value(),
            self.phase_offset.value(),
            self.feedback.value(),
            self.mode.value(),
        )
    }
}
