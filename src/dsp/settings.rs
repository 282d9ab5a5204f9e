//! # Parameter Set
//!
//! The six values the engine reads every sample, and the two effect
//! modes. Every way into a [`ChorusSettings`] clamps, so the engine can
//! rely on the ranges below without checking again.

use std::ops::RangeInclusive;

use nih_plug::prelude::Enum;
use serde::{Deserialize, Serialize};

pub const DRY_WET_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const DEPTH_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// 0.1 Hz is the slowest sweep; anything lower would look stuck.
pub const RATE_RANGE: RangeInclusive<f32> = 0.1..=20.0;
/// Fraction of one LFO cycle the right channel runs ahead of the left.
pub const PHASE_OFFSET_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Capped below 1.0 so the feedback loop always decays.
pub const FEEDBACK_RANGE: RangeInclusive<f32> = 0.0..=0.98;

pub const DEFAULT_DRY_WET: f32 = 0.5;
pub const DEFAULT_DEPTH: f32 = 0.5;
pub const DEFAULT_RATE_HZ: f32 = 10.0;
pub const DEFAULT_PHASE_OFFSET: f32 = 0.0;
pub const DEFAULT_FEEDBACK: f32 = 0.5;

/// Which delay-time window the LFO sweeps.
///
/// The two modes run the exact same engine. They only differ in the pair
/// of delay times the LFO is mapped onto.
#[derive(Enum, Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectMode {
    /// 5-30 ms: long enough to hear as a second, detuned voice.
    #[default]
    #[id = "chorus"]
    #[name = "Chorus"]
    Chorus,
    /// 1-5 ms: short enough to comb-filter against the dry signal.
    #[id = "flanger"]
    #[name = "Flanger"]
    Flanger,
}

impl EffectMode {
    pub const ALL: [EffectMode; 2] = [EffectMode::Chorus, EffectMode::Flanger];

    /// `(low, high)` delay time in seconds.
    pub const fn delay_range(self) -> (f32, f32) {
        match self {
            EffectMode::Chorus => (0.005, 0.03),
            EffectMode::Flanger => (0.001, 0.005),
        }
    }

    /// Map an LFO value in `[-1, 1]` onto this mode's delay range.
    ///
    /// ```text
    /// seconds = low + (lfo + 1) / 2 * (high - low)
    /// ```
    #[inline]
    pub fn map_modulation(self, lfo: f32) -> f32 {
        let (low, high) = self.delay_range();
        low + (lfo + 1.0) * 0.5 * (high - low)
    }

    /// Position in the host's "Type" menu, as stored by older presets.
    pub const fn index(self) -> usize {
        match self {
            EffectMode::Chorus => 0,
            EffectMode::Flanger => 1,
        }
    }

    /// Stable id, shared by the host parameter and the saved state.
    pub const fn id(self) -> &'static str {
        match self {
            EffectMode::Chorus => "chorus",
            EffectMode::Flanger => "flanger",
        }
    }

    /// Inverse of [`index()`](Self::index). `None` for anything that isn't
    /// a menu position.
    pub fn from_menu_index(index: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.index() as i64 == index)
    }

    /// Inverse of [`id()`](Self::id).
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.id() == id)
    }
}

/// Clamp into `range`. NaN can't be ordered, so it becomes `fallback`.
fn clamp_or(value: f32, range: &RangeInclusive<f32>, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(*range.start(), *range.end())
    }
}

/// A snapshot of all six effect parameters, always in range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChorusSettings {
    dry_wet: f32,
    depth: f32,
    rate_hz: f32,
    phase_offset: f32,
    feedback: f32,
    mode: EffectMode,
}

impl Default for ChorusSettings {
    fn default() -> Self {
        Self {
            dry_wet: DEFAULT_DRY_WET,
            depth: DEFAULT_DEPTH,
            rate_hz: DEFAULT_RATE_HZ,
            phase_offset: DEFAULT_PHASE_OFFSET,
            feedback: DEFAULT_FEEDBACK,
            mode: EffectMode::default(),
        }
    }
}

impl ChorusSettings {
    /// Build a snapshot from raw values, clamping each into its range.
    pub fn clamped(
        dry_wet: f32,
        depth: f32,
        rate_hz: f32,
        phase_offset: f32,
        feedback: f32,
        mode: EffectMode,
    ) -> Self {
        let mut settings = Self {
            mode,
            ..Self::default()
        };
        settings.set_dry_wet(dry_wet);
        settings.set_depth(depth);
        settings.set_rate_hz(rate_hz);
        settings.set_phase_offset(phase_offset);
        settings.set_feedback(feedback);
        settings
    }

    pub fn dry_wet(&self) -> f32 {
        self.dry_wet
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn rate_hz(&self) -> f32 {
        self.rate_hz
    }

    pub fn phase_offset(&self) -> f32 {
        self.phase_offset
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn mode(&self) -> EffectMode {
        self.mode
    }

    pub fn set_dry_wet(&mut self, value: f32) {
        self.dry_wet = clamp_or(value, &DRY_WET_RANGE, DEFAULT_DRY_WET);
    }

    pub fn set_depth(&mut self, value: f32) {
        self.depth = clamp_or(value, &DEPTH_RANGE, DEFAULT_DEPTH);
    }

    pub fn set_rate_hz(&mut self, value: f32) {
        self.rate_hz = clamp_or(value, &RATE_RANGE, DEFAULT_RATE_HZ);
    }

    pub fn set_phase_offset(&mut self, value: f32) {
        self.phase_offset = clamp_or(value, &PHASE_OFFSET_RANGE, DEFAULT_PHASE_OFFSET);
    }

    pub fn set_feedback(&mut self, value: f32) {
        self.feedback = clamp_or(value, &FEEDBACK_RANGE, DEFAULT_FEEDBACK);
    }

    pub fn set_mode(&mut self, mode: EffectMode) {
        self.mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = ChorusSettings::default();
        assert_eq!(s.dry_wet(), 0.5);
        assert_eq!(s.depth(), 0.5);
        assert_eq!(s.rate_hz(), 10.0);
        assert_eq!(s.phase_offset(), 0.0);
        assert_eq!(s.feedback(), 0.5);
        assert_eq!(s.mode(), EffectMode::Chorus);
    }

    #[test]
    fn test_out_of_range_writes_are_clamped() {
        let s = ChorusSettings::clamped(1.5, -0.2, 100.0, 2.0, 1.0, EffectMode::Flanger);
        assert_eq!(s.dry_wet(), 1.0);
        assert_eq!(s.depth(), 0.0);
        assert_eq!(s.rate_hz(), 20.0);
        assert_eq!(s.phase_offset(), 1.0);
        assert_eq!(s.feedback(), 0.98);
        assert_eq!(s.mode(), EffectMode::Flanger);

        let s = ChorusSettings::clamped(-1.0, 7.0, 0.0, -0.5, -3.0, EffectMode::Chorus);
        assert_eq!(s.dry_wet(), 0.0);
        assert_eq!(s.depth(), 1.0);
        assert_eq!(s.rate_hz(), 0.1);
        assert_eq!(s.phase_offset(), 0.0);
        assert_eq!(s.feedback(), 0.0);
    }

    #[test]
    fn test_nan_falls_back_to_default_and_infinity_clamps() {
        let mut s = ChorusSettings::default();
        s.set_feedback(0.9);
        s.set_feedback(f32::NAN);
        assert_eq!(s.feedback(), DEFAULT_FEEDBACK);

        s.set_rate_hz(f32::INFINITY);
        assert_eq!(s.rate_hz(), 20.0);
        s.set_rate_hz(f32::NEG_INFINITY);
        assert_eq!(s.rate_hz(), 0.1);
    }

    #[test]
    fn test_in_range_values_pass_through() {
        let s = ChorusSettings::clamped(0.25, 0.75, 3.5, 0.25, 0.3, EffectMode::Chorus);
        assert_eq!(s.dry_wet(), 0.25);
        assert_eq!(s.depth(), 0.75);
        assert_eq!(s.rate_hz(), 3.5);
        assert_eq!(s.phase_offset(), 0.25);
        assert_eq!(s.feedback(), 0.3);
    }

    #[test]
    fn test_mode_mapping_endpoints() {
        for mode in [EffectMode::Chorus, EffectMode::Flanger] {
            let (low, high) = mode.delay_range();
            assert!((mode.map_modulation(-1.0) - low).abs() < 1e-7);
            assert!((mode.map_modulation(1.0) - high).abs() < 1e-7);
            assert!((mode.map_modulation(0.0) - (low + high) / 2.0).abs() < 1e-7);
        }
        assert_eq!(EffectMode::Chorus.delay_range(), (0.005, 0.03));
        assert_eq!(EffectMode::Flanger.delay_range(), (0.001, 0.005));
    }

    #[test]
    fn test_mode_index_and_id_round_trip() {
        assert_eq!(EffectMode::default(), EffectMode::Chorus);
        for mode in EffectMode::ALL {
            assert_eq!(EffectMode::from_menu_index(mode.index() as i64), Some(mode));
            assert_eq!(EffectMode::from_id(mode.id()), Some(mode));
        }
        assert_eq!(EffectMode::from_menu_index(2), None);
        assert_eq!(EffectMode::from_menu_index(-1), None);
        assert_eq!(EffectMode::from_id("phaser"), None);
    }

    /// The saved-state name and the host parameter id must agree.
    #[test]
    fn test_serde_name_matches_id() {
        for mode in EffectMode::ALL {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.id()));
        }
    }
}
