//! # Saved State
//!
//! Two ways saved parameters come back in, one set of rules:
//!
//! - [`load()`] reads the JSON object written by [`save()`], keyed by the
//!   parameter ids (`drywet`, `depth`, `rate`, `phaseoffset`, `feedback`,
//!   `type`). This is what a host-less user of the engine calls.
//! - [`filter_plugin_state()`] runs inside the plugin, from nih-plug's
//!   `Plugin::filter_state()` hook, on the state a host hands back before
//!   nih-plug applies it to the parameters.
//!
//! Loading never fails. Saved state comes from old presets, other
//! versions and hand-edited files, so each field is checked on its own:
//! a missing or malformed field falls back to its default, numbers are
//! clamped into range, and the rest of the document is still used. The
//! mode is stored by id; older presets stored the menu index (`0`/`1`),
//! which is still accepted.

use nih_plug::nih_warn;
use nih_plug::wrapper::state::{ParamValue, PluginState};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::dsp::settings::{ChorusSettings, EffectMode};

pub const KEY_DRY_WET: &str = "drywet";
pub const KEY_DEPTH: &str = "depth";
pub const KEY_RATE: &str = "rate";
pub const KEY_PHASE_OFFSET: &str = "phaseoffset";
pub const KEY_FEEDBACK: &str = "feedback";
pub const KEY_MODE: &str = "type";

/// The five numeric parameters: id, clamping setter, getter.
type FloatField = (
    &'static str,
    fn(&mut ChorusSettings, f32),
    fn(&ChorusSettings) -> f32,
);

const FLOAT_FIELDS: [FloatField; 5] = [
    (KEY_DRY_WET, ChorusSettings::set_dry_wet, ChorusSettings::dry_wet),
    (KEY_DEPTH, ChorusSettings::set_depth, ChorusSettings::depth),
    (KEY_RATE, ChorusSettings::set_rate_hz, ChorusSettings::rate_hz),
    (
        KEY_PHASE_OFFSET,
        ChorusSettings::set_phase_offset,
        ChorusSettings::phase_offset,
    ),
    (KEY_FEEDBACK, ChorusSettings::set_feedback, ChorusSettings::feedback),
];

#[derive(thiserror::Error, Debug)]
pub enum StateError {
    #[error("Failed to serialize parameter state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-disk layout. Field names are the parameter ids.
#[derive(Serialize)]
struct SavedState {
    drywet: f32,
    depth: f32,
    rate: f32,
    phaseoffset: f32,
    feedback: f32,
    #[serde(rename = "type")]
    mode: EffectMode,
}

impl From<&ChorusSettings> for SavedState {
    fn from(settings: &ChorusSettings) -> Self {
        Self {
            drywet: settings.dry_wet(),
            depth: settings.depth(),
            rate: settings.rate_hz(),
            phaseoffset: settings.phase_offset(),
            feedback: settings.feedback(),
            mode: settings.mode(),
        }
    }
}

/// Serialize the current parameter values.
pub fn save(settings: &ChorusSettings) -> Result<String, StateError> {
    Ok(serde_json::to_string(&SavedState::from(settings))?)
}

/// Restore parameter values from `data`, falling back to the default for
/// anything missing or malformed.
pub fn load(data: &str) -> ChorusSettings {
    let mut settings = ChorusSettings::default();

    let fields = match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => {
            nih_warn!("Saved state is not an object ({other}), using defaults");
            return settings;
        }
        Err(err) => {
            nih_warn!("Could not parse saved state, using defaults: {err}");
            return settings;
        }
    };

    // Setters clamp, so an out-of-range number is pulled back into range
    // rather than rejected.
    for (key, set, _) in FLOAT_FIELDS {
        if let Some(value) = json_number(&fields, key) {
            set(&mut settings, value);
        }
    }
    if let Some(mode) = fields.get(KEY_MODE).and_then(json_mode) {
        settings.set_mode(mode);
    }

    settings
}

/// Validate a host-supplied [`PluginState`] in place.
///
/// Afterwards every one of the six parameters is present and valid: the
/// numbers are clamped `F32`s and the mode is the `String` id nih-plug
/// stores for `EnumParam`s with `#[id]`s. Anything that couldn't be used
/// has been replaced by its default, so a broken preset can't leave a
/// parameter at whatever the previous preset had.
pub fn filter_plugin_state(state: &mut PluginState) {
    let mut settings = ChorusSettings::default();

    for (key, set, _) in FLOAT_FIELDS {
        if let Some(value) = param_number(state, key) {
            set(&mut settings, value);
        }
    }
    if let Some(mode) = state.params.get(KEY_MODE).and_then(param_mode) {
        settings.set_mode(mode);
    }

    for (key, _, get) in FLOAT_FIELDS {
        state
            .params
            .insert(key.to_owned(), ParamValue::F32(get(&settings)));
    }
    state.params.insert(
        KEY_MODE.to_owned(),
        ParamValue::String(settings.mode().id().to_owned()),
    );
}

fn json_number(fields: &Map<String, Value>, key: &str) -> Option<f32> {
    match fields.get(key) {
        Some(Value::Number(n)) => n.as_f64().map(|v| v as f32),
        Some(other) => {
            nih_warn!("Ignoring saved '{key}': expected a number, got {other}");
            None
        }
        None => None,
    }
}

fn json_mode(value: &Value) -> Option<EffectMode> {
    let mode = match value {
        Value::String(id) => EffectMode::from_id(id),
        Value::Number(n) => n.as_i64().and_then(EffectMode::from_menu_index),
        _ => None,
    };
    if mode.is_none() {
        nih_warn!("Ignoring saved '{KEY_MODE}': unknown effect mode {value}");
    }
    mode
}

fn param_number(state: &PluginState, key: &str) -> Option<f32> {
    match state.params.get(key) {
        Some(ParamValue::F32(value)) => Some(*value),
        Some(ParamValue::I32(value)) => Some(*value as f32),
        Some(other) => {
            nih_warn!("Ignoring saved '{key}': expected a number, got {other:?}");
            None
        }
        None => None,
    }
}

fn param_mode(value: &ParamValue) -> Option<EffectMode> {
    let mode = match value {
        ParamValue::String(id) => EffectMode::from_id(id),
        ParamValue::I32(index) => EffectMode::from_menu_index(i64::from(*index)),
        _ => None,
    };
    if mode.is_none() {
        nih_warn!("Ignoring saved '{KEY_MODE}': unknown effect mode {value:?}");
    }
    mode
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn plugin_state(params: Vec<(&str, ParamValue)>) -> PluginState {
        PluginState {
            version: String::new(),
            params: params
                .into_iter()
                .map(|(key, value)| (key.to_owned(), value))
                .collect(),
            fields: BTreeMap::new(),
        }
    }

    fn f32_param(state: &PluginState, key: &str) -> f32 {
        match state.params.get(key) {
            Some(ParamValue::F32(value)) => *value,
            other => panic!("'{key}' should be an F32, got {other:?}"),
        }
    }

    fn mode_param(state: &PluginState) -> String {
        match state.params.get(KEY_MODE) {
            Some(ParamValue::String(id)) => id.clone(),
            other => panic!("'{KEY_MODE}' should be a String, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trip() {
        let original = ChorusSettings::clamped(0.8, 0.3, 2.75, 0.25, 0.6, EffectMode::Flanger);
        let saved = save(&original).unwrap();
        assert_eq!(load(&saved), original);
    }

    #[test]
    fn test_round_trip_defaults() {
        let original = ChorusSettings::default();
        assert_eq!(load(&save(&original).unwrap()), original);
    }

    #[test]
    fn test_saved_keys_match_parameter_ids() {
        let saved = save(&ChorusSettings::default()).unwrap();
        let value: Value = serde_json::from_str(&saved).unwrap();
        let fields = value.as_object().unwrap();

        for key in [
            KEY_DRY_WET,
            KEY_DEPTH,
            KEY_RATE,
            KEY_PHASE_OFFSET,
            KEY_FEEDBACK,
            KEY_MODE,
        ] {
            assert!(fields.contains_key(key), "missing key {key}");
        }
        assert_eq!(fields[KEY_MODE], Value::String("chorus".into()));
    }

    #[test]
    fn test_garbage_loads_defaults() {
        for data in ["", "not json", "[1, 2, 3]", "42", "null"] {
            assert_eq!(load(data), ChorusSettings::default(), "input {data:?}");
        }
    }

    #[test]
    fn test_missing_fields_fall_back_individually() {
        let settings = load(r#"{"depth": 0.9, "type": "flanger"}"#);
        assert_eq!(settings.depth(), 0.9);
        assert_eq!(settings.mode(), EffectMode::Flanger);
        assert_eq!(settings.dry_wet(), 0.5);
        assert_eq!(settings.rate_hz(), 10.0);
        assert_eq!(settings.feedback(), 0.5);
    }

    #[test]
    fn test_malformed_fields_fall_back_individually() {
        let settings = load(r#"{"drywet": "loud", "rate": 4.0, "feedback": null}"#);
        assert_eq!(settings.dry_wet(), 0.5);
        assert_eq!(settings.rate_hz(), 4.0);
        assert_eq!(settings.feedback(), 0.5);
    }

    #[test]
    fn test_out_of_range_numbers_are_clamped() {
        let settings = load(r#"{"feedback": 3.0, "rate": 0.0, "phaseoffset": -1}"#);
        assert_eq!(settings.feedback(), 0.98);
        assert_eq!(settings.rate_hz(), 0.1);
        assert_eq!(settings.phase_offset(), 0.0);
    }

    #[test]
    fn test_mode_validation() {
        assert_eq!(load(r#"{"type": 1}"#).mode(), EffectMode::Flanger);
        assert_eq!(load(r#"{"type": 0}"#).mode(), EffectMode::Chorus);
        assert_eq!(load(r#"{"type": "chorus"}"#).mode(), EffectMode::Chorus);

        for bad in [r#""phaser""#, "2", "-1", "0.5", "true", "[]"] {
            let data = format!(r#"{{"type": {bad}}}"#);
            assert_eq!(load(&data).mode(), EffectMode::Chorus, "input {data}");
        }
    }

    /// A valid host state passes through with its values intact.
    #[test]
    fn test_plugin_state_valid_values_are_kept() {
        let mut state = plugin_state(vec![
            (KEY_DRY_WET, ParamValue::F32(0.8)),
            (KEY_DEPTH, ParamValue::F32(0.3)),
            (KEY_RATE, ParamValue::F32(2.75)),
            (KEY_PHASE_OFFSET, ParamValue::F32(0.25)),
            (KEY_FEEDBACK, ParamValue::F32(0.6)),
            (KEY_MODE, ParamValue::String("flanger".into())),
        ]);
        filter_plugin_state(&mut state);

        assert_eq!(f32_param(&state, KEY_DRY_WET), 0.8);
        assert_eq!(f32_param(&state, KEY_DEPTH), 0.3);
        assert_eq!(f32_param(&state, KEY_RATE), 2.75);
        assert_eq!(f32_param(&state, KEY_PHASE_OFFSET), 0.25);
        assert_eq!(f32_param(&state, KEY_FEEDBACK), 0.6);
        assert_eq!(mode_param(&state), "flanger");
    }

    #[test]
    fn test_plugin_state_malformed_fields_become_defaults() {
        let mut state = plugin_state(vec![
            (KEY_DRY_WET, ParamValue::Bool(true)),
            (KEY_DEPTH, ParamValue::String("deep".into())),
            (KEY_FEEDBACK, ParamValue::F32(f32::NAN)),
            (KEY_MODE, ParamValue::String("phaser".into())),
        ]);
        filter_plugin_state(&mut state);

        assert_eq!(f32_param(&state, KEY_DRY_WET), 0.5);
        assert_eq!(f32_param(&state, KEY_DEPTH), 0.5);
        assert_eq!(f32_param(&state, KEY_FEEDBACK), 0.5);
        // Missing entirely: filled in rather than left to the old value.
        assert_eq!(f32_param(&state, KEY_RATE), 10.0);
        assert_eq!(f32_param(&state, KEY_PHASE_OFFSET), 0.0);
        assert_eq!(mode_param(&state), "chorus");
    }

    #[test]
    fn test_plugin_state_numbers_are_clamped() {
        let mut state = plugin_state(vec![
            (KEY_FEEDBACK, ParamValue::F32(1.5)),
            (KEY_RATE, ParamValue::I32(100)),
            (KEY_PHASE_OFFSET, ParamValue::F32(-0.5)),
        ]);
        filter_plugin_state(&mut state);

        assert_eq!(f32_param(&state, KEY_FEEDBACK), 0.98);
        assert_eq!(f32_param(&state, KEY_RATE), 20.0);
        assert_eq!(f32_param(&state, KEY_PHASE_OFFSET), 0.0);
    }

    /// Older presets stored the mode as its menu index.
    #[test]
    fn test_plugin_state_mode_index_maps_to_id() {
        for (index, expected) in [(0, "chorus"), (1, "flanger"), (2, "chorus"), (-3, "chorus")] {
            let mut state = plugin_state(vec![(KEY_MODE, ParamValue::I32(index))]);
            filter_plugin_state(&mut state);
            assert_eq!(mode_param(&state), expected, "index {index}");
        }
    }

    /// Keys that aren't ours are left alone.
    #[test]
    fn test_plugin_state_keeps_unrelated_entries() {
        let mut state = plugin_state(vec![("bypass", ParamValue::Bool(true))]);
        filter_plugin_state(&mut state);
        assert!(matches!(state.params.get("bypass"), Some(ParamValue::Bool(true))));
    }
}
