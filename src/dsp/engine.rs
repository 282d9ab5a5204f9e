//! # Modulated Delay Engine
//!
//! Owns everything that changes from sample to sample: one delay line
//! per channel, the LFO, the feedback memory, and the current
//! [`ChorusSettings`].
//!
//! ## Per-Sample Order
//!
//! ```text
//!  1. lfo_l = sin(phase),  lfo_r = sin(phase + phase_offset), both × depth
//!  2. map each to the mode's delay window (seconds)
//!  3. seconds × sample_rate → delay in samples
//!  4. advance the LFO phase
//!  5. write input + feedback into each line at the shared write head
//!  6. read each line back at its (fractional) delay
//!  7. feedback = delayed × feedback amount
//!  8. advance both write heads together
//!  9. out = in × (1 - dry_wet) + delayed × dry_wet
//! ```
//!
//! Writing before reading means the delay is measured from the sample
//! being processed: a delay of N samples returns the input from exactly
//! N calls ago. The LFO is read before it is advanced, so the very first
//! sample after `prepare()` uses phase 0.

use std::collections::TryReserveError;
use std::num::NonZeroUsize;

use nih_plug::{nih_debug_assert, nih_log};

use super::delay_line::DelayLine;
use super::lfo::Lfo;
use super::settings::ChorusSettings;
use crate::state::{self, StateError};

/// Longest delay the buffers can hold. The longest mapped delay is the
/// chorus ceiling of 30 ms, so every read stays inside the buffer.
pub const MAX_DELAY_SECONDS: f64 = 0.05;

const LEFT: usize = 0;
const RIGHT: usize = 1;

#[derive(thiserror::Error, Debug)]
pub enum PrepareError {
    #[error("Sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f32),

    #[error("Could not allocate a {capacity}-sample delay line: {source}")]
    Allocation {
        capacity: usize,
        #[source]
        source: TryReserveError,
    },
}

/// Stereo chorus/flanger engine.
///
/// Create it once, call [`prepare()`](Self::prepare) whenever the sample
/// rate is known or changes, then feed it audio. Until the first
/// successful `prepare()` audio passes through untouched.
#[derive(Debug, Default)]
pub struct ChorusEngine {
    settings: ChorusSettings,

    /// Set by `prepare()`. Zero until then.
    sample_rate: f32,

    /// `[left, right]`, or `None` until the first successful `prepare()`.
    /// Both are written and advanced together, so their write heads always
    /// sit on the same index.
    delay_lines: Option<[DelayLine; 2]>,

    lfo: Lfo,

    /// Last delayed sample of each channel, already scaled by the
    /// feedback amount, waiting to be added to the next write.
    feedback: [f32; 2],
}

impl ChorusEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate delay lines for `sample_rate` and clear all transient
    /// state.
    ///
    /// Buffers are only reallocated when the required capacity changes;
    /// preparing again at the same rate just zero-fills them. This must
    /// not run concurrently with processing.
    ///
    /// On error nothing changes: an engine that was already prepared keeps
    /// its buffers and sample rate and carries on as before.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) -> Result<(), PrepareError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(PrepareError::InvalidSampleRate(sample_rate));
        }

        let capacity = delay_capacity(sample_rate)?;

        if self.capacity() == Some(capacity.get()) {
            self.reset();
        } else {
            // Both lines are built before either is stored, so a failure
            // on the second leaves the old pair in place.
            let allocate = || {
                DelayLine::try_new(capacity).map_err(|source| PrepareError::Allocation {
                    capacity: capacity.get(),
                    source,
                })
            };
            self.delay_lines = Some([allocate()?, allocate()?]);
            self.lfo.reset();
            self.feedback = [0.0; 2];
        }
        self.sample_rate = sample_rate;

        nih_log!(
            "Prepared chorus at {sample_rate} Hz: {} samples of delay per channel, \
             blocks of up to {max_block_size}",
            capacity.get()
        );

        Ok(())
    }

    /// Silence the delay lines and restart the LFO, keeping the buffers.
    pub fn reset(&mut self) {
        for line in self.delay_lines.iter_mut().flatten() {
            line.clear();
        }
        self.lfo.reset();
        self.feedback = [0.0; 2];
    }

    pub fn is_prepared(&self) -> bool {
        self.delay_lines.is_some()
    }

    /// Samples each delay line holds, once prepared.
    pub fn capacity(&self) -> Option<usize> {
        self.delay_lines.as_ref().map(|lines| lines[LEFT].capacity())
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn settings(&self) -> &ChorusSettings {
        &self.settings
    }

    /// Mutable access for the individual clamping setters.
    pub fn settings_mut(&mut self) -> &mut ChorusSettings {
        &mut self.settings
    }

    pub fn set_settings(&mut self, settings: ChorusSettings) {
        self.settings = settings;
    }

    pub fn save_state(&self) -> Result<String, StateError> {
        state::save(&self.settings)
    }

    pub fn load_state(&mut self, data: &str) {
        self.settings = state::load(data);
    }

    /// Process one stereo sample pair. See the module docs for the order
    /// of operations.
    #[inline]
    pub fn process_frame(&mut self, input_l: f32, input_r: f32) -> (f32, f32) {
        let Some([line_l, line_r]) = self.delay_lines.as_mut() else {
            // Not prepared yet: no buffers to delay into.
            return (input_l, input_r);
        };

        // A copy, so the borrows below only touch the lines, LFO and
        // feedback memory.
        let settings = self.settings;

        // Steps 1-3: MODULATE. Ask the LFO where it is in its cycle (the
        // right channel looks a little further ahead by `phase_offset`),
        // scale that by depth, and turn it into a delay in samples inside
        // the current mode's window. This uses the phase *before* this
        // sample's advance, so sample 0 sits at phase 0.
        let max_delay = (line_l.capacity() - 1) as f32;
        let (delay_l, delay_r) = modulated_delays(
            &self.lfo,
            &settings,
            self.sample_rate,
            max_delay,
        );

        // Step 4: MOVE THE LFO. One sample's worth of phase at the current
        // rate. The delays for this sample were already taken above, so
        // this only affects the next one.
        self.lfo.advance(settings.rate_hz(), self.sample_rate);

        // Step 5: WRITE. Put the new input into the line together with
        // the feedback left over from the previous sample. This is what
        // turns a single echo into a decaying series of them, and for the
        // flanger it is what makes the comb-filter peaks ring.
        line_l.write(input_l + self.feedback[LEFT]);
        line_r.write(input_r + self.feedback[RIGHT]);

        // Step 6: READ. Look back `delay` samples from the slot we just
        // wrote. The delay is fractional, so the line blends the two
        // nearest samples. Because we wrote first, a delay of N samples is
        // exactly the input from N samples ago.
        let wet_l = line_l.read(delay_l);
        let wet_r = line_r.read(delay_r);

        // Step 7: FEEDBACK. Remember a scaled copy of what came out, to be
        // added to the next write. With the amount capped below 1 every
        // trip round the loop makes it quieter, so it always dies away.
        self.feedback = [wet_l * settings.feedback(), wet_r * settings.feedback()];

        // Step 8: ADVANCE. Move both write heads on together. Sharing one
        // position is what keeps the stereo offset purely a matter of the
        // LFO, not of the buffers drifting apart.
        line_l.advance();
        line_r.advance();

        // Step 9: MIX. Crossfade between the untouched input and the
        // delayed signal. The chorus sound itself comes from hearing both
        // at once: the moving delay detunes the copy slightly against the
        // original.
        let dry_wet = settings.dry_wet();
        (
            input_l * (1.0 - dry_wet) + wet_l * dry_wet,
            input_r * (1.0 - dry_wet) + wet_r * dry_wet,
        )
    }

    /// Process a block in place. Extra samples in the longer slice are
    /// left alone.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            (*l, *r) = self.process_frame(*l, *r);
        }
    }

    /// How long the effect keeps ringing after the input stops, in
    /// samples: the longest delay of the current mode, repeated until
    /// the feedback loop has decayed by 60 dB.
    ///
    /// Each pass round the loop multiplies the signal by `feedback`, so
    /// after N passes it is `feedback^N` of where it started. -60 dB is a
    /// factor of 0.001, so we want the N where
    ///
    /// ```text
    /// feedback^N = 0.001  →  N = log10(0.001) / log10(feedback) = -3 / log10(feedback)
    /// ```
    ///
    /// At 50% feedback that is about 10 passes; at 98% about 342. Each pass
    /// takes at most the mode's longest delay, so the tail is N times that.
    /// With no feedback there is a single pass: whatever is still inside
    /// the delay line.
    pub fn tail_samples(&self) -> u32 {
        let (_, longest_seconds) = self.settings.mode().delay_range();
        let longest = longest_seconds * self.sample_rate;
        let feedback = self.settings.feedback();

        if feedback > 0.001 {
            let repeats = -3.0 / feedback.log10();
            (repeats * longest) as u32
        } else {
            longest as u32
        }
    }
}

/// Current `(left, right)` delay in samples, from the LFO's phase before
/// this sample's advance.
///
/// A free function over the parts it needs, so `process_frame()` can call
/// it while holding the delay lines mutably.
fn modulated_delays(
    lfo: &Lfo,
    settings: &ChorusSettings,
    sample_rate: f32,
    max_delay: f32,
) -> (f32, f32) {
    let depth = settings.depth();
    let mode = settings.mode();

    let lfo_l = lfo.value_at(0.0) * depth;
    let lfo_r = lfo.value_at(settings.phase_offset()) * depth;

    let delay_l = mode.map_modulation(lfo_l) * sample_rate;
    let delay_r = mode.map_modulation(lfo_r) * sample_rate;

    nih_debug_assert!(delay_l <= max_delay && delay_r <= max_delay);

    (delay_l.clamp(0.0, max_delay), delay_r.clamp(0.0, max_delay))
}

/// `ceil(sample_rate × MAX_DELAY_SECONDS)` samples, never zero.
fn delay_capacity(sample_rate: f32) -> Result<NonZeroUsize, PrepareError> {
    let samples = (f64::from(sample_rate) * MAX_DELAY_SECONDS).ceil() as usize;
    NonZeroUsize::new(samples).ok_or(PrepareError::InvalidSampleRate(sample_rate))
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
