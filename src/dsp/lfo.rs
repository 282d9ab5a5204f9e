//! # Low-Frequency Oscillator
//!
//! A phase accumulator driving a sine wave, used to sweep the delay time.
//!
//! The phase is a number in `[0, 1)` measuring how far through one cycle
//! we are. Each sample it grows by `rate_hz / sample_rate`, so at 1 Hz
//! and 48 kHz it takes exactly 48000 samples to go round once.
//!
//! Both stereo channels read the *same* phase; the right channel simply
//! looks at it shifted by the phase-offset parameter. That keeps the two
//! channels locked together at a fixed angle no matter how the rate
//! changes.
//!
//! The accumulator is `f64`. Summing 48000 increments of `1/48000` in
//! `f32` drifts by around a thousandth of a cycle per second, which
//! shows up as the stereo image slowly wandering.

use std::f64::consts::TAU;

#[derive(Debug, Default, Clone)]
pub struct Lfo {
    /// Position within the current cycle, in `[0, 1)`.
    phase: f64,
}

impl Lfo {
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Step the phase forward by one sample at `rate_hz`.
    #[inline]
    pub fn advance(&mut self, rate_hz: f32, sample_rate: f32) {
        self.phase += f64::from(rate_hz) / f64::from(sample_rate);

        // A single subtraction is enough for any rate below the sample
        // rate; rem_euclid also covers the degenerate case.
        if self.phase >= 1.0 {
            self.phase = self.phase.rem_euclid(1.0);
        }
    }

    /// Sine of the current phase shifted by `phase_offset` cycles, in
    /// `[-1, 1]`. Does not move the phase.
    #[inline]
    pub fn value_at(&self, phase_offset: f32) -> f32 {
        (TAU * (self.phase + f64::from(phase_offset))).sin() as f32
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}
