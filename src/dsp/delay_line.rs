//! # Delay Line (Ring Buffer)
//!
//! A delay line stores audio samples and lets you read them back after a
//! specified time delay. Chorus and flanger are both built from one of
//! these per channel, read at a delay that keeps moving.
//!
//! ## How a Ring Buffer Works
//!
//! A `Vec<f32>` is the "tape" and an integer index is the write head.
//! Each sample the engine:
//!
//! 1. Writes the new sample at `write_pos`.
//! 2. Reads back from `write_pos - delay`, wrapping past the start of
//!    the buffer to the end.
//! 3. Advances `write_pos` by 1, wrapping back to 0 at the end.
//!
//! Because the write happens first, a delay of `0.0` returns the sample
//! that was just written and a delay of `1.0` returns the one before it.
//!
//! ## Linear Interpolation
//!
//! A modulated delay is almost never a whole number of samples, so the
//! read position `r` lands between two slots. With `x = floor(r)`:
//!
//! ```text
//! result = buffer[x] * (1 - frac) + buffer[x + 1] * frac
//! ```
//!
//! where `x + 1` wraps to 0 at the end of the buffer.

use std::collections::TryReserveError;
use std::num::NonZeroUsize;

/// A ring buffer that functions as an audio delay line.
///
/// The buffer is allocated once, in `prepare()`, so reading and writing
/// never touch the allocator. There is no empty line: the only way to get
/// one is [`try_new()`](Self::try_new) with a non-zero capacity, so every
/// index below is in bounds.
#[derive(Debug)]
pub struct DelayLine {
    /// The circular buffer storing audio samples. All values start at
    /// 0.0 (silence).
    buffer: Vec<f32>,

    /// Where the next incoming sample will be stored. Always in
    /// `[0, capacity)` once the line is allocated.
    write_pos: usize,
}

impl DelayLine {
    /// Allocate a zeroed delay line holding `capacity` samples.
    ///
    /// Uses fallible reservation so an out-of-memory condition is
    /// reported to `prepare()` instead of aborting the host.
    pub fn try_new(capacity: NonZeroUsize) -> Result<Self, TryReserveError> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(capacity.get())?;
        buffer.resize(capacity.get(), 0.0);

        Ok(Self {
            buffer,
            write_pos: 0,
        })
    }

    /// Number of samples the line can hold. Never zero.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Current write head position.
    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Store a sample at the write head without moving it.
    ///
    /// The engine writes both channels, reads both, then calls
    /// [`advance()`](Self::advance) on each so the two lines stay on the
    /// same index.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
    }

    /// Read a sample `delay_samples` behind the write head, linearly
    /// interpolating between the two nearest slots.
    ///
    /// `delay_samples` must lie in `[0, capacity)`. The engine guarantees
    /// this by clamping every mapped delay; out-of-range values are
    /// clamped here as well so a bad caller can't index out of bounds.
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.clamp(0.0, (len - 1) as f32);

        // r = write_pos - delay, wrapped into [0, len).
        let mut read_pos = self.write_pos as f32 - delay;
        if read_pos < 0.0 {
            read_pos += len as f32;
        }

        let floor = read_pos.floor();
        let frac = read_pos - floor;

        // `% len` also catches the rare case where `-tiny + len` rounds
        // up to exactly `len` in f32.
        let x = floor as usize % len;
        let x1 = (x + 1) % len;

        self.buffer[x] * (1.0 - frac) + self.buffer[x1] * frac
    }

    /// Move the write head forward by one slot, wrapping at the end.
    #[inline]
    pub fn advance(&mut self) {
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Zero-fill the buffer and reset the write head, keeping the
    /// allocation.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
