//! # DSP (Digital Signal Processing) Primitives
//!
//! - **`delay_line`**: A ring buffer with fractional (interpolated)
//!   reads. One per channel.
//! - **`lfo`**: The sine oscillator that sweeps the delay time.
//! - **`settings`**: The six effect parameters and the chorus/flanger
//!   delay windows.
//! - **`engine`**: Wires the above together, one sample at a time.

pub mod delay_line;
pub mod engine;
pub mod lfo;
pub mod settings;
