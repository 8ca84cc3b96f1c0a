//! Per-node DSP building blocks used by the signal graph.

pub mod delay;
pub mod filter;
pub mod modulation;
pub mod noise;
pub mod oscillator;
pub mod reverb;

/// Non-finite samples are silenced before they reach filter or feedback state.
#[inline]
pub(crate) fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

pub use delay::DelayLine;
pub use filter::{Biquad, FilterMode};
pub use modulation::{distort, ModulatedDelay, Phaser};
pub use noise::{NoiseColor, NoiseGen, RandomSource};
pub use oscillator::{Oscillator, Waveform};
pub use reverb::Reverb;
