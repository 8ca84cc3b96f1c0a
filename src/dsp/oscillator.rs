//! Oscillator primitives: waveform shapes and a phase accumulator.

use std::f64::consts::PI;

/// Available waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Saw,
    Square,
    Triangle,
}

impl Waveform {
    /// Sample the waveform at `phase` in `[0.0, 1.0)`. Returns a value in `[-1.0, 1.0]`.
    pub fn sample(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (phase * 2.0 * PI).sin(),
            Waveform::Saw => 2.0 * phase - 1.0,
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Saw => "saw",
            Waveform::Square => "square",
            Waveform::Triangle => "triangle",
        }
    }
}

/// A running oscillator. Frequency is supplied per tick so it can be modulated.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    /// Emit the sample for the current phase, then advance by `frequency / sample_rate`.
    #[inline]
    pub fn next(&mut self, frequency: f64, sample_rate: f64) -> f64 {
        let out = self.waveform.sample(self.phase);

        let step = frequency / sample_rate;
        if step.is_finite() {
            self.phase = (self.phase + step).rem_euclid(1.0);
            // rem_euclid can round up to exactly 1.0 for tiny negative inputs.
            if self.phase >= 1.0 {
                self.phase = 0.0;
            }
        }

        out
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }
}
