//! Fixed-length delay line.

use super::finite_or_zero;

/// Circular buffer that returns its input `len` ticks later.
///
/// A zero-length line passes the input straight through.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f64>,
    pos: usize,
}

impl DelayLine {
    pub fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len],
            pos: 0,
        }
    }

    /// Buffer length for `seconds` of delay at `sample_rate`.
    pub fn length_for(seconds: f64, sample_rate: f64) -> usize {
        (seconds * sample_rate).ceil().max(0.0) as usize
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Read the oldest sample, then overwrite it with `input`.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        if self.buffer.is_empty() {
            return input;
        }
        let out = self.buffer[self.pos];
        self.buffer[self.pos] = finite_or_zero(input);
        self.pos = (self.pos + 1) % self.buffer.len();
        out
    }
}
