//! Sample clock: the tick counter a graph is evaluated against.
//!
//! Time is kept as an integer sample count so it never drifts; seconds are
//! derived on demand.

/// Position of a graph in sample ticks since it started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleClock {
    tick: u64,
    sample_rate: f64,
}

impl SampleClock {
    /// A clock at tick zero.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            tick: 0,
            sample_rate,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Current time in seconds (`tick / sample_rate`).
    #[inline]
    pub fn seconds(&self) -> f64 {
        self.tick as f64 / self.sample_rate
    }

    /// Step forward one sample.
    #[inline]
    pub fn advance(&mut self) {
        self.tick += 1;
    }
}
