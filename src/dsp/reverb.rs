//! Mono Schroeder reverb: parallel damped combs into series allpasses.

use super::finite_or_zero;

const COMB_TUNING: [usize; 4] = [1116, 1188, 1277, 1356];
const ALLPASS_TUNING: [usize; 2] = [556, 441];

const COMB_FEEDBACK: f64 = 0.84;
const COMB_DAMP: f64 = 0.2;
const ALLPASS_FEEDBACK: f64 = 0.5;
/// Input attenuation before the comb bank.
const INPUT_GAIN: f64 = 0.03;
/// Makeup gain on the wet path.
const WET_GAIN: f64 = 3.0;

#[derive(Debug, Clone)]
struct Comb {
    buffer: Vec<f64>,
    index: usize,
    store: f64,
}

impl Comb {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
            store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f64) -> f64 {
        let out = self.buffer[self.index];
        self.store = out * (1.0 - COMB_DAMP) + self.store * COMB_DAMP;
        self.buffer[self.index] = input + self.store * COMB_FEEDBACK;
        self.index = (self.index + 1) % self.buffer.len();
        out
    }
}

#[derive(Debug, Clone)]
struct Allpass {
    buffer: Vec<f64>,
    index: usize,
}

impl Allpass {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f64) -> f64 {
        let delayed = self.buffer[self.index];
        let out = delayed - input;
        self.buffer[self.index] = input + delayed * ALLPASS_FEEDBACK;
        self.index = (self.index + 1) % self.buffer.len();
        out
    }
}

/// Mono reverb whose wet/dry balance is supplied per tick.
#[derive(Debug, Clone)]
pub struct Reverb {
    combs: [Comb; 4],
    allpasses: [Allpass; 2],
}

impl Reverb {
    /// Delay lengths are tuned for 44.1 kHz and scaled to `sample_rate`.
    pub fn new(sample_rate: f64) -> Self {
        let scale = sample_rate / 44100.0;
        let size = |t: usize| (t as f64 * scale) as usize;
        Self {
            combs: COMB_TUNING.map(|t| Comb::new(size(t))),
            allpasses: ALLPASS_TUNING.map(|t| Allpass::new(size(t))),
        }
    }

    /// `amount` is clamped to `[0, 1]`; 0 is fully dry.
    #[inline]
    pub fn process(&mut self, input: f64, amount: f64) -> f64 {
        let amount = if amount.is_nan() { 0.0 } else { amount.clamp(0.0, 1.0) };
        let input = finite_or_zero(input);

        let feed = input * INPUT_GAIN;
        let mut wet = 0.0;
        for comb in &mut self.combs {
            wet += comb.process(feed);
        }
        for allpass in &mut self.allpasses {
            wet = allpass.process(wet);
        }

        input * (1.0 - amount) + wet * WET_GAIN * amount
    }
}
