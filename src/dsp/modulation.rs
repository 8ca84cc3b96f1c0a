//! LFO-modulated effects: chorus, flanger and phaser.

use std::f64::consts::PI;

use super::finite_or_zero;

const CHORUS_BUFFER: f64 = 0.050;
const CHORUS_BASE: f64 = 0.015;
const CHORUS_DEPTH: f64 = 0.005;

const FLANGER_BUFFER: f64 = 0.010;
const FLANGER_BASE: f64 = 0.003;
const FLANGER_DEPTH: f64 = 0.002;
const FLANGER_FEEDBACK: f64 = 0.5;

const PHASER_STAGES: usize = 4;
const PHASER_MIN_HZ: f64 = 200.0;
const PHASER_MAX_HZ: f64 = 2000.0;

#[inline]
fn clamp_mix(mix: f64) -> f64 {
    if mix.is_nan() {
        0.0
    } else {
        mix.clamp(0.0, 1.0)
    }
}

/// Sine LFO in `[-1, 1]`; advances by `rate / sample_rate` each call.
#[derive(Debug, Clone, Default)]
struct Lfo {
    phase: f64,
}

impl Lfo {
    #[inline]
    fn next(&mut self, rate: f64, sample_rate: f64) -> f64 {
        let out = (2.0 * PI * self.phase).sin();
        let step = rate / sample_rate;
        if step.is_finite() {
            self.phase = (self.phase + step).rem_euclid(1.0);
            if self.phase >= 1.0 {
                self.phase = 0.0;
            }
        }
        out
    }
}

/// Delay line read at a fractional, LFO-swept tap. Backs chorus and flanger.
#[derive(Debug, Clone)]
pub struct ModulatedDelay {
    buffer: Vec<f64>,
    write_pos: usize,
    lfo: Lfo,
    sample_rate: f64,
    base: f64,
    depth: f64,
    feedback: f64,
    last_wet: f64,
}

impl ModulatedDelay {
    fn new(sample_rate: f64, buffer_secs: f64, base: f64, depth: f64, feedback: f64) -> Self {
        let len = (sample_rate * buffer_secs) as usize + 2;
        Self {
            buffer: vec![0.0; len],
            write_pos: 0,
            lfo: Lfo::default(),
            sample_rate,
            base,
            depth,
            feedback,
            last_wet: 0.0,
        }
    }

    /// 15 ms ± 5 ms tap in a 50 ms line.
    pub fn chorus(sample_rate: f64) -> Self {
        Self::new(sample_rate, CHORUS_BUFFER, CHORUS_BASE, CHORUS_DEPTH, 0.0)
    }

    /// 1 to 5 ms tap in a 10 ms line, with feedback.
    pub fn flanger(sample_rate: f64) -> Self {
        Self::new(
            sample_rate,
            FLANGER_BUFFER,
            FLANGER_BASE,
            FLANGER_DEPTH,
            FLANGER_FEEDBACK,
        )
    }

    /// Linear interpolation between the two samples around `delay` ticks ago.
    #[inline]
    fn read(&self, delay: f64) -> f64 {
        let len = self.buffer.len();
        let whole = delay as usize;
        let frac = delay - whole as f64;

        let newer = (self.write_pos + len - whole % len) % len;
        let older = (newer + len - 1) % len;
        let s0 = self.buffer[newer];
        let s1 = self.buffer[older];
        s0 + frac * (s1 - s0)
    }

    #[inline]
    pub fn process(&mut self, input: f64, rate: f64, mix: f64) -> f64 {
        let input = finite_or_zero(input);
        let len = self.buffer.len();
        self.buffer[self.write_pos] = input + self.last_wet * self.feedback;

        let lfo = self.lfo.next(rate, self.sample_rate);
        let max_delay = (len - 2) as f64;
        let delay = ((self.base + self.depth * lfo) * self.sample_rate).clamp(1.0, max_delay.max(1.0));
        let wet = self.read(delay);
        self.last_wet = wet;

        self.write_pos = (self.write_pos + 1) % len;

        let mix = clamp_mix(mix);
        input * (1.0 - mix) + wet * mix
    }
}

/// Cascade of first-order allpasses whose break frequency follows an LFO.
#[derive(Debug, Clone)]
pub struct Phaser {
    lfo: Lfo,
    sample_rate: f64,
    state: [f64; PHASER_STAGES],
}

impl Phaser {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            lfo: Lfo::default(),
            sample_rate,
            state: [0.0; PHASER_STAGES],
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64, rate: f64, mix: f64) -> f64 {
        let sweep = (self.lfo.next(rate, self.sample_rate) + 1.0) * 0.5;
        let freq = PHASER_MIN_HZ + (PHASER_MAX_HZ - PHASER_MIN_HZ) * sweep;
        let freq = freq.min(self.sample_rate * 0.45);

        let t = (PI * freq / self.sample_rate).tan();
        let a = (t - 1.0) / (t + 1.0);

        let input = finite_or_zero(input);
        let mut x = input;
        for z in &mut self.state {
            let y = a * x + *z;
            *z = x - a * y;
            x = y;
        }

        let mix = clamp_mix(mix);
        input * (1.0 - mix) + x * mix
    }
}

/// `tanh(drive * x)`; negative or NaN drive is treated as 0.
#[inline]
pub fn distort(input: f64, drive: f64) -> f64 {
    let drive = if drive.is_nan() { 0.0 } else { drive.max(0.0) };
    (drive * input).tanh()
}
