//! Biquad filter (RBJ Audio EQ Cookbook, Direct Form II Transposed).

use std::f64::consts::PI;

use super::finite_or_zero;

/// Lowest cutoff accepted, in Hz.
pub const MIN_CUTOFF: f64 = 10.0;
/// Highest cutoff as a fraction of the sample rate.
pub const MAX_CUTOFF_RATIO: f64 = 0.45;
pub const MIN_Q: f64 = 0.1;
pub const MAX_Q: f64 = 30.0;
/// Butterworth Q for the lowpass and highpass modes.
pub const DEFAULT_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Lowpass,
    Highpass,
    /// Constant 0 dB peak gain.
    Bandpass,
}

/// Second-order IIR filter whose cutoff and Q may change every tick.
///
/// Coefficients are only recomputed when the (clamped) parameters differ
/// from the last tick's.
#[derive(Debug, Clone)]
pub struct Biquad {
    mode: FilterMode,
    sample_rate: f64,
    cutoff: f64,
    q: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,
}

impl Biquad {
    pub fn new(mode: FilterMode, sample_rate: f64) -> Self {
        let mut f = Self {
            mode,
            sample_rate,
            cutoff: f64::NAN,
            q: f64::NAN,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        f.set_params(1000.0, DEFAULT_Q);
        f
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Clamp `cutoff` and `q` into range and update coefficients if they moved.
    pub fn set_params(&mut self, cutoff: f64, q: f64) {
        let max_cutoff = (self.sample_rate * MAX_CUTOFF_RATIO).max(MIN_CUTOFF);
        let cutoff = if cutoff.is_nan() {
            MIN_CUTOFF
        } else {
            cutoff.clamp(MIN_CUTOFF, max_cutoff)
        };
        let q = if q.is_nan() { DEFAULT_Q } else { q.clamp(MIN_Q, MAX_Q) };

        if cutoff == self.cutoff && q == self.q {
            return;
        }
        self.cutoff = cutoff;
        self.q = q;
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        let w0 = 2.0 * PI * self.cutoff / self.sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * self.q);

        let (b0, b1, b2) = match self.mode {
            FilterMode::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterMode::Highpass => {
                let b1 = -(1.0 + cos_w0);
                (-b1 / 2.0, b1, -b1 / 2.0)
            }
            FilterMode::Bandpass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let input = finite_or_zero(input);
        let out = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * out + self.z2;
        self.z2 = self.b2 * input - self.a2 * out;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::{Oscillator, Waveform};

    const SR: f64 = 44100.0;

    /// RMS of a filtered sine after the transient settles.
    fn rms_through(mode: FilterMode, cutoff: f64, q: f64, freq: f64) -> f64 {
        let mut filter = Biquad::new(mode, SR);
        filter.set_params(cutoff, q);
        let mut osc = Oscillator::new(Waveform::Sine);
        for _ in 0..4410 {
            filter.process(osc.next(freq, SR));
        }
        let n = 8820;
        let sum: f64 = (0..n)
            .map(|_| filter.process(osc.next(freq, SR)).powi(2))
            .sum();
        (sum / n as f64).sqrt()
    }

    #[test]
    fn lowpass_passes_low_blocks_high() {
        let low = rms_through(FilterMode::Lowpass, 1000.0, DEFAULT_Q, 100.0);
        let high = rms_through(FilterMode::Lowpass, 1000.0, DEFAULT_Q, 10_000.0);
        assert!(low > 0.6, "low={low}");
        assert!(high < 0.05, "high={high}");
    }

    #[test]
    fn highpass_passes_high_blocks_low() {
        let low = rms_through(FilterMode::Highpass, 1000.0, DEFAULT_Q, 50.0);
        let high = rms_through(FilterMode::Highpass, 1000.0, DEFAULT_Q, 10_000.0);
        assert!(low < 0.05, "low={low}");
        assert!(high > 0.6, "high={high}");
    }

    #[test]
    fn bandpass_peaks_at_center() {
        let center = rms_through(FilterMode::Bandpass, 1000.0, 2.0, 1000.0);
        let off = rms_through(FilterMode::Bandpass, 1000.0, 2.0, 8000.0);
        assert!((center - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.05, "center={center}");
        assert!(off < center * 0.3, "off={off}");
    }

    #[test]
    fn lowpass_dc_gain_is_unity() {
        let mut filter = Biquad::new(FilterMode::Lowpass, SR);
        filter.set_params(500.0, DEFAULT_Q);
        let mut out = 0.0;
        for _ in 0..44100 {
            out = filter.process(1.0);
        }
        assert!((out - 1.0).abs() < 1e-6);
    }

    #[test]
    fn parameters_are_clamped() {
        let mut filter = Biquad::new(FilterMode::Lowpass, SR);
        filter.set_params(1e9, 1e9);
        assert_eq!(filter.cutoff, SR * MAX_CUTOFF_RATIO);
        assert_eq!(filter.q, MAX_Q);
        filter.set_params(-5.0, 0.0);
        assert_eq!(filter.cutoff, MIN_CUTOFF);
        assert_eq!(filter.q, MIN_Q);
        filter.set_params(f64::NAN, f64::NAN);
        assert_eq!(filter.cutoff, MIN_CUTOFF);
        assert_eq!(filter.q, DEFAULT_Q);
    }

    #[test]
    fn stable_under_extreme_input() {
        let mut filter = Biquad::new(FilterMode::Bandpass, SR);
        filter.set_params(20_000.0, 30.0);
        for i in 0..44100 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            assert!(filter.process(x).is_finite());
        }
    }

    #[test]
    fn recovers_after_non_finite_input() {
        for mode in [FilterMode::Lowpass, FilterMode::Highpass, FilterMode::Bandpass] {
            let mut filter = Biquad::new(mode, SR);
            filter.set_params(800.0, DEFAULT_Q);
            filter.process(f64::NAN);
            filter.process(f64::INFINITY);
            filter.process(f64::NEG_INFINITY);
            let mut osc = Oscillator::new(Waveform::Sine);
            for _ in 0..1000 {
                let y = filter.process(osc.next(440.0, SR));
                assert!(y.is_finite(), "{mode:?} stuck at {y}");
            }
        }
    }
}
