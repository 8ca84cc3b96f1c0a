//! Output guard: hard clamp to `[-ceiling, ceiling]`, NaN to silence.

pub const DEFAULT_CEILING: f32 = 1.0;

/// Hard limiter applied to every rendered sample before master volume.
#[derive(Debug, Clone)]
pub struct Limiter {
    ceiling: f32,
}

impl Limiter {
    /// `ceiling` is forced into `(0.0, 1.0]`; anything else falls back to 1.0.
    pub fn new(ceiling: f32) -> Self {
        let ceiling = if ceiling > 0.0 && ceiling <= 1.0 {
            ceiling
        } else {
            DEFAULT_CEILING
        };
        Self { ceiling }
    }

    /// NaN becomes 0; infinities and overs clamp to the ceiling.
    #[inline]
    pub fn process(&self, sample: f32) -> f32 {
        if sample.is_nan() {
            0.0
        } else {
            sample.clamp(-self.ceiling, self.ceiling)
        }
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_CEILING,
        }
    }
}
