//! Noise generators: white, pink and brown, each driven by a seeded RNG.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Spectral color of a noise source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseColor {
    White,
    Pink,
    Brown,
}

impl NoiseColor {
    pub fn name(self) -> &'static str {
        match self {
            NoiseColor::White => "white",
            NoiseColor::Pink => "pink",
            NoiseColor::Brown => "brown",
        }
    }
}

/// Step size of the brown-noise random walk.
const BROWN_STEP: f64 = 0.02;

/// Output scale that keeps the Kellet pink filter near unit amplitude.
const PINK_GAIN: f64 = 0.11;

/// Seeded noise source. Output is always within `[-1.0, 1.0]`.
pub struct NoiseGen {
    color: NoiseColor,
    rng: ChaCha8Rng,
    /// Paul Kellet's pink filter state.
    pink: [f64; 7],
    brown: f64,
}

impl NoiseGen {
    pub fn new(color: NoiseColor, seed: u64) -> Self {
        Self {
            color,
            rng: ChaCha8Rng::seed_from_u64(seed),
            pink: [0.0; 7],
            brown: 0.0,
        }
    }

    /// Restart the sequence from `seed`, clearing filter state.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.pink = [0.0; 7];
        self.brown = 0.0;
    }

    #[inline]
    pub fn next(&mut self) -> f64 {
        let white: f64 = self.rng.gen_range(-1.0..=1.0);
        match self.color {
            NoiseColor::White => white,
            NoiseColor::Pink => {
                let b = &mut self.pink;
                b[0] = 0.99886 * b[0] + white * 0.0555179;
                b[1] = 0.99332 * b[1] + white * 0.0750759;
                b[2] = 0.96900 * b[2] + white * 0.1538520;
                b[3] = 0.86650 * b[3] + white * 0.3104856;
                b[4] = 0.55000 * b[4] + white * 0.5329522;
                b[5] = -0.7616 * b[5] - white * 0.0168980;
                let pink = b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + white * 0.5362;
                b[6] = white * 0.115926;
                (pink * PINK_GAIN).clamp(-1.0, 1.0)
            }
            NoiseColor::Brown => {
                self.brown = (self.brown + white * BROWN_STEP).clamp(-1.0, 1.0);
                self.brown
            }
        }
    }
}

/// Per-tick uniform draw in `[0.0, 1.0)`, backing the `random()` built-in.
pub struct RandomSource {
    rng: ChaCha8Rng,
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    #[inline]
    pub fn next(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}
