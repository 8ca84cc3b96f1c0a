//! The built-in function table.
//!
//! Plain static data: every callable name in the language, what it resolves
//! to, how many arguments it takes, and the one-line docs editor tooling
//! shows on hover and completion.

use crate::dsp::noise::NoiseColor;
use crate::dsp::oscillator::Waveform;
use crate::graph::node::{EffectKind, MathOp};

/// What a call resolves to. Closed set, looked up once during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Oscillator(Waveform),
    Noise(NoiseColor),
    Random,
    Ramp,
    Math(MathOp),
    Effect(EffectKind),
}

impl Function {
    pub fn arity(self) -> usize {
        match self {
            Function::Oscillator(_) => 1,
            Function::Noise(_) | Function::Random => 0,
            Function::Ramp => 3,
            Function::Math(op) => op.arity(),
            Function::Effect(kind) => 1 + kind.param_count(),
        }
    }
}

/// Highlighting group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Audio,
    Math,
    Effect,
    Time,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Audio => "audio",
            Category::Math => "math",
            Category::Effect => "effect",
            Category::Time => "time",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub function: Function,
    pub arity: usize,
    pub category: Category,
    pub doc: &'static str,
    pub usage: &'static str,
}

/// Identifiers usable without a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextVar {
    /// Seconds since the graph started playing.
    Time,
}

impl ContextVar {
    pub fn name(self) -> &'static str {
        match self {
            ContextVar::Time => "time",
        }
    }
}

macro_rules! builtin {
    ($name:literal, $function:expr, $arity:literal, $category:ident, $doc:literal, $usage:literal) => {
        Builtin {
            name: $name,
            function: $function,
            arity: $arity,
            category: Category::$category,
            doc: $doc,
            usage: $usage,
        }
    };
}

use EffectKind as E;
use Function as F;
use MathOp as M;

pub static BUILTINS: &[Builtin] = &[
    // Oscillators
    builtin!("sine", F::Oscillator(Waveform::Sine), 1, Audio, "Generate a sine wave at the specified frequency", "sine(frequency)"),
    builtin!("sin", F::Oscillator(Waveform::Sine), 1, Audio, "Alias for sine", "sin(frequency)"),
    builtin!("sawtooth", F::Oscillator(Waveform::Saw), 1, Audio, "Generate a sawtooth wave at the specified frequency", "sawtooth(frequency)"),
    builtin!("saw", F::Oscillator(Waveform::Saw), 1, Audio, "Alias for sawtooth", "saw(frequency)"),
    builtin!("square", F::Oscillator(Waveform::Square), 1, Audio, "Generate a square wave at the specified frequency", "square(frequency)"),
    builtin!("triangle", F::Oscillator(Waveform::Triangle), 1, Audio, "Generate a triangle wave at the specified frequency", "triangle(frequency)"),
    builtin!("tri", F::Oscillator(Waveform::Triangle), 1, Audio, "Alias for triangle", "tri(frequency)"),
    // Noise
    builtin!("noise", F::Noise(NoiseColor::White), 0, Audio, "Generate white noise", "noise()"),
    builtin!("white", F::Noise(NoiseColor::White), 0, Audio, "Alias for noise", "white()"),
    builtin!("pink", F::Noise(NoiseColor::Pink), 0, Audio, "Generate pink noise (equal energy per octave)", "pink()"),
    builtin!("brown", F::Noise(NoiseColor::Brown), 0, Audio, "Generate brown noise (bounded random walk)", "brown()"),
    // Time
    builtin!("ramp", F::Ramp, 3, Time, "Create a linear ramp from start to end over duration", "ramp(start, end, duration)"),
    // Math
    builtin!("random", F::Random, 0, Math, "Uniform random value in [0, 1), drawn every sample", "random()"),
    builtin!("abs", F::Math(M::Abs), 1, Math, "Absolute value", "abs(x)"),
    builtin!("min", F::Math(M::Min), 2, Math, "Smaller of two values", "min(a, b)"),
    builtin!("max", F::Math(M::Max), 2, Math, "Larger of two values", "max(a, b)"),
    builtin!("floor", F::Math(M::Floor), 1, Math, "Round down", "floor(x)"),
    builtin!("ceil", F::Math(M::Ceil), 1, Math, "Round up", "ceil(x)"),
    builtin!("round", F::Math(M::Round), 1, Math, "Round to nearest, halves away from zero", "round(x)"),
    builtin!("sqrt", F::Math(M::Sqrt), 1, Math, "Square root", "sqrt(x)"),
    builtin!("pow", F::Math(M::Pow), 2, Math, "Raise base to exponent", "pow(base, exponent)"),
    builtin!("exp", F::Math(M::Exp), 1, Math, "e raised to x", "exp(x)"),
    builtin!("log", F::Math(M::Log), 1, Math, "Natural logarithm", "log(x)"),
    builtin!("cos", F::Math(M::Cos), 1, Math, "Cosine of x radians", "cos(x)"),
    builtin!("tan", F::Math(M::Tan), 1, Math, "Tangent of x radians", "tan(x)"),
    builtin!("atan2", F::Math(M::Atan2), 2, Math, "Angle of the point (x, y) in radians", "atan2(y, x)"),
    builtin!("lerp", F::Math(M::Lerp), 3, Math, "Linear interpolation between a and b by factor t", "lerp(a, b, t)"),
    // Effects
    builtin!("delay", F::Effect(E::Delay), 2, Effect, "Add delay effect with specified time", "delay(signal, time)"),
    builtin!("reverb", F::Effect(E::Reverb), 2, Effect, "Add reverb effect with specified amount", "reverb(signal, amount)"),
    builtin!("filter", F::Effect(E::Lowpass), 2, Effect, "Alias for lowpass", "filter(signal, cutoff)"),
    builtin!("lowpass", F::Effect(E::Lowpass), 2, Effect, "Attenuate content above the cutoff frequency", "lowpass(signal, cutoff)"),
    builtin!("highpass", F::Effect(E::Highpass), 2, Effect, "Attenuate content below the cutoff frequency", "highpass(signal, cutoff)"),
    builtin!("bandpass", F::Effect(E::Bandpass), 3, Effect, "Keep a band around the center frequency", "bandpass(signal, center, q)"),
    builtin!("distortion", F::Effect(E::Distortion), 2, Effect, "Soft-clip the signal with tanh", "distortion(signal, drive)"),
    builtin!("chorus", F::Effect(E::Chorus), 3, Effect, "Thicken the signal with a modulated delay", "chorus(signal, rate, mix)"),
    builtin!("flanger", F::Effect(E::Flanger), 3, Effect, "Short swept delay with feedback", "flanger(signal, rate, mix)"),
    builtin!("phaser", F::Effect(E::Phaser), 3, Effect, "Sweep notches through the spectrum", "phaser(signal, rate, mix)"),
];

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

pub fn lookup_context(name: &str) -> Option<ContextVar> {
    match name {
        "time" => Some(ContextVar::Time),
        _ => None,
    }
}
