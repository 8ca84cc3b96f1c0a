//! Signal graph node model.
//!
//! A [`Node`] is one DSP unit in the arena; its inputs are [`Signal`]s that
//! either hold a constant or refer to another node by [`NodeId`].

use std::fmt;

use crate::dsp::noise::NoiseColor;
use crate::dsp::oscillator::Waveform;

/// Index of a node in its graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A per-sample value: a constant or the output of another node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    Constant(f64),
    Node(NodeId),
}

impl Signal {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Signal::Node(id) => Some(id),
            Signal::Constant(_) => None,
        }
    }
}

impl From<f64> for Signal {
    fn from(v: f64) -> Self {
        Signal::Constant(v)
    }
}

impl From<NodeId> for Signal {
    fn from(id: NodeId) -> Self {
        Signal::Node(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            ArithOp::Add => '+',
            ArithOp::Sub => '-',
            ArithOp::Mul => '*',
            ArithOp::Div => '/',
        }
    }
}

/// Pure per-tick math functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Abs,
    Min,
    Max,
    Floor,
    Ceil,
    Round,
    Sqrt,
    Pow,
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Atan2,
    Lerp,
}

impl MathOp {
    pub fn arity(self) -> usize {
        match self {
            MathOp::Abs
            | MathOp::Floor
            | MathOp::Ceil
            | MathOp::Round
            | MathOp::Sqrt
            | MathOp::Exp
            | MathOp::Log
            | MathOp::Sin
            | MathOp::Cos
            | MathOp::Tan => 1,
            MathOp::Min | MathOp::Max | MathOp::Pow | MathOp::Atan2 => 2,
            MathOp::Lerp => 3,
        }
    }

    /// Apply to the first `arity()` values of `x`.
    #[inline]
    pub fn apply(self, x: &[f64; 3]) -> f64 {
        match self {
            MathOp::Abs => x[0].abs(),
            MathOp::Min => x[0].min(x[1]),
            MathOp::Max => x[0].max(x[1]),
            MathOp::Floor => x[0].floor(),
            MathOp::Ceil => x[0].ceil(),
            MathOp::Round => x[0].round(),
            MathOp::Sqrt => x[0].sqrt(),
            MathOp::Pow => x[0].powf(x[1]),
            MathOp::Exp => x[0].exp(),
            MathOp::Log => x[0].ln(),
            MathOp::Sin => x[0].sin(),
            MathOp::Cos => x[0].cos(),
            MathOp::Tan => x[0].tan(),
            MathOp::Atan2 => x[0].atan2(x[1]),
            MathOp::Lerp => x[0] + (x[1] - x[0]) * x[2],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MathOp::Abs => "abs",
            MathOp::Min => "min",
            MathOp::Max => "max",
            MathOp::Floor => "floor",
            MathOp::Ceil => "ceil",
            MathOp::Round => "round",
            MathOp::Sqrt => "sqrt",
            MathOp::Pow => "pow",
            MathOp::Exp => "exp",
            MathOp::Log => "log",
            MathOp::Sin => "sin",
            MathOp::Cos => "cos",
            MathOp::Tan => "tan",
            MathOp::Atan2 => "atan2",
            MathOp::Lerp => "lerp",
        }
    }
}

/// Effects that process an input signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    /// params: `[time]` in seconds, fixed at build time.
    Delay,
    /// params: `[amount]`.
    Reverb,
    /// params: `[cutoff]`.
    Lowpass,
    /// params: `[cutoff]`.
    Highpass,
    /// params: `[center, q]`.
    Bandpass,
    /// params: `[drive]`.
    Distortion,
    /// params: `[rate, mix]`.
    Chorus,
    /// params: `[rate, mix]`.
    Flanger,
    /// params: `[rate, mix]`.
    Phaser,
}

impl EffectKind {
    /// Number of parameters after the input signal.
    pub fn param_count(self) -> usize {
        match self {
            EffectKind::Delay
            | EffectKind::Reverb
            | EffectKind::Lowpass
            | EffectKind::Highpass
            | EffectKind::Distortion => 1,
            EffectKind::Bandpass | EffectKind::Chorus | EffectKind::Flanger | EffectKind::Phaser => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Delay => "delay",
            EffectKind::Reverb => "reverb",
            EffectKind::Lowpass => "lowpass",
            EffectKind::Highpass => "highpass",
            EffectKind::Bandpass => "bandpass",
            EffectKind::Distortion => "distortion",
            EffectKind::Chorus => "chorus",
            EffectKind::Flanger => "flanger",
            EffectKind::Phaser => "phaser",
        }
    }
}

/// One DSP unit in a signal graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Oscillator { waveform: Waveform, frequency: Signal },
    Noise { color: NoiseColor },
    /// Uniform draw in `[0, 1)` every tick.
    Random,
    /// Seconds since the graph started.
    Time,
    Ramp { from: Signal, to: Signal, duration: Signal },
    MathFn { op: MathOp, inputs: Vec<Signal> },
    Arithmetic { op: ArithOp, left: Signal, right: Signal },
    Effect { kind: EffectKind, input: Signal, params: Vec<Signal> },
    Constant { value: f64 },
}

impl Node {
    /// The number of inputs this unit's contract requires.
    pub fn expected_inputs(&self) -> usize {
        match self {
            Node::Oscillator { .. } => 1,
            Node::Noise { .. } | Node::Random | Node::Time | Node::Constant { .. } => 0,
            Node::Ramp { .. } => 3,
            Node::MathFn { op, .. } => op.arity(),
            Node::Arithmetic { .. } => 2,
            Node::Effect { kind, .. } => 1 + kind.param_count(),
        }
    }

    /// Visit this node's inputs in argument order.
    pub fn for_each_input(&self, mut f: impl FnMut(Signal)) {
        match self {
            Node::Oscillator { frequency, .. } => f(*frequency),
            Node::Noise { .. } | Node::Random | Node::Time | Node::Constant { .. } => {}
            Node::Ramp { from, to, duration } => {
                f(*from);
                f(*to);
                f(*duration);
            }
            Node::MathFn { inputs, .. } => inputs.iter().copied().for_each(f),
            Node::Arithmetic { left, right, .. } => {
                f(*left);
                f(*right);
            }
            Node::Effect { input, params, .. } => {
                f(*input);
                params.iter().copied().for_each(f);
            }
        }
    }

    /// Short display name.
    pub fn name(&self) -> &'static str {
        match self {
            Node::Oscillator { waveform, .. } => waveform.name(),
            Node::Noise { color } => color.name(),
            Node::Random => "random",
            Node::Time => "time",
            Node::Ramp { .. } => "ramp",
            Node::MathFn { op, .. } => op.name(),
            Node::Arithmetic { .. } => "arithmetic",
            Node::Effect { kind, .. } => kind.name(),
            Node::Constant { .. } => "constant",
        }
    }

    pub fn input_count(&self) -> usize {
        let mut n = 0;
        self.for_each_input(|_| n += 1);
        n
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Constant(v) => write!(f, "{v}"),
            Signal::Node(id) => write!(f, "#{}", id.0),
        }
    }
}
