//! Signal graph: an arena of DSP nodes evaluated once per sample tick.
//!
//! Nodes live in a `Vec` and refer to each other by [`NodeId`]. The builder
//! precomputes a post-order plan from the root, so evaluating a tick is a
//! single forward pass that writes each node's output into its value slot.
//! Shared sub-graphs are therefore computed once per tick, and the pass never
//! allocates.

pub mod build;
pub mod node;

use std::fmt;

pub use build::{build, BuildError, GraphBuilder};
pub use node::{ArithOp, EffectKind, MathOp, Node, NodeId, Signal};

use crate::dsp::filter::DEFAULT_Q;
use crate::dsp::{
    distort, Biquad, DelayLine, ModulatedDelay, NoiseGen, Oscillator, Phaser, RandomSource, Reverb,
};
use crate::engine::clock::SampleClock;

/// Runtime state owned by a single node.
pub(crate) enum NodeState {
    Stateless,
    Oscillator(Oscillator),
    Noise(NoiseGen),
    Random(RandomSource),
    Delay(DelayLine),
    Reverb(Reverb),
    Filter(Biquad),
    Modulated(ModulatedDelay),
    Phaser(Phaser),
}

/// A compiled expression, ready to render.
pub struct SignalGraph {
    nodes: Vec<Node>,
    states: Vec<NodeState>,
    values: Vec<f64>,
    plan: Vec<NodeId>,
    root: NodeId,
    clock: SampleClock,
    seed: u64,
    generation: u64,
}

impl SignalGraph {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &Node {
        &self.nodes[self.root.0]
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Evaluation order: every node after its inputs, root last.
    pub fn plan(&self) -> &[NodeId] {
        &self.plan
    }

    pub fn sample_rate(&self) -> f64 {
        self.clock.sample_rate()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Where the next call to [`next_sample`](Self::next_sample) will evaluate.
    pub fn clock(&self) -> SampleClock {
        self.clock
    }

    /// Sequence number assigned by the renderer that played this graph.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    /// Restart every noise and random node from `seed` (node `i` gets `seed + i`).
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        for (i, state) in self.states.iter_mut().enumerate() {
            let s = seed.wrapping_add(i as u64);
            match state {
                NodeState::Noise(gen) => gen.reseed(s),
                NodeState::Random(gen) => gen.reseed(s),
                _ => {}
            }
        }
    }

    /// Evaluate the graph at the internal clock, then advance it by one tick.
    #[inline]
    pub fn next_sample(&mut self) -> f64 {
        let clock = self.clock;
        let out = self.evaluate(&clock);
        self.clock.advance();
        out
    }

    /// Evaluate one tick at `clock` and return the root's value.
    ///
    /// Stateful nodes advance exactly once per call, so callers must pass
    /// monotonically increasing ticks.
    pub fn evaluate(&mut self, clock: &SampleClock) -> f64 {
        let t = clock.seconds();
        let sr = clock.sample_rate();
        let root = self.root.0;
        let Self {
            nodes,
            states,
            values,
            plan,
            ..
        } = self;

        for &id in plan.iter() {
            let i = id.0;
            let v = eval_node(&nodes[i], &mut states[i], values, t, sr);
            values[i] = v;
        }
        values[root]
    }

    /// Render `frames` ticks into a new buffer. Allocates; not for the audio thread.
    pub fn render(&mut self, frames: usize) -> Vec<f64> {
        (0..frames).map(|_| self.next_sample()).collect()
    }
}

#[inline]
fn read(values: &[f64], signal: Signal) -> f64 {
    match signal {
        Signal::Constant(v) => v,
        Signal::Node(id) => values[id.0],
    }
}

#[inline]
fn eval_node(node: &Node, state: &mut NodeState, values: &[f64], t: f64, sr: f64) -> f64 {
    match (node, state) {
        (Node::Constant { value }, _) => *value,
        (Node::Time, _) => t,
        (Node::Oscillator { frequency, .. }, NodeState::Oscillator(osc)) => {
            osc.next(read(values, *frequency), sr)
        }
        (Node::Noise { .. }, NodeState::Noise(gen)) => gen.next(),
        (Node::Random, NodeState::Random(gen)) => gen.next(),
        (Node::Ramp { from, to, duration }, _) => {
            let (from, to, duration) = (read(values, *from), read(values, *to), read(values, *duration));
            if duration <= 0.0 || t >= duration {
                to
            } else {
                from + (to - from) * t / duration
            }
        }
        (Node::MathFn { op, inputs }, _) => {
            let mut x = [0.0; 3];
            for (slot, input) in x.iter_mut().zip(inputs) {
                *slot = read(values, *input);
            }
            op.apply(&x)
        }
        (Node::Arithmetic { op, left, right }, _) => op.apply(read(values, *left), read(values, *right)),
        (Node::Effect { kind, input, params }, state) => {
            let x = read(values, *input);
            let p = |i: usize| params.get(i).map_or(0.0, |s| read(values, *s));
            match (kind, state) {
                (EffectKind::Delay, NodeState::Delay(line)) => line.process(x),
                (EffectKind::Reverb, NodeState::Reverb(reverb)) => reverb.process(x, p(0)),
                (EffectKind::Lowpass | EffectKind::Highpass, NodeState::Filter(filter)) => {
                    filter.set_params(p(0), DEFAULT_Q);
                    filter.process(x)
                }
                (EffectKind::Bandpass, NodeState::Filter(filter)) => {
                    filter.set_params(p(0), p(1));
                    filter.process(x)
                }
                (EffectKind::Distortion, _) => distort(x, p(0)),
                (EffectKind::Chorus | EffectKind::Flanger, NodeState::Modulated(line)) => {
                    line.process(x, p(0), p(1))
                }
                (EffectKind::Phaser, NodeState::Phaser(phaser)) => phaser.process(x, p(0), p(1)),
                _ => 0.0,
            }
        }
        // State is built alongside the node; a mismatch cannot occur.
        _ => 0.0,
    }
}

/// Human-readable frequency: `440.0Hz`, `1.5kHz`.
pub fn format_frequency(hz: f64) -> String {
    if hz.abs() >= 1000.0 {
        format!("{:.1}kHz", hz / 1000.0)
    } else {
        format!("{hz:.1}Hz")
    }
}

impl SignalGraph {
    fn fmt_signal(&self, f: &mut fmt::Formatter<'_>, signal: Signal, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        match signal {
            Signal::Constant(v) => writeln!(f, "{pad}{v}"),
            Signal::Node(id) => {
                let node = &self.nodes[id.0];
                match node {
                    Node::Oscillator {
                        waveform,
                        frequency: Signal::Constant(hz),
                    } => writeln!(f, "{pad}#{} {} {}", id.0, waveform.name(), format_frequency(*hz)),
                    Node::Constant { value } => writeln!(f, "{pad}#{} {value}", id.0),
                    Node::Arithmetic { op, left, right } => {
                        writeln!(f, "{pad}#{} {}", id.0, op.symbol())?;
                        self.fmt_signal(f, *left, depth + 1)?;
                        self.fmt_signal(f, *right, depth + 1)
                    }
                    _ => {
                        writeln!(f, "{pad}#{} {}", id.0, node.name())?;
                        let mut result = Ok(());
                        node.for_each_input(|s| {
                            if result.is_ok() {
                                result = self.fmt_signal(f, s, depth + 1);
                            }
                        });
                        result
                    }
                }
            }
        }
    }
}

impl fmt::Display for SignalGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_signal(f, Signal::Node(self.root), 0)
    }
}

impl fmt::Debug for SignalGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalGraph")
            .field("nodes", &self.nodes)
            .field("root", &self.root)
            .field("tick", &self.clock.tick())
            .field("generation", &self.generation)
            .finish()
    }
}
