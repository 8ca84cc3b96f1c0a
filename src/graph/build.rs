//! Graph construction: lowering a validated expression into a
//! [`SignalGraph`] and sizing every node's runtime state.

use thiserror::Error;

use super::node::{ArithOp, EffectKind, Node, NodeId, Signal};
use super::{NodeState, SignalGraph};
use crate::dsl::ast::{BinaryOp, UnaryOp};
use crate::dsl::builtins::{ContextVar, Function};
use crate::dsl::validate::{Checked, CheckedKind, ValidatedAst};
use crate::dsp::{
    Biquad, DelayLine, FilterMode, ModulatedDelay, NoiseGen, Oscillator, Phaser, RandomSource,
    Reverb,
};
use crate::engine::clock::SampleClock;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_MAX_DELAY_SECONDS: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("sample rate must be a positive number, got {0}")]
    InvalidSampleRate(f64),

    #[error("root node #{0} does not exist")]
    MissingRoot(usize),

    #[error("node #{node} refers to missing node #{input}")]
    DanglingInput {
        node: usize,
        input: usize,
        offset: Option<usize>,
    },

    #[error("node #{node} feeds back into itself")]
    Cycle { node: usize, offset: Option<usize> },

    #[error("{name} expects {expected} inputs, got {got}")]
    Arity {
        name: &'static str,
        expected: usize,
        got: usize,
        offset: Option<usize>,
    },

    #[error("delay time must be a constant number of seconds")]
    VariableDelay { offset: Option<usize> },

    #[error("delay time {seconds}s is outside 0..={max}s")]
    DelayOutOfRange {
        seconds: f64,
        max: f64,
        offset: Option<usize>,
    },
}

impl BuildError {
    /// Source offset of the expression that produced the failing node, if known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            BuildError::InvalidSampleRate(_) | BuildError::MissingRoot(_) => None,
            BuildError::DanglingInput { offset, .. }
            | BuildError::Cycle { offset, .. }
            | BuildError::Arity { offset, .. }
            | BuildError::VariableDelay { offset }
            | BuildError::DelayOutOfRange { offset, .. } => *offset,
        }
    }
}

/// Accumulates nodes into an arena, then validates and instantiates them.
///
/// ```
/// use sapf::graph::{GraphBuilder, Node, Signal};
/// use sapf::dsp::Waveform;
///
/// let mut b = GraphBuilder::new(48_000.0).with_seed(7);
/// let osc = b.push(Node::Oscillator { waveform: Waveform::Sine, frequency: Signal::Constant(220.0) });
/// let graph = b.finish(osc).unwrap();
/// assert_eq!(graph.len(), 1);
/// ```
#[derive(Debug)]
pub struct GraphBuilder {
    sample_rate: f64,
    seed: u64,
    max_delay: f64,
    nodes: Vec<Node>,
    /// Source offset each node was lowered from; `None` for pushed nodes.
    origins: Vec<Option<usize>>,
}

impl GraphBuilder {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            seed: DEFAULT_SEED,
            max_delay: DEFAULT_MAX_DELAY_SECONDS,
            nodes: Vec::new(),
            origins: Vec::new(),
        }
    }

    /// Base seed for noise and random nodes. Node `i` is seeded with `seed + i`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Longest delay line a graph may allocate.
    pub fn with_max_delay(mut self, seconds: f64) -> Self {
        self.max_delay = seconds;
        self
    }

    /// Add a node and return its id. Inputs may refer to any node, pushed
    /// before or after; they are checked in [`finish`](Self::finish).
    pub fn push(&mut self, node: Node) -> NodeId {
        self.push_from(node, None)
    }

    fn push_from(&mut self, node: Node, origin: Option<usize>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.origins.push(origin);
        id
    }

    /// Lower `ast` and finish with its root.
    pub fn build(mut self, ast: &ValidatedAst) -> Result<SignalGraph, BuildError> {
        let root = match self.lower(&ast.root)? {
            Signal::Node(id) => id,
            Signal::Constant(value) => self.push_from(Node::Constant { value }, Some(ast.root.offset)),
        };
        self.finish(root)
    }

    fn lower(&mut self, expr: &Checked) -> Result<Signal, BuildError> {
        let origin = Some(expr.offset);
        let node = match &expr.kind {
            CheckedKind::Number(v) => return Ok(Signal::Constant(*v)),
            CheckedKind::Context(ContextVar::Time) => Node::Time,
            CheckedKind::Call { function, args, .. } => {
                let inputs = args
                    .iter()
                    .map(|a| self.lower(a))
                    .collect::<Result<Vec<_>, _>>()?;
                call_node(*function, inputs, origin)?
            }
            CheckedKind::Binary { op, left, right } => Node::Arithmetic {
                op: match op {
                    BinaryOp::Add => ArithOp::Add,
                    BinaryOp::Sub => ArithOp::Sub,
                    BinaryOp::Mul => ArithOp::Mul,
                    BinaryOp::Div => ArithOp::Div,
                },
                left: self.lower(left)?,
                right: self.lower(right)?,
            },
            CheckedKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => Node::Arithmetic {
                op: ArithOp::Sub,
                left: Signal::Constant(0.0),
                right: self.lower(operand)?,
            },
        };
        Ok(Signal::Node(self.push_from(node, origin)))
    }

    /// Check the arena and instantiate runtime state for every node.
    ///
    /// Rejects a missing root, dangling inputs, arity mismatches, cycles,
    /// and delay times that are not build-time constants within range.
    pub fn finish(self, root: NodeId) -> Result<SignalGraph, BuildError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(BuildError::InvalidSampleRate(self.sample_rate));
        }
        if root.0 >= self.nodes.len() {
            return Err(BuildError::MissingRoot(root.0));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            let got = node.input_count();
            let expected = node.expected_inputs();
            if got != expected {
                return Err(BuildError::Arity {
                    name: node.name(),
                    expected,
                    got,
                    offset: self.origins[i],
                });
            }
            let mut dangling = None;
            node.for_each_input(|s| {
                if let Some(input) = s.node() {
                    if input.0 >= self.nodes.len() && dangling.is_none() {
                        dangling = Some(input.0);
                    }
                }
            });
            if let Some(input) = dangling {
                return Err(BuildError::DanglingInput {
                    node: i,
                    input,
                    offset: self.origins[i],
                });
            }
        }

        let plan = post_order(&self.nodes, &self.origins, root)?;

        let states = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| self.state_for(i, node))
            .collect::<Result<Vec<_>, _>>()?;

        let len = self.nodes.len();
        Ok(SignalGraph {
            nodes: self.nodes,
            states,
            values: vec![0.0; len],
            plan,
            root,
            clock: SampleClock::new(self.sample_rate),
            seed: self.seed,
            generation: 0,
        })
    }

    fn state_for(&self, index: usize, node: &Node) -> Result<NodeState, BuildError> {
        let sr = self.sample_rate;
        let seed = self.seed.wrapping_add(index as u64);
        Ok(match node {
            Node::Oscillator { waveform, .. } => NodeState::Oscillator(Oscillator::new(*waveform)),
            Node::Noise { color } => NodeState::Noise(NoiseGen::new(*color, seed)),
            Node::Random => NodeState::Random(RandomSource::new(seed)),
            Node::Effect { kind, params, .. } => match kind {
                EffectKind::Delay => {
                    let origin = self.origins[index];
                    let seconds = params
                        .first()
                        .and_then(|p| fold(&self.nodes, *p, self.nodes.len()))
                        .ok_or(BuildError::VariableDelay { offset: origin })?;
                    if !seconds.is_finite() || seconds < 0.0 || seconds > self.max_delay {
                        return Err(BuildError::DelayOutOfRange {
                            seconds,
                            max: self.max_delay,
                            offset: origin,
                        });
                    }
                    NodeState::Delay(DelayLine::new(DelayLine::length_for(seconds, sr)))
                }
                EffectKind::Reverb => NodeState::Reverb(Reverb::new(sr)),
                EffectKind::Lowpass => NodeState::Filter(Biquad::new(FilterMode::Lowpass, sr)),
                EffectKind::Highpass => NodeState::Filter(Biquad::new(FilterMode::Highpass, sr)),
                EffectKind::Bandpass => NodeState::Filter(Biquad::new(FilterMode::Bandpass, sr)),
                EffectKind::Chorus => NodeState::Modulated(ModulatedDelay::chorus(sr)),
                EffectKind::Flanger => NodeState::Modulated(ModulatedDelay::flanger(sr)),
                EffectKind::Phaser => NodeState::Phaser(Phaser::new(sr)),
                EffectKind::Distortion => NodeState::Stateless,
            },
            Node::Time
            | Node::Ramp { .. }
            | Node::MathFn { .. }
            | Node::Arithmetic { .. }
            | Node::Constant { .. } => NodeState::Stateless,
        })
    }
}

/// Lower a validated AST into a graph with the default seed and delay limit.
pub fn build(ast: &ValidatedAst, sample_rate: f64) -> Result<SignalGraph, BuildError> {
    GraphBuilder::new(sample_rate).build(ast)
}

fn call_node(function: Function, inputs: Vec<Signal>, origin: Option<usize>) -> Result<Node, BuildError> {
    let expected = function.arity();
    if inputs.len() != expected {
        return Err(BuildError::Arity {
            name: function_name(function),
            expected,
            got: inputs.len(),
            offset: origin,
        });
    }

    let mut it = inputs.into_iter();
    let mut next = || it.next().unwrap_or(Signal::Constant(0.0));
    Ok(match function {
        Function::Oscillator(waveform) => Node::Oscillator {
            waveform,
            frequency: next(),
        },
        Function::Noise(color) => Node::Noise { color },
        Function::Random => Node::Random,
        Function::Ramp => Node::Ramp {
            from: next(),
            to: next(),
            duration: next(),
        },
        Function::Math(op) => Node::MathFn {
            op,
            inputs: (0..expected).map(|_| next()).collect(),
        },
        Function::Effect(kind) => Node::Effect {
            kind,
            input: next(),
            params: (1..expected).map(|_| next()).collect(),
        },
    })
}

fn function_name(function: Function) -> &'static str {
    match function {
        Function::Oscillator(w) => w.name(),
        Function::Noise(c) => c.name(),
        Function::Random => "random",
        Function::Ramp => "ramp",
        Function::Math(op) => op.name(),
        Function::Effect(kind) => kind.name(),
    }
}

/// Evaluate `signal` at build time if it depends only on constants.
/// `budget` bounds the walk so a malformed arena cannot recurse forever.
fn fold(nodes: &[Node], signal: Signal, budget: usize) -> Option<f64> {
    let id = match signal {
        Signal::Constant(v) => return Some(v),
        Signal::Node(id) => id,
    };
    let budget = budget.checked_sub(1)?;
    match nodes.get(id.0)? {
        Node::Constant { value } => Some(*value),
        Node::Arithmetic { op, left, right } => {
            Some(op.apply(fold(nodes, *left, budget)?, fold(nodes, *right, budget)?))
        }
        Node::MathFn { op, inputs } => {
            let mut x = [0.0; 3];
            for (slot, input) in x.iter_mut().zip(inputs) {
                *slot = fold(nodes, *input, budget)?;
            }
            Some(op.apply(&x))
        }
        _ => None,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Depth-first post-order from `root`: every node appears after its inputs,
/// each reachable node exactly once. Iterative so deep graphs cannot
/// overflow the stack.
fn post_order(nodes: &[Node], origins: &[Option<usize>], root: NodeId) -> Result<Vec<NodeId>, BuildError> {
    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut order = Vec::new();
    let mut stack = vec![(root, false)];
    let mut children = Vec::new();

    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            marks[id.0] = Mark::Done;
            order.push(id);
            continue;
        }
        match marks[id.0] {
            Mark::Done => continue,
            Mark::InProgress => {
                return Err(BuildError::Cycle {
                    node: id.0,
                    offset: origins[id.0],
                })
            }
            Mark::Unvisited => {}
        }
        marks[id.0] = Mark::InProgress;
        stack.push((id, true));

        children.clear();
        nodes[id.0].for_each_input(|s| children.extend(s.node()));
        // Reverse so the leftmost input is evaluated first.
        for &child in children.iter().rev() {
            match marks[child.0] {
                Mark::InProgress => {
                    return Err(BuildError::Cycle {
                        node: child.0,
                        offset: origins[child.0],
                    })
                }
                Mark::Unvisited => stack.push((child, false)),
                Mark::Done => {}
            }
        }
    }

    Ok(order)
}
