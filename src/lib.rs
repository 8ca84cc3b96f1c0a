//! SAPF: a small audio-expression language compiled to a signal graph and
//! rendered in real time.
//!
//! ```
//! let mut graph = sapf::dsl::compile("sine(440) * 0.5", 44100.0, 42).unwrap();
//! assert_eq!(graph.next_sample(), 0.0);
//! ```

pub mod audio;
pub mod config;
pub mod dsl;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod graph;

pub use config::EngineConfig;
pub use engine::{EngineState, Renderer, RunError};
pub use error::{PipelineError, Stage};
