//! Renderer: owns play/stop and hands graphs to the audio side.
//!
//! The control thread compiles source into a [`SignalGraph`] and sends it to
//! the [`RenderCallback`] over a lock-free ring buffer. Graphs the callback
//! is done with come back over a second ring and are dropped here, so the
//! audio thread never frees memory in the normal path.

pub mod callback;
pub mod clock;
pub mod command;
pub mod limiter;

use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use callback::RenderCallback;
pub use clock::SampleClock;
pub use command::RenderCommand;
pub use limiter::Limiter;

use crate::audio::{AudioError, AudioSink};
use crate::config::EngineConfig;
use crate::dsl::Compiler;
use crate::error::PipelineError;
use crate::graph::SignalGraph;

/// Lifecycle of the renderer.
///
/// `Idle → Building → Playing → Idle`, or `Building → Error → Idle` when the
/// source is rejected. Every transition is logged at `debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Building,
    Playing,
    Error,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Control-side handle to the render callback.
pub struct Renderer {
    commands: HeapProd<RenderCommand>,
    retired: HeapCons<Box<SignalGraph>>,
    scope: Option<HeapCons<f32>>,
    compiler: Compiler,
    state: EngineState,
    generation: u64,
    volume: f32,
    last_error: Option<PipelineError>,
}

impl Renderer {
    /// Create a renderer and its audio-side callback for a stream of the
    /// given format. The callback must be handed to a sink to be heard.
    pub fn new(sample_rate: u32, channels: u16, config: &EngineConfig) -> (Self, RenderCallback) {
        let capacity = config.command_capacity.max(2);
        let (commands, command_cons) = HeapRb::<RenderCommand>::new(capacity).split();
        let (retired_prod, retired) = HeapRb::<Box<SignalGraph>>::new(capacity).split();
        let (scope_prod, scope) = if config.scope_capacity > 0 {
            let (p, c) = HeapRb::<f32>::new(config.scope_capacity).split();
            (Some(p), Some(c))
        } else {
            (None, None)
        };

        let volume = config.master_volume.clamp(0.0, 1.0);
        let callback = RenderCallback::new(
            command_cons,
            retired_prod,
            scope_prod,
            volume,
            Limiter::new(config.ceiling),
            channels,
        );

        let compiler = Compiler::new(sample_rate as f64)
            .with_seed(config.seed)
            .with_max_delay(config.max_delay_seconds);

        let renderer = Self {
            commands,
            retired,
            scope,
            compiler,
            state: EngineState::Idle,
            generation: 0,
            volume,
            last_error: None,
        };
        (renderer, callback)
    }

    /// Create a renderer for `sink` and open the sink with its callback.
    pub fn with_sink<S: AudioSink>(sink: &mut S, config: &EngineConfig) -> Result<Self, AudioError> {
        let (renderer, callback) = Self::new(sink.sample_rate(), sink.channels(), config);
        sink.open(callback)?;
        info!(
            sample_rate = sink.sample_rate(),
            channels = sink.channels(),
            "renderer attached to sink"
        );
        Ok(renderer)
    }

    /// Stop whatever is playing, compile `source`, and start it.
    ///
    /// On a pipeline error nothing new is started and the renderer returns
    /// to [`EngineState::Idle`].
    pub fn run(&mut self, source: &str) -> Result<(), RunError> {
        self.stop()?;

        self.transition(EngineState::Building);
        let mut graph = match self.compiler.compile(source) {
            Ok(graph) => graph,
            Err(e) => {
                warn!(stage = %e.stage, offset = e.offset, "run rejected: {}", e.message);
                self.transition(EngineState::Error);
                self.last_error = Some(e.clone());
                self.transition(EngineState::Idle);
                return Err(e.into());
            }
        };
        self.last_error = None;

        self.generation += 1;
        graph.set_generation(self.generation);
        debug!(
            generation = self.generation,
            nodes = graph.len(),
            planned = graph.plan().len(),
            "graph built"
        );

        if self
            .commands
            .try_push(RenderCommand::Play(Box::new(graph)))
            .is_err()
        {
            self.transition(EngineState::Idle);
            return Err(AudioError::QueueFull.into());
        }
        self.transition(EngineState::Playing);
        info!(generation = self.generation, "playing");
        Ok(())
    }

    /// Stop playback at the next block boundary. No-op when nothing plays.
    ///
    /// Graphs already retired by the audio side are released here. The graph
    /// being stopped is retired after the next block and released by the
    /// following `stop`, `run` or [`reclaim`](Self::reclaim).
    pub fn stop(&mut self) -> Result<(), AudioError> {
        self.reclaim();
        if self.state != EngineState::Playing {
            return Ok(());
        }
        self.commands
            .try_push(RenderCommand::Stop)
            .map_err(|_| AudioError::QueueFull)?;
        self.transition(EngineState::Idle);
        info!(generation = self.generation, "stopped");
        Ok(())
    }

    /// Set master volume, clamped to `[0, 1]`. Applies at the next block.
    pub fn set_master_volume(&mut self, volume: f32) -> Result<(), AudioError> {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.commands
            .try_push(RenderCommand::SetVolume(volume))
            .map_err(|_| AudioError::QueueFull)?;
        self.volume = volume;
        Ok(())
    }

    fn transition(&mut self, next: EngineState) {
        debug!(from = ?self.state, to = ?next, "renderer state");
        self.state = next;
    }

    /// Drop graphs the audio side has finished with. Returns how many.
    pub fn reclaim(&mut self) -> usize {
        let mut n = 0;
        while let Some(graph) = self.retired.try_pop() {
            debug!(generation = graph.generation(), "graph reclaimed");
            drop(graph);
            n += 1;
        }
        n
    }

    /// Take the scope tap: post-limiter mono samples for meters and
    /// visualizers. Available once; `None` if disabled or already taken.
    pub fn scope(&mut self) -> Option<HeapCons<f32>> {
        self.scope.take()
    }

    /// Seed used for graphs built from now on.
    pub fn set_seed(&mut self, seed: u64) {
        self.compiler = self.compiler.clone().with_seed(seed);
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Generation of the most recently started graph (0 before the first run).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn master_volume(&self) -> f32 {
        self.volume
    }

    /// The error from the last rejected run, cleared by the next successful one.
    pub fn last_error(&self) -> Option<&PipelineError> {
        self.last_error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;

    fn renderer() -> (Renderer, RenderCallback) {
        Renderer::new(1000, 1, &EngineConfig::default())
    }

    #[test]
    fn starts_idle() {
        let (r, cb) = renderer();
        assert_eq!(r.state(), EngineState::Idle);
        assert_eq!(r.generation(), 0);
        assert_eq!(cb.active_generation(), None);
    }

    #[test]
    fn run_plays() {
        let (mut r, mut cb) = renderer();
        r.run("sine(100)").unwrap();
        assert_eq!(r.state(), EngineState::Playing);
        cb.process(&mut [0.0; 8]);
        assert_eq!(cb.active_generation(), Some(1));
    }

    #[test]
    fn failed_run_returns_to_idle() {
        let (mut r, mut cb) = renderer();
        let err = r.run("sine(").unwrap_err();
        assert!(matches!(err, RunError::Pipeline(ref e) if e.stage == Stage::Parser && e.offset == 4));
        assert_eq!(r.state(), EngineState::Idle);
        assert!(r.last_error().is_some());
        cb.process(&mut [0.0; 8]);
        assert_eq!(cb.active_generation(), None);
    }

    #[test]
    fn failed_run_stops_previous_graph() {
        let (mut r, mut cb) = renderer();
        r.run("sine(100)").unwrap();
        cb.process(&mut [0.0; 8]);
        assert!(r.run("foo()").is_err());
        let mut out = [1.0f32; 8];
        cb.process(&mut out);
        assert_eq!(cb.active_generation(), None);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut r, _cb) = renderer();
        r.stop().unwrap();
        r.stop().unwrap();
        r.run("noise()").unwrap();
        r.stop().unwrap();
        r.stop().unwrap();
        assert_eq!(r.state(), EngineState::Idle);
    }

    #[test]
    fn reclaim_collects_retired_graphs() {
        let (mut r, mut cb) = renderer();
        r.run("sine(100)").unwrap();
        cb.process(&mut [0.0; 4]);
        r.stop().unwrap();
        cb.process(&mut [0.0; 4]);
        assert_eq!(r.reclaim(), 1);
        assert_eq!(r.reclaim(), 0);
    }

    #[test]
    fn stop_releases_graphs_retired_since_last_call() {
        let (mut r, mut cb) = renderer();
        r.run("delay(sine(100), 10)").unwrap();
        cb.process(&mut [0.0; 4]);
        r.stop().unwrap();
        cb.process(&mut [0.0; 4]);
        // Idle already; the call still frees the retired graph.
        r.stop().unwrap();
        assert_eq!(r.reclaim(), 0);
    }

    #[test]
    fn rejected_run_passes_through_error_state() {
        use std::io;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let (mut r, _cb) = renderer();
        tracing::subscriber::with_default(subscriber, || {
            assert!(r.run("bogus(1)").is_err());
        });

        let log = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("from=Idle to=Building"), "{log}");
        assert!(log.contains("from=Building to=Error"), "{log}");
        assert!(log.contains("from=Error to=Idle"), "{log}");
        assert_eq!(r.state(), EngineState::Idle);
    }

    #[test]
    fn volume_is_clamped_on_both_sides() {
        let (mut r, mut cb) = renderer();
        r.set_master_volume(4.0).unwrap();
        assert_eq!(r.master_volume(), 1.0);
        cb.process(&mut [0.0; 1]);
        assert_eq!(cb.volume(), 1.0);
    }

    #[test]
    fn scope_can_be_taken_once() {
        let (mut r, _cb) = renderer();
        assert!(r.scope().is_some());
        assert!(r.scope().is_none());
    }

    #[test]
    fn queue_full_is_reported() {
        let config = EngineConfig {
            command_capacity: 2,
            ..EngineConfig::default()
        };
        let (mut r, _cb) = Renderer::new(1000, 1, &config);
        r.set_master_volume(0.5).unwrap();
        r.set_master_volume(0.5).unwrap();
        assert!(matches!(r.set_master_volume(0.5), Err(AudioError::QueueFull)));
        assert!(matches!(r.run("sine(1)"), Err(RunError::Audio(AudioError::QueueFull))));
        assert_eq!(r.state(), EngineState::Idle);
    }

    #[test]
    fn seed_change_applies_to_next_build() {
        let (mut r, mut cb) = renderer();
        r.run("noise()").unwrap();
        let mut a = [0.0f32; 16];
        cb.process(&mut a);

        r.set_seed(99);
        r.run("noise()").unwrap();
        let mut b = [0.0f32; 16];
        cb.process(&mut b);
        assert_ne!(a, b);
    }
}
