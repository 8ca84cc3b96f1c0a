//! Render callback: the audio-thread half of the renderer.
//!
//! Drains commands at the start of each block, pulls one sample per frame
//! from the live graph, limits it, applies master volume and writes it to
//! every channel. Nothing here allocates, locks, logs, or frees a graph.

use ringbuf::traits::{Consumer, Producer};
use ringbuf::{HeapCons, HeapProd};

use super::command::RenderCommand;
use super::limiter::Limiter;
use crate::graph::SignalGraph;

/// State owned by the audio side. Built by [`Renderer`](super::Renderer)
/// and handed to an [`AudioSink`](crate::audio::AudioSink).
pub struct RenderCallback {
    commands: HeapCons<RenderCommand>,
    retired: HeapProd<Box<SignalGraph>>,
    scope: Option<HeapProd<f32>>,
    graph: Option<Box<SignalGraph>>,
    volume: f32,
    limiter: Limiter,
    channels: u16,
}

impl RenderCallback {
    pub(crate) fn new(
        commands: HeapCons<RenderCommand>,
        retired: HeapProd<Box<SignalGraph>>,
        scope: Option<HeapProd<f32>>,
        volume: f32,
        limiter: Limiter,
        channels: u16,
    ) -> Self {
        Self {
            commands,
            retired,
            scope,
            graph: None,
            volume: volume.clamp(0.0, 1.0),
            limiter,
            channels: channels.max(1),
        }
    }

    /// Fill `output` (interleaved, `channels` samples per frame).
    pub fn process(&mut self, output: &mut [f32]) {
        self.drain_commands();

        let Some(graph) = self.graph.as_mut() else {
            output.fill(0.0);
            return;
        };

        for frame in output.chunks_mut(self.channels as usize) {
            let raw = graph.next_sample() as f32;
            let sample = self.limiter.process(raw) * self.volume;
            frame.fill(sample);
            if let Some(scope) = self.scope.as_mut() {
                let _ = scope.try_push(sample);
            }
        }
    }

    fn drain_commands(&mut self) {
        while let Some(cmd) = self.commands.try_pop() {
            match cmd {
                RenderCommand::Play(graph) => {
                    self.retire();
                    self.graph = Some(graph);
                }
                RenderCommand::Stop => self.retire(),
                RenderCommand::SetVolume(v) => {
                    self.volume = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
                }
            }
        }
    }

    /// Hand the live graph back to the control thread for dropping.
    fn retire(&mut self) {
        if let Some(graph) = self.graph.take() {
            // If the return ring is full the graph is dropped here instead.
            let _ = self.retired.try_push(graph);
        }
    }

    /// Generation of the graph currently playing, if any.
    pub fn active_generation(&self) -> Option<u64> {
        self.graph.as_ref().map(|g| g.generation())
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::compile;
    use ringbuf::{traits::Split, HeapRb};

    struct Harness {
        commands: HeapProd<RenderCommand>,
        retired: HeapCons<Box<SignalGraph>>,
        scope: HeapCons<f32>,
        callback: RenderCallback,
    }

    fn setup(channels: u16) -> Harness {
        let (commands, cmd_cons) = HeapRb::<RenderCommand>::new(8).split();
        let (ret_prod, retired) = HeapRb::<Box<SignalGraph>>::new(8).split();
        let (scope_prod, scope) = HeapRb::<f32>::new(64).split();
        let callback = RenderCallback::new(
            cmd_cons,
            ret_prod,
            Some(scope_prod),
            1.0,
            Limiter::default(),
            channels,
        );
        Harness {
            commands,
            retired,
            scope,
            callback,
        }
    }

    fn play(h: &mut Harness, src: &str, generation: u64) {
        let mut graph = compile(src, 1000.0, 0).unwrap();
        graph.set_generation(generation);
        h.commands.try_push(RenderCommand::Play(Box::new(graph))).unwrap();
    }

    #[test]
    fn silence_without_graph() {
        let mut h = setup(2);
        let mut out = vec![9.0f32; 16];
        h.callback.process(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn writes_every_channel() {
        let mut h = setup(2);
        play(&mut h, "ramp(0, 1, 1)", 1);
        let mut out = vec![0.0f32; 8];
        h.callback.process(&mut out);
        for frame in out.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert_eq!(out[0], 0.0);
        assert!((out[2] - 0.001).abs() < 1e-6);
    }

    #[test]
    fn clamps_and_applies_volume() {
        let mut h = setup(1);
        play(&mut h, "5", 1);
        h.commands.try_push(RenderCommand::SetVolume(0.5)).unwrap();
        let mut out = vec![0.0f32; 4];
        h.callback.process(&mut out);
        assert!(out.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn nan_output_is_silenced() {
        let mut h = setup(1);
        play(&mut h, "sqrt(0 - 1)", 1);
        let mut out = vec![1.0f32; 4];
        h.callback.process(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn stop_retires_graph() {
        let mut h = setup(1);
        play(&mut h, "sine(100)", 7);
        let mut out = vec![0.0f32; 4];
        h.callback.process(&mut out);
        assert_eq!(h.callback.active_generation(), Some(7));

        h.commands.try_push(RenderCommand::Stop).unwrap();
        h.callback.process(&mut out);
        assert_eq!(h.callback.active_generation(), None);
        assert!(out.iter().all(|&s| s == 0.0));
        let retired = h.retired.try_pop().unwrap();
        assert_eq!(retired.generation(), 7);
    }

    #[test]
    fn play_replaces_and_retires_previous() {
        let mut h = setup(1);
        play(&mut h, "1", 1);
        let mut out = vec![0.0f32; 4];
        h.callback.process(&mut out);

        play(&mut h, "0.25", 2);
        h.callback.process(&mut out);
        assert_eq!(h.callback.active_generation(), Some(2));
        assert!(out.iter().all(|&s| s == 0.25));
        assert_eq!(h.retired.try_pop().map(|g| g.generation()), Some(1));
    }

    #[test]
    fn commands_apply_only_at_block_start() {
        let mut h = setup(1);
        play(&mut h, "1", 1);
        let mut out = vec![0.0f32; 4];
        h.callback.process(&mut out);
        // Queued after the block; the block already written is untouched.
        h.commands.try_push(RenderCommand::Stop).unwrap();
        assert!(out.iter().all(|&s| s == 1.0));
        h.callback.process(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn scope_receives_mono_samples() {
        let mut h = setup(2);
        play(&mut h, "0.5", 1);
        let mut out = vec![0.0f32; 8];
        h.callback.process(&mut out);
        let tapped: Vec<f32> = std::iter::from_fn(|| h.scope.try_pop()).collect();
        assert_eq!(tapped, vec![0.5; 4]);
    }

    #[test]
    fn volume_is_clamped() {
        let mut h = setup(1);
        h.commands.try_push(RenderCommand::SetVolume(3.0)).unwrap();
        h.callback.process(&mut [0.0f32; 1]);
        assert_eq!(h.callback.volume(), 1.0);
        h.commands.try_push(RenderCommand::SetVolume(-1.0)).unwrap();
        h.callback.process(&mut [0.0f32; 1]);
        assert_eq!(h.callback.volume(), 0.0);
    }
}
