//! Commands sent from the control thread to the render callback.

use crate::graph::SignalGraph;

#[derive(Debug)]
pub enum RenderCommand {
    /// Replace the live graph. The previous one, if any, is retired.
    Play(Box<SignalGraph>),
    /// Retire the live graph and output silence.
    Stop,
    /// Set master volume (clamped to `0.0..=1.0` on the audio side).
    SetVolume(f32),
}
