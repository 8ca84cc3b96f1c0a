//! Synchronous sink: blocks are rendered on request by the caller.

use super::{AudioError, AudioSink};
use crate::engine::RenderCallback;

/// A sink with no device behind it. Each [`request_block`](Self::request_block)
/// runs the callback once, the way a device would on its audio thread.
pub struct OfflineSink {
    sample_rate: u32,
    channels: u16,
    callback: Option<RenderCallback>,
}

impl OfflineSink {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            callback: None,
        }
    }

    /// Render `frames` frames of interleaved audio. Silence until opened.
    pub fn request_block(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * self.channels as usize];
        self.fill(&mut out);
        out
    }

    /// Render into `out` (interleaved). Silence until opened.
    pub fn fill(&mut self, out: &mut [f32]) {
        match self.callback.as_mut() {
            Some(cb) => cb.process(out),
            None => out.fill(0.0),
        }
    }

    pub fn is_open(&self) -> bool {
        self.callback.is_some()
    }

    /// The callback this sink is driving, for inspection.
    pub fn callback(&self) -> Option<&RenderCallback> {
        self.callback.as_ref()
    }
}

impl AudioSink for OfflineSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn open(&mut self, callback: RenderCallback) -> Result<(), AudioError> {
        if self.callback.is_some() {
            return Err(AudioError::AlreadyOpen);
        }
        self.callback = Some(callback);
        Ok(())
    }
}
