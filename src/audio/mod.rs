//! Audio sinks: where rendered blocks go.
//!
//! A sink owns the [`RenderCallback`] and calls
//! [`process`](RenderCallback::process) whenever it needs another block.
//! [`CpalSink`] drives the default output device from cpal's audio thread;
//! [`OfflineSink`] is pulled synchronously for tests and file rendering.

pub mod offline;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;
use tracing::{error, info};

pub use offline::OfflineSink;

use crate::engine::RenderCallback;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoOutputDevice,
    #[error("device config error: {0}")]
    DeviceConfig(String),
    #[error("stream build error: {0}")]
    StreamBuild(String),
    #[error("stream play error: {0}")]
    StreamPlay(String),
    /// The audio side is not draining commands fast enough.
    #[error("render command queue is full")]
    QueueFull,
    #[error("sink is already open")]
    AlreadyOpen,
}

/// A consumer of rendered audio.
pub trait AudioSink {
    fn sample_rate(&self) -> u32;
    fn channels(&self) -> u16;
    /// Take ownership of `callback` and start pulling blocks from it.
    fn open(&mut self, callback: RenderCallback) -> Result<(), AudioError>;
}

/// The default cpal output device.
pub struct CpalSink {
    device: cpal::Device,
    sample_rate: u32,
    channels: u16,
    stream: Option<cpal::Stream>,
}

impl CpalSink {
    /// Use the default output device at its default configuration.
    pub fn new() -> Result<Self, AudioError> {
        let device = default_device()?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;
        Ok(Self {
            device,
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            stream: None,
        })
    }

    /// Use the default output device, overriding its format. Either override
    /// may be `None` to keep the device default.
    pub fn with_config(sample_rate: Option<u32>, channels: Option<u16>) -> Result<Self, AudioError> {
        let mut sink = Self::new()?;
        if let Some(sr) = sample_rate {
            sink.sample_rate = sr;
        }
        if let Some(ch) = channels {
            sink.channels = ch;
        }
        Ok(sink)
    }

    /// Pause the stream so no further blocks are requested before it is dropped.
    pub fn pause(&self) -> Result<(), AudioError> {
        if let Some(stream) = &self.stream {
            stream
                .pause()
                .map_err(|e| AudioError::StreamPlay(e.to_string()))?;
        }
        Ok(())
    }
}

fn default_device() -> Result<cpal::Device, AudioError> {
    cpal::default_host()
        .default_output_device()
        .ok_or(AudioError::NoOutputDevice)
}

impl AudioSink for CpalSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn open(&mut self, mut callback: RenderCallback) -> Result<(), AudioError> {
        if self.stream.is_some() {
            return Err(AudioError::AlreadyOpen);
        }

        let stream_config = cpal::StreamConfig {
            channels: self.channels,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_fn = |err: cpal::StreamError| {
            error!("audio stream error: {err}");
        };

        let stream = self
            .device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback.process(data);
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;

        info!(
            sample_rate = self.sample_rate,
            channels = self.channels,
            "output stream started"
        );
        self.stream = Some(stream);
        Ok(())
    }
}
