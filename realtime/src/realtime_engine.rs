use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig, SupportedStreamConfig,
};

use specter_core::{
    effects::VolumeLimiter, AudioPipe, AudioStreamParams, BlockRenderer, ChannelCount, EngineConfig,
    EngineController, RenderEngine,
};

use crate::{RealtimeConfig, RealtimeError};

/// Size of the callback scratch buffer in blocks. Larger device buffers are
/// rendered in chunks of this size.
const CALLBACK_HEADROOM_BLOCKS: usize = 8;

/// The Specter engine playing on an audio output device.
///
/// The render engine is moved into the device callback, so rendering never
/// waits on a lock. Everything else goes through the [`EngineController`].
pub struct RealtimeEngine {
    stream: Stream,
    controller: EngineController,
    stream_params: AudioStreamParams,
}

impl RealtimeEngine {
    /// Initializes a new realtime engine using the default config and
    /// the default audio output.
    pub fn open_with_all_defaults() -> Result<Self, RealtimeError> {
        Self::open_with_default_output(Default::default())
    }

    /// Initializes a new realtime engine using a given config and
    /// the default audio output.
    pub fn open_with_default_output(config: RealtimeConfig) -> Result<Self, RealtimeError> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or(RealtimeError::NoOutputDevice)?;
        log::info!(
            "Output device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );

        let stream_config = device.default_output_config()?;

        Self::open(config, &device, stream_config)
    }

    /// Initializes a new realtime engine using a given config and audio
    /// output device.
    pub fn open(
        config: RealtimeConfig,
        device: &Device,
        stream_config: SupportedStreamConfig,
    ) -> Result<Self, RealtimeError> {
        let sample_rate = stream_config.sample_rate().0;
        let channels = ChannelCount::from_count(stream_config.channels())
            .ok_or(RealtimeError::UnsupportedChannelCount(stream_config.channels()))?;
        let stream_params = AudioStreamParams::new(sample_rate, channels);

        let (engine, controller) = RenderEngine::new(EngineConfig {
            stream_params,
            block_size: config.block_size,
            grain_tuning: config.grain_tuning,
            loop_enabled: config.loop_enabled,
        });
        let renderer = BlockRenderer::new(engine, sample_rate, config.block_size)?;

        let limiter = if config.use_limiter {
            Some(VolumeLimiter::new(channels.count()))
        } else {
            None
        };

        let scratch_len = config.block_size * channels.count() as usize * CALLBACK_HEADROOM_BLOCKS;
        let output = CallbackOutput::new(renderer, limiter, scratch_len);
        let sample_format = stream_config.sample_format();
        let stream_config: StreamConfig = stream_config.config();

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(device, &stream_config, output)?,
            SampleFormat::F64 => build_stream::<f64>(device, &stream_config, output)?,
            SampleFormat::I16 => build_stream::<i16>(device, &stream_config, output)?,
            SampleFormat::I32 => build_stream::<i32>(device, &stream_config, output)?,
            SampleFormat::U16 => build_stream::<u16>(device, &stream_config, output)?,
            other => return Err(RealtimeError::UnsupportedSampleFormat(other)),
        };

        stream.play()?;
        log::info!(
            "Output stream started: {} Hz, {} channels, {:?}",
            sample_rate,
            channels.count(),
            sample_format
        );

        Ok(Self {
            stream,
            controller,
            stream_params,
        })
    }

    /// The controller that drives the engine playing on this stream.
    pub fn controller(&mut self) -> &mut EngineController {
        &mut self.controller
    }

    /// Returns the parameters of the output audio.
    pub fn stream_params(&self) -> &AudioStreamParams {
        &self.stream_params
    }

    /// Pauses the playback of the audio output device.
    pub fn pause(&mut self) -> Result<(), RealtimeError> {
        self.stream.pause()?;
        Ok(())
    }

    /// Resumes the playback of the audio output device.
    pub fn resume(&mut self) -> Result<(), RealtimeError> {
        self.stream.play()?;
        Ok(())
    }
}

/// Fills device buffers from the renderer through a fixed scratch buffer.
///
/// Device buffers larger than the scratch are filled in scratch-sized
/// chunks, so the callback never allocates.
struct CallbackOutput {
    renderer: BlockRenderer,
    limiter: Option<VolumeLimiter>,
    scratch: Vec<f32>,
}

impl CallbackOutput {
    fn new(renderer: BlockRenderer, limiter: Option<VolumeLimiter>, scratch_len: usize) -> Self {
        let channels = renderer.stream_params().channels.count() as usize;
        // Chunks must hold whole frames.
        let scratch_len = (scratch_len / channels).max(1) * channels;
        Self {
            renderer,
            limiter,
            scratch: vec![0.0; scratch_len],
        }
    }

    fn fill<T: FromSample<f32>>(&mut self, data: &mut [T]) {
        for chunk in data.chunks_mut(self.scratch.len()) {
            let samples = &mut self.scratch[..chunk.len()];
            self.renderer.read_samples(samples);
            if let Some(limiter) = self.limiter.as_mut() {
                limiter.limit(samples);
            }
            for (out, sample) in chunk.iter_mut().zip(samples.iter()) {
                *out = T::from_sample_(*sample);
            }
        }
    }
}

fn build_stream<T>(
    device: &Device,
    stream_config: &StreamConfig,
    mut output: CallbackOutput,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let err_fn = |err| log::error!("an error occurred on the output stream: {}", err);

    device.build_output_stream(
        stream_config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| output.fill(data),
        err_fn,
        None,
    )
}
