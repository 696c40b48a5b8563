use crate::{AudioBlock, AudioStreamParams, EngineError, RenderEngine};

/// An object to read audio samples from.
pub trait AudioPipe {
    /// The audio stream parameters of the audio pipe.
    fn stream_params(&self) -> &'_ AudioStreamParams;

    /// Reads interleaved samples from the pipe.
    ///
    /// The amount of samples read determines how far the engine advances. For
    /// example reading 48000 frames at 48kHz plays one second of audio, and
    /// parameter changes published meanwhile are heard at the next block
    /// boundary.
    fn read_samples(&mut self, to: &mut [f32]) {
        assert!(to.len() as u32 % self.stream_params().channels.count() as u32 == 0);
        self.read_samples_unchecked(to);
    }

    /// Reads samples from the pipe without checking the channel count of the output.
    fn read_samples_unchecked(&mut self, to: &mut [f32]);
}

/// Adapts the fixed block size of a [`RenderEngine`] to reads of any length.
///
/// Rendered frames that do not fit in one read are kept for the next one.
pub struct BlockRenderer {
    engine: RenderEngine,
    block: AudioBlock,
    interleaved: Vec<f32>,
    cursor: usize,
}

impl BlockRenderer {
    /// Prepares the engine and wraps it.
    pub fn new(
        mut engine: RenderEngine,
        sample_rate: u32,
        block_size: usize,
    ) -> Result<Self, EngineError> {
        engine.prepare(sample_rate, block_size)?;
        let block = engine.new_block();
        let interleaved = vec![0.0; block.as_slice().len()];

        Ok(Self {
            engine,
            block,
            // Starts empty so the first read renders.
            cursor: interleaved.len(),
            interleaved,
        })
    }

    pub fn engine(&self) -> &RenderEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut RenderEngine {
        &mut self.engine
    }

    /// Returns the engine. Frames rendered but not read yet are discarded.
    pub fn into_engine(self) -> RenderEngine {
        self.engine
    }
}

impl AudioPipe for BlockRenderer {
    fn stream_params(&self) -> &'_ AudioStreamParams {
        self.engine.stream_params()
    }

    fn read_samples_unchecked(&mut self, to: &mut [f32]) {
        let mut written = 0;
        while written < to.len() {
            if self.cursor == self.interleaved.len() {
                self.engine.render_block(&mut self.block);
                self.block.write_interleaved(&mut self.interleaved);
                self.cursor = 0;
            }

            let count = (self.interleaved.len() - self.cursor).min(to.len() - written);
            to[written..written + count]
                .copy_from_slice(&self.interleaved[self.cursor..self.cursor + count]);
            self.cursor += count;
            written += count;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{EngineConfig, QuadrantPosition, VoiceSource};

    #[test]
    fn odd_read_sizes_see_a_continuous_stream() {
        let (engine, mut controller) = RenderEngine::new(EngineConfig::default());
        let mut renderer = BlockRenderer::new(engine, 48000, 64).unwrap();

        let ramp: Vec<f32> = (0..1000).map(|i| i as f32).collect();
        controller.load_sources([
            Some(Arc::new(VoiceSource::from_planar("ramp", 48000, vec![ramp]))),
            None,
            None,
            None,
        ]);
        controller.set_position(QuadrantPosition::new(0.0, 0.0));
        controller.play();

        let mut output = Vec::new();
        for size in [6, 130, 2, 256, 50] {
            let mut chunk = vec![0.0; size];
            renderer.read_samples(&mut chunk);
            output.extend_from_slice(&chunk);
        }

        for (frame, pair) in output.chunks(2).enumerate() {
            assert_eq!(pair[0], frame as f32);
            assert_eq!(pair[1], frame as f32);
        }
    }

    #[test]
    fn invalid_block_size_is_rejected() {
        let (engine, _controller) = RenderEngine::new(EngineConfig::default());
        assert!(matches!(
            BlockRenderer::new(engine, 48000, 0),
            Err(EngineError::InvalidBlockSize(0))
        ));
    }
}
