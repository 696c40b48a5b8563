use crate::{AudioStreamParams, GrainTuning};

/// Options for initializing a new RenderEngine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EngineConfig {
    /// Output sample rate and channel count. The sample rate is replaced by
    /// the one given to `prepare`.
    ///
    /// Default: 48kHz stereo
    pub stream_params: AudioStreamParams,

    /// The number of frames rendered per block.
    ///
    /// Default: `512`
    pub block_size: usize,

    /// Grain resynthesis lengths.
    pub grain_tuning: GrainTuning,

    /// Whether voices wrap around at the end of their source.
    ///
    /// Default: `true`
    pub loop_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream_params: AudioStreamParams::default(),
            block_size: 512,
            grain_tuning: GrainTuning::default(),
            loop_enabled: true,
        }
    }
}
