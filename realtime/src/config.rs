use specter_core::GrainTuning;

/// Options for initializing a new RealtimeEngine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RealtimeConfig {
    /// The number of frames the engine renders at a time. The device
    /// callback may ask for any amount; the remainder is kept for the next
    /// callback.
    ///
    /// Default: `512`
    pub block_size: usize,

    /// Whether or not to apply a limiter to the output.
    ///
    /// Default: `true`
    pub use_limiter: bool,

    /// Grain resynthesis lengths.
    pub grain_tuning: GrainTuning,

    /// Whether voices wrap around at the end of their source.
    ///
    /// Default: `true`
    pub loop_enabled: bool,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            block_size: 512,
            use_limiter: true,
            grain_tuning: GrainTuning::default(),
            loop_enabled: true,
        }
    }
}
