use thiserror::Error;

use specter_core::EngineError;

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("No output device available")]
    NoOutputDevice,

    #[error("Failed to query the default output config")]
    DefaultStreamConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Unsupported sample format {0:?}")]
    UnsupportedSampleFormat(cpal::SampleFormat),

    #[error("Unsupported output channel count {0}")]
    UnsupportedChannelCount(u16),

    #[error("Failed to build the output stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start the output stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Failed to pause the output stream")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
