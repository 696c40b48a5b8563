use std::{io, path::Path, path::PathBuf};

use symphonia::core::errors::Error;
use thiserror::Error;

mod symphonia_decoder;
pub use symphonia_decoder::*;

#[derive(Debug, Error)]
pub enum AudioLoadError {
    #[error("IO Error")]
    IOError(#[from] io::Error),

    #[error("Unsupported audio format for {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Audio decoding failed for {0}")]
    AudioDecodingFailed(PathBuf, #[source] Error),

    #[error("Audio file {0} has an invalid channel count")]
    InvalidChannelCount(PathBuf),

    #[error("Audio file {0} has no tracks")]
    NoTracks(PathBuf),

    #[error("Audio file {0} contains no frames")]
    EmptySource(PathBuf),
}

/// A stream of decoded planar frames.
pub trait FrameReader: Send {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> usize;

    /// Total length in frames, when the container knows it.
    fn frame_count(&self) -> Option<u64>;

    /// Appends the next decoded frames to `out`, one vector per channel, and
    /// returns how many frames were appended. Returns 0 at the end of the
    /// stream.
    fn read_frames(&mut self, out: &mut [Vec<f32>]) -> Result<usize, AudioLoadError>;
}

/// Opens audio files for reading.
pub trait AudioDecoder: Send + Sync {
    fn open_reader(&self, path: &Path) -> Result<Box<dyn FrameReader>, AudioLoadError>;
}
