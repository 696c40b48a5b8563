use std::path::Path;

use crate::decoder::{AudioDecoder, AudioLoadError};

/// Decoded, immutable audio that a voice plays from.
///
/// Sources are shared between the control side and the render side through
/// an `Arc`, so they are never copied once decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSource {
    id: String,
    sample_rate: u32,
    frames: usize,
    channels: Box<[Box<[f32]>]>,
}

impl VoiceSource {
    /// Builds a source from planar channel data. Channels are truncated to the
    /// shortest one.
    pub fn from_planar(id: impl Into<String>, sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        let frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        let channels = channels
            .into_iter()
            .map(|mut channel| {
                channel.truncate(frames);
                channel.into_boxed_slice()
            })
            .collect();

        Self {
            id: id.into(),
            sample_rate,
            frames,
            channels,
        }
    }

    /// Decodes a whole file into memory.
    pub fn load(decoder: &dyn AudioDecoder, path: &Path) -> Result<Self, AudioLoadError> {
        let mut reader = decoder.open_reader(path)?;
        let mut channels = vec![Vec::new(); reader.channels()];

        if let Some(frames) = reader.frame_count() {
            for channel in channels.iter_mut() {
                channel.reserve(frames as usize);
            }
        }

        while reader.read_frames(&mut channels)? > 0 {}

        let source = Self::from_planar(path.display().to_string(), reader.sample_rate(), channels);
        if source.frames == 0 {
            return Err(AudioLoadError::EmptySource(path.to_path_buf()));
        }

        Ok(source)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Duration in seconds at the source's own sample rate.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames as f64 / self.sample_rate as f64
        }
    }

    /// The source channel that feeds an output channel. Output channels wrap
    /// around the source channels, so a mono source feeds every output.
    pub fn channel_for_output(&self, output_channel: usize) -> &[f32] {
        if self.channels.is_empty() {
            return &[];
        }
        &self.channels[output_channel % self.channels.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::FrameReader;

    struct EmptyDecoder;

    struct EmptyReader;

    impl FrameReader for EmptyReader {
        fn sample_rate(&self) -> u32 {
            48000
        }

        fn channels(&self) -> usize {
            2
        }

        fn frame_count(&self) -> Option<u64> {
            Some(0)
        }

        fn read_frames(&mut self, _out: &mut [Vec<f32>]) -> Result<usize, AudioLoadError> {
            Ok(0)
        }
    }

    impl AudioDecoder for EmptyDecoder {
        fn open_reader(&self, _path: &Path) -> Result<Box<dyn FrameReader>, AudioLoadError> {
            Ok(Box::new(EmptyReader))
        }
    }

    #[test]
    fn empty_files_are_rejected() {
        let result = VoiceSource::load(&EmptyDecoder, Path::new("silence.wav"));
        assert!(matches!(result, Err(AudioLoadError::EmptySource(_))));
    }

    #[test]
    fn mono_feeds_every_output_channel() {
        let source = VoiceSource::from_planar("mono", 44100, vec![vec![0.1, 0.2]]);
        assert_eq!(source.channel_for_output(0), source.channel_for_output(1));
        assert_eq!(source.frames(), 2);
    }

    #[test]
    fn stereo_maps_channel_by_channel() {
        let source = VoiceSource::from_planar("stereo", 44100, vec![vec![0.1; 3], vec![0.2; 4]]);
        assert_eq!(source.frames(), 3);
        assert_eq!(source.channel_for_output(1), &[0.2; 3]);
        assert_eq!(source.channel_for_output(2), &[0.1; 3]);
    }

    #[test]
    fn source_without_channels_is_empty() {
        let source = VoiceSource::from_planar("none", 44100, Vec::new());
        assert_eq!(source.frames(), 0);
        assert!(source.channel_for_output(0).is_empty());
    }
}
