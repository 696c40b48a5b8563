use std::{fs::File, path::Path, path::PathBuf};

use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::{audio::AudioBuffer, conv::IntoSample, probe::Hint, sample::Sample};
use symphonia::core::{audio::AudioBufferRef, meta::MetadataOptions};
use symphonia::core::{audio::Signal, errors::Error, io::MediaSourceStream};

use super::{AudioDecoder, AudioLoadError, FrameReader};

/// Decodes every format enabled in the `symphonia` dependency (WAV, AIFF,
/// FLAC, Ogg Vorbis and more).
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

fn map_error(path: &Path, error: Error) -> AudioLoadError {
    match error {
        Error::IoError(error) => AudioLoadError::IOError(error),
        Error::Unsupported(_) => AudioLoadError::UnsupportedFormat(path.to_path_buf()),
        error => AudioLoadError::AudioDecodingFailed(path.to_path_buf(), error),
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn open_reader(&self, path: &Path) -> Result<Box<dyn FrameReader>, AudioLoadError> {
        let extension = path.extension().and_then(|ext| ext.to_str());

        let file = Box::new(File::open(path)?);
        let mss = MediaSourceStream::new(file, Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = extension {
            hint.with_extension(extension);
        }

        let format_opts: FormatOptions = Default::default();
        let metadata_opts: MetadataOptions = Default::default();
        let decoder_opts: DecoderOptions = Default::default();

        // Running out of data before any known header counts as unsupported.
        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &metadata_opts)
            .map_err(|e| match e {
                Error::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    AudioLoadError::UnsupportedFormat(path.to_path_buf())
                }
                e => map_error(path, e),
            })?;

        let format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| AudioLoadError::NoTracks(path.to_path_buf()))?;

        let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
        if channels == 0 {
            return Err(AudioLoadError::InvalidChannelCount(path.to_path_buf()));
        }
        let frame_count = track.codec_params.n_frames;
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &decoder_opts)
            .map_err(|e| map_error(path, e))?;

        log::debug!(
            "opened {} ({} Hz, {} channels)",
            path.display(),
            sample_rate,
            channels
        );

        Ok(Box::new(SymphoniaFrameReader {
            path: path.to_path_buf(),
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
            frame_count,
        }))
    }
}

struct SymphoniaFrameReader {
    path: PathBuf,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    frame_count: Option<u64>,
}

impl FrameReader for SymphoniaFrameReader {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }

    fn read_frames(&mut self, out: &mut [Vec<f32>]) -> Result<usize, AudioLoadError> {
        loop {
            let packet = match self.format.next_packet() {
                Err(Error::IoError(error)) if error.kind() == std::io::ErrorKind::UnexpectedEof => {
                    // Audio source ended. Symphonia has no cleaner way of signalling this.
                    return Ok(0);
                }
                Err(error) => {
                    return Err(AudioLoadError::AudioDecodingFailed(self.path.clone(), error))
                }
                Ok(packet) => packet,
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            // Decode errors only lose the current packet.
            match self.decoder.decode(&packet) {
                Ok(buffer) => {
                    let frames = push_buffer_ref(buffer, out);
                    if frames > 0 {
                        return Ok(frames);
                    }
                }
                Err(Error::DecodeError(_)) => (),
                Err(error) => {
                    return Err(AudioLoadError::AudioDecodingFailed(self.path.clone(), error))
                }
            }
        }
    }
}

fn push_buffer_ref(buffer: AudioBufferRef, out: &mut [Vec<f32>]) -> usize {
    match buffer {
        AudioBufferRef::U8(buf) => push_buffer(&buf, out),
        AudioBufferRef::U16(buf) => push_buffer(&buf, out),
        AudioBufferRef::U24(buf) => push_buffer(&buf, out),
        AudioBufferRef::U32(buf) => push_buffer(&buf, out),
        AudioBufferRef::S8(buf) => push_buffer(&buf, out),
        AudioBufferRef::S16(buf) => push_buffer(&buf, out),
        AudioBufferRef::S24(buf) => push_buffer(&buf, out),
        AudioBufferRef::S32(buf) => push_buffer(&buf, out),
        AudioBufferRef::F32(buf) => push_buffer(&buf, out),
        AudioBufferRef::F64(buf) => push_buffer(&buf, out),
    }
}

fn push_buffer(buffer: &AudioBuffer<impl Sample + IntoSample<f32>>, out: &mut [Vec<f32>]) -> usize {
    let channels = buffer.spec().channels.count().min(out.len());

    for (c, vec) in out.iter_mut().enumerate().take(channels) {
        let channel = buffer.chan(c);
        vec.reserve(channel.len());
        for &sample in channel.iter() {
            vec.push(sample.into_sample());
        }
    }

    buffer.frames()
}
