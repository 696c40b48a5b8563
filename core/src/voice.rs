use std::sync::Arc;

use crate::AudioBlock;

mod sampler;
pub use sampler::*;

mod source;
pub use source::*;

mod bank;
pub use bank::*;

/// The number of voices, one per corner of the mixing square.
pub const VOICE_COUNT: usize = 4;

/// One optional source per voice slot.
pub type VoiceSet = [Option<Arc<VoiceSource>>; VOICE_COUNT];

/// A playback head over a [`VoiceSource`].
///
/// The read position is fractional and advances by the pitch ratio times the
/// ratio of the source sample rate to the engine sample rate.
#[derive(Debug, Clone)]
pub struct Voice {
    source: Option<Arc<VoiceSource>>,
    read_position: f64,
    pitch_ratio: f32,
    rate_ratio: f64,
    playing: bool,
    looping: bool,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            source: None,
            read_position: 0.0,
            pitch_ratio: 1.0,
            rate_ratio: 1.0,
            playing: false,
            looping: true,
        }
    }
}

impl Voice {
    pub fn source(&self) -> Option<&Arc<VoiceSource>> {
        self.source.as_ref()
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source.as_deref().map(|s| s.id())
    }

    pub fn read_position(&self) -> f64 {
        self.read_position
    }

    pub fn pitch_ratio(&self) -> f32 {
        self.pitch_ratio
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Replaces the source and rewinds. Returns the previous source so the
    /// caller decides where it gets dropped.
    pub fn set_source(
        &mut self,
        source: Option<Arc<VoiceSource>>,
        engine_sample_rate: u32,
    ) -> Option<Arc<VoiceSource>> {
        let old = std::mem::replace(&mut self.source, source);
        self.read_position = 0.0;
        self.update_rate_ratio(engine_sample_rate);
        if self.source.is_none() {
            self.playing = false;
        }
        old
    }

    pub(crate) fn update_rate_ratio(&mut self, engine_sample_rate: u32) {
        self.rate_ratio = match &self.source {
            Some(source) if engine_sample_rate > 0 && source.sample_rate() > 0 => {
                source.sample_rate() as f64 / engine_sample_rate as f64
            }
            _ => 1.0,
        };
    }

    pub fn set_pitch_ratio(&mut self, ratio: f32) {
        if ratio.is_finite() && ratio > 0.0 {
            self.pitch_ratio = ratio;
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Starts playback from the current position. A voice without a source
    /// stays stopped.
    pub fn start(&mut self) {
        self.playing = self.source.is_some();
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn rewind(&mut self) {
        self.read_position = 0.0;
    }

    /// Renders the next frames of the voice into `out` and returns how many
    /// frames came from the source.
    ///
    /// A stopped voice renders silence and returns 0. When a non-looping voice
    /// reaches the end of its source it stops and the rest of the block is
    /// silent. A looping voice wraps around, keeping the fractional part of
    /// the position.
    pub fn advance(&mut self, out: &mut AudioBlock) -> usize {
        out.clear();

        let Some(source) = self.source.as_ref() else {
            self.playing = false;
            return 0;
        };
        if !self.playing {
            return 0;
        }

        let length = source.frames() as f64;
        if source.frames() == 0 {
            self.playing = false;
            return 0;
        }

        let step = self.pitch_ratio as f64 * self.rate_ratio;
        let mut position = self.read_position;
        let mut produced = 0;

        for frame in 0..out.frames() {
            if position >= length {
                if self.looping {
                    position %= length;
                } else {
                    self.playing = false;
                    break;
                }
            }

            for channel in 0..out.channels() {
                let sampler = LinearSampler::new(source.channel_for_output(channel), self.looping);
                out.channel_mut(channel)[frame] = sampler.get(position);
            }

            position += step;
            produced += 1;
        }

        if !self.looping && position >= length {
            self.playing = false;
        }
        self.read_position = position;

        produced
    }
}
