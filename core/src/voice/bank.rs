use crate::{helpers::pitch_ratio, AudioBlock};

use super::{Voice, VoiceSet, VOICE_COUNT};

/// The four voices of the engine, driven together by transport and pitch
/// changes.
#[derive(Debug, Clone)]
pub struct VoiceBank {
    voices: [Voice; VOICE_COUNT],
    sample_rate: u32,
    running: bool,
}

impl VoiceBank {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            voices: Default::default(),
            sample_rate,
            running: false,
        }
    }

    pub fn voices(&self) -> &[Voice; VOICE_COUNT] {
        &self.voices
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    /// True after play or a note, until stop.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_sources(&self) -> bool {
        self.voices.iter().any(|v| v.source().is_some())
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        for voice in self.voices.iter_mut() {
            voice.update_rate_ratio(sample_rate);
        }
    }

    /// Installs a new set of sources and returns the previous one. Voices
    /// rewind, and keep playing if the bank is running.
    pub fn load_voices(&mut self, mut sources: VoiceSet) -> VoiceSet {
        for (voice, source) in self.voices.iter_mut().zip(sources.iter_mut()) {
            *source = voice.set_source(source.take(), self.sample_rate);
            if self.running {
                voice.start();
            } else {
                voice.stop();
            }
        }
        sources
    }

    /// Sets the pitch of every voice from a note number.
    pub fn set_pitch_from_note(&mut self, note: u8) {
        self.set_pitch_ratio(pitch_ratio(note));
    }

    pub fn set_pitch_ratio(&mut self, ratio: f32) {
        for voice in self.voices.iter_mut() {
            voice.set_pitch_ratio(ratio);
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        for voice in self.voices.iter_mut() {
            voice.set_looping(looping);
        }
    }

    /// Rewinds every voice and starts the ones that have a source.
    pub fn retrigger(&mut self) {
        self.running = true;
        for voice in self.voices.iter_mut() {
            voice.rewind();
            voice.start();
        }
    }

    /// Starts every voice from where it is. Voices that ran out restart from
    /// the beginning.
    pub fn play(&mut self) {
        self.running = true;
        for voice in self.voices.iter_mut() {
            let finished = voice
                .source()
                .map(|s| voice.read_position() >= s.frames() as f64)
                .unwrap_or(false);
            if finished {
                voice.rewind();
            }
            voice.start();
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
        for voice in self.voices.iter_mut() {
            voice.stop();
        }
    }

    /// Renders one voice into `out`. Returns the number of frames produced.
    pub fn advance(&mut self, index: usize, out: &mut AudioBlock) -> usize {
        match self.voices.get_mut(index) {
            Some(voice) => voice.advance(out),
            None => {
                out.clear();
                0
            }
        }
    }
}
