use rand::Rng;

use crate::AudioBlock;

use super::EffectUnit;

/// Settings of the reverb.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ReverbParams {
    /// Room size from 0 (small) to 1 (large).
    ///
    /// Default: `0.5`
    pub room_size: f32,

    /// High frequency damping of the tail, from 0 to 1.
    ///
    /// Default: `0.5`
    pub damping: f32,

    /// Level of the reverberated signal.
    ///
    /// Default: `0.33`
    pub wet_level: f32,

    /// Level of the original signal.
    ///
    /// Default: `0.4`
    pub dry_level: f32,

    /// Stereo width of the tail, from 0 to 1.
    ///
    /// Default: `1.0`
    pub width: f32,

    /// Holds the current tail indefinitely and ignores new input.
    ///
    /// Default: `false`
    pub freeze: bool,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.33,
            dry_level: 0.4,
            width: 1.0,
            freeze: false,
        }
    }
}

impl ReverbParams {
    /// Random settings. Freeze is never chosen.
    pub fn randomized<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            room_size: rng.gen_range(0.0..1.0),
            damping: rng.gen_range(0.0..1.0),
            wet_level: rng.gen_range(0.0..1.0),
            dry_level: rng.gen_range(0.0..1.0),
            width: rng.gen_range(0.0..1.0),
            freeze: false,
        }
    }
}

const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNINGS: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;
const TUNING_SAMPLE_RATE: f64 = 44100.0;

const FIXED_GAIN: f32 = 0.015;
const WET_SCALE: f32 = 3.0;
const DRY_SCALE: f32 = 2.0;
const ROOM_SCALE: f32 = 0.28;
const ROOM_OFFSET: f32 = 0.7;
const DAMP_SCALE: f32 = 0.4;
const ALLPASS_FEEDBACK: f32 = 0.5;

fn unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Default)]
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    last: f32,
}

impl CombFilter {
    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            index: 0,
            last: 0.0,
        }
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.last = 0.0;
    }

    #[inline(always)]
    fn process(&mut self, input: f32, damp: f32, feedback: f32) -> f32 {
        let output = self.buffer[self.index];
        self.last = output * (1.0 - damp) + self.last * damp;
        self.buffer[self.index] = input + self.last * feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }
}

#[derive(Debug, Clone, Default)]
struct AllPassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllPassFilter {
    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            index: 0,
        }
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
    }

    #[inline(always)]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.index];
        self.buffer[self.index] = input + buffered * ALLPASS_FEEDBACK;
        self.index = (self.index + 1) % self.buffer.len();
        buffered - input
    }
}

#[derive(Debug, Clone, Default)]
struct ReverbChannel {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllPassFilter>,
}

impl ReverbChannel {
    fn new(sample_rate: u32, spread: usize) -> Self {
        let scale = sample_rate as f64 / TUNING_SAMPLE_RATE;
        let scaled = |tuning: usize| ((tuning + spread) as f64 * scale) as usize;
        Self {
            combs: COMB_TUNINGS.iter().map(|t| CombFilter::new(scaled(*t))).collect(),
            allpasses: ALLPASS_TUNINGS
                .iter()
                .map(|t| AllPassFilter::new(scaled(*t)))
                .collect(),
        }
    }

    fn clear(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::clear);
        self.allpasses.iter_mut().for_each(AllPassFilter::clear);
    }

    #[inline(always)]
    fn process(&mut self, input: f32, damp: f32, feedback: f32) -> f32 {
        let mut output = 0.0;
        for comb in self.combs.iter_mut() {
            output += comb.process(input, damp, feedback);
        }
        for allpass in self.allpasses.iter_mut() {
            output = allpass.process(output);
        }
        output
    }
}

/// A Schroeder-Moorer reverb in the Freeverb layout: eight damped comb
/// filters in parallel followed by four all-pass filters, with a slightly
/// detuned set for the right channel.
///
/// Mono blocks use the left set only. In stereo blocks both channels feed a
/// shared input and the tails are mixed according to the width.
pub struct Reverb {
    params: ReverbParams,
    left: ReverbChannel,
    right: ReverbChannel,
    gain: f32,
    feedback: f32,
    damp: f32,
    wet1: f32,
    wet2: f32,
    dry: f32,
}

impl Reverb {
    pub fn new(params: ReverbParams) -> Self {
        let mut reverb = Self {
            params,
            left: ReverbChannel::default(),
            right: ReverbChannel::default(),
            gain: 0.0,
            feedback: 0.0,
            damp: 0.0,
            wet1: 0.0,
            wet2: 0.0,
            dry: 0.0,
        };
        reverb.update_parameters(&params);
        reverb
    }

    pub fn params(&self) -> &ReverbParams {
        &self.params
    }

    fn is_prepared(&self) -> bool {
        !self.left.combs.is_empty()
    }
}

impl EffectUnit for Reverb {
    type Params = ReverbParams;

    fn prepare(&mut self, sample_rate: u32, _block_size: usize, _channels: usize) {
        self.left = ReverbChannel::new(sample_rate, 0);
        self.right = ReverbChannel::new(sample_rate, STEREO_SPREAD);
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    fn update_parameters(&mut self, params: &ReverbParams) {
        self.params = *params;

        let wet = unit(params.wet_level) * WET_SCALE;
        let width = unit(params.width);
        self.dry = unit(params.dry_level) * DRY_SCALE;
        self.wet1 = 0.5 * wet * (1.0 + width);
        self.wet2 = 0.5 * wet * (1.0 - width);

        if params.freeze {
            self.gain = 0.0;
            self.feedback = 1.0;
            self.damp = 0.0;
        } else {
            self.gain = FIXED_GAIN;
            self.feedback = unit(params.room_size) * ROOM_SCALE + ROOM_OFFSET;
            self.damp = unit(params.damping) * DAMP_SCALE;
        }
    }

    fn process(&mut self, block: &mut AudioBlock) {
        if !self.is_prepared() {
            return;
        }

        let frames = block.frames();
        match block.channels() {
            0 => {}
            1 => {
                for sample in block.channel_mut(0).iter_mut() {
                    let output = self.left.process(*sample * self.gain, self.damp, self.feedback);
                    *sample = output * self.wet1 + *sample * self.dry;
                }
            }
            _ => {
                let mut channels = block.channels_iter_mut();
                let (Some(left), Some(right)) = (channels.next(), channels.next()) else {
                    return;
                };
                for n in 0..frames {
                    let input = (left[n] + right[n]) * self.gain;
                    let out_left = self.left.process(input, self.damp, self.feedback);
                    let out_right = self.right.process(input, self.damp, self.feedback);
                    left[n] = out_left * self.wet1 + out_right * self.wet2 + left[n] * self.dry;
                    right[n] = out_right * self.wet1 + out_left * self.wet2 + right[n] * self.dry;
                }
            }
        }
    }
}
