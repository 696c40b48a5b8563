use biquad::*;
use rand::Rng;

use crate::AudioBlock;

use super::EffectUnit;

/// Settings of the resonant low-pass filter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FilterParams {
    /// Cutoff frequency in Hz. Clamped below the Nyquist frequency.
    ///
    /// Default: `2000.0`
    pub cutoff_hz: f32,

    /// Resonance from 0 (Butterworth response) to 1 (strong peak).
    ///
    /// Default: `0.0`
    pub resonance: f32,

    /// Input gain. Values above 1 saturate the input.
    ///
    /// Default: `1.0`
    pub drive: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            cutoff_hz: 2000.0,
            resonance: 0.0,
            drive: 1.0,
        }
    }
}

impl FilterParams {
    /// Random settings in a musically useful range.
    pub fn randomized<R: Rng + ?Sized>(rng: &mut R) -> Self {
        // Exponential distribution over 200 Hz..8 kHz.
        let octaves: f32 = rng.gen_range(0.0..(8000.0f32 / 200.0).log2());
        Self {
            cutoff_hz: 200.0 * 2.0f32.powf(octaves),
            resonance: rng.gen_range(0.0..0.7),
            drive: rng.gen_range(1.0..2.0),
        }
    }

    fn quality(&self) -> f32 {
        let resonance = if self.resonance.is_finite() {
            self.resonance.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Q_BUTTERWORTH_F32 + resonance * 9.0
    }
}

#[derive(Clone)]
struct BiQuadFilter {
    filter: DirectForm1<f32>,
}

impl BiQuadFilter {
    fn new(coeffs: Coefficients<f32>) -> Self {
        Self {
            filter: DirectForm1::<f32>::new(coeffs),
        }
    }

    #[inline(always)]
    fn process(&mut self, input: f32) -> f32 {
        self.filter.run(input)
    }
}

/// A resonant low-pass biquad with one filter per channel.
pub struct LowPassFilter {
    params: FilterParams,
    sample_rate: f32,
    coeffs: Option<Coefficients<f32>>,
    channels: Vec<BiQuadFilter>,
}

impl LowPassFilter {
    pub fn new(params: FilterParams) -> Self {
        Self {
            params,
            sample_rate: 0.0,
            coeffs: None,
            channels: Vec::new(),
        }
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    fn make_coeffs(&self) -> Option<Coefficients<f32>> {
        if self.sample_rate <= 0.0 {
            return None;
        }
        let nyquist = self.sample_rate / 2.0;
        let cutoff = if self.params.cutoff_hz.is_finite() {
            self.params.cutoff_hz.clamp(10.0, nyquist * 0.95)
        } else {
            nyquist * 0.95
        };

        Coefficients::<f32>::from_params(
            Type::LowPass,
            self.sample_rate.hz(),
            cutoff.hz(),
            self.params.quality(),
        )
        .ok()
    }
}

impl EffectUnit for LowPassFilter {
    type Params = FilterParams;

    fn prepare(&mut self, sample_rate: u32, _block_size: usize, channels: usize) {
        self.sample_rate = sample_rate as f32;
        self.coeffs = self.make_coeffs();
        self.channels = match self.coeffs {
            Some(coeffs) => (0..channels).map(|_| BiQuadFilter::new(coeffs)).collect(),
            None => Vec::new(),
        };
    }

    fn reset(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.filter.reset_state();
        }
    }

    fn update_parameters(&mut self, params: &FilterParams) {
        self.params = *params;
        // Invalid settings keep the previous coefficients.
        if let Some(coeffs) = self.make_coeffs() {
            self.coeffs = Some(coeffs);
            for channel in self.channels.iter_mut() {
                channel.filter.update_coefficients(coeffs);
            }
        }
    }

    fn process(&mut self, block: &mut AudioBlock) {
        let drive = self.params.drive;
        let saturate = drive.is_finite() && drive > 1.0;

        for (filter, samples) in self.channels.iter_mut().zip(block.channels_iter_mut()) {
            for sample in samples.iter_mut() {
                let input = if saturate { (*sample * drive).tanh() } else { *sample };
                *sample = filter.process(input);
            }
        }
    }
}
