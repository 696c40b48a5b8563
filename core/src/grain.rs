/// Time-based settings of the grain resynthesizer.
///
/// They are converted to a [`GrainPlan`] in samples whenever the engine
/// sample rate or the tuning changes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct GrainTuning {
    /// The frequency whose period sets the grain length.
    ///
    /// Default: `440.0`
    pub reference_hz: f32,

    /// The length of one zone in seconds.
    ///
    /// Default: `4.0 / 440.0`
    pub zone_duration: f32,

    /// Overlap between consecutive zones, as a fraction of the zone.
    ///
    /// Default: `0.5`
    pub overlap_ratio: f32,
}

impl Default for GrainTuning {
    fn default() -> Self {
        Self {
            reference_hz: 440.0,
            zone_duration: 4.0 / 440.0,
            overlap_ratio: 0.5,
        }
    }
}

impl GrainTuning {
    /// Returns true if the tuning would need clamping to form a valid plan
    /// at the given sample rate.
    pub fn is_degenerate(&self, sample_rate: u32) -> bool {
        let (grain, zone, overlap) = self.raw_lengths(sample_rate);
        zone < GrainPlan::MIN_ZONE_LENGTH
            || grain == 0
            || grain > zone
            || overlap == 0
            || overlap >= zone
    }

    fn raw_lengths(&self, sample_rate: u32) -> (usize, usize, usize) {
        let sample_rate = sample_rate as f32;
        let zone = to_length(self.zone_duration * sample_rate);
        let grain = if self.reference_hz.is_finite() && self.reference_hz > 0.0 {
            to_length(sample_rate / self.reference_hz)
        } else {
            zone
        };
        let overlap = to_length(self.overlap_ratio * zone as f32);
        (grain, zone, overlap)
    }
}

fn to_length(value: f32) -> usize {
    if value.is_finite() && value > 0.0 {
        value as usize
    } else {
        0
    }
}

/// Sample lengths used by [`resynthesize`].
///
/// A plan always satisfies `0 < grain_length <= zone_length` and
/// `0 < overlap_length < zone_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrainPlan {
    grain_length: usize,
    zone_length: usize,
    overlap_length: usize,
}

impl Default for GrainPlan {
    fn default() -> Self {
        Self::from_tuning(&GrainTuning::default(), 48000)
    }
}

impl GrainPlan {
    pub const MIN_ZONE_LENGTH: usize = 2;

    /// Builds a plan, clamping the lengths into a valid range. An overlap
    /// that does not fit in the zone becomes half a zone.
    pub fn new(grain_length: usize, zone_length: usize, overlap_length: usize) -> Self {
        let zone_length = zone_length.max(Self::MIN_ZONE_LENGTH);
        let grain_length = grain_length.clamp(1, zone_length);
        let overlap_length = if overlap_length >= zone_length {
            zone_length / 2
        } else {
            overlap_length
        }
        .max(1);

        Self {
            grain_length,
            zone_length,
            overlap_length,
        }
    }

    pub fn from_tuning(tuning: &GrainTuning, sample_rate: u32) -> Self {
        let (grain, zone, overlap) = tuning.raw_lengths(sample_rate);
        Self::new(grain, zone, overlap)
    }

    pub fn grain_length(&self) -> usize {
        self.grain_length
    }

    pub fn zone_length(&self) -> usize {
        self.zone_length
    }

    pub fn overlap_length(&self) -> usize {
        self.overlap_length
    }

    /// Distance between the starts of consecutive zones.
    pub fn hop(&self) -> usize {
        self.zone_length - self.overlap_length
    }

    /// Whether at least one zone fits into a block of `block_size` frames.
    /// Blocks shorter than a zone come out of resynthesis silent.
    pub fn fits_block(&self, block_size: usize) -> bool {
        self.zone_length <= block_size
    }
}

/// Rebuilds a signal from short grains of itself.
///
/// Every zone starting at `k * hop` receives the first `grain_length`
/// samples of the input at that position, padded with silence to the end of
/// the zone. The first `overlap_length` samples of each zone after the first
/// crossfade linearly from what is already written into the new grain.
/// Samples past the last whole zone stay silent.
pub fn resynthesize(input: &[f32], plan: &GrainPlan) -> Vec<f32> {
    let mut output = vec![0.0; input.len()];
    resynthesize_into(input, plan, &mut output);
    output
}

/// Same as [`resynthesize`] but writes into an existing buffer, which is
/// silenced first. Only `min(input.len(), output.len())` samples take part.
pub fn resynthesize_into(input: &[f32], plan: &GrainPlan, output: &mut [f32]) {
    output.fill(0.0);

    let len = input.len().min(output.len());
    let zone = plan.zone_length;
    let grain = plan.grain_length;
    let overlap = plan.overlap_length;
    let hop = plan.hop();

    let mut start = 0;
    while start + zone <= len {
        let source = &input[start..start + grain];
        let target = &mut output[start..start + zone];

        for (j, out) in target.iter_mut().enumerate() {
            let value = source.get(j).copied().unwrap_or(0.0);
            if start != 0 && j < overlap {
                let fade = j as f32 / overlap as f32;
                *out = fade * value + (1.0 - fade) * *out;
            } else {
                *out = value;
            }
        }

        start += hop;
    }
}
