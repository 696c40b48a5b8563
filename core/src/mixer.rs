use crate::{helpers::sum_weighted, AudioBlock, VOICE_COUNT};

/// A point on the unit square that places the listener between the four
/// sources. `(0, 0)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct QuadrantPosition {
    x: f32,
    y: f32,
}

impl Default for QuadrantPosition {
    fn default() -> Self {
        Self::CENTER
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl QuadrantPosition {
    pub const CENTER: QuadrantPosition = QuadrantPosition { x: 0.5, y: 0.5 };

    /// Creates a position, clamping both coordinates to `[0, 1]`.
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }
}

/// Per-voice gains, in the order top-left, top-right, bottom-left,
/// bottom-right.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MixWeights([f32; VOICE_COUNT]);

impl Default for MixWeights {
    fn default() -> Self {
        compute_weights(QuadrantPosition::CENTER)
    }
}

impl MixWeights {
    /// Weights that only let one voice through.
    pub fn solo(index: usize) -> Self {
        let mut weights = [0.0; VOICE_COUNT];
        if let Some(weight) = weights.get_mut(index) {
            *weight = 1.0;
        }
        Self(weights)
    }

    pub fn get(&self, index: usize) -> f32 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    pub fn as_array(&self) -> &[f32; VOICE_COUNT] {
        &self.0
    }

    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }
}

/// Bilinear weights of the four corners for a position.
///
/// The weights are non-negative and sum to one.
pub fn compute_weights(position: QuadrantPosition) -> MixWeights {
    let QuadrantPosition { x, y } = QuadrantPosition::new(position.x, position.y);
    MixWeights([
        (1.0 - x) * (1.0 - y),
        x * (1.0 - y),
        (1.0 - x) * y,
        x * y,
    ])
}

/// Sums the active voice blocks into `out`, each scaled by its weight.
///
/// `out` is overwritten. Inactive voices contribute nothing, and no clipping
/// or normalization is applied.
pub fn blend(
    inputs: &[AudioBlock; VOICE_COUNT],
    active: &[bool; VOICE_COUNT],
    weights: &MixWeights,
    out: &mut AudioBlock,
) {
    out.clear();

    for ((input, &active), &weight) in inputs.iter().zip(active.iter()).zip(weights.0.iter()) {
        if !active || weight == 0.0 {
            continue;
        }

        for (source, target) in input.channels_iter().zip(out.channels_iter_mut()) {
            sum_weighted(source, target, weight);
        }
    }
}
