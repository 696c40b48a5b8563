mod pitch;
pub use pitch::*;

/// Adds `source * gain` into `target`, sample by sample.
#[inline]
pub fn sum_weighted(source: &[f32], target: &mut [f32], gain: f32) {
    for (out, sample) in target.iter_mut().zip(source.iter()) {
        *out += sample * gain;
    }
}
