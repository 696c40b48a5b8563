use lazy_static::lazy_static;

/// The note that plays sources at their original speed.
pub const REFERENCE_NOTE: u8 = 60;

/// Create an array of playback rate ratios for keys 0-127
fn build_pitch_ratios() -> [f32; 128] {
    let mut ratios = [0.0f32; 128];
    for (key, ratio) in ratios.iter_mut().enumerate() {
        *ratio = 2.0f32.powf((key as f32 - REFERENCE_NOTE as f32) / 12.0);
    }
    ratios
}

lazy_static! {
    /// Static array of the playback rate ratios for keys 0-127.
    pub static ref PITCH_RATIOS: [f32; 128] = build_pitch_ratios();
}

/// Returns the playback rate ratio of a note, relative to [`REFERENCE_NOTE`].
/// Notes above 127 are treated as 127.
pub fn pitch_ratio(note: u8) -> f32 {
    PITCH_RATIOS[note.min(127) as usize]
}
