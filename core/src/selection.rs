use std::path::PathBuf;

use rand::{seq::SliceRandom, Rng};

use crate::VOICE_COUNT;

/// Picks up to four distinct files from `candidates` in random order.
///
/// With fewer than four candidates all of them are returned, shuffled.
pub fn pick_voice_files<R: Rng + ?Sized>(candidates: &[PathBuf], rng: &mut R) -> Vec<PathBuf> {
    candidates.choose_multiple(rng, VOICE_COUNT).cloned().collect()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn candidates(count: usize) -> Vec<PathBuf> {
        (0..count).map(|i| PathBuf::from(format!("{i}.wav"))).collect()
    }

    #[test]
    fn picks_four_distinct_candidates() {
        let mut rng = StdRng::seed_from_u64(1);
        let all = candidates(10);
        let mut picked = pick_voice_files(&all, &mut rng);
        assert_eq!(picked.len(), 4);
        assert!(picked.iter().all(|p| all.contains(p)));
        picked.sort();
        picked.dedup();
        assert_eq!(picked.len(), 4);
    }

    #[test]
    fn short_lists_are_returned_whole() {
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(pick_voice_files(&candidates(2), &mut rng).len(), 2);
        assert!(pick_voice_files(&[], &mut rng).is_empty());
    }
}
