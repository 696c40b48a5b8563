use std::{path::Path, path::PathBuf, sync::Arc};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use rand::Rng;
use rayon::prelude::*;

use crate::{
    compute_weights,
    decoder::{AudioDecoder, AudioLoadError},
    effects::{FilterParams, ReverbParams},
    helpers::pitch_ratio,
    params::{ParameterPublisher, ParameterSnapshot, PitchChange, TransportAction, TransportChange},
    pick_voice_files, GrainPlan, GrainTuning, MixWeights, QuadrantPosition, VoiceSet, VoiceSource,
    VOICE_COUNT,
};

/// The outcome of loading one voice slot.
#[derive(Debug, Default)]
pub enum SlotLoad {
    Loaded {
        id: String,
        frames: usize,
        sample_rate: u32,
    },
    /// No file was offered for the slot. The voice stays silent.
    #[default]
    Empty,
    /// The file could not be decoded. The voice stays silent.
    Failed(AudioLoadError),
}

impl SlotLoad {
    pub fn is_loaded(&self) -> bool {
        matches!(self, SlotLoad::Loaded { .. })
    }
}

/// Per-slot results of a load request.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub slots: [SlotLoad; VOICE_COUNT],
}

impl LoadReport {
    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_loaded()).count()
    }

    /// True if all four voices received a source.
    pub fn is_complete(&self) -> bool {
        self.loaded_count() == VOICE_COUNT
    }

    pub fn errors(&self) -> impl Iterator<Item = &AudioLoadError> {
        self.slots.iter().filter_map(|s| match s {
            SlotLoad::Failed(error) => Some(error),
            _ => None,
        })
    }
}

/// The control side of the engine.
///
/// Every setter updates a local copy of the parameters and publishes it
/// whole, so the render side always sees a consistent set. Note and transport
/// events take effect at the start of the next rendered block. Decoding runs
/// on the calling thread (in parallel across the four files) and never
/// touches the render thread.
pub struct EngineController {
    publisher: ParameterPublisher,
    snapshot: ParameterSnapshot,
    position: QuadrantPosition,
    serial: u64,

    sources: Sender<VoiceSet>,
    unclaimed_sources: Receiver<VoiceSet>,
    retired: Receiver<VoiceSet>,
    loaded: VoiceSet,

    sample_rate: u32,
    block_size: usize,
}

impl EngineController {
    pub(crate) fn new(
        publisher: ParameterPublisher,
        snapshot: ParameterSnapshot,
        sources: Sender<VoiceSet>,
        unclaimed_sources: Receiver<VoiceSet>,
        retired: Receiver<VoiceSet>,
        sample_rate: u32,
        block_size: usize,
    ) -> Self {
        Self {
            publisher,
            snapshot,
            position: QuadrantPosition::CENTER,
            serial: 0,
            sources,
            unclaimed_sources,
            retired,
            loaded: Default::default(),
            sample_rate,
            block_size,
        }
    }

    /// The parameters as last published.
    pub fn snapshot(&self) -> &ParameterSnapshot {
        &self.snapshot
    }

    /// The position as last set.
    pub fn position(&self) -> QuadrantPosition {
        self.position
    }

    /// The sources as last loaded. The render side picks them up at its next
    /// block.
    pub fn loaded_sources(&self) -> &VoiceSet {
        &self.loaded
    }

    /// Sets the format used to check grain tunings. Call this when the
    /// engine is prepared with a different rate or block size than configured.
    pub fn set_stream_format(&mut self, sample_rate: u32, block_size: usize) {
        self.sample_rate = sample_rate;
        self.block_size = block_size;
    }

    /// Whether the published grain tuning fits at least one zone into a block.
    pub fn grain_fits_block(&self) -> bool {
        GrainPlan::from_tuning(&self.snapshot.grain_tuning, self.sample_rate)
            .fits_block(self.block_size)
    }

    fn publish(&mut self) {
        self.collect_retired();
        self.publisher.publish(self.snapshot);
    }

    fn next_serial(&mut self) -> u64 {
        self.serial += 1;
        self.serial
    }

    pub fn set_position(&mut self, position: QuadrantPosition) {
        self.position = position;
        self.snapshot.weights = compute_weights(position);
        self.publish();
    }

    /// Sets the voice gains directly, bypassing the position.
    pub fn set_weights(&mut self, weights: MixWeights) {
        self.snapshot.weights = weights;
        self.publish();
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.snapshot.loop_enabled = enabled;
        self.publish();
    }

    pub fn set_grain_enabled(&mut self, enabled: bool) {
        self.snapshot.grain_enabled = enabled;
        self.publish();
    }

    /// Sets the grain lengths. Values that do not form a valid plan are
    /// clamped by the render side.
    pub fn set_grain_tuning(&mut self, tuning: GrainTuning) {
        if tuning.is_degenerate(self.sample_rate) {
            log::warn!(
                "grain tuning {:?} is degenerate at {} Hz and will be clamped",
                tuning,
                self.sample_rate
            );
        }
        self.snapshot.grain_tuning = tuning;
        if !self.grain_fits_block() {
            log::warn!(
                "grain tuning {:?} needs more than {} frames per zone, grain output is silent",
                tuning,
                self.block_size
            );
        }
        self.publish();
    }

    pub fn set_reverb_enabled(&mut self, enabled: bool) {
        self.snapshot.reverb_enabled = enabled;
        self.publish();
    }

    pub fn set_reverb_params(&mut self, params: ReverbParams) {
        self.snapshot.reverb = params;
        self.publish();
    }

    pub fn set_filter_enabled(&mut self, enabled: bool) {
        self.snapshot.filter_enabled = enabled;
        self.publish();
    }

    pub fn set_filter_params(&mut self, params: FilterParams) {
        self.snapshot.filter = params;
        self.publish();
    }

    /// Draws new reverb settings and switches the reverb on.
    pub fn randomize_reverb<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ReverbParams {
        let params = ReverbParams::randomized(rng);
        log::debug!("randomized reverb: {:?}", params);
        self.snapshot.reverb = params;
        self.snapshot.reverb_enabled = true;
        self.publish();
        params
    }

    /// Draws new filter settings and switches the filter on.
    pub fn randomize_filter<R: Rng + ?Sized>(&mut self, rng: &mut R) -> FilterParams {
        let params = FilterParams::randomized(rng);
        log::debug!("randomized filter: {:?}", params);
        self.snapshot.filter = params;
        self.snapshot.filter_enabled = true;
        self.publish();
        params
    }

    /// Retunes every voice to a note, rewinds them and starts playback.
    pub fn note_on(&mut self, note: u8) {
        let serial = self.next_serial();
        self.snapshot.pending_pitch = Some(PitchChange {
            ratio: pitch_ratio(note),
            retrigger: true,
            serial,
        });
        self.publish();
    }

    /// Starts every loaded voice from its current position.
    pub fn play(&mut self) {
        self.transport(TransportAction::Play);
    }

    pub fn stop(&mut self) {
        self.transport(TransportAction::Stop);
    }

    fn transport(&mut self, action: TransportAction) {
        let serial = self.next_serial();
        self.snapshot.pending_transport = Some(TransportChange { action, serial });
        self.publish();
    }

    /// Hands a set of decoded sources to the render side. A set that has not
    /// been picked up yet is replaced.
    pub fn load_sources(&mut self, sources: VoiceSet) {
        self.collect_retired();
        self.loaded = sources.clone();

        let mut pending = sources;
        loop {
            match self.sources.try_send(pending) {
                Ok(()) => break,
                Err(TrySendError::Full(back)) => {
                    let _ = self.unclaimed_sources.try_recv();
                    pending = back;
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::warn!("render engine is gone, sources were not installed");
                    break;
                }
            }
        }
    }

    /// Decodes up to four files, in parallel, and loads them into the voices
    /// in order. Slots without a file or with a failed file stay silent.
    pub fn load_files<D, P>(&mut self, decoder: &D, paths: &[P]) -> LoadReport
    where
        D: AudioDecoder,
        P: AsRef<Path> + Sync,
    {
        if paths.len() < VOICE_COUNT {
            log::warn!(
                "not enough audio files: {} offered, {} voices will stay silent",
                paths.len(),
                VOICE_COUNT - paths.len()
            );
        } else if paths.len() > VOICE_COUNT {
            log::warn!(
                "{} audio files offered, only the first {} are used",
                paths.len(),
                VOICE_COUNT
            );
        }

        let used = &paths[..paths.len().min(VOICE_COUNT)];
        let results: Vec<Result<VoiceSource, AudioLoadError>> = used
            .par_iter()
            .map(|path| VoiceSource::load(decoder, path.as_ref()))
            .collect();

        let mut report = LoadReport::default();
        let mut sources: VoiceSet = Default::default();

        for (i, (result, path)) in results.into_iter().zip(used.iter()).enumerate() {
            match result {
                Ok(source) => {
                    log::info!(
                        "voice {}: loaded {} ({} frames, {:.2} s at {} Hz)",
                        i,
                        source.id(),
                        source.frames(),
                        source.duration(),
                        source.sample_rate()
                    );
                    report.slots[i] = SlotLoad::Loaded {
                        id: source.id().to_string(),
                        frames: source.frames(),
                        sample_rate: source.sample_rate(),
                    };
                    sources[i] = Some(Arc::new(source));
                }
                Err(error) => {
                    log::error!(
                        "voice {}: failed to load {}: {}",
                        i,
                        path.as_ref().display(),
                        error
                    );
                    report.slots[i] = SlotLoad::Failed(error);
                }
            }
        }

        self.load_sources(sources);
        report
    }

    /// Picks four random files from `candidates` and loads them.
    pub fn load_random_files<D, R>(
        &mut self,
        decoder: &D,
        candidates: &[PathBuf],
        rng: &mut R,
    ) -> LoadReport
    where
        D: AudioDecoder,
        R: Rng + ?Sized,
    {
        let picked = pick_voice_files(candidates, rng);
        self.load_files(decoder, picked.as_slice())
    }

    /// Drops source sets the render side has replaced. Returns how many were
    /// collected. Every other controller call does this too.
    pub fn collect_retired(&mut self) -> usize {
        self.retired.try_iter().count()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{decoder::FrameReader, RenderEngine};

    struct MemoryReader {
        channels: Vec<Vec<f32>>,
        done: bool,
    }

    impl FrameReader for MemoryReader {
        fn sample_rate(&self) -> u32 {
            44100
        }

        fn channels(&self) -> usize {
            self.channels.len()
        }

        fn frame_count(&self) -> Option<u64> {
            Some(self.channels[0].len() as u64)
        }

        fn read_frames(&mut self, out: &mut [Vec<f32>]) -> Result<usize, AudioLoadError> {
            if self.done {
                return Ok(0);
            }
            self.done = true;
            for (target, source) in out.iter_mut().zip(self.channels.iter()) {
                target.extend_from_slice(source);
            }
            Ok(self.channels[0].len())
        }
    }

    #[derive(Default)]
    struct MemoryDecoder {
        files: HashMap<PathBuf, Vec<Vec<f32>>>,
    }

    impl AudioDecoder for MemoryDecoder {
        fn open_reader(&self, path: &Path) -> Result<Box<dyn FrameReader>, AudioLoadError> {
            match self.files.get(path) {
                Some(channels) => Ok(Box::new(MemoryReader {
                    channels: channels.clone(),
                    done: false,
                })),
                None => Err(AudioLoadError::UnsupportedFormat(path.to_path_buf())),
            }
        }
    }

    fn decoder_with(names: &[&str]) -> MemoryDecoder {
        let mut decoder = MemoryDecoder::default();
        for (i, name) in names.iter().enumerate() {
            decoder
                .files
                .insert(PathBuf::from(name), vec![vec![i as f32; 100 + i]]);
        }
        decoder
    }

    #[test]
    fn loads_files_in_slot_order() {
        let decoder = decoder_with(&["a.wav", "b.wav", "c.wav", "d.wav"]);
        let (_engine, mut controller) = RenderEngine::new(Default::default());

        let report = controller.load_files(&decoder, &["a.wav", "b.wav", "c.wav", "d.wav"]);
        assert!(report.is_complete());
        for (i, slot) in controller.loaded_sources().iter().enumerate() {
            assert_eq!(slot.as_ref().map(|s| s.frames()), Some(100 + i));
        }
    }

    #[test]
    fn insufficient_files_leave_silent_slots() {
        let decoder = decoder_with(&["a.wav", "b.wav"]);
        let (_engine, mut controller) = RenderEngine::new(Default::default());

        let report = controller.load_files(&decoder, &["a.wav", "b.wav"]);
        assert_eq!(report.loaded_count(), 2);
        assert!(matches!(report.slots[2], SlotLoad::Empty));
        assert!(controller.loaded_sources()[3].is_none());
    }

    #[test]
    fn failed_files_are_reported_per_slot() {
        let decoder = decoder_with(&["a.wav"]);
        let (_engine, mut controller) = RenderEngine::new(Default::default());

        let report = controller.load_files(&decoder, &["a.wav", "missing.wav", "a.wav", "a.wav"]);
        assert_eq!(report.loaded_count(), 3);
        assert!(matches!(report.slots[1], SlotLoad::Failed(AudioLoadError::UnsupportedFormat(_))));
        assert_eq!(report.errors().count(), 1);
    }

    #[test]
    fn random_pick_loads_four_distinct_files() {
        let names = ["a.wav", "b.wav", "c.wav", "d.wav", "e.wav", "f.wav"];
        let decoder = decoder_with(&names);
        let candidates: Vec<PathBuf> = names.iter().map(PathBuf::from).collect();
        let (_engine, mut controller) = RenderEngine::new(Default::default());

        let mut rng = StdRng::seed_from_u64(3);
        let report = controller.load_random_files(&decoder, &candidates, &mut rng);
        assert!(report.is_complete());

        let mut ids: Vec<&str> = controller
            .loaded_sources()
            .iter()
            .filter_map(|s| s.as_deref().map(|s| s.id()))
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn randomize_switches_the_effect_on() {
        let (_engine, mut controller) = RenderEngine::new(Default::default());
        let mut rng = StdRng::seed_from_u64(5);

        let reverb = controller.randomize_reverb(&mut rng);
        assert!(controller.snapshot().reverb_enabled);
        assert_eq!(controller.snapshot().reverb, reverb);

        let filter = controller.randomize_filter(&mut rng);
        assert!(controller.snapshot().filter_enabled);
        assert_eq!(controller.snapshot().filter, filter);
    }

    #[test]
    fn grain_fit_follows_tuning_and_format() {
        let (_engine, mut controller) = RenderEngine::new(Default::default());
        assert!(controller.grain_fits_block());

        controller.set_stream_format(96000, 512);
        assert!(!controller.grain_fits_block());

        controller.set_stream_format(96000, 1024);
        assert!(controller.grain_fits_block());

        controller.set_grain_tuning(GrainTuning {
            zone_duration: 0.05,
            ..Default::default()
        });
        assert!(!controller.grain_fits_block());
        assert_eq!(controller.snapshot().grain_tuning.zone_duration, 0.05);
    }

    #[test]
    fn position_is_remembered() {
        let (_engine, mut controller) = RenderEngine::new(Default::default());
        assert_eq!(controller.position(), QuadrantPosition::CENTER);
        controller.set_position(QuadrantPosition::new(0.25, 2.0));
        assert_eq!(controller.position(), QuadrantPosition::new(0.25, 1.0));
        assert_eq!(
            controller.snapshot().weights,
            compute_weights(QuadrantPosition::new(0.25, 1.0))
        );
    }

    #[test]
    fn serials_increase_with_every_event() {
        let (_engine, mut controller) = RenderEngine::new(Default::default());
        controller.play();
        controller.note_on(64);
        controller.stop();
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.pending_transport.map(|t| t.serial), Some(3));
        assert_eq!(snapshot.pending_pitch.map(|p| p.serial), Some(2));
    }
}
