use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use thiserror::Error;

use crate::{
    blend,
    effects::EffectChain,
    grain::{resynthesize_into, GrainPlan},
    params::{
        parameter_channel, ParameterReceiver, ParameterSnapshot, PitchChange, TransportAction,
        TransportChange,
    },
    AudioBlock, AudioStreamParams, EngineConfig, EngineController, GrainTuning, VoiceBank,
    VoiceSet, VOICE_COUNT,
};

/// The largest block the engine accepts in `prepare`.
pub const MAX_BLOCK_SIZE: usize = 16384;

/// Retired source sets waiting to be dropped by the controller.
const RETIRED_CAPACITY: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid sample rate {0}")]
    InvalidSampleRate(u32),

    #[error("Invalid block size {0}, must be between 1 and {max}", max = MAX_BLOCK_SIZE)]
    InvalidBlockSize(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not prepared, or no sources loaded.
    Idle,
    /// Prepared with sources, no block rendered since.
    Ready,
    Rendering,
}

/// The render side of the engine.
///
/// Each call to [`render_block`](Self::render_block) picks up new sources,
/// reads the newest parameter snapshot, advances the four voices, optionally
/// resynthesizes them, mixes them by the quadrant weights and runs the
/// enabled effects. Nothing in the render path allocates, locks or logs.
pub struct RenderEngine {
    stream_params: AudioStreamParams,
    block_size: usize,
    prepared: bool,
    rendered: bool,

    voices: VoiceBank,
    voice_blocks: [AudioBlock; VOICE_COUNT],
    active: [bool; VOICE_COUNT],

    params: ParameterReceiver,
    snapshot: ParameterSnapshot,
    applied_pitch_serial: u64,
    applied_transport_serial: u64,

    sources: Receiver<VoiceSet>,
    retired: Sender<VoiceSet>,
    unsent: Option<VoiceSet>,

    grain_tuning: GrainTuning,
    grain_plan: GrainPlan,
    grain_scratch: Vec<f32>,

    effects: EffectChain,
}

impl RenderEngine {
    /// Creates an unprepared engine and the controller that drives it.
    pub fn new(config: EngineConfig) -> (Self, EngineController) {
        let initial = ParameterSnapshot {
            loop_enabled: config.loop_enabled,
            grain_tuning: config.grain_tuning,
            ..Default::default()
        };
        let (publisher, receiver) = parameter_channel(initial);
        let (sources_tx, sources_rx) = bounded(1);
        let (retired_tx, retired_rx) = bounded(RETIRED_CAPACITY);

        let engine = Self {
            stream_params: config.stream_params,
            block_size: config.block_size,
            prepared: false,
            rendered: false,

            voices: VoiceBank::new(config.stream_params.sample_rate),
            voice_blocks: Default::default(),
            active: [false; VOICE_COUNT],

            params: receiver,
            snapshot: initial,
            applied_pitch_serial: 0,
            applied_transport_serial: 0,

            sources: sources_rx.clone(),
            retired: retired_tx,
            unsent: None,

            grain_tuning: config.grain_tuning,
            grain_plan: GrainPlan::from_tuning(
                &config.grain_tuning,
                config.stream_params.sample_rate,
            ),
            grain_scratch: Vec::new(),

            effects: EffectChain::new(),
        };

        let controller = EngineController::new(
            publisher,
            initial,
            sources_tx,
            sources_rx,
            retired_rx,
            config.stream_params.sample_rate,
            config.block_size,
        );

        (engine, controller)
    }

    /// Allocates every buffer for the given sample rate and block size. Must be
    /// called before rendering and whenever either changes.
    pub fn prepare(&mut self, sample_rate: u32, block_size: usize) -> Result<(), EngineError> {
        if sample_rate == 0 {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        if block_size == 0 || block_size > MAX_BLOCK_SIZE {
            return Err(EngineError::InvalidBlockSize(block_size));
        }

        let channels = self.channels();
        self.stream_params.sample_rate = sample_rate;
        self.block_size = block_size;

        for block in self.voice_blocks.iter_mut() {
            block.resize(channels, block_size);
        }
        self.grain_scratch = vec![0.0; block_size];
        self.grain_plan = GrainPlan::from_tuning(&self.grain_tuning, sample_rate);
        self.voices.set_sample_rate(sample_rate);
        self.effects.prepare(sample_rate, block_size, channels);
        self.effects.reset();

        self.prepared = true;
        self.rendered = false;

        if !self.grain_plan.fits_block(block_size) {
            log::warn!(
                "grain zone ({} frames) exceeds the block ({} frames), grain output is silent",
                self.grain_plan.zone_length(),
                block_size
            );
        }
        log::info!(
            "engine prepared: {} Hz, {} channels, {} frames per block",
            sample_rate,
            channels,
            block_size
        );
        Ok(())
    }

    pub fn state(&self) -> EngineState {
        if !self.prepared || !self.voices.has_sources() {
            EngineState::Idle
        } else if self.rendered {
            EngineState::Rendering
        } else {
            EngineState::Ready
        }
    }

    pub fn stream_params(&self) -> &AudioStreamParams {
        &self.stream_params
    }

    pub fn channels(&self) -> usize {
        self.stream_params.channels.count() as usize
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn voices(&self) -> &VoiceBank {
        &self.voices
    }

    /// The snapshot used for the last rendered block.
    pub fn snapshot(&self) -> &ParameterSnapshot {
        &self.snapshot
    }

    pub fn grain_plan(&self) -> &GrainPlan {
        &self.grain_plan
    }

    /// Creates a silent block shaped for this engine.
    pub fn new_block(&self) -> AudioBlock {
        AudioBlock::new(self.channels(), self.block_size)
    }

    /// Renders the next block into `out`.
    ///
    /// An unprepared engine, or a block whose shape differs from the prepared
    /// one, produces silence.
    pub fn render_block(&mut self, out: &mut AudioBlock) {
        out.clear();
        if !self.prepared
            || out.channels() != self.channels()
            || out.frames() != self.block_size
        {
            return;
        }

        self.flush_retired();
        while let Ok(sources) = self.sources.try_recv() {
            let old = self.voices.load_voices(sources);
            self.retire(old);
        }

        self.snapshot = self.params.consume_latest();
        self.apply_events();
        self.voices.set_looping(self.snapshot.loop_enabled);

        if self.snapshot.grain_tuning != self.grain_tuning {
            self.grain_tuning = self.snapshot.grain_tuning;
            self.grain_plan =
                GrainPlan::from_tuning(&self.grain_tuning, self.stream_params.sample_rate);
        }

        for i in 0..VOICE_COUNT {
            let produced = self.voices.advance(i, &mut self.voice_blocks[i]);
            self.active[i] = produced > 0;

            if produced > 0 && self.snapshot.grain_enabled {
                for channel in self.voice_blocks[i].channels_iter_mut() {
                    resynthesize_into(channel, &self.grain_plan, &mut self.grain_scratch);
                    channel.copy_from_slice(&self.grain_scratch);
                }
            }
        }

        blend(&self.voice_blocks, &self.active, &self.snapshot.weights, out);
        self.effects.process(out, &self.snapshot);

        self.rendered = true;
    }

    /// Applies note and transport events that have not been applied yet, in
    /// the order they were issued.
    fn apply_events(&mut self) {
        let applied_pitch = self.applied_pitch_serial;
        let applied_transport = self.applied_transport_serial;
        let pitch = self.snapshot.pending_pitch.filter(|p| p.serial > applied_pitch);
        let transport = self
            .snapshot
            .pending_transport
            .filter(|t| t.serial > applied_transport);

        match (pitch, transport) {
            (Some(pitch), Some(transport)) if transport.serial < pitch.serial => {
                self.apply_transport(transport);
                self.apply_pitch(pitch);
            }
            (pitch, transport) => {
                if let Some(pitch) = pitch {
                    self.apply_pitch(pitch);
                }
                if let Some(transport) = transport {
                    self.apply_transport(transport);
                }
            }
        }
    }

    fn apply_pitch(&mut self, pitch: PitchChange) {
        self.voices.set_pitch_ratio(pitch.ratio);
        if pitch.retrigger {
            self.voices.retrigger();
        }
        self.applied_pitch_serial = pitch.serial;
    }

    fn apply_transport(&mut self, transport: TransportChange) {
        match transport.action {
            TransportAction::Play => self.voices.play(),
            TransportAction::Stop => self.voices.stop(),
        }
        self.applied_transport_serial = transport.serial;
    }

    fn flush_retired(&mut self) {
        if let Some(set) = self.unsent.take() {
            match self.retired.try_send(set) {
                Ok(()) => {}
                Err(TrySendError::Full(set)) => self.unsent = Some(set),
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
    }

    /// Hands replaced sources back to the controller so their memory is not
    /// freed on the render thread.
    fn retire(&mut self, old: VoiceSet) {
        if old.iter().all(Option::is_none) {
            return;
        }
        self.flush_retired();
        self.unsent = Some(old);
        self.flush_retired();
    }
}
