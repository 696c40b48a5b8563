//! A four-source quadrant mixer with grain resynthesis.
//!
//! The engine is split in two halves. The [`EngineController`] lives on the
//! control thread: it decodes sources, takes the mixing position, note and
//! transport events and effect settings, and publishes them as whole
//! parameter snapshots. The [`RenderEngine`] lives on the audio thread and
//! turns the newest snapshot into one block of audio per call, without
//! allocating, locking or blocking.

mod audio_block;
pub use audio_block::*;

mod audio_pipe;
pub use audio_pipe::*;

mod audio_stream;
pub use audio_stream::*;

mod config;
pub use config::*;

mod controller;
pub use controller::*;

pub mod decoder;

pub mod effects;

mod engine;
pub use engine::*;

pub mod grain;
pub use grain::{GrainPlan, GrainTuning};

pub mod helpers;

mod mixer;
pub use mixer::*;

pub mod params;

mod selection;
pub use selection::*;

pub mod voice;
pub use voice::{Voice, VoiceBank, VoiceSet, VoiceSource, VOICE_COUNT};
