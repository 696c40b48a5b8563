//! Renders a slow circle around the mixing square to a WAV file.
//!
//! Usage: render_to_wav <out.wav> <file> [file] [file] [file]

use std::{f32::consts::TAU, path::PathBuf};

use hound::{WavSpec, WavWriter};
use specter_core::{
    decoder::SymphoniaDecoder, AudioPipe, BlockRenderer, EngineConfig, QuadrantPosition,
    RenderEngine,
};

const SECONDS: usize = 20;
const STEPS_PER_SECOND: usize = 50;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(out_path) = args.next() else {
        eprintln!("Usage: render_to_wav <out.wav> <file> [file] [file] [file]");
        return;
    };
    let files: Vec<PathBuf> = args.map(PathBuf::from).collect();

    let config = EngineConfig::default();
    let params = config.stream_params;
    let (engine, mut controller) = RenderEngine::new(config);
    let mut renderer = BlockRenderer::new(engine, params.sample_rate, config.block_size).unwrap();

    let report = controller.load_files(&SymphoniaDecoder, &files);
    if report.loaded_count() == 0 {
        eprintln!("No audio could be loaded");
        return;
    }

    controller.set_grain_enabled(true);
    controller.set_reverb_enabled(true);
    controller.play();

    let spec = WavSpec {
        channels: params.channels.count(),
        sample_rate: params.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&out_path, spec).unwrap();

    let step_len =
        params.sample_rate as usize / STEPS_PER_SECOND * params.channels.count() as usize;
    let mut buffer = vec![0.0; step_len];

    for step in 0..SECONDS * STEPS_PER_SECOND {
        let angle = step as f32 / (SECONDS * STEPS_PER_SECOND) as f32 * TAU;
        controller.set_position(QuadrantPosition::new(
            0.5 + 0.5 * angle.cos(),
            0.5 + 0.5 * angle.sin(),
        ));
        if step % STEPS_PER_SECOND == 0 {
            controller.note_on(60 + (step / STEPS_PER_SECOND % 12) as u8);
        }

        renderer.read_samples(&mut buffer);
        for sample in buffer.iter() {
            writer.write_sample(*sample).unwrap();
        }
    }

    writer.finalize().unwrap();
    println!("Wrote {SECONDS} seconds to {out_path}");
}
