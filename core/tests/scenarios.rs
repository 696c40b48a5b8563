use std::{f32::consts::TAU, sync::Arc, thread};

use specter_core::{
    AudioBlock, EngineConfig, EngineController, QuadrantPosition, RenderEngine, VoiceSet,
    VoiceSource,
};

const SAMPLE_RATE: u32 = 48000;

fn sine(freq: f32, amplitude: f32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|n| (n as f32 * freq * TAU / SAMPLE_RATE as f32).sin() * amplitude)
        .collect()
}

fn source(name: &str, samples: Vec<f32>) -> Option<Arc<VoiceSource>> {
    Some(Arc::new(VoiceSource::from_planar(name, SAMPLE_RATE, vec![samples])))
}

fn engine(block_size: usize, sources: VoiceSet) -> (RenderEngine, EngineController, AudioBlock) {
    let (mut engine, mut controller) = RenderEngine::new(EngineConfig::default());
    engine.prepare(SAMPLE_RATE, block_size).unwrap();
    controller.load_sources(sources);
    let block = engine.new_block();
    (engine, controller, block)
}

fn rms(samples: &[f32]) -> f32 {
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

#[test]
fn sweeping_identical_sources_keeps_the_level() {
    let block_size = 512;
    let signal = sine(440.0, 0.5, SAMPLE_RATE as usize);
    let (mut engine, mut controller, mut block) = engine(
        block_size,
        [
            source("tl", signal.clone()),
            source("tr", signal.clone()),
            source("bl", signal.clone()),
            source("br", signal.clone()),
        ],
    );
    controller.play();

    let blocks = SAMPLE_RATE as usize / block_size;
    for i in 0..blocks {
        let t = i as f32 / (blocks - 1) as f32;
        controller.set_position(QuadrantPosition::new(t, t));
        engine.render_block(&mut block);

        let expected = rms(&signal[i * block_size..(i + 1) * block_size]);
        let actual = rms(block.channel(0));
        assert!((actual - expected).abs() < 1e-3, "block {i}: {actual} vs {expected}");
    }
}

#[test]
fn sweeping_distinct_sources_never_exceeds_the_source_level() {
    let block_size = 512;
    let (mut engine, mut controller, mut block) = engine(
        block_size,
        [
            source("a", sine(220.0, 0.5, SAMPLE_RATE as usize)),
            source("b", sine(330.0, 0.5, SAMPLE_RATE as usize)),
            source("c", sine(495.0, 0.5, SAMPLE_RATE as usize)),
            source("d", sine(742.5, 0.5, SAMPLE_RATE as usize)),
        ],
    );
    controller.play();

    let blocks = SAMPLE_RATE as usize / block_size;
    for i in 0..blocks {
        let t = i as f32 / (blocks - 1) as f32;
        controller.set_position(QuadrantPosition::new(t, 1.0 - t));
        engine.render_block(&mut block);
        assert!(block.channel(0).iter().all(|s| s.abs() <= 0.5 + 1e-4));
    }
}

#[test]
fn exhausted_voice_contributes_nothing() {
    let block_size = 64;
    let (mut engine, mut controller, mut block) = engine(
        block_size,
        [source("long", vec![0.5; 4096]), source("short", vec![1.0; 40]), None, None],
    );
    controller.set_loop_enabled(false);
    controller.set_position(QuadrantPosition::new(0.5, 0.0));
    controller.play();

    engine.render_block(&mut block);
    let first = block.channel(0);
    assert!(first[..40].iter().all(|s| (*s - 0.75).abs() < 1e-6));
    assert!(first[40..].iter().all(|s| (*s - 0.25).abs() < 1e-6));

    engine.render_block(&mut block);
    assert!(block.channel(0).iter().all(|s| (*s - 0.25).abs() < 1e-6));
    assert!(!engine.voices().voices()[1].is_playing());
}

#[test]
fn stopped_engine_is_silent() {
    let (mut engine, mut controller, mut block) =
        engine(128, [source("a", vec![0.5; 1024]), None, None, None]);
    controller.set_position(QuadrantPosition::new(0.0, 0.0));
    controller.play();
    engine.render_block(&mut block);
    assert!(block.rms() > 0.0);

    controller.stop();
    engine.render_block(&mut block);
    assert_eq!(block.rms(), 0.0);
}

#[test]
fn short_looping_source_wraps_without_jumps() {
    // One full sine period, so the wrap continues the waveform.
    let period = 100;
    let samples = sine(SAMPLE_RATE as f32 / period as f32, 0.8, period);
    let max_step = samples
        .iter()
        .zip(samples.iter().cycle().skip(1))
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);

    let (mut engine, mut controller, mut block) =
        engine(512, [source("loop", samples), None, None, None]);
    controller.set_position(QuadrantPosition::new(0.0, 0.0));
    controller.play();

    let mut previous = None;
    for _ in 0..4 {
        engine.render_block(&mut block);
        for &sample in block.channel(0) {
            if let Some(previous) = previous {
                let jump: f32 = sample - previous;
                assert!(jump.abs() <= max_step + 1e-5, "jump of {jump}");
            }
            previous = Some(sample);
        }
    }
    assert!(engine.voices().voices()[0].is_playing());
}

#[test]
fn note_on_doubles_the_playback_rate() {
    let block_size = 256;
    let (mut engine, mut controller, mut block) =
        engine(block_size, [source("a", vec![0.1; 8192]), None, None, None]);

    controller.note_on(72);
    engine.render_block(&mut block);
    let position = engine.voices().voices()[0].read_position();
    assert!((position - 2.0 * block_size as f64).abs() < 1e-3);

    controller.note_on(48);
    engine.render_block(&mut block);
    let position = engine.voices().voices()[0].read_position();
    assert!((position - 0.5 * block_size as f64).abs() < 1e-3);
}

#[test]
fn control_thread_publishes_while_rendering() {
    let (mut engine, mut controller, mut block) = engine(
        128,
        [
            source("a", sine(220.0, 0.5, 48000)),
            source("b", sine(330.0, 0.5, 48000)),
            source("c", sine(440.0, 0.5, 48000)),
            source("d", sine(550.0, 0.5, 48000)),
        ],
    );
    controller.play();

    let control = thread::spawn(move || {
        for i in 0..2000 {
            let t = (i % 100) as f32 / 100.0;
            controller.set_position(QuadrantPosition::new(t, 1.0 - t));
            if i % 250 == 0 {
                controller.note_on(60 + (i / 250) as u8);
            }
            controller.set_grain_enabled(i % 3 == 0);
        }
        controller
    });

    for _ in 0..500 {
        engine.render_block(&mut block);
        assert!(block.is_finite());
        let weights = engine.snapshot().weights;
        assert!((weights.sum() - 1.0).abs() < 1e-5);
    }

    let controller = control.join().unwrap();
    engine.render_block(&mut block);
    assert_eq!(engine.snapshot(), controller.snapshot());
}
