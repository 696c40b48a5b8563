//! Plays four audio files on the default output while the mixing position
//! circles the square and a new note starts every two seconds.
//!
//! Usage: play <file> [file] [file] [file] ...
//! With more than four files, four are picked at random.

use std::{f32::consts::TAU, path::PathBuf, thread, time::Duration};

use specter_core::{decoder::SymphoniaDecoder, QuadrantPosition};
use specter_realtime::RealtimeEngine;

const NOTES: [u8; 6] = [60, 63, 67, 70, 72, 55];

fn main() {
    env_logger::init();

    let files: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if files.is_empty() {
        println!(
            "Usage: {} <file> [file] [file] [file] ...",
            std::env::current_exe()
                .unwrap_or("example".into())
                .display()
        );
        return;
    }

    let mut engine = RealtimeEngine::open_with_all_defaults().unwrap();
    let controller = engine.controller();

    let mut rng = rand::thread_rng();
    let report = if files.len() > 4 {
        controller.load_random_files(&SymphoniaDecoder, &files, &mut rng)
    } else {
        controller.load_files(&SymphoniaDecoder, &files)
    };
    println!("Loaded {} of 4 voices", report.loaded_count());

    controller.set_grain_enabled(true);
    let reverb = controller.randomize_reverb(&mut rng);
    println!("Reverb: {reverb:?}");
    controller.play();

    for step in 0..1200 {
        let angle = step as f32 / 300.0 * TAU;
        controller.set_position(QuadrantPosition::new(
            0.5 + 0.5 * angle.cos(),
            0.5 + 0.5 * angle.sin(),
        ));

        if step % 200 == 0 {
            controller.note_on(NOTES[step / 200 % NOTES.len()]);
        }
        if step == 600 {
            let filter = controller.randomize_filter(&mut rng);
            println!("Filter: {filter:?}");
        }

        thread::sleep(Duration::from_millis(10));
    }

    controller.stop();
    thread::sleep(Duration::from_millis(100));
}
