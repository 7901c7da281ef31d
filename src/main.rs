//! Demo: drive an analysis session with synthesized kick-drum audio and
//! print beats and snapshots as JSON lines.
//!
//! Usage: `audioviz-demo [style]` where style is one of the built-in presets.

use audioviz_core::audio::{get_preset, tone, FrameSynth};
use audioviz_core::{AnalysisConfig, AnalysisHandle};
use std::process::ExitCode;

const SAMPLE_RATE: u32 = 44_100;
const CAPTURE_SIZE: usize = 1024;
const FRAME_INTERVAL_MS: u64 = 25;
const BPM: u64 = 120;
const DURATION_MS: u64 = 4_000;

fn main() -> ExitCode {
    env_logger::init();

    let style = std::env::args().nth(1).unwrap_or_else(|| "bars".to_string());
    let Some(preset) = get_preset(&style) else {
        log::error!("Unknown style '{}'", style);
        return ExitCode::FAILURE;
    };

    let mut handle = match AnalysisHandle::spawn(AnalysisConfig::from_preset(&preset)) {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("Failed to start analysis: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut beats = handle.subscribe_beats();
    let sender = handle.frame_sender();

    let mut synth = FrameSynth::new(CAPTURE_SIZE, SAMPLE_RATE);
    let beat_period_ms = 60_000 / BPM;
    let pad = tone(440.0, 0.05, CAPTURE_SIZE, SAMPLE_RATE);

    for t in (0..DURATION_MS).step_by(FRAME_INTERVAL_MS as usize) {
        // Kick: a short loud 60 Hz burst at the start of every beat
        let pcm = if t % beat_period_ms < FRAME_INTERVAL_MS {
            tone(60.0, 0.9, CAPTURE_SIZE, SAMPLE_RATE)
        } else {
            pad.clone()
        };
        if let Err(e) = sender.send(synth.synthesize(&pcm, t)) {
            log::error!("Frame rejected: {}", e);
            return ExitCode::FAILURE;
        }
    }
    handle.stop();

    while let Ok(beat) = beats.try_recv() {
        match serde_json::to_string(&beat) {
            Ok(json) => println!("{json}"),
            Err(e) => log::warn!("Failed to encode beat: {}", e),
        }
    }

    match serde_json::to_string(handle.snapshot().as_ref()) {
        Ok(json) => println!("{json}"),
        Err(e) => log::warn!("Failed to encode snapshot: {}", e),
    }

    ExitCode::SUCCESS
}
