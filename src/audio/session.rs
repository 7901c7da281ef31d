//! Analysis session running on a dedicated thread

use super::beat::BeatEvent;
use super::config::ConfigError;
use super::pipeline::AnalysisPipeline;
use super::presets::StylePreset;
use super::spectrum::Frame;
use super::AnalysisConfig;
use crate::state::AnalysisSnapshot;
use parking_lot::Mutex;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::broadcast;

/// Buffered beat events per subscriber before the slowest one lags
const BEAT_CHANNEL_CAPACITY: usize = 64;

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid analysis config: {0}")]
    Config(#[from] ConfigError),

    #[error("Thread error: {0}")]
    ThreadError(String),

    #[error("Analysis session has stopped")]
    Stopped,
}

/// Messages sent to the analysis thread, applied in arrival order
enum SessionMessage {
    Frame(Frame),
    SetBeatDetection(bool),
    ApplyPreset(Box<StylePreset>),
    Stop,
}

/// Producer side of the frame queue, handed to the capture layer
#[derive(Clone)]
pub struct FrameSender {
    tx: mpsc::SyncSender<SessionMessage>,
    started: Instant,
}

impl FrameSender {
    /// Queue a frame, blocking while the queue is full
    pub fn send(&self, frame: Frame) -> Result<(), SessionError> {
        self.tx
            .send(SessionMessage::Frame(frame))
            .map_err(|_| SessionError::Stopped)
    }

    /// Queue a frame without blocking; a full queue drops it.
    ///
    /// Returns `Ok(false)` when the frame was dropped.
    pub fn try_send(&self, frame: Frame) -> Result<bool, SessionError> {
        match self.tx.try_send(SessionMessage::Frame(frame)) {
            Ok(()) => Ok(true),
            Err(mpsc::TrySendError::Full(_)) => {
                log::trace!("Frame queue full, dropping frame");
                Ok(false)
            }
            Err(mpsc::TrySendError::Disconnected(_)) => Err(SessionError::Stopped),
        }
    }

    /// Queue raw capture bytes, stamped with the time since session start
    pub fn push_capture(&self, bytes: &[u8], sample_rate: u32) -> Result<bool, SessionError> {
        let now = self.started.elapsed().as_millis() as u64;
        self.try_send(Frame::from_bytes(bytes, sample_rate, now))
    }
}

/// Handle to a running analysis session (Send + Sync)
///
/// The analysis thread owns the pipeline. Readers see the latest published
/// snapshot and may subscribe to the beat event stream.
pub struct AnalysisHandle {
    sender: FrameSender,

    /// Handle to the analysis thread
    thread_handle: Option<JoinHandle<()>>,

    /// Latest published snapshot; swapped whole on every frame
    latest: Arc<Mutex<Arc<AnalysisSnapshot>>>,

    beats: broadcast::Sender<BeatEvent>,
}

impl AnalysisHandle {
    /// Validate the config and start the analysis thread
    pub fn spawn(config: AnalysisConfig) -> Result<Self, SessionError> {
        let pipeline = AnalysisPipeline::new(&config)?;

        let (tx, rx) = mpsc::sync_channel(config.frame_queue);
        let latest = Arc::new(Mutex::new(Arc::new(AnalysisSnapshot::empty(
            config.bands.band_count,
        ))));
        let (beats, _) = broadcast::channel(BEAT_CHANNEL_CAPACITY);

        let latest_clone = latest.clone();
        let beats_clone = beats.clone();
        let thread_handle = thread::Builder::new()
            .name("audio-analysis".to_string())
            .spawn(move || run_analysis_thread(pipeline, rx, latest_clone, beats_clone))
            .map_err(|e| SessionError::ThreadError(e.to_string()))?;

        log::info!(
            "Analysis session started: {} bands, queue of {}",
            config.bands.band_count,
            config.frame_queue
        );

        Ok(Self {
            sender: FrameSender {
                tx,
                started: Instant::now(),
            },
            thread_handle: Some(thread_handle),
            latest,
            beats,
        })
    }

    /// A producer handle for the capture layer
    pub fn frame_sender(&self) -> FrameSender {
        self.sender.clone()
    }

    /// Queue a frame, blocking while the queue is full
    pub fn send_frame(&self, frame: Frame) -> Result<(), SessionError> {
        self.sender.send(frame)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<AnalysisSnapshot> {
        self.latest.lock().clone()
    }

    /// Subscribe to beat events published from now on
    pub fn subscribe_beats(&self) -> broadcast::Receiver<BeatEvent> {
        self.beats.subscribe()
    }

    /// Enable or disable beat detection, applied between two frames
    pub fn set_beat_detection(&self, enabled: bool) -> Result<(), SessionError> {
        self.control(SessionMessage::SetBeatDetection(enabled))
    }

    /// Switch visualization style on the running session
    pub fn apply_preset(&self, preset: StylePreset) -> Result<(), SessionError> {
        self.control(SessionMessage::ApplyPreset(Box::new(preset)))
    }

    /// Stop the session after already-queued frames are processed
    pub fn stop(&mut self) {
        let Some(handle) = self.thread_handle.take() else {
            return;
        };
        let _ = self.sender.tx.send(SessionMessage::Stop);
        if handle.join().is_err() {
            log::error!("Analysis thread panicked");
        }
    }

    fn control(&self, message: SessionMessage) -> Result<(), SessionError> {
        if self.thread_handle.is_none() {
            return Err(SessionError::Stopped);
        }
        self.sender
            .tx
            .send(message)
            .map_err(|_| SessionError::Stopped)
    }
}

impl Drop for AnalysisHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run the analysis loop until stopped or every sender is gone
fn run_analysis_thread(
    mut pipeline: AnalysisPipeline,
    rx: mpsc::Receiver<SessionMessage>,
    latest: Arc<Mutex<Arc<AnalysisSnapshot>>>,
    beats: broadcast::Sender<BeatEvent>,
) {
    while let Ok(message) = rx.recv() {
        match message {
            SessionMessage::Frame(frame) => {
                let Some(output) = pipeline.process(&frame) else {
                    continue;
                };
                if let Some(beat) = output.beat {
                    // No subscribers is fine
                    let _ = beats.send(beat);
                }
                // Build the snapshot before taking the lock
                let snapshot = Arc::new(output.snapshot);
                *latest.lock() = snapshot;
            }
            SessionMessage::SetBeatDetection(enabled) => {
                pipeline.set_beat_detection(enabled);
            }
            SessionMessage::ApplyPreset(preset) => {
                if let Err(e) = pipeline.apply_preset(&preset) {
                    log::warn!("Rejected preset '{}': {}", preset.name, e);
                }
            }
            SessionMessage::Stop => {
                log::info!("Analysis session stopping");
                return;
            }
        }
    }
    log::info!("Analysis frame channel disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{get_preset, BeatPhase};

    /// Energy sequence as frames: each pair carries (e, 0) so every bin's
    /// magnitude equals `e`
    fn energy_frame(energy: i8, timestamp_ms: u64) -> Frame {
        let mut data = vec![0i8; 64];
        for pair in data.chunks_mut(2).skip(1) {
            pair[0] = energy;
        }
        Frame::new(data, 8_000, timestamp_ms)
    }

    fn spawn() -> AnalysisHandle {
        AnalysisHandle::spawn(AnalysisConfig {
            frame_queue: 32,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn spawn_rejects_invalid_config() {
        let mut config = AnalysisConfig::default();
        config.bands.band_count = 0;
        assert!(matches!(
            AnalysisHandle::spawn(config),
            Err(SessionError::Config(ConfigError::ZeroBands))
        ));
    }

    #[test]
    fn initial_snapshot_is_empty() {
        let handle = spawn();
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.seq, 0);
        assert_eq!(snapshot.amplitudes.len(), 32);
    }

    #[test]
    fn frames_publish_snapshots_and_beats() {
        let mut handle = spawn();
        let mut beats = handle.subscribe_beats();

        for (i, e) in [1, 1, 1, 1, 10, 1, 1, 1, 1, 10].into_iter().enumerate() {
            handle.send_frame(energy_frame(e, i as u64 * 100)).unwrap();
        }
        handle.stop();

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.seq, 10);
        assert_eq!(snapshot.timestamp_ms, 900);
        assert_eq!(snapshot.last_beat.map(|b| b.timestamp_ms), Some(900));

        let first = beats.try_recv().unwrap();
        let second = beats.try_recv().unwrap();
        assert_eq!((first.timestamp_ms, second.timestamp_ms), (400, 900));
        assert!(beats.try_recv().is_err());
    }

    #[test]
    fn empty_frames_publish_nothing() {
        let mut handle = spawn();
        handle.send_frame(Frame::new(Vec::new(), 8_000, 0)).unwrap();
        handle.stop();
        assert_eq!(handle.snapshot().seq, 0);
    }

    #[test]
    fn toggle_is_ordered_with_frames() {
        let mut handle = spawn();
        handle.send_frame(energy_frame(3, 0)).unwrap();
        handle.set_beat_detection(false).unwrap();
        handle.send_frame(energy_frame(5, 100)).unwrap();
        handle.stop();

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.phase, BeatPhase::Disabled);
        assert_eq!(snapshot.detection.intensity, 0.0);
        assert_eq!(snapshot.detection.current_energy, 5.0);
    }

    #[test]
    fn preset_changes_band_count() {
        let mut handle = spawn();
        handle.apply_preset(get_preset("bass").unwrap()).unwrap();
        handle.send_frame(energy_frame(20, 0)).unwrap();
        handle.stop();
        assert_eq!(handle.snapshot().amplitudes.len(), 8);
    }

    #[test]
    fn stopped_session_refuses_work() {
        let mut handle = spawn();
        let sender = handle.frame_sender();
        handle.stop();

        assert!(matches!(handle.set_beat_detection(true), Err(SessionError::Stopped)));
        assert!(matches!(sender.send(energy_frame(1, 0)), Err(SessionError::Stopped)));
        // Stopping twice is harmless
        handle.stop();
    }

    #[test]
    fn try_send_reports_full_queue() {
        // No thread drains this queue
        let (tx, rx) = mpsc::sync_channel(1);
        let sender = FrameSender {
            tx,
            started: Instant::now(),
        };

        assert!(sender.try_send(energy_frame(4, 0)).unwrap());
        assert!(!sender.try_send(energy_frame(4, 10)).unwrap());

        // The queued frame is the first one; the dropped one never arrives
        match rx.try_recv() {
            Ok(SessionMessage::Frame(frame)) => assert_eq!(frame.timestamp_ms(), 0),
            _ => panic!("expected the first frame"),
        }
        assert!(rx.try_recv().is_err());

        drop(rx);
        assert!(matches!(
            sender.try_send(energy_frame(4, 20)),
            Err(SessionError::Stopped)
        ));
    }

    #[test]
    fn flooding_a_live_session_never_errors() {
        let handle = AnalysisHandle::spawn(AnalysisConfig {
            frame_queue: 1,
            ..Default::default()
        })
        .unwrap();
        let sender = handle.frame_sender();

        let accepted = (0..200)
            .map(|i| sender.try_send(energy_frame(4, i * 10)).unwrap())
            .filter(|&ok| ok)
            .count();
        assert!(accepted >= 1);
    }

    #[test]
    fn push_capture_accepts_raw_bytes() {
        let mut handle = spawn();
        let sender = handle.frame_sender();
        let mut bytes = vec![0u8; 64];
        bytes[2] = 0xF6; // -10
        assert!(sender.push_capture(&bytes, 8_000).unwrap());
        handle.stop();

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.seq, 1);
        assert!(snapshot.detection.current_energy > 0.0);
    }

    #[tokio::test]
    async fn beats_can_be_awaited() {
        let handle = spawn();
        let mut beats = handle.subscribe_beats();
        let sender = handle.frame_sender();

        tokio::task::spawn_blocking(move || {
            for (i, e) in [1, 1, 1, 1, 12].into_iter().enumerate() {
                sender.send(energy_frame(e, i as u64 * 100)).unwrap();
            }
        })
        .await
        .unwrap();

        let beat = tokio::time::timeout(std::time::Duration::from_secs(5), beats.recv())
            .await
            .expect("beat within timeout")
            .unwrap();
        assert_eq!(beat.timestamp_ms, 400);
        assert!(beat.dominant_frequency_hz.is_some());
    }
}
