// Analysis session
// Per-track composition root: ties the ingested grid, the playhead, the
// playback controller and the position watcher together, and exposes the
// surface the UI layer drives.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::info;

use crate::audio::backend::{DeviceBackend, PlaybackBackend};
use crate::audio::controller::{PlaybackController, PlaybackState};
use crate::audio::source::{SymphoniaSource, TrackInfo};
use crate::config::EngineSettings;
use crate::error::PlaybackError;
use crate::spectrogram::ingest::{SpectrogramGrid, DEFAULT_DELIMITER};
use crate::timeline::cursor::PlayheadCursor;
use crate::timeline::mapper::TimelineIndexMapper;
use crate::timeline::watcher::PositionWatcher;

/// One loaded track plus its spectrogram: the playback controller and
/// the position watcher run for the lifetime of the session and are
/// stopped together when it closes.
pub struct AnalysisSession {
    grid: Arc<SpectrogramGrid>,
    mapper: TimelineIndexMapper,
    cursor: Arc<PlayheadCursor>,
    controller: PlaybackController,
    watcher: PositionWatcher,
    track_info: TrackInfo,
}

impl AnalysisSession {
    /// Load a spectrogram export and its sound file. Ingestion failure
    /// aborts the whole load; no partial session is ever returned.
    pub fn open(
        spectrogram_path: &Path,
        track_path: &Path,
        settings: EngineSettings,
    ) -> anyhow::Result<Self> {
        let grid = SpectrogramGrid::from_path(spectrogram_path, DEFAULT_DELIMITER)
            .with_context(|| format!("failed to load spectrogram {:?}", spectrogram_path))?;

        let track_info = SymphoniaSource::probe(track_path)
            .with_context(|| format!("failed to probe track {:?}", track_path))?;

        info!(
            "session opened: {} time columns, {} bins, track {:.2}s",
            grid.num_samples(),
            grid.num_bins(),
            track_info.duration_seconds
        );

        let backend = DeviceBackend::new(track_path, settings.volume);
        Ok(Self::from_parts(grid, Box::new(backend), track_info, &settings))
    }

    /// Assemble a session from already-built parts. `open` uses this with
    /// the real device backend; tests inject fakes.
    pub fn from_parts(
        grid: SpectrogramGrid,
        backend: Box<dyn PlaybackBackend>,
        track_info: TrackInfo,
        settings: &EngineSettings,
    ) -> Self {
        let grid = Arc::new(grid);
        let cursor = Arc::new(PlayheadCursor::new(track_info.duration_seconds));
        let controller =
            PlaybackController::spawn(backend, Arc::clone(&cursor), settings.chunk_seconds);
        let watcher = PositionWatcher::spawn(
            Arc::clone(&cursor),
            Duration::from_millis(settings.poll_interval_ms),
        );
        let mapper = TimelineIndexMapper::new(Arc::clone(&grid));

        Self {
            grid,
            mapper,
            cursor,
            controller,
            watcher,
            track_info,
        }
    }

    pub fn play(&self) {
        self.controller.play();
    }

    /// One operation both pauses and resumes
    pub fn toggle_pause(&self) {
        self.controller.toggle_pause();
    }

    /// Stop and rewind to 0
    pub fn stop(&self) {
        self.controller.stop();
    }

    /// Move the playhead; out-of-range values clamp. Takes effect on the
    /// very next streaming chunk when playing.
    pub fn seek(&self, seconds: f64) {
        self.cursor.set(seconds);
    }

    pub fn position(&self) -> f64 {
        self.cursor.get()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.controller.state()
    }

    /// Raw playhead fan-out: invoked with the new position on every
    /// observed change, whatever wrote it
    pub fn subscribe_position(&self, callback: impl Fn(f64) + Send + 'static) {
        self.watcher.subscribe(callback);
    }

    /// Playhead fan-out mapped to a spectrogram column, for driving a
    /// discrete selector
    pub fn subscribe_column(&self, callback: impl Fn(usize) + Send + 'static) {
        let mapper = self.mapper.clone();
        self.watcher
            .subscribe(move |seconds| callback(mapper.index_for(seconds)));
    }

    pub fn grid(&self) -> &Arc<SpectrogramGrid> {
        &self.grid
    }

    pub fn mapper(&self) -> &TimelineIndexMapper {
        &self.mapper
    }

    pub fn cursor(&self) -> &Arc<PlayheadCursor> {
        &self.cursor
    }

    pub fn track_info(&self) -> &TrackInfo {
        &self.track_info
    }

    /// The error that ended the last playback pass, if any
    pub fn take_playback_error(&self) -> Option<PlaybackError> {
        self.controller.take_error()
    }

    /// Shut both background loops down. Idempotent; also runs on drop.
    pub fn close(&mut self) {
        self.controller.close();
        self.watcher.stop();
    }
}

impl Drop for AnalysisSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::output::{OutputSink, StreamSpec};
    use crate::audio::source::TrackSource;
    use parking_lot::Mutex;
    use std::time::Instant;

    struct SilenceSource {
        info: TrackInfo,
    }

    impl TrackSource for SilenceSource {
        fn info(&self) -> &TrackInfo {
            &self.info
        }

        fn read_frames(
            &mut self,
            frame_offset: u64,
            max_frames: usize,
        ) -> Result<Vec<f32>, PlaybackError> {
            if frame_offset >= self.info.total_frames {
                return Ok(Vec::new());
            }
            let frames = max_frames.min((self.info.total_frames - frame_offset) as usize);
            Ok(vec![0.0; frames * self.info.channels as usize])
        }
    }

    struct NullSink;

    impl OutputSink for NullSink {
        fn write_blocking(&mut self, _samples: &[f32]) {
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    struct SilenceBackend {
        info: TrackInfo,
    }

    impl PlaybackBackend for SilenceBackend {
        fn open_source(&mut self) -> Result<Box<dyn TrackSource>, PlaybackError> {
            Ok(Box::new(SilenceSource {
                info: self.info.clone(),
            }))
        }

        fn open_sink(&mut self, _spec: &StreamSpec) -> Result<Box<dyn OutputSink>, PlaybackError> {
            Ok(Box::new(NullSink))
        }
    }

    fn test_session() -> AnalysisSession {
        let grid = SpectrogramGrid::from_text(
            ";100;200\n0.0;1;2\n0.5;3;4\n1.0;5;6\n",
            ';',
        )
        .unwrap();
        let info = TrackInfo {
            sample_rate: 8000,
            channels: 1,
            total_frames: 12000,
            duration_seconds: 1.5,
        };
        let settings = EngineSettings {
            chunk_seconds: 0.1,
            poll_interval_ms: 5,
            volume: 1.0,
        };
        AnalysisSession::from_parts(
            grid,
            Box::new(SilenceBackend { info: info.clone() }),
            info,
            &settings,
        )
    }

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_seek_clamps_to_track_bounds() {
        let session = test_session();
        session.seek(100.0);
        assert_eq!(session.position(), 1.5);
        session.seek(-3.0);
        assert_eq!(session.position(), 0.0);
    }

    #[test]
    fn test_column_subscription_follows_playhead() {
        let session = test_session();
        let columns: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&columns);
        session.subscribe_column(move |index| sink.lock().push(index));

        session.seek(0.6);
        assert!(wait_until(Duration::from_secs(2), || {
            columns.lock().last() == Some(&1)
        }));

        session.seek(1.2);
        assert!(wait_until(Duration::from_secs(2), || {
            columns.lock().last() == Some(&2)
        }));
    }

    #[test]
    fn test_play_stop_round_trip() {
        let mut session = test_session();
        session.play();
        assert!(wait_until(Duration::from_secs(5), || session.position() > 0.15));
        assert_eq!(session.playback_state(), PlaybackState::Playing);

        session.stop();
        assert!(wait_until(Duration::from_secs(5), || {
            session.playback_state() == PlaybackState::Stopped && session.position() == 0.0
        }));
        session.close();
        assert_eq!(session.playback_state(), PlaybackState::Closed);
    }
}
