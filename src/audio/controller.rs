// Playback controller
// Owns the one legal streaming session per loaded track and keeps the
// shared playhead consistent with actual audio output progress.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, info};
use parking_lot::{Condvar, Mutex};

use crate::audio::backend::PlaybackBackend;
use crate::audio::output::StreamSpec;
use crate::error::PlaybackError;
use crate::timeline::cursor::PlayheadCursor;

/// Lifecycle of the streaming session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Created, never played
    Idle,
    Playing,
    Paused,
    /// Unwound: sink and source released, cursor rewound to 0
    Stopped,
    /// Terminal; no further operations are legal
    Closed,
}

#[derive(Debug)]
struct TransportFlags {
    stopped: bool,
    paused: bool,
    closed: bool,
}

/// Shared between the control surface and the worker thread. Every flag
/// transition notifies the condvar so a paused or idle worker unblocks
/// promptly.
struct Transport {
    flags: Mutex<TransportFlags>,
    signal: Condvar,
    started: AtomicBool,
    last_error: Mutex<Option<PlaybackError>>,
}

/// Streams a track to the output device on a dedicated worker thread.
///
/// The worker idles until `play()`, then repeatedly: reads the cursor,
/// seeks the source to the matching frame, reads one chunk, writes it to
/// the sink, and advances the cursor by the chunk duration. Reseeking
/// from the cursor every iteration is what makes external seeks take
/// effect on the very next chunk.
///
/// The controller communicates with the rest of the system only through
/// the shared cursor; it never touches a widget or a watcher.
pub struct PlaybackController {
    transport: Arc<Transport>,
    cursor: Arc<PlayheadCursor>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackController {
    /// Spawn the worker thread. It opens no device or file until the
    /// first `play()`.
    pub fn spawn(
        backend: Box<dyn PlaybackBackend>,
        cursor: Arc<PlayheadCursor>,
        chunk_seconds: f64,
    ) -> Self {
        let transport = Arc::new(Transport {
            flags: Mutex::new(TransportFlags {
                stopped: true,
                paused: false,
                closed: false,
            }),
            signal: Condvar::new(),
            started: AtomicBool::new(false),
            last_error: Mutex::new(None),
        });

        let worker = Worker {
            backend,
            cursor: Arc::clone(&cursor),
            transport: Arc::clone(&transport),
            chunk_seconds,
        };
        let handle = thread::spawn(move || worker.run());

        Self {
            transport,
            cursor,
            handle: Some(handle),
        }
    }

    /// Begin (or restart) streaming from the cursor's current position
    pub fn play(&self) {
        let mut flags = self.transport.flags.lock();
        if flags.closed || !flags.stopped {
            return;
        }
        flags.stopped = false;
        flags.paused = false;
        self.transport.started.store(true, Ordering::Release);
        self.transport.signal.notify_all();
    }

    /// Toggle pause: one operation both pauses and resumes. While paused
    /// the sink stays open and the cursor does not move; resuming
    /// continues from the exact paused position.
    pub fn toggle_pause(&self) {
        let mut flags = self.transport.flags.lock();
        if flags.closed || flags.stopped {
            return;
        }
        flags.paused = !flags.paused;
        self.transport.signal.notify_all();
    }

    /// Stop streaming. A full stop always rewinds: the cursor returns to
    /// 0 and the paused flag is cleared.
    pub fn stop(&self) {
        {
            let mut flags = self.transport.flags.lock();
            if flags.closed {
                return;
            }
            flags.stopped = true;
            flags.paused = false;
            self.transport.signal.notify_all();
        }
        self.cursor.set(0.0);
    }

    /// Terminal shutdown: observed by the worker within one iteration,
    /// releases the sink and file handle, and joins the thread.
    /// Idempotent.
    pub fn close(&mut self) {
        {
            let mut flags = self.transport.flags.lock();
            flags.closed = true;
            self.transport.signal.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn state(&self) -> PlaybackState {
        let flags = self.transport.flags.lock();
        if flags.closed {
            PlaybackState::Closed
        } else if flags.stopped {
            if self.transport.started.load(Ordering::Acquire) {
                PlaybackState::Stopped
            } else {
                PlaybackState::Idle
            }
        } else if flags.paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        }
    }

    /// The error that ended the last pass, if any. Playback errors are
    /// local to one pass; the cursor and everything else stay intact so
    /// the caller can retry explicitly.
    pub fn take_error(&self) -> Option<PlaybackError> {
        self.transport.last_error.lock().take()
    }

    pub fn cursor(&self) -> &Arc<PlayheadCursor> {
        &self.cursor
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.close();
    }
}

struct Worker {
    backend: Box<dyn PlaybackBackend>,
    cursor: Arc<PlayheadCursor>,
    transport: Arc<Transport>,
    chunk_seconds: f64,
}

impl Worker {
    fn run(mut self) {
        loop {
            // idle until play or close
            {
                let mut flags = self.transport.flags.lock();
                while flags.stopped && !flags.closed {
                    self.transport.signal.wait(&mut flags);
                }
                if flags.closed {
                    break;
                }
            }

            if let Err(err) = self.stream_pass() {
                error!("playback pass failed: {}", err);
                *self.transport.last_error.lock() = Some(err);
            }

            // unwind: sink and source are already released (pass scope).
            // The rewind happens inside the critical section so nobody can
            // observe Stopped with a stale cursor.
            {
                let mut flags = self.transport.flags.lock();
                flags.stopped = true;
                flags.paused = false;
                if flags.closed {
                    break;
                }
                // a full stop always rewinds
                self.cursor.set(0.0);
            }
        }
        info!("playback worker exited");
    }

    /// One streaming pass: open source and sink, stream chunks until the
    /// track ends or stop/close is observed. The sink and source are
    /// dropped when this returns, whatever the reason.
    fn stream_pass(&mut self) -> Result<(), PlaybackError> {
        let mut source = self.backend.open_source()?;
        let info = source.info().clone();
        let spec = StreamSpec {
            sample_rate: info.sample_rate,
            channels: info.channels,
        };
        let mut sink = self.backend.open_sink(&spec)?;

        info!(
            "streaming {:.2}s at {} Hz, {} channel(s)",
            info.duration_seconds, info.sample_rate, info.channels
        );

        let frames_per_chunk = ((self.chunk_seconds * info.sample_rate as f64) as usize).max(1);

        loop {
            // blocking wait while paused; stop and close wake this too
            {
                let mut flags = self.transport.flags.lock();
                while flags.paused && !flags.stopped && !flags.closed {
                    self.transport.signal.wait(&mut flags);
                }
                if flags.stopped || flags.closed {
                    return Ok(());
                }
            }

            let position = self.cursor.get();
            if position >= info.duration_seconds {
                return Ok(());
            }

            // reseek from the cursor so external seeks land on this chunk
            let frame_offset = (position * info.sample_rate as f64) as u64;
            let samples = source.read_frames(frame_offset, frames_per_chunk)?;
            if samples.is_empty() {
                return Ok(());
            }

            sink.write_blocking(&samples);
            self.cursor.advance(self.chunk_seconds);
        }
    }
}
