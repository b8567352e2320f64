// Playback backend
// The seam between the streaming loop and concrete audio I/O: open a
// track source, open an output sink sized to a format. Tests substitute
// fakes; DeviceBackend wires Symphonia decoding to the cpal device.

use std::path::PathBuf;

use crate::audio::output::{CpalOutput, OutputSink, StreamSpec};
use crate::audio::source::{SymphoniaSource, TrackSource};
use crate::error::PlaybackError;

/// Opens the source and sink for one playback pass.
///
/// Both are created on the streaming thread and exclusively owned by it
/// until the pass ends.
pub trait PlaybackBackend: Send {
    fn open_source(&mut self) -> Result<Box<dyn TrackSource>, PlaybackError>;
    fn open_sink(&mut self, spec: &StreamSpec) -> Result<Box<dyn OutputSink>, PlaybackError>;
}

/// The real thing: a sound file decoded through Symphonia, played on the
/// default cpal output device
pub struct DeviceBackend {
    path: PathBuf,
    volume: f32,
}

impl DeviceBackend {
    pub fn new<P: Into<PathBuf>>(path: P, volume: f32) -> Self {
        Self {
            path: path.into(),
            volume,
        }
    }
}

impl PlaybackBackend for DeviceBackend {
    fn open_source(&mut self) -> Result<Box<dyn TrackSource>, PlaybackError> {
        Ok(Box::new(SymphoniaSource::open(&self.path)?))
    }

    fn open_sink(&mut self, spec: &StreamSpec) -> Result<Box<dyn OutputSink>, PlaybackError> {
        Ok(Box::new(CpalOutput::open(spec, self.volume)?))
    }
}
