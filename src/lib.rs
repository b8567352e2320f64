// Wavescope - playback and timeline core for desktop audio analysis tools
// Module declarations

pub mod audio;
pub mod config;
pub mod error;
pub mod session;
pub mod spectrogram;
pub mod timeline;
pub mod waveform;

pub use audio::{
    DeviceBackend, OutputSink, PlaybackBackend, PlaybackController, PlaybackState, StreamSpec,
    SymphoniaSource, TrackInfo, TrackSource,
};
pub use config::EngineSettings;
pub use error::{IngestError, PlaybackError};
pub use session::AnalysisSession;
pub use spectrogram::{SpectrogramGrid, DEFAULT_DELIMITER};
pub use timeline::{PlayheadCursor, PositionWatcher, TimelineIndexMapper};
pub use waveform::WaveformData;
