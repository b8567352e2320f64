// Audio playback module
// Uses Symphonia for decoding and cpal for output

pub mod backend;
pub mod controller;
pub mod output;
pub mod source;

pub use backend::{DeviceBackend, PlaybackBackend};
pub use controller::{PlaybackController, PlaybackState};
pub use output::{OutputSink, StreamSpec};
pub use source::{SymphoniaSource, TrackInfo, TrackSource};
