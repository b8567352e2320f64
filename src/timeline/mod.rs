// Timeline module
// The shared playhead, the polling watcher that fans its motion out,
// and the time-to-column index mapper

pub mod cursor;
pub mod mapper;
pub mod watcher;

pub use cursor::PlayheadCursor;
pub use mapper::TimelineIndexMapper;
pub use watcher::PositionWatcher;
