// Time-to-column index mapping
// Maps a playhead position onto the spectrogram's discrete time axis
// with a nearest-preceding-sample policy.

use std::sync::Arc;

use crate::spectrogram::ingest::SpectrogramGrid;

/// Pure lookup over an immutable grid: which time column does a playhead
/// position fall into?
#[derive(Clone)]
pub struct TimelineIndexMapper {
    grid: Arc<SpectrogramGrid>,
}

impl TimelineIndexMapper {
    pub fn new(grid: Arc<SpectrogramGrid>) -> Self {
        Self { grid }
    }

    /// The greatest index `i` such that `time_axis[i] <= seconds`.
    ///
    /// Values before the first sample clamp to 0 and values past the last
    /// sample clamp to the final index; neither is an error.
    pub fn index_for(&self, seconds: f64) -> usize {
        let axis = self.grid.time_axis();
        axis.partition_point(|&t| t <= seconds).saturating_sub(1)
    }

    /// Timestamp of a given column, for driving the cursor from a
    /// discrete selector
    pub fn time_at(&self, index: usize) -> Option<f64> {
        self.grid.time_axis().get(index).copied()
    }

    pub fn grid(&self) -> &Arc<SpectrogramGrid> {
        &self.grid
    }
}
