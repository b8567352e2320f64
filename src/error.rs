// Error taxonomy for the engine
// Ingestion errors abort a load entirely; playback errors end one pass
// and leave the cursor and grid intact.

use thiserror::Error;

/// Spectrogram ingestion failures. Fatal to the load: no partial grid is
/// ever exposed to callers.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read spectrogram file: {0}")]
    Io(#[from] std::io::Error),

    /// The header row carries no frequency labels after the leading cell.
    #[error("spectrogram header has no frequency labels")]
    EmptyHeader,

    /// The file contains a header but no data rows.
    #[error("spectrogram has no data rows")]
    NoDataRows,

    /// A cell failed to parse as a real number. Rows and columns are
    /// zero-based file coordinates (row 0 is the header).
    #[error("row {row}, column {col}: cannot parse {value:?} as a number")]
    InvalidNumber {
        row: usize,
        col: usize,
        value: String,
    },

    /// Even after zero-padding, the flattened cell count does not match
    /// rows x bins (a row was too wide, or whole rows were missing).
    #[error("grid shape mismatch: expected {expected} power cells, found {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

/// Playback I/O failures. Local to one streaming pass: the controller
/// recovers to Stopped and does not retry.
#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    #[error("failed to open track source: {0}")]
    SourceOpen(String),

    #[error("failed to open output device: {0}")]
    SinkOpen(String),

    #[error("error reading track: {0}")]
    SourceRead(String),
}
