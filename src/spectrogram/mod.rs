// Spectrogram module
// Ingestion of delimited matrix exports into the time/frequency/power
// grid the timeline indexes into

pub mod ingest;

pub use ingest::{SpectrogramGrid, DEFAULT_DELIMITER};
