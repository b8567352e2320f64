// Spectrogram ingestion
// Parses a delimited matrix export (header row of frequency labels, one
// leading time cell per data row) into an immutable time x frequency
// power grid.

use std::fs;
use std::path::Path;

use log::warn;

use crate::error::IngestError;

/// Delimiter used by the analyzer's matrix exports
pub const DEFAULT_DELIMITER: char = ';';

/// The time x frequency power matrix produced by ingestion.
///
/// `power` is stored flat in row-major, time-major order: the cell for
/// time column `i` and frequency bin `j` lives at `i * num_bins() + j`.
/// Built once at load time; immutable thereafter.
#[derive(Debug)]
pub struct SpectrogramGrid {
    time_axis: Vec<f64>,
    frequency_axis: Vec<f64>,
    power: Vec<f64>,
}

impl SpectrogramGrid {
    /// Ingest a spectrogram file from disk
    pub fn from_path<P: AsRef<Path>>(path: P, delimiter: char) -> Result<Self, IngestError> {
        let text = fs::read_to_string(path)?;
        Self::from_text(&text, delimiter)
    }

    /// Ingest a spectrogram from delimited text.
    ///
    /// One streaming pass extracts the time axis (first cell per data
    /// row) and flattens the remaining cells. If the flattened cell count
    /// is not a multiple of the bin count it is zero-padded up to the
    /// next full row before reshape: a defined, lossy recovery for ragged
    /// exports, not silent data loss. Padding that still cannot reach
    /// rows x bins fails with `ShapeMismatch`.
    pub fn from_text(text: &str, delimiter: char) -> Result<Self, IngestError> {
        // dimension pre-scan: total rows and header column count
        let (num_rows, num_cols) = scan_dimensions(text, delimiter)?;
        let num_samples = num_rows - 1;
        let num_bins = num_cols - 1;
        if num_bins == 0 {
            return Err(IngestError::EmptyHeader);
        }
        if num_samples == 0 {
            return Err(IngestError::NoDataRows);
        }

        let mut time_axis = Vec::with_capacity(num_samples);
        let mut frequency_axis = Vec::with_capacity(num_bins);
        let mut power = Vec::with_capacity(num_samples * num_bins);

        for (row, line) in text.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            let mut cells = line.split(delimiter);
            if row == 0 {
                // header: leading cell is ignored, the rest are bin labels
                cells.next();
                for (col, cell) in cells.enumerate() {
                    frequency_axis.push(parse_cell(cell, row, col + 1)?);
                }
                continue;
            }
            let time_cell = cells.next().unwrap_or("");
            time_axis.push(parse_cell(time_cell, row, 0)?);
            for (col, cell) in cells.enumerate() {
                power.push(parse_cell(cell, row, col + 1)?);
            }
        }

        // ragged-row recovery: zero-fill up to the next full row
        if power.len() % num_bins != 0 {
            let missing = num_bins - power.len() % num_bins;
            warn!(
                "spectrogram is missing {} power cell(s); zero-padding to a full row",
                missing
            );
            power.resize(power.len() + missing, 0.0);
        }

        let expected = num_samples * num_bins;
        if power.len() != expected {
            return Err(IngestError::ShapeMismatch {
                expected,
                actual: power.len(),
            });
        }

        Ok(Self {
            time_axis,
            frequency_axis,
            power,
        })
    }

    /// Number of time columns (N)
    pub fn num_samples(&self) -> usize {
        self.time_axis.len()
    }

    /// Number of frequency bins (M)
    pub fn num_bins(&self) -> usize {
        self.frequency_axis.len()
    }

    pub fn time_axis(&self) -> &[f64] {
        &self.time_axis
    }

    pub fn frequency_axis(&self) -> &[f64] {
        &self.frequency_axis
    }

    /// Flat N x M power matrix, time-major
    pub fn power(&self) -> &[f64] {
        &self.power
    }

    /// The M power values of one time column
    pub fn spectrum_at(&self, sample: usize) -> Option<&[f64]> {
        if sample >= self.num_samples() {
            return None;
        }
        let bins = self.num_bins();
        Some(&self.power[sample * bins..(sample + 1) * bins])
    }

    /// Transposed M x N copy, frequency-major: the orientation image
    /// renderers index by row
    pub fn bin_major(&self) -> Vec<f64> {
        let (samples, bins) = (self.num_samples(), self.num_bins());
        let mut out = vec![0.0; samples * bins];
        for i in 0..samples {
            for j in 0..bins {
                out[j * samples + i] = self.power[i * bins + j];
            }
        }
        out
    }

    /// Frequency of the strongest bin in a time column
    pub fn dominant_frequency(&self, sample: usize) -> Option<f64> {
        let spectrum = self.spectrum_at(sample)?;
        let (argmax, _) = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        Some(self.frequency_axis[argmax])
    }

    /// Power of the strongest bin in a time column
    pub fn peak_power(&self, sample: usize) -> Option<f64> {
        let spectrum = self.spectrum_at(sample)?;
        spectrum.iter().copied().max_by(f64::total_cmp)
    }
}

fn scan_dimensions(text: &str, delimiter: char) -> Result<(usize, usize), IngestError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or(IngestError::EmptyHeader)?;
    let num_cols = header.split(delimiter).count();
    let num_rows = 1 + lines.count();
    Ok((num_rows, num_cols))
}

fn parse_cell(cell: &str, row: usize, col: usize) -> Result<f64, IngestError> {
    cell.trim()
        .parse::<f64>()
        .map_err(|_| IngestError::InvalidNumber {
            row,
            col,
            value: cell.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "\
;100;200;300;400
0.0;1;2;3;4
0.1;5;6;7;8
0.2;9;10;11;12
";

    #[test]
    fn test_round_trip_dimensions() {
        let grid = SpectrogramGrid::from_text(WELL_FORMED, ';').unwrap();
        assert_eq!(grid.num_samples(), 3);
        assert_eq!(grid.num_bins(), 4);
        assert_eq!(grid.time_axis(), &[0.0, 0.1, 0.2]);
        assert_eq!(grid.frequency_axis(), &[100.0, 200.0, 300.0, 400.0]);
        assert_eq!(grid.power().len(), 12);
    }

    #[test]
    fn test_spectrum_at_reads_one_time_column() {
        let grid = SpectrogramGrid::from_text(WELL_FORMED, ';').unwrap();
        assert_eq!(grid.spectrum_at(1), Some(&[5.0, 6.0, 7.0, 8.0][..]));
        assert_eq!(grid.spectrum_at(3), None);
    }

    #[test]
    fn test_bin_major_is_the_transpose() {
        let grid = SpectrogramGrid::from_text(WELL_FORMED, ';').unwrap();
        let transposed = grid.bin_major();
        // bin 0 across time: 1, 5, 9
        assert_eq!(&transposed[0..3], &[1.0, 5.0, 9.0]);
        // bin 3 across time: 4, 8, 12
        assert_eq!(&transposed[9..12], &[4.0, 8.0, 12.0]);
    }

    #[test]
    fn test_ragged_final_row_is_zero_padded() {
        // 3 rows x 4 bins expected but only 11 power cells present
        let text = "\
;100;200;300;400
0.0;1;2;3;4
0.1;5;6;7;8
0.2;9;10;11
";
        let grid = SpectrogramGrid::from_text(text, ';').unwrap();
        assert_eq!(grid.num_samples(), 3);
        assert_eq!(grid.power().len(), 12);
        assert_eq!(grid.power()[11], 0.0);
        assert_eq!(grid.spectrum_at(2), Some(&[9.0, 10.0, 11.0, 0.0][..]));
    }

    #[test]
    fn test_empty_file_rejected() {
        let err = SpectrogramGrid::from_text("", ';').unwrap_err();
        assert!(matches!(err, IngestError::EmptyHeader));
    }

    #[test]
    fn test_header_without_labels_rejected() {
        let err = SpectrogramGrid::from_text("label\n0.0;1\n", ';').unwrap_err();
        assert!(matches!(err, IngestError::EmptyHeader));
    }

    #[test]
    fn test_header_only_rejected() {
        let err = SpectrogramGrid::from_text(";100;200\n", ';').unwrap_err();
        assert!(matches!(err, IngestError::NoDataRows));
    }

    #[test]
    fn test_non_numeric_cell_rejected_with_location() {
        let text = ";100;200\n0.0;1;oops\n";
        let err = SpectrogramGrid::from_text(text, ';').unwrap_err();
        match err {
            IngestError::InvalidNumber { row, col, value } => {
                assert_eq!(row, 1);
                assert_eq!(col, 2);
                assert_eq!(value, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_overwide_row_rejected() {
        // 5 power cells pad up to 6, which still cannot fill 2 rows x 2 bins
        let text = ";100;200\n0.0;1;2;3\n0.1;4;5\n";
        let err = SpectrogramGrid::from_text(text, ';').unwrap_err();
        assert!(matches!(
            err,
            IngestError::ShapeMismatch {
                expected: 4,
                actual: 6
            }
        ));
    }

    #[test]
    fn test_dominant_frequency_and_peak() {
        let grid = SpectrogramGrid::from_text(WELL_FORMED, ';').unwrap();
        assert_eq!(grid.dominant_frequency(0), Some(400.0));
        assert_eq!(grid.peak_power(2), Some(12.0));
        assert_eq!(grid.dominant_frequency(9), None);
    }

    #[test]
    fn test_alternate_delimiter() {
        let text = ",100,200\n0.0,1,2\n";
        let grid = SpectrogramGrid::from_text(text, ',').unwrap();
        assert_eq!(grid.num_bins(), 2);
        assert_eq!(grid.spectrum_at(0), Some(&[1.0, 2.0][..]));
    }
}
