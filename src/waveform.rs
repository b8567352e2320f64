// Waveform extraction
// Reads a whole track and splits the interleaved samples into one vector
// per channel, the data behind the waveform pane. Rendering is the UI's
// job.

use crate::audio::source::TrackSource;
use crate::error::PlaybackError;

/// How many frames to pull from the source per read while extracting
const EXTRACT_CHUNK_FRAMES: usize = 65536;

/// Per-channel sample data for a whole track
pub struct WaveformData {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl WaveformData {
    /// Read the full track and de-interleave it
    pub fn extract(source: &mut dyn TrackSource) -> Result<Self, PlaybackError> {
        let info = source.info().clone();
        let channel_count = (info.channels as usize).max(1);
        let mut channels = vec![Vec::new(); channel_count];

        let mut frame_offset = 0u64;
        loop {
            let samples = source.read_frames(frame_offset, EXTRACT_CHUNK_FRAMES)?;
            if samples.is_empty() {
                break;
            }
            for frame in samples.chunks(channel_count) {
                for (ch, &sample) in frame.iter().enumerate() {
                    channels[ch].push(sample);
                }
            }
            frame_offset += (samples.len() / channel_count) as u64;
        }

        Ok(Self {
            channels,
            sample_rate: info.sample_rate,
        })
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames per channel
    pub fn len_frames(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.len_frames() as f64 / self.sample_rate as f64
    }

    /// Timestamps for each frame, for plotting against a channel
    pub fn time_axis(&self) -> Vec<f64> {
        let rate = self.sample_rate as f64;
        (0..self.len_frames()).map(|i| i as f64 / rate).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::TrackInfo;

    /// Yields frames whose samples encode (frame, channel) so the
    /// de-interleave can be checked exactly
    struct PatternSource {
        info: TrackInfo,
    }

    impl TrackSource for PatternSource {
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
            let channels = self.info.channels as usize;
            let mut samples = Vec::with_capacity(frames * channels);
            for i in 0..frames {
                let frame = frame_offset + i as u64;
                for ch in 0..channels {
                    samples.push(frame as f32 + ch as f32 * 0.5);
                }
            }
            Ok(samples)
        }
    }

    fn stereo_source(total_frames: u64) -> PatternSource {
        PatternSource {
            info: TrackInfo {
                sample_rate: 4,
                channels: 2,
                total_frames,
                duration_seconds: total_frames as f64 / 4.0,
            },
        }
    }

    #[test]
    fn test_deinterleaves_channels() {
        let mut source = stereo_source(3);
        let waveform = WaveformData::extract(&mut source).unwrap();

        assert_eq!(waveform.channels().len(), 2);
        assert_eq!(waveform.channels()[0], vec![0.0, 1.0, 2.0]);
        assert_eq!(waveform.channels()[1], vec![0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_time_axis_follows_sample_rate() {
        let mut source = stereo_source(4);
        let waveform = WaveformData::extract(&mut source).unwrap();

        assert_eq!(waveform.len_frames(), 4);
        assert_eq!(waveform.duration_seconds(), 1.0);
        assert_eq!(waveform.time_axis(), vec![0.0, 0.25, 0.5, 0.75]);
    }
}
