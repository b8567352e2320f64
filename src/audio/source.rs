// Track sources
// Seekable decoded PCM behind a trait so the streaming loop can be
// exercised without real files; the production implementation decodes
// through Symphonia.

use std::fs::File;
use std::path::Path;

use log::warn;
use symphonia::core::audio::{AudioBufferRef, AudioPlanes, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use symphonia::core::units::Time;

use crate::error::PlaybackError;

/// Format facts needed before playback can start
#[derive(Debug, Clone)]
pub struct TrackInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub total_frames: u64,
    pub duration_seconds: f64,
}

/// A seekable sound-file reader: sample rate, channel count, total frame
/// count, and random-access frame reads.
///
/// Consumed exclusively by the playback controller for the duration of
/// one streaming pass, and by waveform extraction at load time.
pub trait TrackSource {
    fn info(&self) -> &TrackInfo;

    /// Read up to `max_frames` frames of interleaved f32 samples starting
    /// at `frame_offset`. Returns fewer frames only at end of track, an
    /// empty vec at or past the end.
    fn read_frames(
        &mut self,
        frame_offset: u64,
        max_frames: usize,
    ) -> Result<Vec<f32>, PlaybackError>;
}

/// Symphonia-backed track source
pub struct SymphoniaSource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    info: TrackInfo,
}

impl SymphoniaSource {
    /// Open an audio file and prepare for decoding
    pub fn open(path: &Path) -> Result<Self, PlaybackError> {
        let file = File::open(path)
            .map_err(|e| PlaybackError::SourceOpen(format!("{:?}: {}", path, e)))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| PlaybackError::SourceOpen(format!("unrecognized format: {}", e)))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| PlaybackError::SourceOpen("no audio track found".to_string()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| PlaybackError::SourceOpen("track reports no sample rate".to_string()))?;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);
        let total_frames = track
            .codec_params
            .n_frames
            .ok_or_else(|| PlaybackError::SourceOpen("track reports no frame count".to_string()))?;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| PlaybackError::SourceOpen(format!("no decoder: {}", e)))?;

        let info = TrackInfo {
            sample_rate,
            channels,
            total_frames,
            duration_seconds: total_frames as f64 / sample_rate as f64,
        };

        Ok(Self {
            format,
            decoder,
            track_id,
            info,
        })
    }

    /// Open just long enough to read the track's format facts
    pub fn probe(path: &Path) -> Result<TrackInfo, PlaybackError> {
        Self::open(path).map(|source| source.info)
    }

    /// Seek to a frame position; returns the frame actually landed on
    /// (coarse seeks may land earlier than requested)
    fn seek_to_frame(&mut self, frame_offset: u64) -> Result<u64, PlaybackError> {
        let seconds = frame_offset as f64 / self.info.sample_rate as f64;
        let time = Time::new(seconds as u64, seconds.fract());

        let seeked_to = self
            .format
            .seek(
                SeekMode::Coarse,
                SeekTo::Time {
                    time,
                    track_id: Some(self.track_id),
                },
            )
            .map_err(|e| PlaybackError::SourceRead(format!("seek failed: {}", e)))?;

        // decoder state is stale after a demuxer seek
        self.decoder.reset();

        Ok(seeked_to.actual_ts)
    }

    /// Decode the next packet to interleaved f32 samples; None at end of
    /// stream
    fn decode_next(&mut self) -> Result<Option<Vec<f32>>, PlaybackError> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(PlaybackError::SourceRead(format!("read packet: {}", e))),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => return Ok(Some(audio_buf_to_f32(&decoded))),
                Err(SymphoniaError::DecodeError(e)) => {
                    // recoverable; skip the bad packet
                    warn!("decode error (skipping): {}", e);
                    continue;
                }
                Err(e) => return Err(PlaybackError::SourceRead(format!("decode: {}", e))),
            }
        }
    }
}

impl TrackSource for SymphoniaSource {
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

        let landed = self.seek_to_frame(frame_offset)?;
        let channels = self.info.channels as usize;

        // discard the gap between the coarse landing point and the
        // requested offset
        let mut skip = frame_offset.saturating_sub(landed) as usize * channels;
        let want = max_frames * channels;
        let mut samples = Vec::with_capacity(want);

        while samples.len() < want {
            match self.decode_next()? {
                Some(mut chunk) => {
                    if skip > 0 {
                        let n = skip.min(chunk.len());
                        chunk.drain(..n);
                        skip -= n;
                    }
                    samples.extend(chunk);
                }
                None => break,
            }
        }

        samples.truncate(want);
        Ok(samples)
    }
}

/// Convert any AudioBufferRef to interleaved f32 samples
fn audio_buf_to_f32(buf: &AudioBufferRef) -> Vec<f32> {
    match buf {
        AudioBufferRef::F32(b) => interleave(b.planes(), b.frames(), |s: f32| s),
        AudioBufferRef::F64(b) => interleave(b.planes(), b.frames(), |s: f64| s as f32),
        AudioBufferRef::S8(b) => interleave(b.planes(), b.frames(), |s: i8| s as f32 / 128.0),
        AudioBufferRef::S16(b) => interleave(b.planes(), b.frames(), |s: i16| s as f32 / 32768.0),
        AudioBufferRef::S24(b) => {
            interleave(b.planes(), b.frames(), |s| s.inner() as f32 / 8388608.0)
        }
        AudioBufferRef::S32(b) => {
            interleave(b.planes(), b.frames(), |s: i32| s as f32 / 2147483648.0)
        }
        AudioBufferRef::U8(b) => {
            interleave(b.planes(), b.frames(), |s: u8| (s as f32 - 128.0) / 128.0)
        }
        AudioBufferRef::U16(b) => interleave(b.planes(), b.frames(), |s: u16| {
            (s as f32 - 32768.0) / 32768.0
        }),
        AudioBufferRef::U24(b) => interleave(b.planes(), b.frames(), |s| {
            (s.inner() as f32 - 8388608.0) / 8388608.0
        }),
        AudioBufferRef::U32(b) => interleave(b.planes(), b.frames(), |s: u32| {
            ((s as f64 - 2147483648.0) / 2147483648.0) as f32
        }),
    }
}

fn interleave<T: Sample + Copy, F: Fn(T) -> f32>(
    planes: AudioPlanes<T>,
    frames: usize,
    convert: F,
) -> Vec<f32> {
    let num_channels = planes.planes().len();
    if num_channels == 0 || frames == 0 {
        return Vec::new();
    }

    let mut interleaved = Vec::with_capacity(frames * num_channels);
    for frame in 0..frames {
        for ch in 0..num_channels {
            interleaved.push(convert(planes.planes()[ch][frame]));
        }
    }
    interleaved
}
