// Audio output using cpal
// The device consumes samples from a ring buffer filled by the streaming
// loop; write_blocking is the loop's pacing mechanism.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use log::error;
use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};
use std::sync::Arc;

use crate::error::PlaybackError;

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

/// Format an output sink is opened with, taken from the track source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Where streamed chunks go. The write blocks until the device has
/// accepted every sample: backpressure from the audio hardware paces
/// the streaming loop, and nothing buffers ahead beyond the ring.
///
/// A sink lives on the streaming thread for exactly one playback pass.
pub trait OutputSink {
    fn write_blocking(&mut self, samples: &[f32]);
}

pub struct CpalOutput {
    _stream: Stream,
    producer: RingProducer,
    volume: Arc<Mutex<f32>>,
}

impl CpalOutput {
    /// Open the default output device at the source's rate and channel
    /// count, holding about 250ms of audio in the ring buffer
    pub fn open(spec: &StreamSpec, volume: f32) -> Result<Self, PlaybackError> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| PlaybackError::SinkOpen("no output device available".to_string()))?;

        let sample_format = device
            .default_output_config()
            .map_err(|e| PlaybackError::SinkOpen(format!("no default output config: {}", e)))?
            .sample_format();

        let config = StreamConfig {
            channels: spec.channels,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let ring_len = (spec.sample_rate as usize * spec.channels as usize) / 4;
        let rb = HeapRb::<f32>::new(ring_len.max(1024));
        let (producer, consumer) = rb.split();
        let consumer = Arc::new(Mutex::new(consumer));

        let volume = Arc::new(Mutex::new(volume.clamp(0.0, 1.0)));
        let volume_clone = Arc::clone(&volume);

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config, consumer, volume_clone)?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config, consumer, volume_clone)?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config, consumer, volume_clone)?
            }
            format => {
                return Err(PlaybackError::SinkOpen(format!(
                    "unsupported sample format: {:?}",
                    format
                )))
            }
        };

        stream
            .play()
            .map_err(|e| PlaybackError::SinkOpen(format!("failed to start stream: {}", e)))?;

        Ok(Self {
            _stream: stream,
            producer,
            volume,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        consumer: Arc<Mutex<RingConsumer>>,
        volume: Arc<Mutex<f32>>,
    ) -> Result<Stream, PlaybackError> {
        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut consumer = consumer.lock();
                    let vol = *volume.lock();

                    for sample in data.iter_mut() {
                        let value = consumer.try_pop().unwrap_or(0.0) * vol;
                        *sample = T::from_sample(value);
                    }
                },
                move |err| {
                    error!("audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| PlaybackError::SinkOpen(format!("failed to build stream: {}", e)))?;

        Ok(stream)
    }

    /// Push as many samples as fit; returns the number written
    fn write(&mut self, samples: &[f32]) -> usize {
        let mut written = 0;
        for &sample in samples {
            if self.producer.try_push(sample).is_ok() {
                written += 1;
            } else {
                break;
            }
        }
        written
    }

    /// Free sample slots in the ring
    pub fn available_space(&self) -> usize {
        self.producer.vacant_len()
    }

    /// Set the output volume (0.0 to 1.0)
    pub fn set_volume(&self, vol: f32) {
        *self.volume.lock() = vol.clamp(0.0, 1.0);
    }
}

impl OutputSink for CpalOutput {
    fn write_blocking(&mut self, samples: &[f32]) {
        let mut remaining = samples;

        while !remaining.is_empty() {
            let written = self.write(remaining);
            if written > 0 {
                remaining = &remaining[written..];
            } else {
                // ring full: the device has real audio queued, wait for it
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
        }
    }
}
