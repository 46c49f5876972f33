use std::collections::VecDeque;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::error::DeviceError;

/// Samples kept for the level meter.
const LEVEL_WINDOW: usize = 1280;

type LevelBuffer = Arc<Mutex<VecDeque<f32>>>;
type WavFile = hound::WavWriter<BufWriter<File>>;

/// Live input from the default microphone. Drop (or `release`) to close it.
pub struct MicrophoneStream {
    stream: Option<cpal::Stream>,
    levels: LevelBuffer,
    tap: AudioTap,
}

/// Records the microphone to a WAV file between `begin` and `finish`.
/// Samples arriving while no file is open are only metered.
#[derive(Clone)]
pub struct AudioTap {
    writer: Arc<Mutex<Option<WavFile>>>,
    sample_rate: u32,
}

impl AudioTap {
    pub(super) fn new(sample_rate: u32) -> Self {
        Self {
            writer: Arc::new(Mutex::new(None)),
            sample_rate,
        }
    }

    /// Start writing mono 16-bit PCM to `path`, replacing any open file.
    pub fn begin(&self, path: &Path) -> Result<(), DeviceError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer =
            hound::WavWriter::create(path, spec).map_err(|e| DeviceError::Microphone(e.to_string()))?;
        let mut slot = self
            .writer
            .lock()
            .map_err(|_| DeviceError::Microphone("audio writer poisoned".into()))?;
        *slot = Some(writer);
        Ok(())
    }

    /// Close the file. Returns the number of samples written.
    pub fn finish(&self) -> Result<u32, DeviceError> {
        let writer = match self.writer.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => return Err(DeviceError::Microphone("audio writer poisoned".into())),
        };
        let Some(writer) = writer else {
            return Ok(0);
        };
        let samples = writer.len();
        writer
            .finalize()
            .map_err(|e| DeviceError::Microphone(e.to_string()))?;
        Ok(samples)
    }

    pub(super) fn write(&self, samples: &[f32]) {
        let Ok(mut slot) = self.writer.lock() else {
            return;
        };
        let Some(writer) = slot.as_mut() else {
            return;
        };
        for &s in samples {
            let clamped = s.clamp(-1.0, 1.0);
            if let Err(e) = writer.write_sample((clamped * i16::MAX as f32) as i16) {
                log::warn!("Dropping audio after write error: {e}");
                *slot = None;
                return;
            }
        }
    }
}

/// Read side of a microphone's level buffer, usable after the stream
/// itself has been handed off.
#[derive(Clone)]
pub struct LevelMeter(LevelBuffer);

impl LevelMeter {
    pub fn level(&self) -> f32 {
        match self.0.lock() {
            Ok(buf) => rms(buf.iter().copied()),
            Err(_) => 0.0,
        }
    }
}

impl MicrophoneStream {
    pub fn open() -> Result<Self, DeviceError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(DeviceError::MicrophoneNotFound)?;

        log::info!("Input device: {:?}", device.description());

        let config = input_config(&device)?;
        let channels = config.channels.max(1) as usize;
        let levels: LevelBuffer = Arc::new(Mutex::new(VecDeque::with_capacity(LEVEL_WINDOW)));
        let tap = AudioTap::new(config.sample_rate);
        let sink = levels.clone();
        let recorder = tap.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono: Vec<f32> = data
                        .chunks(channels)
                        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                        .collect();
                    if let Ok(mut buf) = sink.lock() {
                        for &sample in &mono {
                            if buf.len() == LEVEL_WINDOW {
                                buf.pop_front();
                            }
                            buf.push_back(sample);
                        }
                    }
                    recorder.write(&mono);
                },
                |err| log::error!("Input stream error: {err}"),
                None,
            )
            .map_err(|e| DeviceError::Microphone(e.to_string()))?;

        stream
            .play()
            .map_err(|e| DeviceError::Microphone(e.to_string()))?;

        Ok(Self {
            stream: Some(stream),
            levels,
            tap,
        })
    }

    pub fn meter(&self) -> LevelMeter {
        LevelMeter(self.levels.clone())
    }

    pub fn tap(&self) -> AudioTap {
        self.tap.clone()
    }

    pub fn release(&mut self) {
        if self.stream.take().is_some() {
            log::info!("Releasing microphone");
        }
    }
}

/// Pick an f32 input config, preferring the device default.
fn input_config(device: &cpal::Device) -> Result<cpal::StreamConfig, DeviceError> {
    let default = device
        .default_input_config()
        .map_err(|e| DeviceError::Microphone(e.to_string()))?;
    if default.sample_format() == cpal::SampleFormat::F32 {
        return Ok(default.config());
    }

    let mut supported = device
        .supported_input_configs()
        .map_err(|e| DeviceError::Microphone(e.to_string()))?;
    supported
        .find(|c| c.sample_format() == cpal::SampleFormat::F32)
        .map(|c| c.with_max_sample_rate().config())
        .ok_or_else(|| DeviceError::Microphone("no f32 input format available".into()))
}

/// Root mean square of the samples; 0 for an empty window.
pub fn rms(samples: impl Iterator<Item = f32>) -> f32 {
    let (count, sum_sq) = samples.fold((0usize, 0.0f32), |(n, acc), s| (n + 1, acc + s * s));
    if count == 0 {
        return 0.0;
    }
    (sum_sq / count as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_empty_window_is_zero() {
        assert_eq!(rms(std::iter::empty()), 0.0);
    }

    #[test]
    fn rms_of_constant_signal_is_its_magnitude() {
        let level = rms([0.5f32, -0.5, 0.5, -0.5].into_iter());
        assert!((level - 0.5).abs() < 1e-6);
    }

    #[test]
    fn meter_reads_shared_buffer() {
        let buffer: LevelBuffer = Arc::new(Mutex::new(VecDeque::from(vec![0.25f32; 16])));
        let meter = LevelMeter(buffer.clone());
        assert!((meter.level() - 0.25).abs() < 1e-6);

        buffer.lock().unwrap().clear();
        assert_eq!(meter.level(), 0.0);
    }

    #[test]
    fn tap_records_only_between_begin_and_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.wav");
        let tap = AudioTap::new(16_000);

        tap.write(&[0.5; 10]);
        assert_eq!(tap.finish().unwrap(), 0);

        tap.begin(&path).unwrap();
        tap.write(&[0.5, -0.5, 2.0]);
        assert_eq!(tap.finish().unwrap(), 3);
        tap.write(&[0.5; 10]);

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![i16::MAX / 2, -(i16::MAX / 2), i16::MAX]);
    }
}
