use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;

use super::encoder::{self, TakeEncoder};
use super::microphone::AudioTap;
use super::{RecordedFile, TakeId};
use crate::config::CameraConfig;
use crate::error::DeviceError;

const PREVIEW_INTERVAL: Duration = Duration::from_millis(100);

/// A frame for the live preview.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub width: u32,
    pub height: u32,
    /// True when `bytes` is a complete JPEG image.
    pub mjpeg: bool,
    pub bytes: Vec<u8>,
}

/// What the capture thread reports. Chunks for a take always precede the
/// `Stopped` signal for that take.
#[derive(Debug)]
pub enum CaptureEvent {
    Opened { name: String },
    Failed(DeviceError),
    Preview(PreviewFrame),
    /// A frame of `bytes` bytes went to the take's encoder.
    Chunk { take: TakeId, bytes: usize },
    /// The take is over; carries the encoded file or why there is none.
    Stopped {
        take: TakeId,
        result: Result<RecordedFile, DeviceError>,
    },
}

/// Handle to a camera running on its own capture thread.
///
/// The camera is opened on the thread, so acquisition never blocks the
/// caller; the outcome arrives as `Opened` or `Failed`.
pub struct CameraStream {
    running: Arc<AtomicBool>,
    take: Arc<AtomicU32>,
    stopping: Arc<AtomicU32>,
    audio: Arc<Mutex<Option<AudioTap>>>,
}

impl CameraStream {
    pub fn open<F>(config: CameraConfig, sink: F) -> Result<Self, DeviceError>
    where
        F: Fn(CaptureEvent) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let take = Arc::new(AtomicU32::new(0));
        let stopping = Arc::new(AtomicU32::new(0));
        let audio = Arc::new(Mutex::new(None));

        let takes = Takes {
            wanted: take.clone(),
            stopping: stopping.clone(),
            audio: audio.clone(),
        };
        let thread_running = running.clone();
        std::thread::Builder::new()
            .name("camera-capture".into())
            .spawn(move || capture_loop(&config, &thread_running, &takes, &sink))
            .map_err(|e| DeviceError::Camera(format!("failed to spawn capture thread: {e}")))?;

        Ok(Self {
            running,
            take,
            stopping,
            audio,
        })
    }

    /// Record `tap` alongside the frames of every following take.
    pub fn attach_audio(&self, tap: AudioTap) {
        if let Ok(mut slot) = self.audio.lock() {
            *slot = Some(tap);
        }
    }

    pub fn start(&self, take: TakeId) -> Result<(), DeviceError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(DeviceError::Released);
        }
        self.take.store(take, Ordering::SeqCst);
        Ok(())
    }

    pub fn stop(&self) -> Result<(), DeviceError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(DeviceError::Released);
        }
        let take = self.take.swap(0, Ordering::SeqCst);
        if take != 0 {
            self.stopping.store(take, Ordering::SeqCst);
        }
        Ok(())
    }

    pub fn release(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            log::info!("Releasing camera");
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.release();
    }
}

fn open_camera(config: &CameraConfig) -> Result<Camera, DeviceError> {
    let cameras = nokhwa::query(ApiBackend::Auto).map_err(|e| DeviceError::Camera(e.to_string()))?;
    if cameras.is_empty() {
        return Err(DeviceError::CameraNotFound);
    }

    let requested = CameraFormat::new(
        Resolution::new(config.width, config.height),
        FrameFormat::MJPEG,
        config.frame_rate,
    );
    let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(requested));

    let mut camera = Camera::new(CameraIndex::Index(config.index), format)
        .map_err(|e| DeviceError::Camera(e.to_string()))?;
    camera
        .open_stream()
        .map_err(|e| DeviceError::Camera(e.to_string()))?;
    Ok(camera)
}

/// Take requests shared with the capture thread. `stopping` holds the last
/// take that was stopped, so a take stopped before any frame arrived still
/// gets its `Stopped` signal.
struct Takes {
    wanted: Arc<AtomicU32>,
    stopping: Arc<AtomicU32>,
    audio: Arc<Mutex<Option<AudioTap>>>,
}

impl Takes {
    fn audio(&self) -> Option<AudioTap> {
        self.audio.lock().ok().and_then(|slot| slot.clone())
    }
}

fn finish_take<F>(take: TakeId, encoder: Option<TakeEncoder>, sink: &F)
where
    F: Fn(CaptureEvent),
{
    let Some(encoder) = encoder else {
        return;
    };
    let result = encoder.finish();
    if let Err(ref e) = result {
        log::warn!("Take {take} could not be encoded: {e}");
    }
    sink(CaptureEvent::Stopped { take, result });
}

fn capture_loop<F>(config: &CameraConfig, running: &AtomicBool, takes: &Takes, sink: &F)
where
    F: Fn(CaptureEvent),
{
    let opened = encoder::check_available().and_then(|()| open_camera(config));
    let mut camera = match opened {
        Ok(camera) => camera,
        Err(e) => {
            log::warn!("Camera {} unavailable: {e}", config.index);
            running.store(false, Ordering::SeqCst);
            sink(CaptureEvent::Failed(e));
            return;
        }
    };

    let format = camera.camera_format();
    let mjpeg = format.format() == FrameFormat::MJPEG;
    let (width, height) = (format.resolution().width(), format.resolution().height());
    let frame_rate = format.frame_rate();

    let input = match encoder::input_args(format.format(), width, height, frame_rate) {
        Ok(input) => input,
        Err(e) => {
            log::warn!("Camera {} cannot be recorded: {e}", config.index);
            running.store(false, Ordering::SeqCst);
            if let Err(e) = camera.stop_stream() {
                log::warn!("Error stopping camera stream: {e}");
            }
            sink(CaptureEvent::Failed(e));
            return;
        }
    };

    if running.load(Ordering::SeqCst) {
        let name = camera.info().human_name();
        log::info!(
            "Camera opened: {name} {width}x{height} @ {frame_rate}fps, format={:?}",
            format.format()
        );
        sink(CaptureEvent::Opened { name });
    }

    let mut active: TakeId = 0;
    let mut encoder: Option<TakeEncoder> = None;
    let mut last_preview: Option<Instant> = None;

    while running.load(Ordering::SeqCst) {
        let wanted = takes.wanted.load(Ordering::SeqCst);
        let stopping = takes.stopping.swap(0, Ordering::SeqCst);
        if active != 0 && wanted != active {
            finish_take(active, encoder.take(), sink);
        }
        if stopping != 0 && stopping != active {
            sink(CaptureEvent::Stopped {
                take: stopping,
                result: Err(DeviceError::Encoder("stopped before any frame was captured".into())),
            });
        }
        if wanted != 0 && wanted != active {
            match TakeEncoder::start(wanted, &input, frame_rate, takes.audio()) {
                Ok(started) => encoder = Some(started),
                Err(e) => {
                    log::error!("Cannot record take {wanted}: {e}");
                    sink(CaptureEvent::Stopped {
                        take: wanted,
                        result: Err(e),
                    });
                }
            }
        }
        active = wanted;

        let frame = match camera.frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::debug!("Failed to capture frame: {e}");
                std::thread::sleep(Duration::from_millis(20));
                continue;
            }
        };
        let bytes = frame.buffer();

        if let Some(current) = encoder.as_mut() {
            match current.write_frame(bytes) {
                Ok(()) => sink(CaptureEvent::Chunk {
                    take: active,
                    bytes: bytes.len(),
                }),
                Err(e) => {
                    log::warn!("Encoder for take {active} failed: {e}");
                    finish_take(active, encoder.take(), sink);
                }
            }
        }

        if last_preview.map_or(true, |t| t.elapsed() >= PREVIEW_INTERVAL) {
            last_preview = Some(Instant::now());
            sink(CaptureEvent::Preview(PreviewFrame {
                width,
                height,
                mjpeg,
                bytes: bytes.to_vec(),
            }));
        }
    }

    finish_take(active, encoder.take(), sink);

    if let Err(e) = camera.stop_stream() {
        log::warn!("Error stopping camera stream: {e}");
    }
    log::info!("Camera capture thread stopped");
}
