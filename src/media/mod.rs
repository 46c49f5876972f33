//! Device and recording capability boundaries.
//!
//! The wizard core only sees [`LiveSource`]; chunks and the recorder's stop
//! signal come back through the application event queue tagged with the take
//! they belong to.

mod camera;
mod encoder;
mod microphone;
mod system;

use std::path::Path;

use chrono::{DateTime, Local};
use tempfile::TempPath;

use crate::error::DeviceError;

pub use camera::{CameraStream, CaptureEvent, PreviewFrame};
pub use microphone::{LevelMeter, MicrophoneStream};
pub use system::SystemSource;

/// One start-to-stop recording attempt. Zero means "not recording".
pub type TakeId = u32;

/// A live camera+microphone source that can be recorded from.
pub trait LiveSource {
    /// Human-readable device summary for logs.
    fn describe(&self) -> String;

    /// Begin emitting chunks for `take`.
    fn start_capture(&mut self, take: TakeId) -> Result<(), DeviceError>;

    /// Stop the take. The stop signal carrying the encoded file arrives
    /// later, after the last chunk.
    fn stop_capture(&mut self) -> Result<(), DeviceError>;

    /// Relinquish the devices. Idempotent.
    fn release(&mut self);
}

/// Container every finished take is encoded to.
pub const RECORDING_MEDIA_TYPE: &str = "video/mp4";

/// A take as the encoder left it on disk. The file is deleted when the
/// path is dropped.
#[derive(Debug)]
pub struct RecordedFile {
    pub media_type: &'static str,
    pub path: TempPath,
    pub size: u64,
    pub has_audio: bool,
}

/// A finalized recording.
#[derive(Debug)]
pub struct Artifact {
    file: RecordedFile,
    duration_secs: u32,
    recorded_at: DateTime<Local>,
}

impl Artifact {
    pub fn new(file: RecordedFile, duration_secs: u32) -> Self {
        Self {
            file,
            duration_secs,
            recorded_at: Local::now(),
        }
    }

    pub fn media_type(&self) -> &str {
        self.file.media_type
    }

    /// Playable file backing the recording.
    pub fn path(&self) -> &Path {
        &self.file.path
    }

    pub fn size(&self) -> u64 {
        self.file.size
    }

    pub fn has_audio(&self) -> bool {
        self.file.has_audio
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub fn recorded_at(&self) -> DateTime<Local> {
        self.recorded_at
    }
}
