use super::camera::CameraStream;
use super::microphone::MicrophoneStream;
use super::{LiveSource, TakeId};
use crate::error::DeviceError;

/// The real camera and default microphone, bound together once both have
/// been acquired.
pub struct SystemSource {
    camera_name: String,
    camera: CameraStream,
    microphone: MicrophoneStream,
}

impl SystemSource {
    /// Bind the pair; every take records the microphone with the frames.
    pub fn new(camera_name: String, camera: CameraStream, microphone: MicrophoneStream) -> Self {
        camera.attach_audio(microphone.tap());
        Self {
            camera_name,
            camera,
            microphone,
        }
    }
}

impl LiveSource for SystemSource {
    fn describe(&self) -> String {
        format!("{} + default microphone", self.camera_name)
    }

    fn start_capture(&mut self, take: TakeId) -> Result<(), DeviceError> {
        self.camera.start(take)
    }

    fn stop_capture(&mut self) -> Result<(), DeviceError> {
        self.camera.stop()
    }

    fn release(&mut self) {
        self.camera.release();
        self.microphone.release();
    }
}

impl Drop for SystemSource {
    fn drop(&mut self) {
        self.release();
    }
}
