use thiserror::Error;

use crate::wizard::RecorderState;

/// Failures at the device capability boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("no camera found")]
    CameraNotFound,

    #[error("no microphone found")]
    MicrophoneNotFound,

    #[error("camera error: {0}")]
    Camera(String),

    #[error("microphone error: {0}")]
    Microphone(String),

    #[error("encoder error: {0}")]
    Encoder(String),

    #[error("device stream was released")]
    Released,
}

/// A recording-session operation called out of sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("camera and microphone access has not been granted")]
    NotGranted,

    #[error("device access request already in progress")]
    AcquisitionPending,

    #[error("camera and microphone access already granted")]
    AlreadyGranted,

    #[error("cannot {op} while {state:?}")]
    InvalidState {
        op: &'static str,
        state: RecorderState,
    },

    #[error("nothing has been recorded")]
    NothingRecorded,

    #[error(transparent)]
    Device(#[from] DeviceError),
}
