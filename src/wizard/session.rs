//! Camera/microphone acquisition and a capped-duration recording.
//!
//! All inputs are plain method calls made from the single event loop:
//! user actions, one-second ticks and the recorder's chunk/stop callbacks.
//! Ticks and recorder callbacks carry the take they belong to, so anything
//! from an earlier take is ignored no matter when it arrives.

use std::sync::Arc;

use crate::error::{DeviceError, SessionError};
use crate::media::{Artifact, LiveSource, RecordedFile, TakeId};

/// Recording stops by itself when this many seconds have elapsed.
pub const RECORDING_LIMIT_SECS: u32 = 90;

pub const PERMISSION_DENIED_MESSAGE: &str =
    "Camera or microphone access denied. Please allow access to continue.";

pub const NOTHING_RECORDED_MESSAGE: &str = "Please record a video before submitting.";

pub const RECORDING_FAILED_MESSAGE: &str = "The recording could not be saved. Please record again.";

/// Prompts shown to the candidate above the recorder.
pub const INSTRUCTIONS: [&str; 4] = [
    "Give a short introduction about yourself.",
    "Why are you interested in this position?",
    "Highlight your relevant experience.",
    "Describe your long-term career goals.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    NotRequested,
    Pending,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Stopped,
}

/// Result of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Stale take or not recording.
    Ignored,
    Counted(u32),
    /// The limit was reached and the recording has been stopped.
    LimitReached,
}

/// Which actions the recording step currently offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub request_access: bool,
    pub start: bool,
    pub stop: bool,
    pub rerecord: bool,
    pub submit: bool,
}

pub struct RecordingSession {
    acquisition: Acquisition,
    source: Option<Box<dyn LiveSource>>,
    state: RecorderState,
    elapsed: u32,
    take: TakeId,
    captured_bytes: u64,
    recorded_secs: u32,
    finalizing: bool,
    artifact: Option<Arc<Artifact>>,
    error: Option<String>,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            acquisition: Acquisition::NotRequested,
            source: None,
            state: RecorderState::Idle,
            elapsed: 0,
            take: 0,
            captured_bytes: 0,
            recorded_secs: 0,
            finalizing: false,
            artifact: None,
            error: None,
        }
    }

    pub fn acquisition(&self) -> Acquisition {
        self.acquisition
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn take(&self) -> TakeId {
        self.take
    }

    pub fn artifact(&self) -> Option<&Arc<Artifact>> {
        self.artifact.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Bytes handed to the encoder during the current take.
    pub fn captured_bytes(&self) -> u64 {
        self.captured_bytes
    }

    pub fn is_finalizing(&self) -> bool {
        self.finalizing
    }

    /// Whether the one-second tick should still be running.
    pub fn wants_timer(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn timer_text(&self) -> String {
        format!("Time: {}s / {}s", self.elapsed, RECORDING_LIMIT_SECS)
    }

    pub fn controls(&self) -> Controls {
        if self.acquisition != Acquisition::Granted {
            return Controls {
                request_access: self.acquisition != Acquisition::Pending,
                ..Controls::default()
            };
        }
        Controls {
            request_access: false,
            start: self.can_start(),
            stop: self.state == RecorderState::Recording,
            rerecord: self.artifact.is_some(),
            submit: self.artifact.is_some(),
        }
    }

    fn can_start(&self) -> bool {
        match self.state {
            RecorderState::Idle => true,
            RecorderState::Stopped => self.artifact.is_none() && !self.finalizing,
            RecorderState::Recording => false,
        }
    }

    /// Mark a device access request as in flight.
    pub fn begin_acquisition(&mut self) -> Result<(), SessionError> {
        match self.acquisition {
            Acquisition::Pending => Err(SessionError::AcquisitionPending),
            Acquisition::Granted => Err(SessionError::AlreadyGranted),
            Acquisition::NotRequested | Acquisition::Denied => {
                log::info!("Requesting camera and microphone access");
                self.acquisition = Acquisition::Pending;
                Ok(())
            }
        }
    }

    /// Resolve the pending access request. A result nobody is waiting for
    /// is dropped and its source released.
    pub fn complete_acquisition(&mut self, result: Result<Box<dyn LiveSource>, DeviceError>) {
        if self.acquisition != Acquisition::Pending {
            log::debug!("Discarding device access result; none pending");
            if let Ok(mut source) = result {
                source.release();
            }
            return;
        }

        match result {
            Ok(source) => {
                log::info!("Device access granted: {}", source.describe());
                self.source = Some(source);
                self.acquisition = Acquisition::Granted;
                self.state = RecorderState::Idle;
                self.error = None;
            }
            Err(e) => {
                log::warn!("Device access failed: {e}");
                self.acquisition = Acquisition::Denied;
                self.error = Some(PERMISSION_DENIED_MESSAGE.to_string());
            }
        }
    }

    /// Start a new take. Returns its id so the caller can tag the tick
    /// source it starts in the same turn.
    pub fn start_recording(&mut self) -> Result<TakeId, SessionError> {
        if self.acquisition != Acquisition::Granted {
            return Err(SessionError::NotGranted);
        }
        if !self.can_start() {
            return Err(SessionError::InvalidState {
                op: "start recording",
                state: self.state,
            });
        }
        let source = self.source.as_mut().ok_or(SessionError::NotGranted)?;

        let take = self.take + 1;
        if let Err(e) = source.start_capture(take) {
            log::error!("Failed to start recording: {e}");
            self.error = Some(format!("Could not start recording: {e}"));
            return Err(e.into());
        }

        self.take = take;
        self.artifact = None;
        self.captured_bytes = 0;
        self.finalizing = false;
        self.error = None;
        self.elapsed = 0;
        self.state = RecorderState::Recording;
        log::info!("Recording take {take}");
        Ok(take)
    }

    pub fn tick(&mut self, take: TakeId) -> Tick {
        if self.state != RecorderState::Recording || take != self.take {
            log::debug!("Ignoring tick for take {take}");
            return Tick::Ignored;
        }
        self.elapsed += 1;
        if self.elapsed >= RECORDING_LIMIT_SECS {
            log::info!("Recording limit of {RECORDING_LIMIT_SECS}s reached");
            self.halt();
            Tick::LimitReached
        } else {
            Tick::Counted(self.elapsed)
        }
    }

    pub fn stop_recording(&mut self) -> Result<(), SessionError> {
        if self.state != RecorderState::Recording {
            return Err(SessionError::InvalidState {
                op: "stop recording",
                state: self.state,
            });
        }
        self.halt();
        Ok(())
    }

    fn halt(&mut self) {
        self.recorded_secs = self.elapsed;
        self.elapsed = 0;
        self.state = RecorderState::Stopped;
        self.finalizing = true;

        let stopped = match self.source.as_mut() {
            Some(source) => source.stop_capture(),
            None => Err(DeviceError::Released),
        };
        match stopped {
            Ok(()) => log::info!("Stopped take {} after {}s", self.take, self.recorded_secs),
            Err(e) => {
                log::warn!("Recorder did not stop cleanly: {e}");
                self.finalize(Err(e));
            }
        }
    }

    /// Data-available callback from the recorder. The data itself is
    /// already with the encoder; only its size is tracked here.
    pub fn on_chunk(&mut self, take: TakeId, bytes: usize) {
        let accepting = self.state == RecorderState::Recording || self.finalizing;
        if take != self.take || !accepting {
            log::debug!("Dropping chunk for stale take {take}");
            return;
        }
        self.captured_bytes += bytes as u64;
    }

    /// Stop callback from the recorder; finalizes the artifact from the
    /// encoded file.
    pub fn on_recorder_stopped(&mut self, take: TakeId, result: Result<RecordedFile, DeviceError>) {
        if take != self.take {
            log::debug!("Ignoring stop for stale take {take}");
            return;
        }
        match self.state {
            RecorderState::Recording => {
                log::warn!("Recorder stopped on its own during take {take}");
                self.recorded_secs = self.elapsed;
                self.elapsed = 0;
                self.state = RecorderState::Stopped;
                self.finalize(result);
            }
            RecorderState::Stopped if self.finalizing => self.finalize(result),
            _ => log::debug!("Ignoring stop for take {take} in {:?}", self.state),
        }
    }

    fn finalize(&mut self, result: Result<RecordedFile, DeviceError>) {
        self.finalizing = false;
        match result {
            Ok(file) => {
                let artifact = Artifact::new(file, self.recorded_secs);
                log::info!(
                    "Take {} finalized: {} bytes of {}",
                    self.take,
                    artifact.size(),
                    artifact.media_type()
                );
                self.artifact = Some(Arc::new(artifact));
            }
            Err(e) => {
                log::error!("Take {} produced no recording: {e}", self.take);
                self.artifact = None;
                self.error = Some(RECORDING_FAILED_MESSAGE.to_string());
            }
        }
    }

    /// Throw away the recording and go back to idle on the same devices.
    pub fn rerecord(&mut self) -> Result<(), SessionError> {
        if self.state != RecorderState::Stopped {
            return Err(SessionError::InvalidState {
                op: "re-record",
                state: self.state,
            });
        }
        log::info!("Discarding take {}", self.take);
        self.artifact = None;
        self.captured_bytes = 0;
        self.finalizing = false;
        self.elapsed = 0;
        self.state = RecorderState::Idle;
        Ok(())
    }

    /// Hand the finished recording forward.
    pub fn submit(&mut self) -> Result<Arc<Artifact>, SessionError> {
        if self.state == RecorderState::Recording {
            return Err(SessionError::InvalidState {
                op: "submit",
                state: self.state,
            });
        }
        match &self.artifact {
            Some(artifact) => Ok(artifact.clone()),
            None => {
                self.error = Some(NOTHING_RECORDED_MESSAGE.to_string());
                Err(SessionError::NothingRecorded)
            }
        }
    }

    /// Relinquish the devices. The session cannot record afterwards.
    pub fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.release();
        }
        if self.acquisition == Acquisition::Granted {
            self.acquisition = Acquisition::NotRequested;
        }
        if self.state == RecorderState::Recording {
            self.state = RecorderState::Stopped;
            self.elapsed = 0;
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::media::tests::recorded_file;

    /// Calls made on a [`FakeSource`], shared with the test.
    #[derive(Debug, Default)]
    pub struct FakeLog {
        pub started: Vec<TakeId>,
        pub stops: usize,
        pub released: bool,
    }

    pub struct FakeSource {
        pub log: Rc<RefCell<FakeLog>>,
        pub fail_start: bool,
        pub fail_stop: bool,
    }

    impl FakeSource {
        pub fn new() -> (Box<dyn LiveSource>, Rc<RefCell<FakeLog>>) {
            let log = Rc::new(RefCell::new(FakeLog::default()));
            let source = FakeSource {
                log: log.clone(),
                fail_start: false,
                fail_stop: false,
            };
            (Box::new(source), log)
        }
    }

    impl LiveSource for FakeSource {
        fn describe(&self) -> String {
            "fake camera".into()
        }

        fn start_capture(&mut self, take: TakeId) -> Result<(), DeviceError> {
            if self.fail_start {
                return Err(DeviceError::Camera("busy".into()));
            }
            self.log.borrow_mut().started.push(take);
            Ok(())
        }

        fn stop_capture(&mut self) -> Result<(), DeviceError> {
            if self.fail_stop {
                return Err(DeviceError::Released);
            }
            self.log.borrow_mut().stops += 1;
            Ok(())
        }

        fn release(&mut self) {
            self.log.borrow_mut().released = true;
        }
    }

    pub fn granted() -> (RecordingSession, Rc<RefCell<FakeLog>>) {
        let mut session = RecordingSession::new();
        let (source, log) = FakeSource::new();
        session.begin_acquisition().unwrap();
        session.complete_acquisition(Ok(source));
        (session, log)
    }

    fn record(session: &mut RecordingSession, seconds: u32) -> TakeId {
        let take = session.start_recording().unwrap();
        for _ in 0..seconds {
            session.on_chunk(take, 1000);
            session.tick(take);
        }
        take
    }

    #[test]
    fn denied_access_is_reported_and_retryable() {
        let mut session = RecordingSession::new();
        assert!(session.controls().request_access);

        session.begin_acquisition().unwrap();
        assert!(!session.controls().request_access);
        session.complete_acquisition(Err(DeviceError::CameraNotFound));

        assert_eq!(session.acquisition(), Acquisition::Denied);
        assert_eq!(session.error(), Some(PERMISSION_DENIED_MESSAGE));
        assert!(session.controls().request_access);
        assert_eq!(session.start_recording(), Err(SessionError::NotGranted));

        let (source, _log) = FakeSource::new();
        session.begin_acquisition().unwrap();
        session.complete_acquisition(Ok(source));
        assert_eq!(session.acquisition(), Acquisition::Granted);
        assert_eq!(session.error(), None);
        assert!(session.controls().start);
    }

    #[test]
    fn late_grant_is_released() {
        let mut session = RecordingSession::new();
        let (source, log) = FakeSource::new();
        session.complete_acquisition(Ok(source));

        assert_eq!(session.acquisition(), Acquisition::NotRequested);
        assert!(log.borrow().released);
    }

    #[test]
    fn second_request_while_pending_is_rejected() {
        let mut session = RecordingSession::new();
        session.begin_acquisition().unwrap();
        assert_eq!(session.begin_acquisition(), Err(SessionError::AcquisitionPending));
    }

    #[test]
    fn request_after_grant_is_rejected() {
        let (mut session, log) = granted();
        assert_eq!(session.begin_acquisition(), Err(SessionError::AlreadyGranted));
        assert_eq!(session.acquisition(), Acquisition::Granted);
        assert!(!log.borrow().released);
    }

    #[test]
    fn manual_stop_finalizes_artifact() {
        let (mut session, log) = granted();
        let take = record(&mut session, 12);
        assert_eq!(session.elapsed(), 12);

        session.stop_recording().unwrap();
        assert_eq!(session.state(), RecorderState::Stopped);
        assert_eq!(session.elapsed(), 0);
        assert!(session.artifact().is_none());
        assert!(session.is_finalizing());
        assert_eq!(session.controls(), Controls::default());

        // a chunk still in flight when the stop was requested
        session.on_chunk(take, 500);
        assert_eq!(session.captured_bytes(), 12_500);
        session.on_recorder_stopped(take, Ok(recorded_file(b"mp4 data")));

        let artifact = session.artifact().expect("artifact after stop");
        assert_eq!(artifact.size(), 8);
        assert_eq!(artifact.duration_secs(), 12);
        assert_eq!(artifact.media_type(), "video/mp4");
        assert!(artifact.has_audio());
        assert_eq!(log.borrow().stops, 1);

        let controls = session.controls();
        assert!(controls.rerecord && controls.submit && !controls.start);
    }

    #[test]
    fn recording_stops_at_exactly_the_limit() {
        let (mut session, log) = granted();
        let take = session.start_recording().unwrap();

        for second in 1..RECORDING_LIMIT_SECS {
            assert_eq!(session.tick(take), Tick::Counted(second));
            assert_eq!(session.state(), RecorderState::Recording);
        }
        assert_eq!(session.elapsed(), 89);

        assert_eq!(session.tick(take), Tick::LimitReached);
        assert_eq!(session.state(), RecorderState::Stopped);
        assert_eq!(session.elapsed(), 0);
        assert_eq!(log.borrow().stops, 1);

        assert_eq!(session.tick(take), Tick::Ignored);
        session.on_recorder_stopped(take, Ok(recorded_file(b"x")));
        assert_eq!(session.artifact().unwrap().duration_secs(), RECORDING_LIMIT_SECS);
    }

    #[test]
    fn stop_callback_before_last_tick_is_tolerated() {
        let (mut session, _log) = granted();
        let take = record(&mut session, 3);
        session.stop_recording().unwrap();
        session.on_recorder_stopped(take, Ok(recorded_file(b"x")));

        // tick queued before the stop was handled
        assert_eq!(session.tick(take), Tick::Ignored);
        assert_eq!(session.elapsed(), 0);
        assert!(session.artifact().is_some());
    }

    #[test]
    fn rerecord_discards_artifact() {
        let (mut session, _log) = granted();
        let take = record(&mut session, 5);
        session.stop_recording().unwrap();
        session.on_recorder_stopped(take, Ok(recorded_file(b"x")));
        assert!(session.submit().is_ok());

        session.rerecord().unwrap();
        assert_eq!(session.state(), RecorderState::Idle);
        assert_eq!(session.acquisition(), Acquisition::Granted);
        assert!(session.artifact().is_none());

        assert_eq!(session.submit(), Err(SessionError::NothingRecorded));
        assert_eq!(session.error(), Some(NOTHING_RECORDED_MESSAGE));
        assert!(session.controls().start);
    }

    #[test]
    fn stale_take_events_are_ignored() {
        let (mut session, log) = granted();
        let first = record(&mut session, 2);
        session.stop_recording().unwrap();
        session.rerecord().unwrap();

        // the first take's stop arrives after it was discarded
        let late = recorded_file(b"first");
        let late_path = late.path.to_path_buf();
        session.on_recorder_stopped(first, Ok(late));
        assert!(session.artifact().is_none());
        assert!(!late_path.exists());

        let second = session.start_recording().unwrap();
        assert_ne!(first, second);
        assert_eq!(log.borrow().started, vec![first, second]);

        session.on_chunk(first, 3);
        assert_eq!(session.tick(first), Tick::Ignored);
        session.on_chunk(second, 2);
        assert_eq!(session.captured_bytes(), 2);
        session.stop_recording().unwrap();
        session.on_recorder_stopped(second, Ok(recorded_file(b"second")));

        let artifact = session.artifact().unwrap();
        assert_eq!(std::fs::read(artifact.path()).unwrap(), b"second");
    }

    #[test]
    fn submit_without_recording_sets_error() {
        let (mut session, _log) = granted();
        assert_eq!(session.submit(), Err(SessionError::NothingRecorded));
        assert_eq!(session.error(), Some(NOTHING_RECORDED_MESSAGE));

        // starting a new take clears it
        session.start_recording().unwrap();
        assert_eq!(session.error(), None);
        assert!(matches!(
            session.submit(),
            Err(SessionError::InvalidState { op: "submit", .. })
        ));
    }

    #[test]
    fn out_of_sequence_calls_are_rejected() {
        let (mut session, _log) = granted();
        assert!(session.stop_recording().is_err());
        assert!(session.rerecord().is_err());

        let take = session.start_recording().unwrap();
        assert!(session.start_recording().is_err());
        session.stop_recording().unwrap();
        // still waiting for the recorder to finish
        assert!(session.start_recording().is_err());
        session.on_recorder_stopped(take, Ok(recorded_file(b"x")));
        assert!(session.start_recording().is_err());
    }

    #[test]
    fn failed_stop_reports_error_without_artifact() {
        let mut session = RecordingSession::new();
        let log = Rc::new(RefCell::new(FakeLog::default()));
        session.begin_acquisition().unwrap();
        session.complete_acquisition(Ok(Box::new(FakeSource {
            log,
            fail_start: false,
            fail_stop: true,
        })));

        let take = record(&mut session, 4);
        session.stop_recording().unwrap();
        assert!(!session.is_finalizing());
        assert!(session.artifact().is_none());
        assert_eq!(session.error(), Some(RECORDING_FAILED_MESSAGE));

        // a stop signal showing up afterwards changes nothing
        session.on_recorder_stopped(take, Ok(recorded_file(b"x")));
        assert!(session.artifact().is_none());
        assert!(session.controls().start);
    }

    #[test]
    fn failed_start_keeps_session_idle() {
        let mut session = RecordingSession::new();
        let log = Rc::new(RefCell::new(FakeLog::default()));
        session.begin_acquisition().unwrap();
        session.complete_acquisition(Ok(Box::new(FakeSource {
            log,
            fail_start: true,
            fail_stop: false,
        })));

        assert!(matches!(session.start_recording(), Err(SessionError::Device(_))));
        assert_eq!(session.state(), RecorderState::Idle);
        assert!(session.error().unwrap().starts_with("Could not start recording"));
    }

    #[test]
    fn device_loss_while_recording_counts_as_stop() {
        let (mut session, _log) = granted();
        let take = record(&mut session, 7);
        assert!(session.wants_timer());
        session.on_recorder_stopped(take, Ok(recorded_file(b"x")));

        assert!(!session.wants_timer());
        assert_eq!(session.state(), RecorderState::Stopped);
        assert_eq!(session.elapsed(), 0);
        assert_eq!(session.artifact().unwrap().duration_secs(), 7);
    }

    #[test]
    fn encoder_failure_leaves_nothing_to_submit() {
        let (mut session, _log) = granted();
        let take = record(&mut session, 3);
        session.on_recorder_stopped(take, Err(DeviceError::Encoder("ffmpeg exited".into())));

        assert!(!session.wants_timer());
        assert!(!session.is_finalizing());
        assert!(session.artifact().is_none());
        assert_eq!(session.error(), Some(RECORDING_FAILED_MESSAGE));
        assert!(session.controls().start);
        assert_eq!(session.submit(), Err(SessionError::NothingRecorded));
    }

    #[test]
    fn chunks_are_counted_not_kept() {
        let (mut session, _log) = granted();
        let take = session.start_recording().unwrap();
        // 90 s of raw 640x480 YUYV at 30 fps
        for _ in 0..RECORDING_LIMIT_SECS * 30 {
            session.on_chunk(take, 640 * 480 * 2);
        }
        assert_eq!(session.captured_bytes(), 1_658_880_000);
        assert_eq!(std::mem::size_of_val(&session.captured_bytes()), 8);
    }

    #[test]
    fn dropping_session_releases_devices() {
        let (session, log) = granted();
        assert!(!log.borrow().released);
        drop(session);
        assert!(log.borrow().released);
    }

    #[test]
    fn timer_text_shows_limit() {
        let (mut session, _log) = granted();
        record(&mut session, 12);
        assert_eq!(session.timer_text(), "Time: 12s / 90s");
    }
}
