use std::path::PathBuf;

use gtk4::glib;

use crate::config::Config;
use crate::media::{CameraStream, CaptureEvent, LevelMeter, TakeId};
use crate::ui::window::WindowWidgets;
use crate::ui::Page;
use crate::wizard::{FieldUpdate, FormState, RecordingSession, ResumeFile, Wizard};

/// Everything the main loop reacts to: widget callbacks, timers, the
/// camera thread and tokio tasks all post one of these.
///
/// Events from devices and background tasks carry the step epoch they were
/// started under; once the wizard has moved on they are dropped.
#[derive(Debug)]
pub enum AppEvent {
    FieldChanged(FieldUpdate),
    ResumeSelected(PathBuf),
    ResumeLoaded {
        epoch: u64,
        result: Result<ResumeFile, String>,
    },
    SubmitForm,

    RequestAccess,
    Capture {
        epoch: u64,
        event: CaptureEvent,
    },
    TimerTick {
        epoch: u64,
        take: TakeId,
    },
    LevelTick,
    StartRecording,
    StopRecording,
    Rerecord,
    SubmitRecording,

    SaveResume(PathBuf),
    SaveFinished(Result<PathBuf, String>),
    Restart,
}

/// Central application state. Lives on the GTK main thread inside Rc<RefCell<>>.
pub struct AppState {
    pub config: Config,
    pub wizard: Wizard,
    pub form: FormState,
    pub session: Option<RecordingSession>,
    /// Bumped on every navigation.
    pub epoch: u64,
    pub tokio_rt: tokio::runtime::Runtime,
    pub sender: async_channel::Sender<AppEvent>,

    // Recording step resources
    pub pending_camera: Option<CameraStream>,
    pub level_meter: Option<LevelMeter>,
    pub timer_source: Option<glib::SourceId>,
    pub level_source: Option<glib::SourceId>,

    // UI handles
    pub window: Option<WindowWidgets>,
    pub page: Option<Page>,
}

impl AppState {
    pub fn new(sender: async_channel::Sender<AppEvent>, config: Config) -> Self {
        let tokio_rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");

        Self {
            config,
            wizard: Wizard::new(),
            form: FormState::new(),
            session: None,
            epoch: 0,
            tokio_rt,
            sender,
            pending_camera: None,
            level_meter: None,
            timer_source: None,
            level_source: None,
            window: None,
            page: None,
        }
    }

    /// Drop everything owned by the current step, its timers and devices
    /// included. Late events from it become stale.
    pub fn leave_step(&mut self) {
        if let Some(source) = self.timer_source.take() {
            source.remove();
        }
        if let Some(source) = self.level_source.take() {
            source.remove();
        }
        if let Some(mut session) = self.session.take() {
            session.release();
        }
        self.pending_camera = None;
        self.level_meter = None;
        self.page = None;
        self.epoch += 1;
    }

    /// Show a transient message at the bottom of the window.
    pub fn toast(&self, message: &str) {
        if let Some(ref window) = self.window {
            crate::ui::window::show_toast(window, message);
        }
    }
}
