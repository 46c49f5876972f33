use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use gtk4::glib;

use super::navigation::apply_navigation;
use super::state::{AppEvent, AppState};
use crate::error::DeviceError;
use crate::media::{
    CameraStream, CaptureEvent, LiveSource, MicrophoneStream, SystemSource, TakeId,
};
use crate::ui::{self, Page};
use crate::wizard::{RecordingSession, Tick};

const LEVEL_INTERVAL: Duration = Duration::from_millis(80);

/// Redraw the recording page from the session.
fn refresh(s: &AppState) {
    if let (Some(Page::Recording(page)), Some(session)) = (&s.page, &s.session) {
        ui::recording_page::refresh(page, session);
    }
}

fn session_mut(s: &mut AppState) -> Option<&mut RecordingSession> {
    let session = s.session.as_mut();
    if session.is_none() {
        log::debug!("No recording session on this step");
    }
    session
}

/// Ask for the camera, then the microphone. The camera opens on its own
/// thread and answers with `Opened` or `Failed`.
pub fn request_access(state: &Rc<RefCell<AppState>>) {
    let mut s = state.borrow_mut();
    let Some(session) = session_mut(&mut s) else {
        return;
    };
    if let Err(e) = session.begin_acquisition() {
        log::debug!("Access request ignored: {e}");
        return;
    }

    let sender = s.sender.clone();
    let epoch = s.epoch;
    let sink = move |event: CaptureEvent| {
        // previews are disposable; everything else must arrive
        let disposable = matches!(event, CaptureEvent::Preview(_));
        let event = AppEvent::Capture { epoch, event };
        if disposable {
            let _ = sender.try_send(event);
        } else {
            let _ = sender.send_blocking(event);
        }
    };

    match CameraStream::open(s.config.camera.clone(), sink) {
        Ok(camera) => s.pending_camera = Some(camera),
        Err(e) => {
            if let Some(session) = s.session.as_mut() {
                session.complete_acquisition(Err(e));
            }
        }
    }
    refresh(&s);
}

pub fn on_capture_event(state: &Rc<RefCell<AppState>>, epoch: u64, event: CaptureEvent) {
    let mut s = state.borrow_mut();
    if epoch != s.epoch {
        log::debug!("Dropping capture event from an abandoned step");
        return;
    }

    match event {
        CaptureEvent::Opened { name } => {
            let Some(camera) = s.pending_camera.take() else {
                log::debug!("Camera opened but no request is pending");
                return;
            };
            let result: Result<Box<dyn LiveSource>, DeviceError> = match MicrophoneStream::open() {
                Ok(microphone) => {
                    s.level_meter = Some(microphone.meter());
                    Ok(Box::new(SystemSource::new(name, camera, microphone)))
                }
                Err(e) => Err(e),
            };
            let granted = result.is_ok();
            if let Some(session) = s.session.as_mut() {
                session.complete_acquisition(result);
            }
            if granted {
                start_level_meter(&mut s);
            }
        }
        CaptureEvent::Failed(e) => {
            s.pending_camera = None;
            if let Some(session) = s.session.as_mut() {
                session.complete_acquisition(Err(e));
            }
        }
        CaptureEvent::Preview(frame) => {
            if let Some(Page::Recording(ref page)) = s.page {
                ui::recording_page::show_frame(page, &frame);
            }
            return;
        }
        CaptureEvent::Chunk { take, bytes } => {
            if let Some(session) = s.session.as_mut() {
                session.on_chunk(take, bytes);
            }
        }
        CaptureEvent::Stopped { take, result } => {
            if let Some(session) = s.session.as_mut() {
                session.on_recorder_stopped(take, result);
            }
        }
    }
    if !s.session.as_ref().is_some_and(RecordingSession::wants_timer) {
        stop_timer(&mut s);
    }
    refresh(&s);
}

fn start_level_meter(s: &mut AppState) {
    if let Some(source) = s.level_source.take() {
        source.remove();
    }
    let sender = s.sender.clone();
    let source = glib::timeout_add_local(LEVEL_INTERVAL, move || {
        let _ = sender.try_send(AppEvent::LevelTick);
        glib::ControlFlow::Continue
    });
    s.level_source = Some(source);
}

pub fn on_level_tick(state: &Rc<RefCell<AppState>>) {
    let s = state.borrow();
    if let (Some(Page::Recording(page)), Some(meter)) = (&s.page, &s.level_meter) {
        ui::recording_page::show_level(page, meter.level());
    }
}

/// Start a take and its one-second tick in the same turn.
pub fn start_recording(state: &Rc<RefCell<AppState>>) {
    let mut s = state.borrow_mut();
    let Some(session) = session_mut(&mut s) else {
        return;
    };

    match session.start_recording() {
        Ok(take) => {
            if let Some(source) = s.timer_source.take() {
                source.remove();
            }
            let sender = s.sender.clone();
            let epoch = s.epoch;
            let source = glib::timeout_add_local(Duration::from_secs(1), move || {
                let _ = sender.try_send(AppEvent::TimerTick { epoch, take });
                glib::ControlFlow::Continue
            });
            s.timer_source = Some(source);
        }
        Err(e) => log::warn!("Cannot start recording: {e}"),
    }
    refresh(&s);
}

pub fn on_timer_tick(state: &Rc<RefCell<AppState>>, epoch: u64, take: TakeId) {
    let mut s = state.borrow_mut();
    if epoch != s.epoch {
        return;
    }
    let Some(session) = session_mut(&mut s) else {
        return;
    };

    match session.tick(take) {
        Tick::Ignored => return,
        Tick::Counted(_) => {}
        Tick::LimitReached => stop_timer(&mut s),
    }
    refresh(&s);
}

fn stop_timer(s: &mut AppState) {
    if let Some(source) = s.timer_source.take() {
        source.remove();
    }
}

pub fn stop_recording(state: &Rc<RefCell<AppState>>) {
    let mut s = state.borrow_mut();
    let Some(session) = session_mut(&mut s) else {
        return;
    };
    if let Err(e) = session.stop_recording() {
        log::debug!("Stop ignored: {e}");
        return;
    }
    stop_timer(&mut s);
    refresh(&s);
}

pub fn rerecord(state: &Rc<RefCell<AppState>>) {
    let mut s = state.borrow_mut();
    let Some(session) = session_mut(&mut s) else {
        return;
    };
    if let Err(e) = session.rerecord() {
        log::debug!("Re-record ignored: {e}");
        return;
    }
    refresh(&s);
}

pub fn submit_recording(state: &Rc<RefCell<AppState>>) {
    let submitted = {
        let mut s = state.borrow_mut();
        let Some(session) = session_mut(&mut s) else {
            return;
        };
        session.submit()
    };

    match submitted {
        Ok(video) => {
            let nav = state.borrow_mut().wizard.complete_recording(video);
            apply_navigation(state, nav);
        }
        Err(e) => {
            log::info!("Recording not submitted: {e}");
            refresh(&state.borrow());
        }
    }
}
