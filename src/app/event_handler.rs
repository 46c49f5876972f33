use std::cell::RefCell;
use std::rc::Rc;

use super::form::{on_field_changed, on_resume_loaded, on_resume_selected, on_submit_form};
use super::navigation::restart;
use super::recording::{
    on_capture_event, on_level_tick, on_timer_tick, request_access, rerecord, start_recording,
    stop_recording, submit_recording,
};
use super::state::{AppEvent, AppState};

/// Handle one event from the queue. Everything that changes wizard state
/// goes through here, one event at a time.
pub fn handle_event(state: &Rc<RefCell<AppState>>, event: AppEvent) {
    match event {
        AppEvent::FieldChanged(update) => on_field_changed(state, update),
        AppEvent::ResumeSelected(path) => on_resume_selected(state, path),
        AppEvent::ResumeLoaded { epoch, result } => on_resume_loaded(state, epoch, result),
        AppEvent::SubmitForm => on_submit_form(state),

        AppEvent::RequestAccess => request_access(state),
        AppEvent::Capture { epoch, event } => on_capture_event(state, epoch, event),
        AppEvent::TimerTick { epoch, take } => on_timer_tick(state, epoch, take),
        AppEvent::LevelTick => on_level_tick(state),
        AppEvent::StartRecording => start_recording(state),
        AppEvent::StopRecording => stop_recording(state),
        AppEvent::Rerecord => rerecord(state),
        AppEvent::SubmitRecording => submit_recording(state),

        AppEvent::SaveResume(path) => save_resume(state, path),
        AppEvent::SaveFinished(result) => {
            let s = state.borrow();
            match result {
                Ok(path) => {
                    log::info!("Resume saved to {}", path.display());
                    s.toast(&format!("Resume saved to {}", path.display()));
                }
                Err(e) => {
                    log::error!("{e}");
                    s.toast(&e);
                }
            }
        }
        AppEvent::Restart => restart(state),
    }
}

/// Write the reviewed candidate's resume back out on the tokio runtime.
fn save_resume(state: &Rc<RefCell<AppState>>, path: std::path::PathBuf) {
    let s = state.borrow();
    let Some(resume) = s.wizard.payload().profile().map(|p| p.resume.clone()) else {
        log::debug!("No resume to save");
        return;
    };
    let sender = s.sender.clone();
    s.tokio_rt.spawn(async move {
        let result = match tokio::fs::write(&path, resume.content()).await {
            Ok(()) => Ok(path),
            Err(e) => Err(format!("Failed to save resume: {e}")),
        };
        let _ = sender.send(AppEvent::SaveFinished(result)).await;
    });
}
