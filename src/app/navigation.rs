use std::cell::RefCell;
use std::rc::Rc;

use super::state::AppState;
use crate::ui::{self, Page};
use crate::wizard::{FormState, Navigation, RecordingSession, ReviewSummary, Route};

/// Tear down the step that was showing and build the one the wizard
/// landed on.
pub fn apply_navigation(state: &Rc<RefCell<AppState>>, nav: Navigation) {
    let mut s = state.borrow_mut();
    s.leave_step();
    if nav.redirected {
        s.toast("Please complete the candidate form first.");
    }

    let Some(window) = s.window.as_ref().map(|w| w.window.clone()) else {
        log::error!("No window to show {}", nav.to.path());
        return;
    };
    let sender = s.sender.clone();

    let page = match nav.to {
        Route::Form => {
            s.form = FormState::new();
            Page::Form(ui::form_page::build_form_page(&window, sender))
        }
        Route::Recording => {
            let session = RecordingSession::new();
            let page = ui::recording_page::build_recording_page(sender);
            ui::recording_page::refresh(&page, &session);
            s.session = Some(session);
            Page::Recording(page)
        }
        Route::Review => {
            let Some(summary) = ReviewSummary::from_payload(s.wizard.payload()) else {
                // unreachable through the wizard guard; reset rather than show blanks
                log::error!("Review entered without a profile");
                let nav = s.wizard.restart();
                drop(s);
                apply_navigation(state, nav);
                return;
            };
            let page = ui::review_page::build_review_page(&window, sender, &summary);
            match summary.video.as_deref() {
                Some(video) if video.path().exists() => {
                    ui::review_page::show_video(&page, video.path())
                }
                Some(video) => {
                    log::error!("Recording {} is gone", video.path().display());
                    ui::review_page::show_video_error(&page);
                }
                None => {}
            }
            Page::Review(page)
        }
    };

    if let Some(ref widgets) = s.window {
        ui::window::show_page(widgets, nav.to, page.widget());
    }
    s.page = Some(page);
}

pub fn restart(state: &Rc<RefCell<AppState>>) {
    let nav = state.borrow_mut().wizard.restart();
    apply_navigation(state, nav);
}

/// Release whatever the current step holds; used when the window closes.
pub fn shutdown(state: &Rc<RefCell<AppState>>) {
    log::info!("Shutting down");
    state.borrow_mut().leave_step();
}
