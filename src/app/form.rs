use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use gtk4::gio;

use super::navigation::apply_navigation;
use super::state::{AppEvent, AppState};
use crate::ui::{self, Page};
use crate::wizard::{FieldUpdate, ResumeFile};

pub fn on_field_changed(state: &Rc<RefCell<AppState>>, update: FieldUpdate) {
    state.borrow_mut().form.update_field(update);
}

/// Read a picked file on the tokio runtime. Only its name, declared type,
/// size and content make it into the form. A file whose type or size is
/// already wrong is never read.
pub fn on_resume_selected(state: &Rc<RefCell<AppState>>, path: PathBuf) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let media_type = declared_media_type(&path);
    log::info!("Resume selected: {name} ({media_type})");

    let s = state.borrow();
    let sender = s.sender.clone();
    let epoch = s.epoch;
    s.tokio_rt.spawn(async move {
        let result = match tokio::fs::metadata(&path).await {
            Ok(meta) => match ResumeFile::check(&media_type, meta.len()) {
                Some(problem) => {
                    log::info!("Not reading {name}: {problem}");
                    Ok(ResumeFile::declared(name, media_type, meta.len()))
                }
                None => match tokio::fs::read(&path).await {
                    Ok(bytes) => Ok(ResumeFile::new(name, media_type, bytes)),
                    Err(e) => Err(format!("Could not read {name}: {e}")),
                },
            },
            Err(e) => Err(format!("Could not read {name}: {e}")),
        };
        let _ = sender.send(AppEvent::ResumeLoaded { epoch, result }).await;
    });
}

/// Media type the platform associates with the file name, the way a
/// browser fills in `File.type`.
fn declared_media_type(path: &std::path::Path) -> String {
    let (content_type, _uncertain) = gio::content_type_guess(Some(path), &[] as &[u8]);
    gio::content_type_get_mime_type(&content_type)
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

pub fn on_resume_loaded(
    state: &Rc<RefCell<AppState>>,
    epoch: u64,
    result: Result<ResumeFile, String>,
) {
    let mut s = state.borrow_mut();
    if epoch != s.epoch {
        log::debug!("Dropping resume read for an abandoned form");
        return;
    }
    match result {
        Ok(file) => {
            s.form.update_field(FieldUpdate::Resume(Some(file)));
            if let Some(Page::Form(ref page)) = s.page {
                ui::form_page::show_resume(page, s.form.resume());
            }
        }
        Err(e) => {
            log::warn!("{e}");
            s.toast(&e);
        }
    }
}

pub fn on_submit_form(state: &Rc<RefCell<AppState>>) {
    let submitted = state.borrow_mut().form.submit();
    match submitted {
        Ok(profile) => {
            let nav = state.borrow_mut().wizard.complete_form(profile);
            apply_navigation(state, nav);
        }
        Err(_) => {
            let s = state.borrow();
            if let Some(Page::Form(ref page)) = s.page {
                ui::form_page::show_errors(page, &s.form);
            }
        }
    }
}
