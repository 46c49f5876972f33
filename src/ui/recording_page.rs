use gtk4::prelude::*;
use gtk4::{gdk, glib};
use libadwaita::prelude::*;

use crate::app::AppEvent;
use crate::media::PreviewFrame;
use crate::wizard::{Acquisition, RecorderState, RecordingSession, INSTRUCTIONS};

/// Handles returned from building the recording step.
pub struct RecordingPage {
    pub root: gtk4::ScrolledWindow,
    access_box: gtk4::Box,
    access_button: gtk4::Button,
    access_status: gtk4::Label,
    recorder_box: gtk4::Box,
    preview: gtk4::Picture,
    level_bar: gtk4::LevelBar,
    timer_label: gtk4::Label,
    recording_dot: gtk4::Label,
    start_button: gtk4::Button,
    stop_button: gtk4::Button,
    rerecord_button: gtk4::Button,
    submit_button: gtk4::Button,
    result_label: gtk4::Label,
    error_label: gtk4::Label,
}

fn event_button(
    label: &str,
    css_class: &str,
    sender: &async_channel::Sender<AppEvent>,
    event: fn() -> AppEvent,
) -> gtk4::Button {
    let button = gtk4::Button::with_label(label);
    button.add_css_class(css_class);
    button.add_css_class("pill");
    let sender = sender.clone();
    button.connect_clicked(move |_| {
        let _ = sender.try_send(event());
    });
    button
}

/// Build the recording step: instructions, the access prompt, and the
/// recorder with its controls.
pub fn build_recording_page(sender: async_channel::Sender<AppEvent>) -> RecordingPage {
    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 12);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    // --- Instructions ---
    let instructions = libadwaita::PreferencesGroup::new();
    instructions.set_title("Video Recording Instructions");
    for prompt in INSTRUCTIONS {
        let row = libadwaita::ActionRow::builder().title(prompt).build();
        row.add_prefix(&gtk4::Image::from_icon_name("object-select-symbolic"));
        instructions.add(&row);
    }
    content.append(&instructions);

    // --- Access prompt ---
    let access_box = gtk4::Box::new(gtk4::Orientation::Vertical, 8);
    access_box.add_css_class("card");
    access_box.set_margin_top(6);
    let access_title = gtk4::Label::new(Some("Camera & Microphone Permission Needed"));
    access_title.add_css_class("title-4");
    access_title.set_margin_top(12);
    let access_status = gtk4::Label::new(Some(
        "To continue, please allow access to your camera and microphone.",
    ));
    access_status.set_wrap(true);
    access_status.set_margin_start(12);
    access_status.set_margin_end(12);
    let access_button = event_button("Allow Access", "suggested-action", &sender, || {
        AppEvent::RequestAccess
    });
    access_button.set_halign(gtk4::Align::Center);
    access_button.set_margin_bottom(12);
    access_box.append(&access_title);
    access_box.append(&access_status);
    access_box.append(&access_button);
    content.append(&access_box);

    // --- Recorder ---
    let recorder_box = gtk4::Box::new(gtk4::Orientation::Vertical, 8);

    let preview = gtk4::Picture::new();
    preview.set_size_request(480, 360);
    preview.set_content_fit(gtk4::ContentFit::Contain);
    preview.add_css_class("card");
    recorder_box.append(&preview);

    let level_bar = gtk4::LevelBar::for_interval(0.0, 1.0);
    level_bar.set_margin_start(48);
    level_bar.set_margin_end(48);
    recorder_box.append(&level_bar);

    let timer_row = gtk4::Box::new(gtk4::Orientation::Horizontal, 6);
    timer_row.set_halign(gtk4::Align::Center);
    let recording_dot = gtk4::Label::new(Some("\u{25CF}"));
    recording_dot.add_css_class("error");
    let timer_label = gtk4::Label::new(None);
    timer_label.add_css_class("title-4");
    timer_label.add_css_class("numeric");
    timer_row.append(&recording_dot);
    timer_row.append(&timer_label);
    recorder_box.append(&timer_row);

    let buttons = gtk4::Box::new(gtk4::Orientation::Horizontal, 12);
    buttons.set_halign(gtk4::Align::Center);
    let start_button =
        event_button("Start Recording", "suggested-action", &sender, || AppEvent::StartRecording);
    let stop_button =
        event_button("Stop Recording", "destructive-action", &sender, || AppEvent::StopRecording);
    let rerecord_button = event_button("Re-record", "flat", &sender, || AppEvent::Rerecord);
    let submit_button =
        event_button("Submit", "suggested-action", &sender, || AppEvent::SubmitRecording);
    buttons.append(&start_button);
    buttons.append(&stop_button);
    buttons.append(&rerecord_button);
    buttons.append(&submit_button);
    recorder_box.append(&buttons);

    let result_label = gtk4::Label::new(None);
    result_label.add_css_class("dim-label");
    recorder_box.append(&result_label);

    content.append(&recorder_box);

    let error_label = gtk4::Label::new(None);
    error_label.add_css_class("error");
    error_label.set_wrap(true);
    content.append(&error_label);

    let clamp = libadwaita::Clamp::builder()
        .maximum_size(640)
        .child(&content)
        .build();
    let root = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .child(&clamp)
        .build();

    RecordingPage {
        root,
        access_box,
        access_button,
        access_status,
        recorder_box,
        preview,
        level_bar,
        timer_label,
        recording_dot,
        start_button,
        stop_button,
        rerecord_button,
        submit_button,
        result_label,
        error_label,
    }
}

/// Project the session onto the widgets.
pub fn refresh(page: &RecordingPage, session: &RecordingSession) {
    let controls = session.controls();
    let granted = session.acquisition() == Acquisition::Granted;

    page.access_box.set_visible(!granted);
    page.access_button.set_sensitive(controls.request_access);
    page.access_status.set_text(match session.acquisition() {
        Acquisition::Pending => "Waiting for the camera\u{2026}",
        _ => "To continue, please allow access to your camera and microphone.",
    });

    page.recorder_box.set_visible(granted);
    page.timer_label.set_text(&session.timer_text());
    page.recording_dot
        .set_visible(session.state() == RecorderState::Recording);

    page.start_button.set_visible(controls.start);
    page.stop_button.set_visible(controls.stop);
    page.rerecord_button.set_visible(controls.rerecord);
    page.submit_button.set_visible(controls.submit);

    let result = match session.artifact() {
        Some(artifact) => format!(
            "Recorded {}s ({:.1} MB)",
            artifact.duration_secs(),
            artifact.size() as f64 / 1_048_576.0
        ),
        None if session.is_finalizing() => "Finishing recording\u{2026}".to_string(),
        None if session.state() == RecorderState::Recording => format!(
            "{:.1} MB captured",
            session.captured_bytes() as f64 / 1_048_576.0
        ),
        None => String::new(),
    };
    page.result_label.set_text(&result);
    page.result_label.set_visible(!result.is_empty());

    let error = session.error().unwrap_or_default();
    page.error_label.set_text(error);
    page.error_label.set_visible(!error.is_empty());
}

/// Show a live camera frame. Only JPEG frames can be decoded for preview.
pub fn show_frame(page: &RecordingPage, frame: &PreviewFrame) {
    if !frame.mjpeg {
        return;
    }
    let bytes = glib::Bytes::from(frame.bytes.as_slice());
    match gdk::Texture::from_bytes(&bytes) {
        Ok(texture) => page.preview.set_paintable(Some(&texture)),
        Err(e) => log::debug!("Undecodable preview frame {}x{}: {e}", frame.width, frame.height),
    }
}

pub fn show_level(page: &RecordingPage, level: f32) {
    page.level_bar
        .set_value((level as f64 * 4.0).clamp(0.0, 1.0));
}
