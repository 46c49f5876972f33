use std::path::Path;

use gtk4::gio;
use gtk4::prelude::*;
use libadwaita::prelude::*;

use crate::app::AppEvent;
use crate::wizard::ReviewSummary;

/// Handles returned from building the review step.
pub struct ReviewPage {
    pub root: gtk4::ScrolledWindow,
    video: gtk4::Video,
    video_status: gtk4::Label,
}

/// Build the read-only summary of the collected profile and recording.
pub fn build_review_page(
    window: &libadwaita::ApplicationWindow,
    sender: async_channel::Sender<AppEvent>,
    summary: &ReviewSummary,
) -> ReviewPage {
    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 12);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    // --- Candidate details ---
    let details = libadwaita::PreferencesGroup::new();
    details.set_title("Candidate Details");
    for (label, value) in summary.details() {
        let row = libadwaita::ActionRow::builder()
            .title(label)
            .subtitle(value)
            .build();
        row.add_css_class("property");
        details.add(&row);
    }

    let resume = summary.profile.resume.clone();
    let resume_row = libadwaita::ActionRow::builder()
        .title("Resume")
        .subtitle(resume.name())
        .build();
    resume_row.add_css_class("property");
    let download = gtk4::Button::with_label("Download Resume");
    download.set_valign(gtk4::Align::Center);
    resume_row.add_suffix(&download);
    details.add(&resume_row);
    content.append(&details);

    {
        let window = window.clone();
        let sender = sender.clone();
        let initial_name = summary.resume_download_name();
        download.connect_clicked(move |_| {
            let dialog = gtk4::FileDialog::builder()
                .title("Save Resume")
                .modal(true)
                .initial_name(initial_name.as_str())
                .build();
            let sender = sender.clone();
            dialog.save(Some(&window), gio::Cancellable::NONE, move |result| match result {
                Ok(file) => match file.path() {
                    Some(path) => {
                        let _ = sender.try_send(AppEvent::SaveResume(path));
                    }
                    None => log::warn!("Save location has no local path"),
                },
                Err(e) => log::debug!("Resume save cancelled: {e}"),
            });
        });
    }

    // --- Recorded video ---
    let video_group = libadwaita::PreferencesGroup::new();
    video_group.set_title("Recorded Video");
    let video = gtk4::Video::new();
    video.set_size_request(480, 360);
    video.set_visible(false);
    let video_status = gtk4::Label::new(None);
    video_status.add_css_class("dim-label");
    video_status.set_wrap(true);
    match summary.video_caption() {
        Some(caption) => {
            video_group.set_description(Some(caption.as_str()));
            video_status.set_text("Loading video\u{2026}");
        }
        None => video_status.set_text("No video recorded."),
    }
    video_group.add(&video);
    video_group.add(&video_status);
    content.append(&video_group);

    let back = gtk4::Button::with_label("Go Back to Form");
    back.add_css_class("pill");
    back.set_halign(gtk4::Align::Center);
    back.set_margin_top(12);
    back.connect_clicked(move |_| {
        let _ = sender.try_send(AppEvent::Restart);
    });
    content.append(&back);

    let clamp = libadwaita::Clamp::builder()
        .maximum_size(640)
        .child(&content)
        .build();
    let root = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .child(&clamp)
        .build();

    ReviewPage {
        root,
        video,
        video_status,
    }
}

pub fn show_video(page: &ReviewPage, path: &Path) {
    page.video.set_filename(Some(path));
    page.video.set_visible(true);
    page.video_status.set_visible(false);
}

pub fn show_video_error(page: &ReviewPage) {
    page.video.set_visible(false);
    page.video_status.set_text("The recording is no longer available.");
    page.video_status.set_visible(true);
}
