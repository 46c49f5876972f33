use std::collections::HashMap;

use gtk4::gio;
use gtk4::prelude::*;
use libadwaita::prelude::*;

use crate::app::AppEvent;
use crate::wizard::{FieldUpdate, FormField, FormState, Position, ResumeFile};

const NO_POSITION: &str = "-- Select Position --";

/// Handles returned from building the candidate form.
pub struct FormPage {
    pub root: gtk4::ScrolledWindow,
    rows: HashMap<FormField, gtk4::Widget>,
    error_labels: HashMap<FormField, gtk4::Label>,
    resume_row: libadwaita::ActionRow,
}

/// Build the candidate form. Every edit is posted as a `FieldChanged` event.
pub fn build_form_page(
    window: &libadwaita::ApplicationWindow,
    sender: async_channel::Sender<AppEvent>,
) -> FormPage {
    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 6);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    let mut rows: HashMap<FormField, gtk4::Widget> = HashMap::new();
    let mut error_labels = HashMap::new();

    let first_name = text_row(FormField::FirstName, &sender, FieldUpdate::FirstName);
    let last_name = text_row(FormField::LastName, &sender, FieldUpdate::LastName);
    let position = position_row(&sender);
    let current_position =
        text_row(FormField::CurrentPosition, &sender, FieldUpdate::CurrentPosition);
    let experience = text_row(FormField::Experience, &sender, FieldUpdate::Experience);
    experience.set_input_purpose(gtk4::InputPurpose::Number);
    let resume_row = resume_row(window, &sender);

    rows.insert(FormField::FirstName, first_name.upcast());
    rows.insert(FormField::LastName, last_name.upcast());
    rows.insert(FormField::Position, position.upcast());
    rows.insert(FormField::CurrentPosition, current_position.upcast());
    rows.insert(FormField::Experience, experience.upcast());
    rows.insert(FormField::Resume, resume_row.clone().upcast());

    for field in FormField::ALL {
        let Some(row) = rows.get(&field) else {
            continue;
        };
        let group = libadwaita::PreferencesGroup::new();
        group.add(row);
        content.append(&group);

        let error = gtk4::Label::new(None);
        error.add_css_class("error");
        error.add_css_class("caption");
        error.set_xalign(0.0);
        error.set_margin_start(12);
        error.set_visible(false);
        content.append(&error);
        error_labels.insert(field, error);
    }

    let next_button = gtk4::Button::with_label("Next");
    next_button.add_css_class("suggested-action");
    next_button.add_css_class("pill");
    next_button.set_halign(gtk4::Align::Center);
    next_button.set_margin_top(12);
    next_button.connect_clicked(move |_| {
        let _ = sender.try_send(AppEvent::SubmitForm);
    });
    content.append(&next_button);

    let clamp = libadwaita::Clamp::builder()
        .maximum_size(600)
        .child(&content)
        .build();
    let root = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .child(&clamp)
        .build();

    FormPage {
        root,
        rows,
        error_labels,
        resume_row,
    }
}

fn text_row(
    field: FormField,
    sender: &async_channel::Sender<AppEvent>,
    update: fn(String) -> FieldUpdate,
) -> libadwaita::EntryRow {
    let row = libadwaita::EntryRow::builder()
        .title(format!("{} *", field.label()))
        .build();
    let sender = sender.clone();
    row.connect_changed(move |row| {
        let _ = sender.try_send(AppEvent::FieldChanged(update(row.text().to_string())));
    });
    row
}

fn position_row(sender: &async_channel::Sender<AppEvent>) -> libadwaita::ComboRow {
    let mut titles = vec![NO_POSITION];
    titles.extend(Position::ALL.iter().map(|p| p.title()));
    let model = gtk4::StringList::new(&titles);

    let row = libadwaita::ComboRow::builder()
        .title(format!("{} *", FormField::Position.label()))
        .model(&model)
        .build();
    let sender = sender.clone();
    row.connect_selected_notify(move |row| {
        let title = row
            .selected_item()
            .and_downcast::<gtk4::StringObject>()
            .map(|item| item.string().to_string())
            .unwrap_or_default();
        let position = match title.parse::<Position>() {
            Ok(position) => Some(position),
            Err(e) => {
                if title != NO_POSITION {
                    log::warn!("{e}");
                }
                None
            }
        };
        let _ = sender.try_send(AppEvent::FieldChanged(FieldUpdate::Position(position)));
    });
    row
}

fn resume_row(
    window: &libadwaita::ApplicationWindow,
    sender: &async_channel::Sender<AppEvent>,
) -> libadwaita::ActionRow {
    let row = libadwaita::ActionRow::builder()
        .title("Upload Resume (PDF \u{2264} 5 MB) *")
        .subtitle("No file selected")
        .build();

    let choose = gtk4::Button::with_label("Choose\u{2026}");
    choose.set_valign(gtk4::Align::Center);
    row.add_suffix(&choose);

    let window = window.clone();
    let sender = sender.clone();
    choose.connect_clicked(move |_| {
        let filter = gtk4::FileFilter::new();
        filter.set_name(Some("PDF documents"));
        filter.add_suffix("pdf");
        let filters = gio::ListStore::new::<gtk4::FileFilter>();
        filters.append(&filter);

        let dialog = gtk4::FileDialog::builder()
            .title("Choose Resume")
            .modal(true)
            .filters(&filters)
            .build();

        let sender = sender.clone();
        dialog.open(Some(&window), gio::Cancellable::NONE, move |result| match result {
            Ok(file) => match file.path() {
                Some(path) => {
                    let _ = sender.try_send(AppEvent::ResumeSelected(path));
                }
                None => log::warn!("Selected resume has no local path"),
            },
            Err(e) => log::debug!("Resume selection cancelled: {e}"),
        });
    });

    row
}

/// Show the errors from the last submit next to their fields.
pub fn show_errors(page: &FormPage, form: &FormState) {
    let errors = form.errors();
    for field in FormField::ALL {
        let message = errors.get(&field).map(String::as_str);
        if let Some(label) = page.error_labels.get(&field) {
            label.set_text(message.unwrap_or_default());
            label.set_visible(message.is_some());
        }
        if let Some(row) = page.rows.get(&field) {
            if message.is_some() {
                row.add_css_class("error");
            } else {
                row.remove_css_class("error");
            }
        }
    }
}

pub fn show_resume(page: &FormPage, resume: Option<&ResumeFile>) {
    let subtitle = match resume {
        Some(file) => format!(
            "{} ({:.1} MB)",
            file.name(),
            file.size() as f64 / 1_048_576.0
        ),
        None => "No file selected".to_string(),
    };
    page.resume_row.set_subtitle(&subtitle);
}
