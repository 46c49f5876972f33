mod app;
mod config;
mod error;
mod media;
mod ui;
mod wizard;

use std::cell::RefCell;
use std::rc::Rc;

use gtk4::glib;
use gtk4::prelude::*;

use app::{AppEvent, AppState};
use config::Config;

fn main() -> glib::ExitCode {
    env_logger::init();
    log::info!("Candidate Intake starting");

    // The first argument picks the starting step, e.g. `/review`.
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "candidate-intake".to_string());
    let start_path = args.next().unwrap_or_else(|| "/".to_string());

    let application = libadwaita::Application::builder()
        .application_id("io.github.candidate-intake")
        .build();

    application.connect_activate(move |app| on_activate(app, &start_path));
    // GTK would otherwise try to interpret the start path as a file to open.
    application.run_with_args(&[program])
}

fn on_activate(app: &libadwaita::Application, start_path: &str) {
    let (sender, receiver) = async_channel::unbounded::<AppEvent>();

    let state = Rc::new(RefCell::new(AppState::new(sender, Config::load())));

    let widgets = ui::window::build_window(app);
    {
        let state_clone = state.clone();
        widgets.window.connect_close_request(move |_| {
            app::shutdown(&state_clone);
            glib::Propagation::Proceed
        });
    }
    widgets.window.present();
    state.borrow_mut().window = Some(widgets);

    let nav = state.borrow_mut().wizard.open_path(start_path);
    log::info!("Opening {} (landed on {})", start_path, nav.to.path());
    app::apply_navigation(&state, nav);

    // Attach the event handler
    {
        let state_clone = state.clone();
        glib::spawn_future_local(async move {
            while let Ok(event) = receiver.recv().await {
                app::handle_event(&state_clone, event);
            }
        });
    }
}
