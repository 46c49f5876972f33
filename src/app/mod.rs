mod event_handler;
mod form;
mod navigation;
mod recording;
mod state;

pub use event_handler::handle_event;
pub use navigation::{apply_navigation, shutdown};
pub use state::{AppEvent, AppState};
