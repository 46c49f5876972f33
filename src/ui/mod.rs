pub mod form_page;
pub mod recording_page;
pub mod review_page;
pub mod window;

use gtk4::prelude::*;

/// Widgets of whichever step is on screen. Only one exists at a time.
pub enum Page {
    Form(form_page::FormPage),
    Recording(recording_page::RecordingPage),
    Review(review_page::ReviewPage),
}

impl Page {
    pub fn widget(&self) -> &gtk4::Widget {
        match self {
            Page::Form(page) => page.root.upcast_ref(),
            Page::Recording(page) => page.root.upcast_ref(),
            Page::Review(page) => page.root.upcast_ref(),
        }
    }
}
