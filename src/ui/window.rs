use libadwaita::prelude::*;

use crate::wizard::Route;

/// Handles returned from building the main window.
pub struct WindowWidgets {
    pub window: libadwaita::ApplicationWindow,
    pub toolbar_view: libadwaita::ToolbarView,
    pub title: libadwaita::WindowTitle,
    pub toasts: libadwaita::ToastOverlay,
}

/// Build the wizard window. The step content is swapped in by `show_page`.
pub fn build_window(app: &libadwaita::Application) -> WindowWidgets {
    let window = libadwaita::ApplicationWindow::builder()
        .application(app)
        .title("Candidate Intake")
        .default_width(640)
        .default_height(760)
        .build();

    let toolbar_view = libadwaita::ToolbarView::new();
    let header = libadwaita::HeaderBar::new();
    let title = libadwaita::WindowTitle::new("Candidate Intake", "");
    header.set_title_widget(Some(&title));
    toolbar_view.add_top_bar(&header);

    let toasts = libadwaita::ToastOverlay::new();
    toasts.set_child(Some(&toolbar_view));
    window.set_content(Some(&toasts));

    WindowWidgets {
        window,
        toolbar_view,
        title,
        toasts,
    }
}

pub fn show_page(widgets: &WindowWidgets, route: Route, content: &gtk4::Widget) {
    let step = match route {
        Route::Form => 1,
        Route::Recording => 2,
        Route::Review => 3,
    };
    widgets.title.set_title(route.title());
    widgets.title.set_subtitle(&format!("Step {step} of 3"));
    widgets.toolbar_view.set_content(Some(content));
}

pub fn show_toast(widgets: &WindowWidgets, message: &str) {
    widgets.toasts.add_toast(libadwaita::Toast::new(message));
}
