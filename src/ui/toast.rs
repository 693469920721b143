use std::{cell::RefCell, rc::Rc, time::Duration};

use gtk4::{
    self as gtk, Align, Application, ApplicationWindow, GestureClick, Label,
    Orientation, glib, prelude::*,
};
use gtk4_layer_shell::{Edge, Layer, LayerShell};

use crate::console::{Toast, ToastKind};

/// The gap between stacked toasts.
const GAP: i32 = 10;
/// The margins between the toast stack and the screen's edges.
const MARGIN: i32 = 16;
/// The toast's width.
const WIDTH: i32 = 280;

/// Shows toasts stacked in the top-right corner, newest on top.
pub struct Manager {
    application: Application,
    windows: Windows,
    success_timeout: Duration,
    error_timeout: Duration,
}

impl Manager {
    pub fn new(
        application: Application,
        success_timeout: Duration,
        error_timeout: Duration,
    ) -> Self {
        Self {
            application,
            windows: Windows::new(),
            success_timeout,
            error_timeout,
        }
    }

    pub fn push(&mut self, toast: &Toast) {
        let window = self.create_window(toast);
        self.windows.push(window.clone());
        window.present();
        self.windows.adjust();

        let timeout = match toast.kind {
            ToastKind::Success => self.success_timeout,
            ToastKind::Error => self.error_timeout,
        };
        let windows = self.windows.clone();
        glib::timeout_add_local_once(timeout, move || {
            windows.dismiss(&window);
        });
    }

    fn create_window(&self, toast: &Toast) -> ApplicationWindow {
        // *------------------------------*
        // | ICON |  MESSAGE              |
        // *------------------------------*
        let icon = Label::builder().css_classes(["icon"]).build();
        icon.set_text(match toast.kind {
            ToastKind::Success => "✅",
            ToastKind::Error => "❌",
        });

        let message = Label::builder()
            .css_classes(["message"])
            .wrap(true)
            .hexpand(true)
            .halign(Align::Start)
            .build();
        message.set_text(toast.message);

        let container = gtk::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(8)
            .css_classes(["toast", toast.kind.css_class()])
            .build();
        container.append(&icon);
        container.append(&message);

        let window = ApplicationWindow::builder()
            .application(&self.application)
            .child(&container)
            .default_width(WIDTH)
            .resizable(false)
            .decorated(false)
            .build();

        // Without a layer-shell compositor the toast is a plain small window.
        if gtk4_layer_shell::is_supported() {
            window.init_layer_shell();
            window.set_layer(Layer::Overlay);
            window.set_anchor(Edge::Right, true);
            window.set_anchor(Edge::Top, true);
            window.set_margin(Edge::Right, MARGIN);
            window.set_margin(Edge::Top, MARGIN);
        }

        let click = GestureClick::new();
        let window_clone = window.clone();
        let windows = self.windows.clone();

        click.connect_pressed(move |_click, _button, _x, _y| {
            windows.dismiss(&window_clone);
        });
        window.add_controller(click);

        window
    }
}

#[derive(Clone)]
struct Windows(Rc<RefCell<Vec<ApplicationWindow>>>);

impl Windows {
    fn new() -> Self {
        Self(Rc::new(RefCell::new(vec![])))
    }

    fn push(&self, window: ApplicationWindow) {
        self.0.borrow_mut().push(window);
    }

    /// Closes `window` if it is still shown and restacks the rest.
    fn dismiss(&self, window: &ApplicationWindow) {
        let removed = {
            let mut windows = self.0.borrow_mut();
            let before = windows.len();
            windows.retain(|w| !w.eq(window));
            windows.len() != before
        };

        if removed {
            window.close();
            self.adjust();
        }
    }

    fn adjust(&self) {
        if !gtk4_layer_shell::is_supported() {
            return;
        }

        let mut offset = MARGIN;
        for window in self.0.borrow().iter().rev() {
            window.set_margin(Edge::Top, offset);

            let (_minimum, natural, _minimum_baseline, _natural_baseline) =
                window.measure(Orientation::Vertical, WIDTH);

            offset += natural + GAP;
        }
    }
}
