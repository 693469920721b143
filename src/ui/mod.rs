pub mod style;
pub mod toast;
pub mod window;

use std::{cell::RefCell, rc::Rc};

use futures::StreamExt;
use gtk4::{Application, glib, prelude::*};
use tokio::runtime::Handle;
use tracing::debug;

use crate::{client::Backend, config::Config, console::Console};

use self::window::ConsoleWindow;

/// Builds the console window and starts feeding it. A second activation only
/// raises the existing window.
pub fn activate(
    application: &Application,
    config: &Config,
    backend: &Backend,
    runtime: &Handle,
) {
    if let Some(existing) = application
        .windows()
        .into_iter()
        .find(|window| window.has_css_class("console"))
    {
        existing.present();
        return;
    }

    let (updates_tx, mut updates) = async_channel::unbounded();
    let (toasts_tx, mut toasts) = async_channel::unbounded();

    let console = Rc::new(RefCell::new(Console::new(
        backend.clone(),
        config.poll_interval,
        config.poll_failure,
        runtime.clone(),
        updates_tx,
        toasts_tx,
    )));
    let window = ConsoleWindow::build(application, &console);

    {
        // Ends once the console shuts down and closes the update channel.
        let console = console.clone();
        let window = window.clone();

        glib::spawn_future_local(async move {
            while let Some(update) = updates.next().await {
                let changed = console.borrow_mut().apply_poll(update);
                if changed {
                    window.render_list(console.borrow().state());
                }
            }
            debug!("Poll updates closed");
        });
    }

    {
        let mut manager = toast::Manager::new(
            application.clone(),
            config.toast_success,
            config.toast_error,
        );

        glib::spawn_future_local(async move {
            while let Some(toast) = toasts.next().await {
                manager.push(&toast);
            }
        });
    }

    console.borrow_mut().mount();
    window.window.present();
}
