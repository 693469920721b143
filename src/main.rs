use std::process::ExitCode;

use anyhow::Context;
use gtk4::{Application, glib, prelude::*};
use insyd_console::{Config, client::Backend, ui};
use tokio::runtime::Handle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const APP_ID: &str = "dev.insyd.Console";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let backend = Backend::new(config.backend_url.clone())
        .context("Failed to build the HTTP client")?;
    info!(backend = %backend.base(), "Starting notification console");

    let runtime = Handle::current();
    let (quit_tx, quit_rx) = async_channel::bounded(1);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, quitting");
                let _ = quit_tx.send(()).await;
            }
            Err(error) => error!(%error, "Failed to listen for Ctrl-C"),
        }
    });

    let app = Application::builder().application_id(APP_ID).build();

    app.connect_startup(move |app| {
        if let Err(error) = ui::style::load() {
            error!(?error, "Failed to load styles");
        }

        let app = app.clone();
        let quit_rx = quit_rx.clone();
        glib::spawn_future_local(async move {
            if quit_rx.recv().await.is_ok() {
                app.quit();
            }
        });
    });

    app.connect_activate(move |app| {
        ui::activate(app, &config, &backend, &runtime);
    });

    // Arguments belong to us, not to GTK.
    let exit_code = app.run_with_args::<&str>(&[]);

    match exit_code {
        glib::ExitCode::SUCCESS => Ok(ExitCode::SUCCESS),
        _ => Ok(ExitCode::FAILURE),
    }
}
