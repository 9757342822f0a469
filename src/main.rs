//! aslpanel - AllStarLink node status panel.
//!
//! Shows connected peers, host IP and uptime of an AllStarLink node on a
//! 240x240 SPI TFT, and drives a two-button connect/disconnect menu for
//! favorite nodes.

mod app;
mod buttons;
mod config;
mod control;
mod display;
mod sysinfo;
mod view;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, Event, Step};
use buttons::ButtonPad;
use config::Config;
use control::AsteriskCli;
use display::Display;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aslpanel=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    tracing::info!("Starting aslpanel v{}", VERSION);

    let config = Config::load().context("loading configuration")?;
    let node = config::load_node_config(&config.favourites_file)
        .context("loading favourites file")?;
    tracing::info!(
        "Node {} with {} favorite(s)",
        node.node_number,
        node.favorites.len()
    );

    let mut display = Display::new(&config).context("initializing display")?;

    let command_timeout = Duration::from_secs(config.command_timeout_secs);
    let mut app = App::new(
        node.node_number.clone(),
        node.favorites,
        sysinfo::query(),
        Box::new(AsteriskCli::new(command_timeout)),
    );

    let (tx, rx) = mpsc::channel();

    // Interrupt means clean shutdown of the event loop
    let mut signals = Signals::new([SIGINT, SIGTERM]).context("registering signal handler")?;
    let _signals = {
        let tx = tx.clone();
        thread::spawn(move || {
            if signals.forever().next().is_some() {
                let _ = tx.send(Event::Shutdown);
            }
        })
    };

    // Workers are detached; they die with the process
    let _buttons = ButtonPad::new(config.button_a_pin, config.button_b_pin)
        .context("initializing buttons")?
        .spawn(tx.clone());
    let _peers = control::spawn_status_poller(
        AsteriskCli::new(command_timeout),
        node.node_number,
        Duration::from_secs(config.startup_grace_secs),
        Duration::from_secs(config.peer_poll_secs),
        tx.clone(),
    );
    let _info = sysinfo::spawn_info_poller(Duration::from_secs(config.info_refresh_secs), tx);

    display.render(&app.view()).context("initial render")?;

    // Single-threaded event loop: the only place App state mutates
    for event in rx.iter() {
        match app.handle_event(event) {
            Step::Redraw => {
                if let Err(e) = display.render(&app.view()) {
                    tracing::error!("Display update failed: {:#}", e);
                }
            }
            Step::Idle => {}
            Step::Shutdown => break,
        }
    }

    tracing::info!("Shutting down");
    Ok(())
}
