mod archive;
mod cli;
mod loader;
#[cfg(test)]
mod testutil;
mod ui;

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use winit::event_loop::EventLoop;

use crate::archive::scan_archive;
use crate::cli::Cli;
use crate::loader::{spawn_decoder, PageStore, UserEvent};
use crate::ui::render::ScreenSize;
use crate::ui::state::ViewerState;
use crate::ui::{App, INITIAL_SIZE};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    // Scan before any window exists so a bad archive never shows a UI
    let index = match scan_archive(&cli.archive) {
        Ok(index) => Arc::new(index),
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if index.is_empty() {
        log::warn!("No pages found in {}", cli.archive.display());
    }

    let pages = PageStore::shared(index.len());

    let event_loop = match EventLoop::<UserEvent>::with_user_event().build() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let proxy = event_loop.create_proxy();

    spawn_decoder(Arc::clone(&index), Arc::clone(&pages), proxy);

    let state = ViewerState::new(pages, ScreenSize::new(INITIAL_SIZE.width, INITIAL_SIZE.height));
    let mut app = App::new(state);

    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop failed: {}", e);
        return ExitCode::FAILURE;
    }

    if app.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
