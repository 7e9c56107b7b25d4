//! ello-feed — load an Ello stream into the terminal.
//!
//! ## Architecture overview
//!
//! ```text
//!                 Completion   ┌────────────┐  StreamDestination  ┌──────────┐  draw()  ┌──────────┐
//! tokio tasks ───────────────► │ generator  │ ──────────────────► │  app.rs  │ ───────► │  ui.rs   │
//! (source/)      (channel)     │ (stream/)  │                     │ (state)  │          │ (render) │
//!                              └────────────┘                     └──────────┘          └──────────┘
//!                                                                      ▲
//!                                                                      │ handle_key_event()
//!                                                                 ┌──────────┐
//!                                                                 │ input.rs │
//!                                                                 └──────────┘
//! ```
//!
//! * **`source/`** — the `FetchClient` trait, the item model and the HTTP
//!   client (JSON stream pages, RSS post streams).
//! * **`stream/`** — completion latch, loading token and the generator that
//!   turns fetches into one ordered batch per load cycle.
//! * **`app`** — the TUI destination: owns the rows, paging and scroll state.
//! * **`ui`** — pure rendering: reads `App` state and draws widgets.
//! * **`input`** — maps key events to `App` mutations.
//! * **`headless`** — `--json` mode: one cycle, printed to stdout.
//! * **`main`** — wires everything together and runs the event loop.

mod app;
mod config;
mod headless;
mod input;
mod source;
mod stream;
mod telemetry;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use app::App;
use config::Config;
use source::{FetchClient, HttpClient};
use stream::{Completion, StreamGenerator};
use telemetry::LogTarget;

// ---------------------------------------------------------------------------
// Restores the terminal on drop, including during unwinding.
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let config = Config::parse();

    let log_target = match (&config.log_file, config.json) {
        (Some(path), _) => LogTarget::File(path),
        (None, true) => LogTarget::Stderr,
        (None, false) => LogTarget::Discard,
    };
    telemetry::init_tracing(log_target)?;

    // Fetches run on the runtime's workers; all state stays on this thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let client: Arc<dyn FetchClient> = Arc::new(HttpClient::new(&config.api_base, config.timeout())?);
    let (mut generator, mut rx) = StreamGenerator::new(config.stream, client, runtime.handle().clone());
    info!(api = %config.api_base, stream = %config.stream, "starting");

    if config.json {
        return runtime.block_on(headless::run(&mut generator, &mut rx));
    }

    install_panic_hook();
    run_tui(&config, &mut generator, &mut rx)
}

fn run_tui(
    config: &Config,
    generator: &mut StreamGenerator,
    rx: &mut UnboundedReceiver<Completion>,
) -> Result<()> {
    // -- terminal setup (RAII — Drop restores on exit or panic) --------------
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new();

    generator.load(&mut app, false)?;
    let mut last_load = Instant::now();
    let refresh = config.refresh_interval();

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Apply every completion that has arrived.
    //   2. Start a reload if one was requested or is due.
    //   3. Render the UI.
    //   4. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        // 1. Process completions
        while let Ok(completion) = rx.try_recv() {
            generator.handle(&mut app, completion)?;
        }

        // 2. Reload
        let due = refresh.is_some_and(|every| last_load.elapsed() >= every);
        if app.reload_requested || due {
            app.reload_requested = false;
            generator.load(&mut app, true)?;
            app.status = "Reloading…".into();
            last_load = Instant::now();
        }

        // 3. Render
        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        // 4. Handle input
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.quit {
            generator.cancel();
            break;
        }
    }

    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
