mod app;
mod msg;

use std::io;
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing_subscriber::EnvFilter;

use app::App;
use msg::Msg;
use treeshelf::model::config::AppConfig;
use treeshelf::session::{Session, SessionOptions};
use treeshelf::storage::FsSlotStore;

fn main() -> Result<()> {
    let config = AppConfig::load()?;
    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("cannot create data dir {}", data_dir.display()))?;

    // Initialize logging to file (never stdout)
    let file_appender = tracing_appender::rolling::daily(&data_dir, "treeshelf.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.general.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("treeshelf=info"));
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .init();

    tracing::info!(data_dir = %data_dir.display(), "treeshelf starting");

    let store = FsSlotStore::open(&data_dir)?;
    let session = Session::load(Box::new(store), SessionOptions::from(&config))
        .context("cannot restore the stored shelf")?;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, config, session);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        tracing::error!("fatal: {e:?}");
        eprintln!("treeshelf error: {e:?}");
    }

    Ok(())
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: AppConfig,
    session: Session,
) -> Result<()> {
    let (tx, rx) = mpsc::channel::<Msg>();
    let mut app = App::new(config, session, tx.clone());

    // Input thread: forwards terminal events as Msg
    let tx_input = tx.clone();
    thread::spawn(move || {
        loop {
            if let Ok(event) = event::read() {
                let msg = match event {
                    Event::Key(k) => Msg::Key(k),
                    Event::Resize(w, h) => Msg::Resize(w, h),
                    _ => continue,
                };
                if tx_input.send(msg).is_err() {
                    break;
                }
            }
        }
    });

    terminal.draw(|f| app.view(f))?;

    // Main event loop
    loop {
        // Batch-drain all pending messages
        let first = rx.recv()?;
        app.update(first);

        while let Ok(msg) = rx.try_recv() {
            app.update(msg);
        }

        if app.should_quit {
            // Final save before exit
            app.shutdown();
            break;
        }

        terminal.draw(|f| app.view(f))?;
    }

    tracing::info!("treeshelf exiting");
    Ok(())
}
