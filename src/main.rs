use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::Event;
use ratatui::layout::Size;
use tokio::runtime::Runtime;

use kim::cli::{self, Cli};
use kim::config::{default_config_path, Config};
use kim::connection::{default_connector, ConnectionManager};
use kim::logging::{self, LogTarget};
use kim::terminal::{self, TerminalGuard, Tui};
use kim::ui::Theme;
use kim::{events, ui, App};

fn main() -> ExitCode {
    let args = Cli::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<()> {
    cli::validate(&args)?;

    let interactive = args.is_interactive();
    let target = if interactive {
        LogTarget::File(logging::default_log_path())
    } else {
        LogTarget::Stderr
    };
    logging::init(target, args.debug)?;

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let rt = Runtime::new().context("failed to start async runtime")?;
    let connections = Arc::new(ConnectionManager::new(default_connector()));

    let result = match args.command {
        Some(command) if !interactive => {
            rt.block_on(cli::run(command, &mut config, &connections))
        }
        _ => run_tui(config, Arc::clone(&connections), &rt),
    };

    rt.block_on(connections.close_all());
    result
}

/// Run interactive mode until the user quits.
fn run_tui(config: Config, connections: Arc<ConnectionManager>, rt: &Runtime) -> Result<()> {
    let theme = Theme::from_scheme(&config.settings.color_scheme);

    let mut guard = TerminalGuard::new()?;
    terminal::install_panic_hook();

    let mut app = App::new(Box::new(config), connections, rt.handle().clone()).with_theme(theme);
    tracing::info!("interactive mode started");

    let result = run_app(guard.terminal(), &mut app);
    app.shutdown();
    tracing::info!("interactive mode finished");
    result
}

fn run_app(terminal: &mut Tui, app: &mut App) -> Result<()> {
    while app.running {
        let size = terminal.size().unwrap_or(Size::new(0, 0));
        app.resize(size.width, size.height);
        app.poll_live();

        terminal.draw(|frame| ui::render(frame, app))?;

        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Resize(_, _) => {
                    terminal.clear()?;
                }
                _ => {}
            }
        }
    }

    Ok(())
}
