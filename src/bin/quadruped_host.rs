use std::{
    fs::OpenOptions,
    io::{self},
    path::PathBuf,
    time::Duration,
};

use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use embedded_io::Write;
use log::info;
use quadruped_link::{
    config::{Config, DEFAULT_CONFIG_FILE},
    host::{HostSession, connect, store::StateStore},
    ui::{App, ui},
};
use ratatui::prelude::*;

/// Terminal pose editor: edit joint angles, save and recall named states, send to the robot.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,
    /// Serial port of the robot, e.g. COM6 or /dev/ttyACM0
    #[arg(long)]
    port: Option<String>,
    #[arg(long)]
    baud: Option<u32>,
    #[arg(long)]
    state_file: Option<PathBuf>,
}

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging to file
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("quadruped_host.log")?;

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let mut config = Config::load(&args.config)?.host;
    config.port = args.port.unwrap_or(config.port);
    config.baud_rate = args.baud.unwrap_or(config.baud_rate);
    config.state_file = args.state_file.unwrap_or(config.state_file);
    info!("Starting pose editor: {:?}", config);

    let link = connect(&config.port, config.baud_rate);
    let session = HostSession::new(StateStore::new(&config.state_file), link);
    let mut app = App::new(session);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: Backend, W: Write>(
    terminal: &mut Terminal<B>,
    app: &mut App<W>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| {
            ui(f, app);
        })?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key) {
                    return Ok(());
                }
            }
        }
    }
}
