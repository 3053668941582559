mod shared;
mod tui;
mod audio_api;
mod loader;
mod middle;
mod stream;

use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;
use anyhow::Context;
use clap::Parser;
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use looptty::LooperConfig;
use middle::Middle;
use shared::InputEvent;

/// Six-track live looper in the terminal.
#[derive(Parser, Debug)]
#[command(name = "looptty", version, about)]
struct Args {
    /// Config file (default: .looptty/config.json if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Loop this WAV file as the live input instead of the microphone
    #[arg(short, long)]
    backing: Option<PathBuf>,

    /// Log file, overrides the config
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Starting tempo, overrides the config
    #[arg(long)]
    bpm: Option<f32>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let project_dir = std::env::current_dir().unwrap_or_default();
    let mut config = LooperConfig::load(args.config.as_deref(), &project_dir)?;
    if let Some(bpm) = args.bpm {
        config.bpm = bpm;
    }
    if let Some(path) = args.log_file {
        config.log_file = path;
    }
    init_logging(&config)?;
    log::info!("config: {:?}", config);

    // audio first, so a missing device fails before the terminal goes raw
    let audio = stream::start_audio(&config, args.backing.as_deref())?;
    let mut middle = Middle::new(&config, audio.sample_rate());
    for cmd in middle.initial_commands() {
        audio.send(cmd);
    }

    terminal::enable_raw_mode()?;
    // Enable keyboard enhancement for real press/release detection.
    // Falls back to shifted keys if the terminal doesn't support it.
    let _ = crossterm::execute!(
        std::io::stdout(),
        crossterm::event::PushKeyboardEnhancementFlags(
            crossterm::event::KeyboardEnhancementFlags::REPORT_EVENT_TYPES
        )
    );
    let _guard = RawModeGuard; // auto drops when out of scope

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = std::time::Duration::from_millis(16); // ~60fps
    let blink_start = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        let blink_on = (blink_start.elapsed().as_millis() / 250) % 2 == 0;

        if let Some(snapshot) = audio.latest_snapshot() {
            middle.set_snapshot(&snapshot);
        }
        for notice in audio.drain_notices() {
            notice.log();
            middle.on_notice(&notice);
        }

        let ds = middle.display_state();
        term.draw(|frame| {
            tui::view::render(frame, frame.area(), ds, blink_on);
        })?;

        let events = tui::input::poll_input(tick_rate, &mut tui_state)?;
        for event in events {
            if event == InputEvent::Quit {
                log::info!("quit");
                drop(term);
                drop(audio);
                return Ok(());
            }
            for cmd in middle.handle_input(event) {
                audio.send(cmd);
            }
        }
    }
}

// the terminal is raw while we run, so logs go to a file
fn init_logging(config: &LooperConfig) -> anyhow::Result<()> {
    let file = File::create(&config.log_file)
        .with_context(|| format!("could not create log file {}", config.log_file.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::event::PopKeyboardEnhancementFlags
        );
        let _ = terminal::disable_raw_mode();
    }
}
