mod tui;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use loopbox::audio::{self, AudioBackend};
use loopbox::config::EngineConfig;
use loopbox::loader::SampleRegistry;
use loopbox::middle::Middle;
use loopbox::pipeline::persistence;
use loopbox::sequencer::SequencerState;
use loopbox::shared;
use loopbox::ticker::Ticker;

const LOG_FILE: &str = "loopbox.log";

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

// the terminal belongs to the tui, so log lines go to <project>/.loopbox/loopbox.log
fn init_logging(project_dir: &Path, config: &EngineConfig) -> anyhow::Result<()> {
    let dir = persistence::loopbox_dir(project_dir);
    std::fs::create_dir_all(&dir)?;
    let file = OpenOptions::new().create(true).append(true).open(dir.join(LOG_FILE))?;
    let filters = std::env::var("LOOPBOX_LOG").unwrap_or_else(|_| config.log_level.clone());
    env_logger::Builder::new()
        .parse_filters(&filters)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()?;
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let project_dir: PathBuf = match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    let config = EngineConfig::load(&project_dir)?;
    init_logging(&project_dir, &config)?;
    log::info!(target: "main", "opening project {}", project_dir.display());

    let mut audio = audio::start_audio()?;

    let mut samples = SampleRegistry::new();
    let loaded = samples.load_dir(&project_dir, audio.sample_rate(), |id, buffer| {
        audio.register_sample(id, buffer)
    })?;
    log::info!(target: "main", "{} samples loaded", loaded);

    let mut state = SequencerState::default();
    match persistence::load_project(&project_dir) {
        Ok(Some(saved)) => {
            if let Err(e) = state.load_app_state(saved) {
                log::warn!(target: "main", "saved project rejected, starting fresh: {}", e);
            }
        }
        Ok(None) => {}
        Err(e) => log::warn!(target: "main", "could not load saved project: {:#}", e),
    }
    let fresh = state.track_count() == 0;
    let mut middle = Middle::new(state, samples, &config);
    if fresh {
        middle.ensure_tracks_for_samples();
    }

    let ticker = Ticker::spawn();

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let poll_rate = Duration::from_millis(16); // ~60fps
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        for event in ticker.drain() {
            middle.on_timer_event(event, &mut audio);
        }

        let ds = middle.display_state(&audio);
        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, &tui_state);
        })?;

        let events = tui::input::poll_input(poll_rate, &mut tui_state)?;
        for event in events {
            if !middle.handle_input(event, &mut audio, &ticker) {
                // save before quitting
                if let Err(e) = persistence::save_project(&project_dir, &middle.state.to_saved()) {
                    log::error!(target: "main", "failed to save project: {:#}", e);
                }
                log::info!(target: "main", "quit at {:.3}s audio time", audio.current_time());
                return Ok(());
            }
        }
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = crossterm::execute!(std::io::stdout(), terminal::Clear(terminal::ClearType::All));
    }
}
