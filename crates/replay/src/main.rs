mod capture;
mod script;
mod session;
mod tui;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use script::Script;
use session::Session;
use tabmask::Identity;
use tui::TabView;

#[derive(Parser)]
#[command(name = "tabmask-replay")]
#[command(about = "Replays a recorded tab list session through the virtualization engine")]
struct Args {
    /// Session script (JSON).
    script: PathBuf,

    #[arg(long, help = "Draw the final tab list in the terminal")]
    tui: bool,

    #[arg(long, help = "Write every outbound packet to this file")]
    capture: Option<PathBuf>,

    #[arg(long, help = "Client does not support the team collision rule")]
    no_collision_rule: bool,

    #[arg(long, help = "Start with virtualization disabled")]
    passthrough: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if !args.tui {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let script = Script::load(&args.script)?;
    let mut config = script.config.clone();
    if args.no_collision_rule {
        config.collision_rule_supported = false;
    }
    if args.passthrough {
        config.passthrough = true;
    }

    let mut session = Session::new(Identity::from(script.viewer), config)?;
    log::info!(
        "replaying {} steps for viewer {}",
        script.steps.len(),
        script.viewer
    );
    session.run(&script)?;

    if let Some(path) = &args.capture {
        let written = capture::write_frames(path, session.packets())?;
        let replayed = capture::read_frames(path)?;
        if replayed.as_slice() != session.packets() {
            anyhow::bail!("capture {} does not read back cleanly", path.display());
        }
        log::info!(
            "captured {} packets ({written} bytes) to {}",
            session.packets().len(),
            path.display()
        );
    }

    if args.tui {
        run_with_tui(&session)?;
    } else {
        print_rows(&session);
    }
    Ok(())
}

fn print_rows(session: &Session) {
    for row in session.rows() {
        let marker = if row.real { '*' } else { ' ' };
        println!(
            "{:>2} {marker} {} {:<12} {:<24} {}ms",
            row.index, row.occupant, row.username, row.text, row.latency
        );
    }
}

/// Raw mode and the alternate screen, restored on drop so an early return
/// leaves the shell usable.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = TerminalGuard;
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)?;
        Ok(guard)
    }

    fn restore(&self) -> io::Result<()> {
        terminal::disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen, cursor::Show)?;
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

fn run_with_tui(session: &Session) -> io::Result<()> {
    let _guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let rows = session.rows();
    let engine = session.engine();
    let view = TabView {
        rows: &rows,
        stats: session.stats(),
        packets: session.packets().len(),
        header: engine
            .header_footer()
            .map(|packet| (packet.header.clone(), packet.footer.clone())),
        passthrough: engine.is_passthrough(),
    };

    event_loop(
        || terminal.draw(|frame| tui::render(frame, &view)).map(|_| ()),
        next_key,
    )
}

fn next_key() -> io::Result<Option<KeyCode>> {
    if !event::poll(Duration::from_millis(100))? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key.code)),
        _ => Ok(None),
    }
}

/// Redraws until `q` or Esc. Draw and input errors end the loop.
fn event_loop(
    mut draw: impl FnMut() -> io::Result<()>,
    mut next_key: impl FnMut() -> io::Result<Option<KeyCode>>,
) -> io::Result<()> {
    loop {
        draw()?;
        if let Some(KeyCode::Char('q') | KeyCode::Esc) = next_key()? {
            return Ok(());
        }
    }
}
