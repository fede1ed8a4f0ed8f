//! Terminal setup and the main loop.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{Event as TermEvent, EventStream};
use crossterm::style::Print;
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::AppError;
use crate::keymap::chord_from_event;
use crate::model::{Dashboard, Routed};
use crate::runtime::EffectRunner;
use crate::views::dashboard_view;

/// Redraw interval when nothing else happens, so plugin clocks stay fresh.
const TICK: Duration = Duration::from_millis(250);

// =============================================================================
// Terminal Guard
// =============================================================================

/// Raw mode plus alternate screen, undone on drop.
pub struct TerminalGuard {
    restored: bool,
}

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        Ok(Self { restored: false })
    }

    /// Current terminal size as (columns, rows).
    pub fn size(&self) -> io::Result<(u16, u16)> {
        terminal::size()
    }

    /// Restore the terminal, reporting failures.
    pub fn restore(mut self) -> io::Result<()> {
        self.restored = true;
        leave()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if !self.restored {
            let _ = leave();
        }
    }
}

fn leave() -> io::Result<()> {
    execute!(io::stdout(), Show, LeaveAlternateScreen)?;
    disable_raw_mode()
}

/// Best-effort restore for a panic hook, before the panic message prints.
/// The guard's own drop repeats it harmlessly while unwinding.
pub fn leave_on_panic() {
    let _ = leave();
}

// =============================================================================
// Main Loop
// =============================================================================

/// Drive the dashboard until quit or the input stream ends.
///
/// Input, routed effect results and the redraw tick are multiplexed on one
/// task; the dashboard is only ever touched from here.
pub async fn run(
    dashboard: &mut Dashboard,
    runner: &EffectRunner,
    routed_rx: &mut UnboundedReceiver<Routed>,
) -> Result<(), AppError> {
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK);
    let mut stdout = io::stdout();

    draw(&mut stdout, dashboard)?;

    loop {
        tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(TermEvent::Key(key))) => {
                    let Some(chord) = chord_from_event(&key) else {
                        continue;
                    };
                    tracing::trace!("Key {}", chord);
                    runner.spawn_all(dashboard.handle_key(chord));
                }
                Some(Ok(TermEvent::Resize(width, height))) => {
                    runner.spawn_all(dashboard.resize(width, height));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => {
                    tracing::info!("Input stream closed");
                    break;
                }
            },
            Some(routed) = routed_rx.recv() => {
                runner.spawn_all(dashboard.deliver(routed));
            }
            _ = tick.tick() => {}
        }

        if dashboard.should_quit() {
            tracing::info!("Quit requested");
            break;
        }
        draw(&mut stdout, dashboard)?;
    }

    Ok(())
}

/// Paint one frame, row by row.
pub fn draw<W: Write>(out: &mut W, dashboard: &Dashboard) -> io::Result<()> {
    let frame = dashboard_view::render(dashboard, true);
    for (row, line) in frame.split('\n').enumerate() {
        let row = u16::try_from(row).unwrap_or(u16::MAX);
        queue!(
            out,
            MoveTo(0, row),
            Print(line),
            Clear(ClearType::UntilNewLine)
        )?;
    }
    out.flush()
}
