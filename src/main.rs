// SPDX-License-Identifier: MIT
//
// termo-demo — an interactive tour of the termo drawing library.
//
// Every key or mouse report redraws the whole screen:
//
//   ╔══════════════════════════════╗
//   ║          termo demo          ║  ← centered title + hint
//   ║    q, Esc or Ctrl-C quits    ║
//   ║                              ║
//   ║ ▒▒▒ ▒▒▒ ▒▒▒ ... ▒▒▒          ║  ← one swatch per color
//   ║ 30  31  32  ... 39     · 4,7 ║  ← codes + pointer position
//   ║              ┌─┐             ║
//   ║              │◆│             ║  ← marker at the last click
//   ║              └─┘             ║
//   ║ last: Char('x')              ║  ← status line
//   ╚══════════════════════════════╝
//
// Environment:
//
//   TERMO_MOUSE=0          do not enable mouse tracking
//   TERMO_FLUSH=coalesced  coalesce SGR sequences across equal cells
//   TERMO_LOG=<file>       write logs there (filter with RUST_LOG)

mod telemetry;

use std::process;
use std::sync::mpsc::{self, Receiver};

use termo::{
    Attribute, CellState, Color, Event, FlushMode, Framebuffer, KeyCode, Modifiers, MouseEventKind,
    Options, ScanCode, Terminal,
};

/// Bound of the key channel. The reader stalls when this many codes are
/// waiting.
const KEY_QUEUE: usize = 64;

const MARKER: CellState = CellState::new(Attribute::Bold, Color::YELLOW.light(), Color::DEFAULT);
const TITLE: CellState = CellState::BOLD_WHITE_ON_BLACK;
const STATUS: CellState = CellState::BOLD_BLACK_ON_WHITE;

// ─── Configuration ──────────────────────────────────────────────────────────

/// Build terminal options from environment lookups.
fn options_from_env(var: impl Fn(&str) -> Option<String>) -> Options {
    let mouse_events = var("TERMO_MOUSE").is_none_or(|v| v != "0");
    let flush_mode = match var("TERMO_FLUSH").as_deref() {
        Some(v) if v.eq_ignore_ascii_case("coalesced") => FlushMode::Coalesced,
        _ => FlushMode::PerCell,
    };
    Options {
        mouse_events,
        flush_mode,
    }
}

// ─── Demo State ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Demo {
    /// Human-readable description of the last input.
    last: String,
    /// Where the mouse was last pressed.
    marker: Option<(i32, i32)>,
    /// Last position reported by any-event tracking.
    pointer: Option<(i32, i32)>,
}

impl Demo {
    /// Fold one scan code into the state. Returns `false` when the user asked
    /// to quit.
    fn handle(&mut self, code: &ScanCode) -> bool {
        if code.is_mouse_down_event() {
            self.marker = Some(code.mouse_coords());
        }
        if code.is_mouse_move_event() {
            self.pointer = Some(code.mouse_coords());
        }

        let event = code.event();
        self.last = describe(code, &event);
        !is_quit(&event)
    }

    fn draw(&self, fb: &mut Framebuffer) {
        let w = i32::from(fb.width());
        let h = i32::from(fb.height());

        fb.clear();
        fb.ascii_rect(0, 0, w, h, true, false);

        fb.attrib_rect(1, 1, w - 2, 1, TITLE);
        fb.center_text(w / 2, 1, "termo demo\nq, Esc or Ctrl-C quits");

        for (x, color) in (2..).step_by(4).zip(Color::ALL) {
            let swatch = CellState::new(Attribute::None, Color::BLACK, color);
            fb.set_rect(x, 4, 3, 1, swatch, ' ');
            let label = CellState::new(Attribute::None, color, Color::DEFAULT);
            fb.attrib_text(x, 5, label, &color.to_string());
        }

        if let Some((x, y)) = self.marker {
            fb.ascii_rect(x - 1, y - 1, 3, 3, false, true);
            fb.set(x, y, MARKER, '◆');
        }
        if let Some((x, y)) = self.pointer {
            fb.set_rune(w - 12, 5, '·');
            fb.set_text(w - 10, 5, &format!("{x},{y}"));
        }

        fb.attrib_rect(1, h - 2, w - 2, 1, STATUS);
        fb.set_text(2, h - 2, &format!("last: {}", self.last));
    }
}

fn is_quit(event: &Event) -> bool {
    let Event::Key(key) = event else {
        return false;
    };
    match key.code {
        KeyCode::Escape => true,
        KeyCode::Char('q') => key.modifiers.is_empty(),
        KeyCode::Char('c') => key.modifiers.contains(Modifiers::CTRL),
        _ => false,
    }
}

fn describe(code: &ScanCode, event: &Event) -> String {
    match event {
        Event::Key(key) if key.modifiers.is_empty() => format!("{:?}", key.code),
        Event::Key(key) => format!("{:?} {:?}", key.modifiers, key.code),
        Event::Mouse(m) => match m.kind {
            MouseEventKind::Down(button) => format!("{button:?} down at {},{}", m.x, m.y),
            MouseEventKind::Up => format!("up at {},{}", m.x, m.y),
            kind => format!("{kind:?} at {},{}", m.x, m.y),
        },
        Event::Unknown => format!("{code:?}"),
    }
}

/// What to tell the user when the terminal cannot be set up. Both cases
/// are fatal for the demo.
fn init_failure(err: &termo::Error) -> String {
    match err {
        termo::Error::NotATerminal => "stdin is not a terminal; run termo-demo interactively".into(),
        termo::Error::RawMode(e) => format!("cannot switch the terminal to raw mode: {e}"),
        termo::Error::Io(e) => format!("cannot write to the terminal: {e}"),
    }
}

// ─── Main Loop ──────────────────────────────────────────────────────────────

fn run(term: &mut Terminal) -> termo::Result<()> {
    let size = term.size()?;
    let mut fb = Framebuffer::new(size.cols, size.rows);

    let (key_tx, key_rx) = mpsc::sync_channel(KEY_QUEUE);
    let (err_tx, err_rx) = mpsc::sync_channel(1);
    let mut reader = termo::start_key_read_loop(key_tx, err_tx)?;

    let outcome = event_loop(term, &mut fb, &key_rx, &err_rx);

    // Unblock a reader stuck on a full queue before joining it.
    drop(key_rx);
    reader.stop();
    outcome
}

fn event_loop(
    term: &mut Terminal,
    fb: &mut Framebuffer,
    keys: &Receiver<ScanCode>,
    errors: &Receiver<termo::Error>,
) -> termo::Result<()> {
    let mut demo = Demo::default();
    demo.draw(fb);
    fb.flush(term)?;

    // The key sender is dropped when the reader exits, and any error it hit
    // is already waiting by then.
    while let Ok(code) = keys.recv() {
        if !demo.handle(&code) {
            return Ok(());
        }
        if let Some((x, y)) = demo.marker {
            term.set_cursor(x, y)?;
        }
        demo.draw(fb);
        fb.flush(term)?;
    }
    errors.try_recv().map_or(Ok(()), Err)
}

fn main() {
    let logging = telemetry::init_tracing("info");
    let options = options_from_env(|key| std::env::var(key).ok());

    let mut term = match Terminal::init_with(options) {
        Ok(term) => term,
        Err(e) => {
            tracing::error!(error = %e, "terminal init failed");
            eprintln!("termo-demo: {}", init_failure(&e));
            process::exit(1);
        }
    };
    tracing::info!(logging, ?options, "demo started");

    let result = run(&mut term);
    let stopped = term.stop();

    if let Err(e) = result.and(stopped) {
        tracing::error!(error = %e, "demo failed");
        eprintln!("termo-demo: {e}");
        process::exit(1);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
