// SPDX-License-Identifier: MIT
//
// Terminal control: raw mode, cursor visibility, mouse reporting, and the
// remembered cursor position.
//
// Safety: termios (tcgetattr, tcsetattr), ioctl (TIOCGWINSZ), isatty and a
// raw fd write for the panic hook are POSIX calls with no safe wrapper in
// std. Each unsafe block is a single call.
#![allow(unsafe_code)]
//
// A `Terminal` owns the saved termios state and the cursor position. There
// is no process-wide "current terminal"; the only global is the termios
// backup the panic hook needs, since the hook cannot reach the value.
//
// Lifecycle:
//
//   init()  — stdin must be a tty. Raw mode, then hide cursor, then
//             (optionally) mouse tracking mode 1003.
//   stop()  — restore termios, show cursor, disable mouse tracking.
//   drop    — same as stop when stop was never called.
//   panic   — the hook writes a restore sequence straight to fd 1 and
//             resets termios before the panic message prints.
//
// `Terminal::headless` binds the same control surface to any `Write` sink
// and never touches termios. Tests render through it.

use std::io::{self, Write};
#[cfg(unix)]
use std::sync::Mutex;
use std::sync::Once;

use crate::ansi;
use crate::error::{Error, Result};
use crate::output::FlushMode;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

/// Query the terminal's current size via `ioctl(TIOCGWINSZ)` on stdin.
///
/// # Errors
///
/// Returns the OS error when stdin is not a terminal or the query fails.
#[cfg(unix)]
pub fn size() -> Result<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(libc::STDIN_FILENO, libc::TIOCGWINSZ, &raw mut ws) };
    if rc != 0 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(Size {
        cols: ws.ws_col,
        rows: ws.ws_row,
    })
}

#[cfg(not(unix))]
pub fn size() -> Result<Size> {
    Err(io::Error::from(io::ErrorKind::Unsupported).into())
}

/// Whether stdin is connected to a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Cursor & Options ───────────────────────────────────────────────────────

/// Zero-based cursor position, re-applied at the end of every flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorPos {
    pub x: i32,
    pub y: i32,
}

/// Start-up configuration for a [`Terminal`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Enable any-event mouse tracking (mode 1003) at init.
    pub mouse_events: bool,
    /// How `Framebuffer::flush` serializes cell styles.
    pub flush_mode: FlushMode,
}

// ─── Panic-Safe Restore ─────────────────────────────────────────────────────

/// Saved termios for the panic hook, which cannot reach the [`Terminal`].
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Disable mouse tracking, reset SGR, show cursor.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[?1003l\x1b[0m\x1b[?25h";

static PANIC_HOOK_INSTALLED: Once = Once::new();

#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

/// Chain a hook in front of the current one that puts the terminal back
/// before the panic message is printed. Installed at most once.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            #[cfg(unix)]
            restore_termios_from_backup();
            original(info);
        }));
    });
}

/// Write [`EMERGENCY_RESTORE`] to fd 1 without taking the stdout lock,
/// which the panicking thread may hold.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Raw Mode (termios) ─────────────────────────────────────────────────────

/// Switch stdin to raw mode, returning the previous settings.
#[cfg(unix)]
fn enable_raw_mode() -> Result<libc::termios> {
    let fd = libc::STDIN_FILENO;
    unsafe {
        let mut termios: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &raw mut termios) != 0 {
            return Err(Error::RawMode(io::Error::last_os_error()));
        }
        let original = termios;

        // cfmakeraw equivalent.
        termios.c_iflag &= !(libc::IGNBRK
            | libc::BRKINT
            | libc::PARMRK
            | libc::ISTRIP
            | libc::INLCR
            | libc::IGNCR
            | libc::ICRNL
            | libc::IXON);
        termios.c_oflag &= !libc::OPOST;
        termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
        termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
        termios.c_cflag |= libc::CS8;

        // read() blocks until at least one byte is available.
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;

        if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) != 0 {
            return Err(Error::RawMode(io::Error::last_os_error()));
        }

        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = Some(original);
        }
        Ok(original)
    }
}

#[cfg(unix)]
fn restore_raw_mode(original: &libc::termios) -> io::Result<()> {
    unsafe {
        if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, original) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
        *guard = None;
    }
    Ok(())
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// An initialised terminal.
///
/// # Example
///
/// ```no_run
/// use termo::buffer::Framebuffer;
/// use termo::terminal::Terminal;
///
/// let mut term = Terminal::init()?;
/// let size = term.size()?;
/// let mut fb = Framebuffer::new(size.cols, size.rows);
/// fb.center_text(i32::from(size.cols) / 2, 0, "hello");
/// fb.flush(&mut term)?;
/// term.stop()?;
/// # Ok::<(), termo::Error>(())
/// ```
pub struct Terminal<W: Write = io::Stdout> {
    out: W,

    /// Termios in effect before raw mode. `None` for headless terminals.
    #[cfg(unix)]
    original_termios: Option<libc::termios>,

    cursor: CursorPos,
    options: Options,

    /// Cleared by `stop`, so `Drop` knows there is nothing left to undo.
    active: bool,
}

impl Terminal<io::Stdout> {
    /// [`init_with`](Self::init_with) using default [`Options`].
    ///
    /// # Errors
    ///
    /// See [`init_with`](Self::init_with).
    pub fn init() -> Result<Self> {
        Self::init_with(Options::default())
    }

    /// Put the controlling terminal into raw mode and hide the cursor.
    ///
    /// # Errors
    ///
    /// [`Error::NotATerminal`] when stdin is not a tty, [`Error::RawMode`]
    /// when the mode switch fails, [`Error::Io`] when writing the control
    /// sequences fails (the terminal is restored before returning).
    pub fn init_with(options: Options) -> Result<Self> {
        if !is_tty() {
            return Err(Error::NotATerminal);
        }
        install_panic_hook();

        #[cfg(unix)]
        let original_termios = Some(enable_raw_mode()?);
        tracing::debug!(?options, "entered raw mode");

        let mut term = Self {
            out: io::stdout(),
            #[cfg(unix)]
            original_termios,
            cursor: CursorPos::default(),
            options,
            active: true,
        };
        term.start()?;
        Ok(term)
    }
}

impl<W: Write> Terminal<W> {
    /// A terminal that writes its control sequences to `out` and leaves
    /// the tty mode alone.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the start-up sequences fails.
    pub fn headless(out: W) -> Result<Self> {
        Self::headless_with(out, Options::default())
    }

    /// [`headless`](Self::headless) with explicit [`Options`].
    ///
    /// # Errors
    ///
    /// Returns an error if writing the start-up sequences fails.
    pub fn headless_with(out: W, options: Options) -> Result<Self> {
        let mut term = Self {
            out,
            #[cfg(unix)]
            original_termios: None,
            cursor: CursorPos::default(),
            options,
            active: true,
        };
        term.start()?;
        Ok(term)
    }

    fn start(&mut self) -> Result<()> {
        ansi::cursor_hide(&mut self.out)?;
        if self.options.mouse_events {
            ansi::enable_mouse(&mut self.out)?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Restore the terminal: original termios, visible cursor, no mouse
    /// reporting.
    ///
    /// # Errors
    ///
    /// Returns the first failure. The remaining steps are still attempted.
    pub fn stop(mut self) -> Result<()> {
        self.restore()
    }

    fn restore(&mut self) -> Result<()> {
        self.active = false;

        #[cfg(unix)]
        let termios = self
            .original_termios
            .take()
            .map_or(Ok(()), |original| restore_raw_mode(&original));
        #[cfg(not(unix))]
        let termios: io::Result<()> = Ok(());

        let output = ansi::cursor_show(&mut self.out)
            .and_then(|()| ansi::disable_mouse(&mut self.out))
            .and_then(|()| self.out.flush());

        tracing::debug!("terminal restored");
        termios?;
        output?;
        Ok(())
    }

    /// Current size of the controlling terminal.
    ///
    /// # Errors
    ///
    /// See [`size`].
    pub fn size(&self) -> Result<Size> {
        size()
    }

    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn hide_cursor(&mut self) -> Result<()> {
        self.emit(ansi::cursor_hide)
    }

    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn show_cursor(&mut self) -> Result<()> {
        self.emit(ansi::cursor_show)
    }

    /// Start reporting every mouse event (mode 1003). Reports arrive
    /// through the input read loop as 6-byte scan codes.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn enable_mouse_events(&mut self) -> Result<()> {
        self.emit(ansi::enable_mouse)
    }

    /// Remember `(x, y)` as the cursor position and move the cursor there
    /// now. Every later flush ends with the cursor back at this position.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. The position is remembered
    /// either way.
    pub fn set_cursor(&mut self, x: i32, y: i32) -> Result<()> {
        self.cursor = CursorPos { x, y };
        self.emit(|w| ansi::cursor_to(w, x, y))
    }

    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> CursorPos {
        self.cursor
    }

    #[inline]
    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn writer_mut(&mut self) -> &mut W {
        &mut self.out
    }

    fn emit(&mut self, seq: impl FnOnce(&mut W) -> io::Result<()>) -> Result<()> {
        seq(&mut self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> Drop for Terminal<W> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.restore();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
