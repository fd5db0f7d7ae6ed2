// SPDX-License-Identifier: MIT
//
// Scan codes — one raw read from the terminal, classified.
//
// A `ScanCode` is whatever a single `read()` on stdin returned, up to six
// bytes: enough for a UTF-8 character, a short CSI sequence (`ESC [ A`,
// `ESC [ 1 ; 5 C`) or an X10 mouse report (`ESC [ M b x y`). Sequences are
// never assembled across reads. With the terminal in raw mode (VMIN=1) a
// keypress or mouse report arrives in one read, so the classification
// helpers work on the valid bytes of a single record.
//
// Longer sequences (SGR mouse, Kitty keyboard, bracketed paste) do not fit
// and are not enabled by this crate.
//
// The classification helpers (`is_escape_code`, `is_mouse_*_event`,
// `mouse_coords`, `rune`) are the raw contract. `event()` layers a typed
// decoding on top for callers who prefer matching on keys.

use std::fmt;
use std::io::{self, Read};

use bitflags::bitflags;

/// Capacity of a scan code in bytes.
pub const SCAN_CODE_LEN: usize = 6;

const ESC: u8 = 0x1B;

/// X10 mouse coordinates and buttons are offset by this much.
const X10_COORD_OFFSET: i32 = 33;
const X10_BUTTON_OFFSET: u8 = 32;

// ─── ScanCode ───────────────────────────────────────────────────────────────

/// The bytes produced by one read from the terminal.
///
/// Holds up to [`SCAN_CODE_LEN`] bytes plus the number that are valid.
/// Unused trailing bytes are zero. Immutable once created.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScanCode {
    bytes: [u8; SCAN_CODE_LEN],
    len: usize,
}

impl ScanCode {
    /// Build a scan code from raw bytes, keeping at most six.
    ///
    /// ```
    /// use termo::scancode::ScanCode;
    ///
    /// let s = ScanCode::from_bytes(&[27, 91, 77, 32, 40, 50]);
    /// assert!(s.is_mouse_down_event());
    /// assert_eq!(s.mouse_coords(), (7, 17));
    /// ```
    #[must_use]
    pub fn from_bytes(data: &[u8]) -> Self {
        let len = data.len().min(SCAN_CODE_LEN);
        let mut bytes = [0u8; SCAN_CODE_LEN];
        bytes[..len].copy_from_slice(&data[..len]);
        Self { bytes, len }
    }

    /// The valid bytes of this record.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Number of valid bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the record holds no bytes.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the record starts with `ESC [` and carries at least one
    /// more byte.
    #[inline]
    #[must_use]
    pub const fn is_escape_code(&self) -> bool {
        self.len > 2 && self.bytes[0] == ESC && self.bytes[1] == b'['
    }

    /// The byte following `ESC [`. Only meaningful when
    /// [`is_escape_code`](Self::is_escape_code) holds.
    #[inline]
    #[must_use]
    pub const fn escape_code(&self) -> u8 {
        self.bytes[2]
    }

    /// `ESC [ M <button> <x> <y>`: an X10 mouse report.
    #[inline]
    const fn is_mouse_report(&self) -> bool {
        self.len == SCAN_CODE_LEN && self.is_escape_code() && self.bytes[2] == b'M'
    }

    /// Mouse moved with no button held (`ESC [ M C x y`).
    #[must_use]
    pub const fn is_mouse_move_event(&self) -> bool {
        self.is_mouse_report() && self.bytes[3] == b'C'
    }

    /// Left button pressed (`ESC [ M space x y`).
    #[must_use]
    pub const fn is_mouse_down_event(&self) -> bool {
        self.is_mouse_report() && self.bytes[3] == b' '
    }

    /// Button released (`ESC [ M # x y`).
    #[must_use]
    pub const fn is_mouse_up_event(&self) -> bool {
        self.is_mouse_report() && self.bytes[3] == b'#'
    }

    /// Zero-based mouse position, upper-left corner at `(0, 0)`.
    ///
    /// Only meaningful for mouse reports.
    #[must_use]
    pub fn mouse_coords(&self) -> (i32, i32) {
        (
            i32::from(self.bytes[4]) - X10_COORD_OFFSET,
            i32::from(self.bytes[5]) - X10_COORD_OFFSET,
        )
    }

    /// The first UTF-8 code point of the record.
    ///
    /// Meant for non-escape records. Returns `'\0'` for an empty record and
    /// U+FFFD when the leading bytes are not valid UTF-8.
    #[must_use]
    pub fn rune(&self) -> char {
        let Some(&lead) = self.as_bytes().first() else {
            return '\0';
        };
        let want = utf8_char_len(lead);
        if want == 0 || want > self.len {
            return char::REPLACEMENT_CHARACTER;
        }
        std::str::from_utf8(&self.bytes[..want])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    /// Decode the record into a typed event.
    #[must_use]
    pub fn event(&self) -> Event {
        let bytes = self.as_bytes();
        match bytes {
            [] => Event::Unknown,
            [ESC] => press(KeyCode::Escape),
            [ESC, b'[', ..] if self.is_mouse_report() => self.mouse_event(),
            [ESC, b'[', rest @ ..] if !rest.is_empty() => decode_csi(rest),
            [ESC, b'O', code] => decode_ss3(*code),
            [ESC, ESC] => key_with(KeyCode::Escape, Modifiers::ALT),
            [ESC, ..] => match ScanCode::from_bytes(&bytes[1..]).event() {
                Event::Key(key) => Event::Key(KeyEvent {
                    modifiers: key.modifiers | Modifiers::ALT,
                    ..key
                }),
                _ => Event::Unknown,
            },
            [lead, ..] => decode_plain(*lead, self.rune()),
        }
    }

    fn mouse_event(&self) -> Event {
        let cb = self.bytes[3].wrapping_sub(X10_BUTTON_OFFSET);
        let (x, y) = self.mouse_coords();
        let kind = if cb & 64 != 0 {
            if cb & 1 == 0 {
                MouseEventKind::ScrollUp
            } else {
                MouseEventKind::ScrollDown
            }
        } else if cb & 3 == 3 {
            if cb & 32 != 0 {
                MouseEventKind::Moved
            } else {
                MouseEventKind::Up
            }
        } else if cb & 32 != 0 {
            MouseEventKind::Drag(decode_mouse_button(cb & 3))
        } else {
            MouseEventKind::Down(decode_mouse_button(cb & 3))
        };
        let mut modifiers = Modifiers::empty();
        if cb & 4 != 0 {
            modifiers |= Modifiers::SHIFT;
        }
        if cb & 8 != 0 {
            modifiers |= Modifiers::ALT;
        }
        if cb & 16 != 0 {
            modifiers |= Modifiers::CTRL;
        }
        Event::Mouse(MouseEvent {
            kind,
            x,
            y,
            modifiers,
        })
    }
}

impl fmt::Debug for ScanCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScanCode({:?})", self.as_bytes())
    }
}

// ─── Reading ────────────────────────────────────────────────────────────────

/// Read one scan code from standard input.
///
/// Performs a single blocking `read(2)` of up to six bytes. Blocks until at
/// least one byte arrives.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) when the read fails, including
/// `UnexpectedEof` when stdin is closed.
pub fn read_scan_code() -> crate::Result<ScanCode> {
    Ok(read_stdin()?)
}

/// One raw read on the stdin file descriptor, bypassing `Stdin`'s buffer so
/// that each read maps to exactly one record.
#[cfg(unix)]
pub(crate) fn read_stdin() -> io::Result<ScanCode> {
    let mut buf = [0u8; SCAN_CODE_LEN];
    loop {
        #[allow(unsafe_code)]
        let n = unsafe { libc::read(libc::STDIN_FILENO, buf.as_mut_ptr().cast(), buf.len()) };
        match usize::try_from(n) {
            Ok(0) => return Err(eof()),
            Ok(n) => return Ok(ScanCode::from_bytes(&buf[..n])),
            Err(_) => {
                let err = io::Error::last_os_error();
                if err.kind() != io::ErrorKind::Interrupted {
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(not(unix))]
pub(crate) fn read_stdin() -> io::Result<ScanCode> {
    read_scan_code_from(&mut io::stdin().lock())
}

/// Read one scan code from an arbitrary reader with a single `read` call.
///
/// # Errors
///
/// Propagates the reader's error; a zero-length read is reported as
/// `UnexpectedEof`.
pub fn read_scan_code_from(r: &mut impl Read) -> io::Result<ScanCode> {
    let mut buf = [0u8; SCAN_CODE_LEN];
    loop {
        match r.read(&mut buf) {
            Ok(0) => return Err(eof()),
            Ok(n) => return Ok(ScanCode::from_bytes(&buf[..n])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

fn eof() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "terminal input closed")
}

// ─── Event Types ────────────────────────────────────────────────────────────

/// A scan code decoded into a key or mouse action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// An escape sequence this crate does not decode.
    Unknown,
}

/// A key press with modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    /// A Unicode character. Ctrl+letter arrives as the letter with
    /// [`Modifiers::CTRL`].
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Insert,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

bitflags! {
    /// Keyboard modifier flags (xterm CSI encoding: `param = 1 + bitmask`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
    }
}

/// A mouse report with zero-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub x: i32,
    pub y: i32,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Down(MouseButton),
    /// X10 reports do not say which button was released.
    Up,
    Drag(MouseButton),
    /// Motion with no button held (any-event tracking).
    Moved,
    ScrollUp,
    ScrollDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

// ─── Decoding ───────────────────────────────────────────────────────────────

const fn press(code: KeyCode) -> Event {
    key_with(code, Modifiers::empty())
}

const fn key_with(code: KeyCode, modifiers: Modifiers) -> Event {
    Event::Key(KeyEvent { code, modifiers })
}

fn decode_plain(lead: u8, rune: char) -> Event {
    match lead {
        0x00 => key_with(KeyCode::Char('@'), Modifiers::CTRL),
        0x08 | 0x7F => press(KeyCode::Backspace),
        0x09 => press(KeyCode::Tab),
        0x0A | 0x0D => press(KeyCode::Enter),
        b @ 0x01..=0x1A => key_with(KeyCode::Char((b + b'a' - 1) as char), Modifiers::CTRL),
        0x1C..=0x1F => Event::Unknown,
        _ => press(KeyCode::Char(rune)),
    }
}

/// Decode the bytes after `ESC [`: optional `;`-separated numeric
/// parameters followed by a final byte.
fn decode_csi(rest: &[u8]) -> Event {
    let Some((&last, params)) = rest.split_last() else {
        return Event::Unknown;
    };
    let mut nums = params.split(|&b| b == b';').map(parse_param);
    let first = nums.next().flatten();
    let modifiers = decode_modifiers(nums.next().flatten().unwrap_or(1));

    let code = match last {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'Z' => return key_with(KeyCode::Tab, Modifiers::SHIFT),
        b'~' => match first {
            Some(1 | 7) => KeyCode::Home,
            Some(2) => KeyCode::Insert,
            Some(3) => KeyCode::Delete,
            Some(4 | 8) => KeyCode::End,
            Some(5) => KeyCode::PageUp,
            Some(6) => KeyCode::PageDown,
            _ => return Event::Unknown,
        },
        _ => return Event::Unknown,
    };
    key_with(code, modifiers)
}

/// `ESC O x` — application-mode cursor keys.
const fn decode_ss3(code: u8) -> Event {
    match code {
        b'A' => press(KeyCode::Up),
        b'B' => press(KeyCode::Down),
        b'C' => press(KeyCode::Right),
        b'D' => press(KeyCode::Left),
        b'H' => press(KeyCode::Home),
        b'F' => press(KeyCode::End),
        _ => Event::Unknown,
    }
}

/// Parse a decimal CSI parameter. Empty or non-numeric yields `None`.
fn parse_param(raw: &[u8]) -> Option<u8> {
    if raw.is_empty() || !raw.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(
        raw.iter()
            .fold(0u8, |acc, &d| acc.saturating_mul(10).saturating_add(d - b'0')),
    )
}

/// The xterm modifier parameter is `1 + bitmask`; 0 or 1 means none.
const fn decode_modifiers(param: u8) -> Modifiers {
    Modifiers::from_bits_truncate(param.saturating_sub(1))
}

const fn decode_mouse_button(bits: u8) -> MouseButton {
    match bits {
        0 => MouseButton::Left,
        1 => MouseButton::Middle,
        _ => MouseButton::Right,
    }
}

/// Expected byte length of a UTF-8 character from its lead byte.
/// Returns 0 for invalid lead bytes.
const fn utf8_char_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 0,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
