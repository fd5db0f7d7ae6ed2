// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit. That belongs to the flush serializer and
// the `Terminal` handle; this module only knows the bytes.
//
// All cursor positions are 0-indexed in our API and converted to 1-indexed
// for the terminal. The one exception is `cursor_home`, which is emitted
// literally as `ESC [ 0 ; 0 H` (terminals treat 0 as 1).
use std::io::{self, Write};

use crate::cell::CellState;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to the upper-left corner.
#[inline]
pub fn cursor_home(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0;0H")
}

/// Move the cursor to `(x, y)` using CUP. Our coordinates are 0-indexed.
#[inline]
pub fn cursor_to(w: &mut impl Write, x: i32, y: i32) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", y + 1, x + 1)
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Graphic Rendition ───────────────────────────────────────────────────────

/// Reset all SGR attributes to terminal defaults (SGR 0).
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

/// Set attribute, foreground and background in one CSI sequence:
/// `ESC [ attr ; fg ; bg+10 m`.
#[inline]
pub fn sgr(w: &mut impl Write, state: CellState) -> io::Result<()> {
    write!(
        w,
        "\x1b[{};{};{}m",
        state.attrib.code(),
        state.fg.code(),
        state.bg.background()
    )
}

// ─── Mouse Reporting ─────────────────────────────────────────────────────────

/// Enable any-event mouse tracking (DEC 1003, X10 coordinate encoding).
#[inline]
pub fn enable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1003h")
}

/// Disable any-event mouse tracking.
#[inline]
pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1003l")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
