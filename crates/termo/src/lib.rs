// SPDX-License-Identifier: MIT
//
// termo — a small text-UI drawing library for VT100/xterm terminals.
//
// Draw into an in-memory grid of cells, then flush the whole grid to the
// terminal as one batched write. The terminal side is raw termios plus a
// handful of escape sequences: cursor visibility and position, SGR styles,
// and any-event mouse tracking. Input arrives as raw scan codes, read
// directly or from a background read loop.
//
// No diffing between frames, no wrapping, one glyph per column.

pub mod ansi;
pub mod buffer;
pub mod cell;
pub mod color;
pub mod error;
pub mod output;
pub mod reader;
pub mod scancode;
pub mod terminal;

pub use buffer::Framebuffer;
pub use cell::{Attribute, Cell, CellState};
pub use color::Color;
pub use error::{Error, Result};
pub use output::FlushMode;
pub use reader::{KeyReadLoop, start_key_read_loop};
pub use scancode::{
    Event, KeyCode, KeyEvent, Modifiers, MouseButton, MouseEvent, MouseEventKind, ScanCode,
    read_scan_code,
};
pub use terminal::{Options, Size, Terminal, size};
