// SPDX-License-Identifier: MIT
//
// Output buffering and frame serialization.
//
// Two components work together so a flush is one `write()`:
//
//   OutputBuffer — accumulates all bytes of a frame in memory, then writes
//   them to the terminal in a single `write_all` + `flush`.
//
//   CellWriter — emits one cell at a time. In `FlushMode::PerCell` every
//   visible cell is wrapped in its own SGR open and reset, so no style can
//   bleed into a neighbor. In `FlushMode::Coalesced` it remembers the last
//   state it emitted and only writes SGR when the state changes.
//
// Frame layout (both modes): cursor home, rows separated by a bare `\n`,
// control glyphs (below U+0020) produce no bytes at all, a final SGR reset,
// then a cursor move to the remembered cursor position. Every flush writes
// the whole grid.

use std::io::{self, Write};

use crate::ansi;
use crate::buffer::Framebuffer;
use crate::cell::{Cell, CellState};
use crate::terminal::CursorPos;

// ─── FlushMode ───────────────────────────────────────────────────────────────

/// How cell styles are written during a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// `ESC[a;f;bm <glyph> ESC[0m` for every visible cell.
    #[default]
    PerCell,
    /// SGR only when the state differs from the previous visible cell on
    /// the same row. Fewer bytes, same picture.
    Coalesced,
}

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A byte buffer that accumulates a frame for a single `write()` syscall.
pub(crate) struct OutputBuffer {
    buf: Vec<u8>,
}

/// Upper bound of bytes per cell in per-cell mode:
/// `ESC[8;99;109m` (13) + 4-byte glyph + `ESC[0m` (4).
const MAX_CELL_BYTES: usize = 21;

impl OutputBuffer {
    /// Create an empty buffer sized for a frame of `cells` cells.
    pub(crate) fn for_cells(cells: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cells.saturating_mul(MAX_CELL_BYTES).max(64)),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    /// Write accumulated output to `w`, flush it, and clear the buffer.
    pub(crate) fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Real flushing happens in flush_to().
        Ok(())
    }
}

// ─── CellWriter ──────────────────────────────────────────────────────────────

/// Writes cells in a given [`FlushMode`], tracking the open SGR state.
pub struct CellWriter {
    mode: FlushMode,
    /// State of the SGR currently in effect, if any (coalesced mode only).
    open: Option<CellState>,
}

impl CellWriter {
    #[must_use]
    pub const fn new(mode: FlushMode) -> Self {
        Self { mode, open: None }
    }

    /// Write one cell. Control glyphs produce no output.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    pub fn render_cell(&mut self, out: &mut impl Write, cell: Cell) -> io::Result<()> {
        if cell.is_control() {
            return Ok(());
        }

        let mut enc = [0u8; 4];
        let glyph = cell.glyph.encode_utf8(&mut enc).as_bytes();

        match self.mode {
            FlushMode::PerCell => {
                ansi::sgr(out, cell.state)?;
                out.write_all(glyph)?;
                ansi::reset(out)
            }
            FlushMode::Coalesced => {
                if self.open != Some(cell.state) {
                    ansi::sgr(out, cell.state)?;
                    self.open = Some(cell.state);
                }
                out.write_all(glyph)
            }
        }
    }

    /// Close any open SGR before a row break so the newline itself is
    /// written in the default rendition.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    pub fn end_row(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.open.take().is_some() {
            ansi::reset(out)?;
        }
        Ok(())
    }
}

// ─── Frame ───────────────────────────────────────────────────────────────────

/// Serialize a whole framebuffer.
///
/// # Errors
///
/// Propagates write errors from `out`.
pub fn render_frame(
    fb: &Framebuffer,
    cursor: CursorPos,
    mode: FlushMode,
    out: &mut impl Write,
) -> io::Result<()> {
    let mut writer = CellWriter::new(mode);

    ansi::cursor_home(out)?;
    for y in 0..usize::from(fb.height()) {
        if y != 0 {
            writer.end_row(out)?;
            out.write_all(b"\n")?;
        }
        for &cell in fb.row(y) {
            writer.render_cell(out, cell)?;
        }
    }
    ansi::reset(out)?;
    ansi::cursor_to(out, cursor.x, cursor.y)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Attribute;
    use crate::color::Color;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn render(fb: &Framebuffer, cursor: CursorPos, mode: FlushMode) -> String {
        let mut out = OutputBuffer::for_cells(fb.cells().len());
        render_frame(fb, cursor, mode, &mut out).unwrap();
        String::from_utf8(out.buf).unwrap()
    }

    const ORIGIN: CursorPos = CursorPos { x: 0, y: 0 };

    // ── OutputBuffer ────────────────────────────────────────────────────

    #[test]
    fn output_buffer_accumulates_writes() {
        let mut buf = OutputBuffer::for_cells(4);
        assert_eq!(buf.len(), 0);
        write!(buf, "hello {}", 42).unwrap();
        assert_eq!(buf.buf, b"hello 42");
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn output_buffer_flush_to() {
        let mut buf = OutputBuffer::for_cells(4);
        write!(buf, "frame data").unwrap();

        let mut dest = Vec::new();
        buf.flush_to(&mut dest).unwrap();

        assert_eq!(dest, b"frame data");
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn output_buffer_flush_to_empty_is_noop() {
        let mut buf = OutputBuffer::for_cells(0);
        let mut dest = Vec::new();
        buf.flush_to(&mut dest).unwrap();
        assert!(dest.is_empty());
    }

    // ── CellWriter ──────────────────────────────────────────────────────

    #[test]
    fn per_cell_wraps_every_glyph() {
        let mut out = Vec::new();
        let mut w = CellWriter::new(FlushMode::PerCell);
        w.render_cell(&mut out, Cell::new(CellState::DEFAULT, 'a')).unwrap();
        w.render_cell(&mut out, Cell::new(CellState::DEFAULT, 'b')).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\x1b[0;39;49ma\x1b[0m\x1b[0;39;49mb\x1b[0m"
        );
    }

    #[test]
    fn control_glyph_writes_nothing() {
        for mode in [FlushMode::PerCell, FlushMode::Coalesced] {
            let mut out = Vec::new();
            let mut w = CellWriter::new(mode);
            w.render_cell(&mut out, Cell::new(CellState::DEFAULT, '\u{1}'))
                .unwrap();
            assert!(out.is_empty());
        }
    }

    #[test]
    fn coalesced_skips_repeated_state() {
        let red = CellState::new(Attribute::None, Color::RED, Color::DEFAULT);
        let mut out = Vec::new();
        let mut w = CellWriter::new(FlushMode::Coalesced);
        for ch in ['a', 'b'] {
            w.render_cell(&mut out, Cell::new(red, ch)).unwrap();
        }
        w.render_cell(&mut out, Cell::new(CellState::DEFAULT, 'c'))
            .unwrap();
        w.end_row(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\x1b[0;31;49mab\x1b[0;39;49mc\x1b[0m"
        );
    }

    #[test]
    fn end_row_without_open_state_is_silent() {
        let mut out = Vec::new();
        let mut w = CellWriter::new(FlushMode::Coalesced);
        w.end_row(&mut out).unwrap();
        let mut per_cell = CellWriter::new(FlushMode::PerCell);
        per_cell.end_row(&mut out).unwrap();
        assert!(out.is_empty());
    }

    // ── Frames ──────────────────────────────────────────────────────────

    #[test]
    fn three_cell_frame() {
        let mut fb = Framebuffer::new(3, 1);
        fb.set(0, 0, CellState::new(Attribute::Bold, Color::RED, Color::BLUE), 'A');
        fb.set(1, 0, CellState::DEFAULT, 'B');
        fb.set(2, 0, CellState::DEFAULT, '\u{1}');
        assert_eq!(
            render(&fb, ORIGIN, FlushMode::PerCell),
            "\x1b[0;0H\x1b[1;31;44mA\x1b[0m\x1b[0;39;49mB\x1b[0m\x1b[0m\x1b[1;1H"
        );
    }

    #[test]
    fn rows_are_newline_separated() {
        let mut fb = Framebuffer::new(1, 3);
        fb.set_text(0, 0, "a\nb\nc");
        let out = render(&fb, ORIGIN, FlushMode::PerCell);
        assert_eq!(out.matches('\n').count(), 2);
        assert!(!out.starts_with("\x1b[0;0H\n"));
    }

    #[test]
    fn frame_ends_at_remembered_cursor() {
        let fb = Framebuffer::new(2, 2);
        let out = render(&fb, CursorPos { x: 4, y: 1 }, FlushMode::PerCell);
        assert!(out.ends_with("\x1b[0m\x1b[2;5H"));
    }

    #[test]
    fn empty_frame() {
        let fb = Framebuffer::new(0, 0);
        assert_eq!(render(&fb, ORIGIN, FlushMode::PerCell), "\x1b[0;0H\x1b[0m\x1b[1;1H");
    }

    #[test]
    fn zero_width_frame_still_separates_rows() {
        let fb = Framebuffer::new(0, 3);
        assert_eq!(
            render(&fb, ORIGIN, FlushMode::PerCell),
            "\x1b[0;0H\n\n\x1b[0m\x1b[1;1H"
        );
    }

    #[test]
    fn coalesced_frame() {
        let mut fb = Framebuffer::new(2, 2);
        fb.attrib_rect(0, 1, 2, 1, CellState::BOLD_WHITE_ON_BLACK);
        fb.set_text(0, 0, "ab\ncd");
        assert_eq!(
            render(&fb, ORIGIN, FlushMode::Coalesced),
            "\x1b[0;0H\x1b[0;39;49mab\x1b[0m\n\x1b[1;97;40mcd\x1b[0m\x1b[1;1H"
        );
    }

    #[test]
    fn coalesced_skips_control_without_breaking_run() {
        let mut fb = Framebuffer::new(3, 1);
        fb.set_text(0, 0, "a\u{2}b");
        assert_eq!(
            render(&fb, ORIGIN, FlushMode::Coalesced),
            "\x1b[0;0H\x1b[0;39;49mab\x1b[0m\x1b[1;1H"
        );
    }

    // ── Properties ──────────────────────────────────────────────────────

    fn arb_cell() -> impl Strategy<Value = Cell> {
        let attrib = prop::sample::select(vec![
            Attribute::None,
            Attribute::Bold,
            Attribute::Dim,
            Attribute::Underline,
            Attribute::Blink,
            Attribute::Reverse,
            Attribute::Hidden,
        ]);
        let color = || prop::sample::select(Color::ALL.to_vec());
        let glyph = prop_oneof![
            (0u8..32).prop_map(char::from),
            any::<char>().prop_filter("visible", |&c| c >= ' '),
        ];
        (attrib, color(), color(), glyph)
            .prop_map(|(a, fg, bg, glyph)| Cell::new(CellState::new(a, fg, bg), glyph))
    }

    fn arb_grid() -> impl Strategy<Value = Framebuffer> {
        (0u16..6, 0u16..5).prop_flat_map(|(w, h)| {
            prop::collection::vec(arb_cell(), usize::from(w) * usize::from(h)).prop_map(
                move |cells| {
                    let mut fb = Framebuffer::new(w, h);
                    for (i, cell) in (0..).zip(cells) {
                        let w = i32::from(w);
                        fb.set(i % w, i / w, cell.state, cell.glyph);
                    }
                    fb
                },
            )
        })
    }

    /// One self-contained SGR-wrapped cell, written out by hand.
    fn wrapped(cell: Cell) -> String {
        let s = cell.state;
        format!(
            "\x1b[{};{};{}m{}\x1b[0m",
            s.attrib.code(),
            s.fg.code(),
            u16::from(s.bg.code()) + 10,
            cell.glyph
        )
    }

    proptest! {
        #[test]
        fn per_cell_frame_layout(fb in arb_grid(), x in -2i32..10, y in -2i32..10) {
            let mut expected = String::from("\x1b[0;0H");
            for row in 0..usize::from(fb.height()) {
                if row != 0 {
                    expected.push('\n');
                }
                for &cell in fb.row(row) {
                    if !cell.is_control() {
                        expected.push_str(&wrapped(cell));
                    }
                }
            }
            expected.push_str(&format!("\x1b[0m\x1b[{};{}H", y + 1, x + 1));

            let out = render(&fb, CursorPos { x, y }, FlushMode::PerCell);
            prop_assert_eq!(
                out.matches('\n').count(),
                usize::from(fb.height()).saturating_sub(1)
            );
            prop_assert_eq!(out, expected);
        }

        #[test]
        fn coalesced_frame_shows_same_glyphs(fb in arb_grid()) {
            let per_cell = render(&fb, ORIGIN, FlushMode::PerCell);
            let coalesced = render(&fb, ORIGIN, FlushMode::Coalesced);
            let glyphs = |s: &str| -> String {
                let mut text = String::new();
                let mut chars = s.chars();
                while let Some(c) = chars.next() {
                    if c == '\x1b' {
                        chars.by_ref().find(|c| c.is_ascii_alphabetic());
                    } else {
                        text.push(c);
                    }
                }
                text
            };
            prop_assert!(coalesced.len() <= per_cell.len());
            prop_assert_eq!(glyphs(&coalesced), glyphs(&per_cell));
        }
    }
}
