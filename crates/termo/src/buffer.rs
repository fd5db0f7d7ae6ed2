// SPDX-License-Identifier: MIT
//
// Framebuffer — the 2D cell grid the application draws into.
//
// Design:
//
//   - Flat `Vec<Cell>` with row-major indexing (`y * width + x`). A row's
//     cells are contiguous, so the left-to-right flush is a linear scan.
//     The length is `width * height` for the buffer's whole life.
//
//   - Coordinates are signed. Anything outside the grid is a silent no-op
//     for setters and reads back as a blank cell for `get`. Client code
//     relies on this to draw at computed offsets (`x0 + i`) without
//     clipping first, so it is part of the contract, not an accident.
//
//   - Rectangle operations clip per cell: negative origins and rectangles
//     running past the far edges are fine, and nothing outside
//     `rect ∩ grid` is touched.
//
//   - One glyph per column. No width measurement, no wrapping, no tabs.
//
// `flush` hands the whole grid to the terminal. There is no diffing against
// a previous frame.

use std::fmt;
use std::ops::Range;

use crate::cell::{Cell, CellState};
use crate::error::Result;
use crate::output::{self, OutputBuffer};
use crate::terminal::Terminal;

// ─── Border Charsets ────────────────────────────────────────────────────────────

/// Border glyphs: horizontal, vertical, top-left, top-right, bottom-left,
/// bottom-right.
const SINGLE_LINE: [char; 6] = ['─', '│', '┌', '┐', '└', '┘'];
const DOUBLE_LINE: [char; 6] = ['═', '║', '╔', '╗', '╚', '╝'];

const HORIZONTAL: usize = 0;
const VERTICAL: usize = 1;
const TOP_LEFT: usize = 2;
const TOP_RIGHT: usize = 3;
const BOTTOM_LEFT: usize = 4;
const BOTTOM_RIGHT: usize = 5;

// ─── Framebuffer ────────────────────────────────────────────────────────────────

/// A fixed-size grid of cells.
///
/// # Example
///
/// ```
/// use termo::buffer::Framebuffer;
/// use termo::cell::CellState;
///
/// let mut fb = Framebuffer::new(10, 3);
/// fb.ascii_rect(0, 0, 10, 3, false, false);
/// fb.attrib_text(2, 1, CellState::BOLD_WHITE_ON_BLACK, "hi");
///
/// assert_eq!(fb.get(0, 0), ('┌', CellState::DEFAULT));
/// assert_eq!(fb.get(2, 1), ('h', CellState::BOLD_WHITE_ON_BLACK));
/// assert_eq!(fb.get(-1, 0), (' ', CellState::DEFAULT)); // off-grid
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Framebuffer {
    /// Allocate a `width × height` grid of blank cells.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::BLANK; usize::from(width) * usize::from(height)],
        }
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// All cells, row-major.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The cells of row `y`. Panics if `y >= height`.
    #[inline]
    pub(crate) fn row(&self, y: usize) -> &[Cell] {
        let w = usize::from(self.width);
        &self.cells[y * w..(y + 1) * w]
    }

    /// Flat index of `(x, y)`, or `None` when off-grid.
    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        let w = usize::from(self.width);
        (x < w && y < usize::from(self.height)).then(|| y * w + x)
    }

    // ─── Cell Access ────────────────────────────────────────────────────

    /// Glyph and state at `(x, y)`; a blank cell when off-grid.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> (char, CellState) {
        let cell = self.index(x, y).map_or(Cell::BLANK, |i| self.cells[i]);
        (cell.glyph, cell.state)
    }

    /// Replace glyph and state at `(x, y)`. Off-grid is a no-op.
    pub fn set(&mut self, x: i32, y: i32, state: CellState, glyph: char) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = Cell::new(state, glyph);
        }
    }

    /// Replace only the glyph at `(x, y)`, keeping its state.
    pub fn set_rune(&mut self, x: i32, y: i32, glyph: char) {
        if let Some(i) = self.index(x, y) {
            self.cells[i].glyph = glyph;
        }
    }

    fn set_state(&mut self, x: i32, y: i32, state: CellState) {
        if let Some(i) = self.index(x, y) {
            self.cells[i].state = state;
        }
    }

    // ─── Rectangles ─────────────────────────────────────────────────────

    /// Fill `[x0, x0+w) × [y0, y0+h)` with `glyph` in `state`.
    pub fn set_rect(&mut self, x0: i32, y0: i32, w: i32, h: i32, state: CellState, glyph: char) {
        for y in clip_span(y0, h, self.height) {
            for x in clip_span(x0, w, self.width) {
                self.set(x, y, state, glyph);
            }
        }
    }

    /// Set the state over a rectangle, leaving glyphs alone.
    pub fn attrib_rect(&mut self, x0: i32, y0: i32, w: i32, h: i32, state: CellState) {
        for y in clip_span(y0, h, self.height) {
            for x in clip_span(x0, w, self.width) {
                self.set_state(x, y, state);
            }
        }
    }

    /// Draw a box border around `[x0, x0+w) × [y0, y0+h)`.
    ///
    /// `double_line` picks `═║╔╗╚╝` over `─│┌┐└┘`. With `clear_inside` the
    /// interior is overwritten with spaces; otherwise it is left alone.
    /// Only glyphs change; cell states are kept.
    pub fn ascii_rect(
        &mut self,
        x0: i32,
        y0: i32,
        w: i32,
        h: i32,
        double_line: bool,
        clear_inside: bool,
    ) {
        let set = if double_line { &DOUBLE_LINE } else { &SINGLE_LINE };
        let x1 = x0.saturating_add(w).saturating_sub(1);
        let y1 = y0.saturating_add(h).saturating_sub(1);

        for y in clip_span(y0, h, self.height) {
            for x in clip_span(x0, w, self.width) {
                let glyph = if x == x0 {
                    if y == y0 {
                        set[TOP_LEFT]
                    } else if y == y1 {
                        set[BOTTOM_LEFT]
                    } else {
                        set[VERTICAL]
                    }
                } else if x == x1 {
                    if y == y0 {
                        set[TOP_RIGHT]
                    } else if y == y1 {
                        set[BOTTOM_RIGHT]
                    } else {
                        set[VERTICAL]
                    }
                } else if y == y0 || y == y1 {
                    set[HORIZONTAL]
                } else if clear_inside {
                    ' '
                } else {
                    continue;
                };
                self.set_rune(x, y, glyph);
            }
        }
    }

    /// Reset every cell to a space in the default state.
    pub fn clear(&mut self) {
        self.set_rect(
            0,
            0,
            i32::from(self.width),
            i32::from(self.height),
            CellState::DEFAULT,
            ' ',
        );
    }

    // ─── Text ───────────────────────────────────────────────────────────

    /// Write `text` left to right from `(x0, y0)`, one char per column,
    /// keeping cell states. `\n` returns to column `x0` on the next row.
    /// Nothing wraps: chars past the right edge are dropped.
    pub fn set_text(&mut self, x0: i32, y0: i32, text: &str) {
        self.place_text(x0, y0, text, |fb, x, y, ch| fb.set_rune(x, y, ch));
    }

    /// Like [`set_text`](Self::set_text), but also sets `state` on every
    /// cell written.
    pub fn attrib_text(&mut self, x0: i32, y0: i32, state: CellState, text: &str) {
        self.place_text(x0, y0, text, |fb, x, y, ch| fb.set(x, y, state, ch));
    }

    /// Write each line of `text` on successive rows from `y0`, centered on
    /// column `x`: a line of `n` chars starts at `x - n / 2`. Keeps cell
    /// states.
    pub fn center_text(&mut self, x: i32, y0: i32, text: &str) {
        for (row, line) in (y0..).zip(text.split('\n')) {
            let start = x.saturating_sub(to_i32(line.chars().count() / 2));
            for (col, ch) in (start..).zip(line.chars()) {
                self.set_rune(col, row, ch);
            }
        }
    }

    fn place_text(
        &mut self,
        x0: i32,
        y0: i32,
        text: &str,
        mut put: impl FnMut(&mut Self, i32, i32, char),
    ) {
        let (mut x, mut y) = (x0, y0);
        for ch in text.chars() {
            if ch == '\n' {
                x = x0;
                y = y.saturating_add(1);
                continue;
            }
            put(self, x, y, ch);
            x = x.saturating_add(1);
        }
    }

    // ─── Output ─────────────────────────────────────────────────────────

    /// Write the whole grid to the terminal in one batch, then move the
    /// cursor to the terminal's remembered position.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the terminal fails.
    pub fn flush<W: std::io::Write>(&self, term: &mut Terminal<W>) -> Result<()> {
        let mut out = OutputBuffer::for_cells(self.cells.len());
        output::render_frame(self, term.cursor(), term.options().flush_mode, &mut out)?;
        tracing::trace!(bytes = out.len(), "flushing frame");
        out.flush_to(term.writer_mut())?;
        Ok(())
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Framebuffer({}x{})", self.width, self.height)
    }
}

/// The part of `[start, start + len)` that lies inside `[0, limit)`.
fn clip_span(start: i32, len: i32, limit: u16) -> Range<i32> {
    let lo = start.max(0);
    let hi = start.saturating_add(len.max(0)).min(i32::from(limit));
    lo..hi.max(lo)
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

// ─── Tests ──────────────────────────────────────────────────────────────────────
