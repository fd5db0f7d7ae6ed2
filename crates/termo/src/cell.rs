// SPDX-License-Identifier: MIT
//
// Cell — one character position in the framebuffer.
//
// A cell is a glyph plus a `CellState` (attribute, foreground, background).
// Exactly one attribute applies per cell; the values are the SGR codes the
// flush serializer writes verbatim, so there is no translation table.

use crate::color::Color;

// ─── Attribute ──────────────────────────────────────────────────────────────

/// Text attribute for a cell. Not a bitmask: one per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum Attribute {
    /// SGR 0 — plain text.
    #[default]
    None = 0,
    /// SGR 1 — increased intensity.
    Bold = 1,
    /// SGR 2 — decreased intensity.
    Dim = 2,
    /// SGR 4 — underline.
    Underline = 4,
    /// SGR 5 — blink.
    Blink = 5,
    /// SGR 7 — swap foreground and background.
    Reverse = 7,
    /// SGR 8 — invisible text.
    Hidden = 8,
}

impl Attribute {
    /// The SGR parameter for this attribute.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

// ─── CellState ──────────────────────────────────────────────────────────────

/// Attribute and colors applied to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellState {
    pub attrib: Attribute,
    pub fg: Color,
    pub bg: Color,
}

impl CellState {
    /// No attribute, terminal default colors.
    pub const DEFAULT: Self = Self::new(Attribute::None, Color::DEFAULT, Color::DEFAULT);

    /// Bold bright white on black.
    pub const BOLD_WHITE_ON_BLACK: Self =
        Self::new(Attribute::Bold, Color::GRAY.light(), Color::BLACK);

    /// Bold black on bright white.
    pub const BOLD_BLACK_ON_WHITE: Self =
        Self::new(Attribute::Bold, Color::BLACK, Color::GRAY.light());

    #[inline]
    #[must_use]
    pub const fn new(attrib: Attribute, fg: Color, bg: Color) -> Self {
        Self { attrib, fg, bg }
    }
}

impl Default for CellState {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ─── Cell ───────────────────────────────────────────────────────────────────

/// A glyph and its state. Glyphs are assumed to be one column wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub state: CellState,
    pub glyph: char,
}

impl Cell {
    /// The clear value: a space in the default state.
    pub const BLANK: Self = Self {
        state: CellState::DEFAULT,
        glyph: ' ',
    };

    #[inline]
    #[must_use]
    pub const fn new(state: CellState, glyph: char) -> Self {
        Self { state, glyph }
    }

    /// Whether the glyph is a C0 control character (below U+0020).
    ///
    /// Such cells produce no output at all when flushed.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        (self.glyph as u32) < 32
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}
