// SPDX-License-Identifier: MIT
//
// The eight classic ANSI colors plus the terminal default.
//
// A `Color` is its SGR foreground code. Everything else is arithmetic on
// that number: +60 selects the high-intensity variant (90–97), +10 turns a
// foreground code into the matching background code (40–47, 49, 100–107).
// No bounds checking is done; `Color::DEFAULT.light()` is 99, which
// terminals simply ignore.

use std::fmt;

/// A terminal color, stored as its SGR foreground parameter.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(u8);

impl Color {
    pub const BLACK: Self = Self(30);
    pub const RED: Self = Self(31);
    pub const GREEN: Self = Self(32);
    pub const YELLOW: Self = Self(33);
    pub const BLUE: Self = Self(34);
    pub const MAGENTA: Self = Self(35);
    pub const CYAN: Self = Self(36);
    pub const GRAY: Self = Self(37);
    /// The terminal's own foreground/background (SGR 39 / 49).
    pub const DEFAULT: Self = Self(39);

    /// All named colors, in SGR order.
    pub const ALL: [Self; 9] = [
        Self::BLACK,
        Self::RED,
        Self::GREEN,
        Self::YELLOW,
        Self::BLUE,
        Self::MAGENTA,
        Self::CYAN,
        Self::GRAY,
        Self::DEFAULT,
    ];

    /// Build a color from a raw SGR foreground code.
    #[inline]
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        Self(code)
    }

    /// The raw SGR foreground code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        self.0
    }

    /// The high-intensity ("light") variant: code + 60.
    ///
    /// ```
    /// use termo::color::Color;
    ///
    /// assert_eq!(Color::GRAY.light().code(), 97);
    /// ```
    #[inline]
    #[must_use]
    pub const fn light(self) -> Self {
        Self(self.0.wrapping_add(60))
    }

    /// The SGR background code for this color: code + 10.
    #[inline]
    #[must_use]
    pub(crate) const fn background(self) -> u8 {
        self.0.wrapping_add(10)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::BLACK => "Black",
            Self::RED => "Red",
            Self::GREEN => "Green",
            Self::YELLOW => "Yellow",
            Self::BLUE => "Blue",
            Self::MAGENTA => "Magenta",
            Self::CYAN => "Cyan",
            Self::GRAY => "Gray",
            Self::DEFAULT => "Default",
            _ => return write!(f, "Color({})", self.0),
        };
        f.write_str(name)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_sgr_foreground() {
        let codes: Vec<u8> = Color::ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes, [30, 31, 32, 33, 34, 35, 36, 37, 39]);
    }

    #[test]
    fn light_adds_sixty() {
        for c in Color::ALL {
            assert_eq!(c.light().code(), c.code() + 60);
        }
        assert_eq!(Color::RED.light().code(), 91);
    }

    #[test]
    fn background_adds_ten() {
        for c in Color::ALL {
            assert_eq!(c.background(), c.code() + 10);
        }
        assert_eq!(Color::DEFAULT.background(), 49);
        assert_eq!(Color::GRAY.light().background(), 107);
    }

    #[test]
    fn default_is_sgr_39() {
        assert_eq!(Color::default(), Color::DEFAULT);
    }

    #[test]
    fn debug_names_known_colors() {
        assert_eq!(format!("{:?}", Color::CYAN), "Cyan");
        assert_eq!(format!("{:?}", Color::CYAN.light()), "Color(96)");
    }

    #[test]
    fn display_prints_code() {
        assert_eq!(Color::BLUE.to_string(), "34");
    }
}
