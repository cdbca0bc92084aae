use std::rc::Rc;

use crate::color::Color;

/// Underline style, decoded from SGR 4 / `4:n` (colon sub-parameter form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnderlineStyle {
    #[default]
    None,
    Single,
    Double,
    Curly,
    Dotted,
    Dashed,
}

/// One terminal grid position (§3.1).
///
/// A width-2 glyph is stored on its left cell with `width == 2`; the cell to
/// its right is a continuation stub (`width == 0`, otherwise default). The
/// write path (`Buffer::write_char`) is responsible for keeping that pairing
/// intact — splitting a wide pair always clears both halves first.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// The printable text for this cell — usually one `char`, but a grapheme
    /// cluster (e.g. an emoji ZWJ sequence) occupies one cell as a whole.
    pub text: Box<str>,
    pub width: u8,
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub italic: bool,
    pub inverse: bool,
    pub strikethrough: bool,
    pub blink: bool,
    pub dim: bool,
    pub hidden: bool,
    pub underline: UnderlineStyle,
    pub url: Option<Rc<str>>,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            text: Box::from(" "),
            width: 1,
            fg: Color::Default,
            bg: Color::Default,
            bold: false,
            italic: false,
            inverse: false,
            strikethrough: false,
            blink: false,
            dim: false,
            hidden: false,
            underline: UnderlineStyle::None,
            url: None,
        }
    }
}

impl Cell {
    /// A wide-character continuation stub: the right half of a width-2 cell.
    pub fn continuation_stub() -> Self {
        Self {
            width: 0,
            ..Self::default()
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.width == 0
    }

    /// Reset to a blank cell, but carrying `bg` forward (ECMA-48 erase: the
    /// cursor's current background colors the blank).
    pub fn erase(&mut self, bg: Color) {
        *self = Self {
            bg,
            ..Self::default()
        };
    }
}

/// One row of the grid: exactly `cols` cells plus the wrap continuation flag
/// (§3.2).
#[derive(Debug, Clone)]
pub struct Line {
    pub cells: Vec<Cell>,
    pub wrapped: bool,
}

impl Line {
    pub fn blank(cols: u16) -> Self {
        Self {
            cells: vec![Cell::default(); cols as usize],
            wrapped: false,
        }
    }

    pub fn resize(&mut self, cols: u16) {
        self.cells.resize(cols as usize, Cell::default());
    }

    pub fn erase_all(&mut self, bg: Color) {
        for cell in &mut self.cells {
            cell.erase(bg);
        }
        self.wrapped = false;
    }

    pub fn erase_range(&mut self, start: usize, end: usize, bg: Color) {
        let end = end.min(self.cells.len());
        for cell in &mut self.cells[start.min(end)..end] {
            cell.erase(bg);
        }
    }

    /// Plain-text contents, ignoring continuation stubs. Used by scrollback
    /// scenario assertions and any consumer that wants raw text.
    pub fn text(&self) -> String {
        self.cells
            .iter()
            .filter(|c| !c.is_continuation())
            .map(|c| c.text.as_ref())
            .collect()
    }
}
