use std::collections::BTreeSet;

use crate::cell::{Cell, Line};
use crate::color::Color;
use crate::cursor::{Cursor, SavedCursor};

/// One screen buffer: primary or alternate (§3.3). Owns its own cursor,
/// scroll region, and dirty-row tracking. Scrollback coupling (deciding
/// *whether* an evicted line should be retained) is the caller's (Screen's)
/// job — `Buffer` just reports what it scrolled off.
pub struct Buffer {
    pub lines: Vec<Line>,
    pub cursor: Cursor,
    pub cols: u16,
    pub rows: u16,
    pub scroll_top: u16,
    pub scroll_bottom: u16,
    pub saved_cursor: Option<SavedCursor>,
    pub dirty_rows: BTreeSet<u16>,
    pub tab_width: u8,
    /// Mirror of the screen-level insert-mode flag; duplicated here so
    /// `write_char` doesn't need a second borrow of `Modes` alongside
    /// `&mut self`.
    pub modes_insert_active: bool,
    pub active_url: Option<std::rc::Rc<str>>,
}

impl Buffer {
    pub fn new(cols: u16, rows: u16, tab_width: u8) -> Self {
        Self {
            lines: (0..rows).map(|_| Line::blank(cols)).collect(),
            cursor: Cursor::default(),
            cols,
            rows,
            scroll_top: 0,
            scroll_bottom: rows.saturating_sub(1),
            saved_cursor: None,
            dirty_rows: BTreeSet::new(),
            tab_width: tab_width.max(1),
            modes_insert_active: false,
            active_url: None,
        }
    }

    fn mark_dirty(&mut self, row: u16) {
        self.dirty_rows.insert(row);
    }

    pub fn take_dirty(&mut self) -> BTreeSet<u16> {
        std::mem::take(&mut self.dirty_rows)
    }

    pub fn line(&self, row: u16) -> &Line {
        &self.lines[row as usize]
    }

    fn line_mut(&mut self, row: u16) -> &mut Line {
        &mut self.lines[row as usize]
    }

    // -- cursor motion (§4.3) --------------------------------------------

    /// Effective top row for row-clamping: the scroll region top when origin
    /// mode is active, 0 otherwise.
    fn row_floor(&self, origin: bool) -> u16 {
        if origin {
            self.scroll_top
        } else {
            0
        }
    }

    fn row_ceiling(&self, origin: bool) -> u16 {
        if origin {
            self.scroll_bottom
        } else {
            self.rows.saturating_sub(1)
        }
    }

    /// CUP/HVP: 1-based (row, col); 0 or missing already normalized to 1 by
    /// the caller. `row` is relative to the scroll region top when `origin`
    /// is set.
    pub fn cup(&mut self, row: u16, col: u16, origin: bool) {
        let base = if origin { self.scroll_top } else { 0 };
        let max_row = self.row_ceiling(origin);
        self.cursor.row = (base + row).min(max_row).max(self.row_floor(origin));
        self.cursor.col = col.min(self.cols.saturating_sub(1));
        self.cursor.pending_wrap = false;
    }

    pub fn cursor_up(&mut self, n: u16) {
        let floor = if self.cursor.row >= self.scroll_top && self.cursor.row <= self.scroll_bottom
        {
            self.scroll_top
        } else {
            0
        };
        self.cursor.row = self.cursor.row.saturating_sub(n.max(1)).max(floor);
        self.cursor.pending_wrap = false;
    }

    pub fn cursor_down(&mut self, n: u16) {
        let ceiling = if self.cursor.row >= self.scroll_top && self.cursor.row <= self.scroll_bottom
        {
            self.scroll_bottom
        } else {
            self.rows.saturating_sub(1)
        };
        self.cursor.row = (self.cursor.row + n.max(1)).min(ceiling);
        self.cursor.pending_wrap = false;
    }

    pub fn cursor_forward(&mut self, n: u16) {
        self.cursor.col = (self.cursor.col + n.max(1)).min(self.cols.saturating_sub(1));
        self.cursor.pending_wrap = false;
    }

    pub fn cursor_backward(&mut self, n: u16) {
        self.cursor.col = self.cursor.col.saturating_sub(n.max(1));
        self.cursor.pending_wrap = false;
    }

    pub fn carriage_return(&mut self) {
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    pub fn backspace(&mut self) {
        self.cursor.col = self.cursor.col.saturating_sub(1);
        self.cursor.pending_wrap = false;
    }

    pub fn tab(&mut self) {
        let width = self.tab_width as u16;
        let next = ((self.cursor.col / width) + 1) * width;
        self.cursor.col = next.min(self.cols.saturating_sub(1));
    }

    pub fn save_cursor(&mut self) {
        self.saved_cursor = Some(SavedCursor {
            row: self.cursor.row,
            col: self.cursor.col,
            attrs: self.cursor.attrs,
            origin: false,
        });
    }

    pub fn restore_cursor(&mut self) {
        if let Some(saved) = self.saved_cursor.take() {
            self.cursor.row = saved.row.min(self.rows.saturating_sub(1));
            self.cursor.col = saved.col.min(self.cols.saturating_sub(1));
            self.cursor.attrs = saved.attrs;
            self.cursor.pending_wrap = false;
        }
    }

    // -- write path (§4.3 "Write path") -----------------------------------

    /// Clears a width-2 pair if `col` lands on either half of one (§3.1
    /// invariant).
    fn split_wide_pair_at(&mut self, row: u16, col: u16) {
        let cols = self.cols;
        let line = self.line_mut(row);
        if col as usize >= line.cells.len() {
            return;
        }
        if line.cells[col as usize].is_continuation() && col > 0 {
            line.cells[col as usize - 1].erase(Color::Default);
            line.cells[col as usize].erase(Color::Default);
        } else if line.cells[col as usize].width == 2 && (col + 1) < cols {
            line.cells[col as usize].erase(Color::Default);
            line.cells[col as usize + 1].erase(Color::Default);
        }
    }

    /// A zero-width combining mark attaches to the cell just written rather
    /// than occupying a column of its own (ECMA-48 combining character
    /// behavior). Appended to the previous column on the current row, or
    /// dropped if the cursor is at column 0 with nothing to attach to.
    fn merge_combining(&mut self, text: &str) {
        let row = self.cursor.row;
        let col = self.cursor.col;
        // The pending-wrap latch parks the cursor ON the last cell written
        // rather than one past it, so the target column differs by one.
        let target = if self.cursor.pending_wrap {
            col
        } else if col > 0 {
            col - 1
        } else {
            return;
        };
        let line = self.line_mut(row);
        // Landing on a wide-char continuation stub: the glyph it belongs to
        // is one column further left.
        let target = if target > 0
            && line
                .cells
                .get(target as usize)
                .is_some_and(Cell::is_continuation)
        {
            target - 1
        } else {
            target
        };
        let Some(cell) = line.cells.get_mut(target as usize) else {
            return;
        };
        let mut combined = String::with_capacity(cell.text.len() + text.len());
        combined.push_str(&cell.text);
        combined.push_str(text);
        cell.text = combined.into_boxed_str();
        self.mark_dirty(row);
    }

    /// Writes one grapheme at the cursor, applying autowrap, insert mode,
    /// and the pending-wrap latch. Returns the line evicted by a
    /// full-region scroll, if any (for scrollback/graphics coupling).
    pub fn write_char(&mut self, text: &str, width: u8, autowrap: bool) -> Option<Line> {
        if width == 0 {
            self.merge_combining(text);
            return None;
        }
        let mut evicted = None;

        if self.cursor.pending_wrap {
            if autowrap {
                self.line_mut(self.cursor.row).wrapped = true;
                evicted = self.newline_within_region();
                self.cursor.col = 0;
            }
            self.cursor.pending_wrap = false;
        }

        if (self.cursor.col + width as u16) > self.cols {
            if autowrap {
                self.line_mut(self.cursor.row).wrapped = true;
                evicted = self.newline_within_region();
                self.cursor.col = 0;
            } else {
                self.cursor.col = self.cols.saturating_sub(width as u16);
            }
        }

        let row = self.cursor.row;
        let col = self.cursor.col;

        if self.modes_insert_active {
            self.insert_cells(row, col, width as u16);
        }

        self.split_wide_pair_at(row, col);

        let attrs = self.cursor.attrs;
        let cell = Cell {
            text: Box::from(text),
            width,
            fg: attrs.fg,
            bg: attrs.bg,
            bold: attrs.bold,
            italic: attrs.italic,
            inverse: attrs.inverse,
            strikethrough: attrs.strikethrough,
            blink: attrs.blink,
            dim: attrs.dim,
            hidden: attrs.hidden,
            underline: attrs.underline,
            url: self.active_url.clone(),
        };
        let line = self.line_mut(row);
        line.cells[col as usize] = cell;
        if width == 2 && (col + 1) < self.cols {
            line.cells[col as usize + 1] = Cell::continuation_stub();
        }
        self.mark_dirty(row);

        self.cursor.col += width as u16;
        if self.cursor.col >= self.cols {
            self.cursor.col = self.cols.saturating_sub(1);
            self.cursor.pending_wrap = true;
        }

        evicted
    }

    fn newline_within_region(&mut self) -> Option<Line> {
        if self.cursor.row == self.scroll_bottom {
            let top = self.scroll_top;
            let bottom = self.scroll_bottom;
            self.scroll_up(top, bottom)
        } else {
            self.cursor.row = (self.cursor.row + 1).min(self.rows.saturating_sub(1));
            None
        }
    }

    /// Advances the cursor one row, scrolling the active region if already
    /// at its bottom. Returns the evicted line when a full scroll occurs.
    pub fn line_feed(&mut self) -> Option<Line> {
        self.cursor.pending_wrap = false;
        self.newline_within_region()
    }

    pub fn reverse_index(&mut self) {
        if self.cursor.row == self.scroll_top {
            let top = self.scroll_top;
            let bottom = self.scroll_bottom;
            self.scroll_down(top, bottom);
        } else {
            self.cursor.row = self.cursor.row.saturating_sub(1);
        }
        self.cursor.pending_wrap = false;
    }

    // -- scrolling (§4.3 "Scrolling") --------------------------------------

    pub fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        let top = top.min(self.rows.saturating_sub(1));
        let bottom = bottom.min(self.rows.saturating_sub(1));
        if top < bottom {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
        } else {
            self.scroll_top = 0;
            self.scroll_bottom = self.rows.saturating_sub(1);
        }
        self.cursor.row = self.scroll_top;
        self.cursor.col = 0;
    }

    /// Scrolls `[top, bottom]` up by one line. The line at `top` is removed
    /// (and returned so the caller can decide whether to retain it in
    /// scrollback); a blank line is inserted at `bottom`.
    pub fn scroll_up(&mut self, top: u16, bottom: u16) -> Option<Line> {
        if top > bottom || bottom as usize >= self.lines.len() {
            return None;
        }
        let evicted = self.lines.remove(top as usize);
        self.lines
            .insert(bottom as usize, Line::blank(self.cols));
        for r in top..=bottom {
            self.mark_dirty(r);
        }
        Some(evicted)
    }

    /// Scrolls `[top, bottom]` down by one line. The line at `bottom` is
    /// discarded; a blank line is inserted at `top`.
    pub fn scroll_down(&mut self, top: u16, bottom: u16) {
        if top > bottom || bottom as usize >= self.lines.len() {
            return;
        }
        self.lines.remove(bottom as usize);
        self.lines.insert(top as usize, Line::blank(self.cols));
        for r in top..=bottom {
            self.mark_dirty(r);
        }
    }

    // -- erase (§4.4) -------------------------------------------------------

    pub fn erase_in_display(&mut self, mode: u16) {
        let (row, col, rows, bg) = (self.cursor.row, self.cursor.col, self.rows, self.cursor.attrs.bg);
        match mode {
            0 => {
                self.erase_cells(row, col, self.cols, bg);
                for r in (row + 1)..rows {
                    self.line_mut(r).erase_all(bg);
                    self.mark_dirty(r);
                }
            }
            1 => {
                for r in 0..row {
                    self.line_mut(r).erase_all(bg);
                    self.mark_dirty(r);
                }
                self.erase_cells(row, 0, col + 1, bg);
            }
            2 | 3 => {
                for r in 0..rows {
                    self.line_mut(r).erase_all(bg);
                    self.mark_dirty(r);
                }
            }
            _ => {}
        }
    }

    pub fn erase_in_line(&mut self, mode: u16) {
        let (row, col, cols, bg) = (self.cursor.row, self.cursor.col, self.cols, self.cursor.attrs.bg);
        match mode {
            0 => self.erase_cells(row, col, cols, bg),
            1 => self.erase_cells(row, 0, col + 1, bg),
            2 => {
                self.line_mut(row).erase_all(bg);
                self.mark_dirty(row);
            }
            _ => {}
        }
    }

    pub fn erase_cells(&mut self, row: u16, start_col: u16, end_col: u16, bg: Color) {
        if row >= self.rows {
            return;
        }
        self.line_mut(row)
            .erase_range(start_col as usize, end_col as usize, bg);
        self.mark_dirty(row);
    }

    // -- insert/delete (§4.3 "Insert/delete") ------------------------------

    pub fn insert_cells(&mut self, row: u16, col: u16, n: u16) {
        if row >= self.rows {
            return;
        }
        let line = self.line_mut(row);
        let col = col as usize;
        let n = (n as usize).min(line.cells.len().saturating_sub(col));
        for _ in 0..n {
            line.cells.pop();
            line.cells.insert(col, Cell::default());
        }
        self.mark_dirty(row);
    }

    pub fn delete_cells(&mut self, row: u16, col: u16, n: u16) {
        if row >= self.rows {
            return;
        }
        let line = self.line_mut(row);
        let col = col as usize;
        let n = (n as usize).min(line.cells.len().saturating_sub(col));
        for _ in 0..n {
            line.cells.remove(col);
            line.cells.push(Cell::default());
        }
        self.mark_dirty(row);
    }

    pub fn insert_lines(&mut self, row: u16, n: u16) {
        if row < self.scroll_top || row > self.scroll_bottom {
            return;
        }
        for _ in 0..n {
            self.scroll_down(row, self.scroll_bottom);
        }
    }

    pub fn delete_lines(&mut self, row: u16, n: u16) {
        if row < self.scroll_top || row > self.scroll_bottom {
            return;
        }
        for _ in 0..n {
            self.scroll_up(row, self.scroll_bottom);
        }
    }

    // -- resize (§4.3 "Resize") --------------------------------------------

    pub fn resize(&mut self, new_cols: u16, new_rows: u16) {
        for line in &mut self.lines {
            line.resize(new_cols);
        }
        if new_rows as usize > self.lines.len() {
            for _ in self.lines.len()..new_rows as usize {
                self.lines.push(Line::blank(new_cols));
            }
        } else {
            self.lines.truncate(new_rows as usize);
        }

        self.cols = new_cols;
        self.rows = new_rows;
        self.scroll_top = 0;
        self.scroll_bottom = new_rows.saturating_sub(1);
        self.cursor.row = self.cursor.row.min(new_rows.saturating_sub(1));
        self.cursor.col = self.cursor.col.min(new_cols.saturating_sub(1));
        self.cursor.pending_wrap = false;
        for r in 0..new_rows {
            self.mark_dirty(r);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combining_mark_attaches_to_previous_cell() {
        let mut buf = Buffer::new(10, 1, 8);
        buf.write_char("e", 1, true);
        buf.write_char("\u{0301}", 0, true); // combining acute accent
        assert_eq!(buf.line(0).cells[0].text.as_ref(), "e\u{0301}");
        assert_eq!(buf.cursor.col, 1);
    }

    #[test]
    fn combining_mark_after_wide_char_attaches_to_glyph_not_stub() {
        let mut buf = Buffer::new(10, 1, 8);
        buf.write_char("中", 2, true);
        buf.write_char("\u{0301}", 0, true);
        assert_eq!(buf.line(0).cells[0].text.as_ref(), "中\u{0301}");
        assert!(buf.line(0).cells[1].is_continuation());
    }

    #[test]
    fn cup_clamps_to_bounds() {
        let mut buf = Buffer::new(80, 24, 8);
        buf.cup(998, 998, false);
        assert_eq!((buf.cursor.row, buf.cursor.col), (23, 79));
    }

    #[test]
    fn autowrap_sets_pending_latch_then_wraps() {
        let mut buf = Buffer::new(4, 2, 8);
        for ch in "ABCD".chars() {
            buf.write_char(&ch.to_string(), 1, true);
        }
        assert_eq!(buf.line(0).text(), "ABCD");
        assert!(buf.line(0).wrapped == false); // wrap flag set on overflow, not on exact fit
        assert!(buf.cursor.pending_wrap);
        assert_eq!(buf.cursor.col, 3);

        buf.write_char("E", 1, true);
        assert_eq!(buf.line(1).text().chars().next(), Some('E'));
        assert_eq!((buf.cursor.row, buf.cursor.col), (1, 1));
    }

    #[test]
    fn insert_mode_shifts_right() {
        let mut buf = Buffer::new(5, 1, 8);
        for ch in "ABC".chars() {
            buf.write_char(&ch.to_string(), 1, true);
        }
        buf.cursor.col = 0;
        buf.modes_insert_active = true;
        buf.write_char("X", 1, true);
        assert_eq!(buf.line(0).text(), "XABC ");
    }

    #[test]
    fn wide_char_pairs_with_continuation_stub() {
        let mut buf = Buffer::new(10, 1, 8);
        buf.write_char("中", 2, true);
        assert_eq!(buf.line(0).cells[0].width, 2);
        assert!(buf.line(0).cells[1].is_continuation());
        assert_eq!(buf.cursor.col, 2);
    }

    #[test]
    fn overwriting_wide_pair_clears_both_halves() {
        let mut buf = Buffer::new(10, 1, 8);
        buf.write_char("中", 2, true);
        buf.cursor.col = 1;
        buf.write_char("X", 1, true);
        // Writing into the continuation stub must have cleared the pair
        // before placing X at column 1.
        assert_eq!(buf.line(0).cells[0].text.as_ref(), " ");
        assert_eq!(buf.line(0).cells[1].text.as_ref(), "X");
    }

    #[test]
    fn scroll_region_confines_scroll() {
        let mut buf = Buffer::new(3, 5, 8);
        for r in 0..5u16 {
            buf.line_mut(r).cells[0].text = r.to_string().into_boxed_str();
        }
        buf.scroll_up(1, 3);
        // Row 0 and row 4 are outside [1,3] and must be untouched.
        assert_eq!(buf.line(0).cells[0].text.as_ref(), "0");
        assert_eq!(buf.line(4).cells[0].text.as_ref(), "4");
        assert_eq!(buf.line(1).cells[0].text.as_ref(), "2");
    }

    #[test]
    fn resize_preserves_overlap() {
        let mut buf = Buffer::new(10, 4, 8);
        buf.write_char("A", 1, true);
        buf.resize(5, 2);
        assert_eq!(buf.line(0).cells[0].text.as_ref(), "A");
        assert_eq!(buf.rows, 2);
        assert_eq!(buf.cols, 5);
    }

    #[test]
    fn erase_uses_cursor_background() {
        let mut buf = Buffer::new(5, 1, 8);
        buf.cursor.attrs.bg = Color::Indexed(4);
        buf.erase_in_line(2);
        assert_eq!(buf.line(0).cells[0].bg, Color::Indexed(4));
    }
}
