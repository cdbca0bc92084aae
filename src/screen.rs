use crate::buffer::Buffer;
use crate::cell::Line;
use crate::cursor::Cursor;
use crate::graphics::{ClearScope, GraphicsManager, ScrollDirection};
use crate::modes::Modes;
use crate::scrollback::Scrollback;

/// Composition root for the two grid buffers, scrollback, mode flags, and
/// the graphics overlay (§3.3, §3.4, §3.5). Owns the coupling between them:
/// a scroll that evicts a primary-buffer line also shifts graphics
/// placements and, when the line survives, pushes it into scrollback.
pub struct Screen {
    primary: Buffer,
    alternate: Buffer,
    using_alternate: bool,
    scrollback: Scrollback,
    pub modes: Modes,
    pub graphics: GraphicsManager,
    cols: u16,
    rows: u16,
}

impl Screen {
    pub fn new(cols: u16, rows: u16, tab_width: u8, scrollback_capacity: usize) -> Self {
        Self {
            primary: Buffer::new(cols, rows, tab_width),
            alternate: Buffer::new(cols, rows, tab_width),
            using_alternate: false,
            scrollback: Scrollback::new(scrollback_capacity),
            modes: Modes::default(),
            graphics: GraphicsManager::new(),
            cols,
            rows,
        }
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn is_alternate(&self) -> bool {
        self.using_alternate
    }

    pub fn active(&self) -> &Buffer {
        if self.using_alternate {
            &self.alternate
        } else {
            &self.primary
        }
    }

    pub fn active_mut(&mut self) -> &mut Buffer {
        if self.using_alternate {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    pub fn cursor(&self) -> &Cursor {
        &self.active().cursor
    }

    // -- alternate screen switch (§4.3 "Alternate screen") -------------------

    /// DECSET 1049-family entry: switches to the alternate buffer, clearing
    /// it to a blank screen with the primary's current cursor position
    /// carried over, and saving the primary cursor for restore on exit.
    pub fn switch_to_alternate(&mut self) {
        if self.using_alternate {
            return;
        }
        self.primary.save_cursor();
        self.alternate = Buffer::new(self.cols, self.rows, self.primary.tab_width);
        self.alternate.cursor = self.primary.cursor.clone();
        self.using_alternate = true;
    }

    /// DECSET 1049-family exit: discards the alternate buffer's contents and
    /// restores the primary cursor saved on entry.
    pub fn switch_to_primary(&mut self) {
        if !self.using_alternate {
            return;
        }
        self.using_alternate = false;
        self.primary.restore_cursor();
    }

    // -- write path pass-through, with scrollback/graphics coupling --------

    pub fn write_char(&mut self, text: &str, width: u8) {
        let autowrap = self.modes.autowrap;
        let is_alt = self.using_alternate;
        let evicted = self.active_mut().write_char(text, width, autowrap);
        if let Some(line) = evicted {
            self.on_line_scrolled_off(line, is_alt);
        }
    }

    fn on_line_scrolled_off(&mut self, line: Line, is_alt: bool) {
        self.graphics
            .handle_scroll(ScrollDirection::Up, 1, self.rows, is_alt);
        if !is_alt {
            self.scrollback.push(line);
        }
    }

    pub fn line_feed(&mut self) {
        let is_alt = self.using_alternate;
        if let Some(line) = self.active_mut().line_feed() {
            self.on_line_scrolled_off(line, is_alt);
        }
    }

    pub fn reverse_index(&mut self) {
        self.active_mut().reverse_index();
    }

    pub fn carriage_return(&mut self) {
        self.active_mut().carriage_return();
    }

    pub fn backspace(&mut self) {
        self.active_mut().backspace();
    }

    pub fn tab(&mut self) {
        self.active_mut().tab();
    }

    pub fn cup(&mut self, row: u16, col: u16) {
        let origin = self.modes.origin;
        self.active_mut().cup(row, col, origin);
    }

    pub fn cursor_up(&mut self, n: u16) {
        self.active_mut().cursor_up(n);
    }

    pub fn cursor_down(&mut self, n: u16) {
        self.active_mut().cursor_down(n);
    }

    pub fn cursor_forward(&mut self, n: u16) {
        self.active_mut().cursor_forward(n);
    }

    pub fn cursor_backward(&mut self, n: u16) {
        self.active_mut().cursor_backward(n);
    }

    pub fn save_cursor(&mut self) {
        self.active_mut().save_cursor();
    }

    pub fn restore_cursor(&mut self) {
        self.active_mut().restore_cursor();
    }

    pub fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        self.active_mut().set_scroll_region(top, bottom);
    }

    // -- erase, with graphics placement cascade (§4.6 "Clear/erase coupling") --

    pub fn erase_in_display(&mut self, mode: u16) {
        let row = self.active().cursor.row;
        self.active_mut().erase_in_display(mode);
        match mode {
            0 => {
                self.graphics.handle_clear(ClearScope::Line {
                    row,
                    col_range: None,
                });
                for r in (row + 1)..self.rows {
                    self.graphics.handle_clear(ClearScope::Line {
                        row: r,
                        col_range: None,
                    });
                }
            }
            1 => {
                for r in 0..row {
                    self.graphics.handle_clear(ClearScope::Line {
                        row: r,
                        col_range: None,
                    });
                }
                self.graphics.handle_clear(ClearScope::Line {
                    row,
                    col_range: None,
                });
            }
            2 | 3 => self.graphics.handle_clear(ClearScope::Screen),
            _ => {}
        }
    }

    pub fn erase_in_line(&mut self, mode: u16) {
        let row = self.active().cursor.row;
        let col = self.active().cursor.col;
        let cols = self.cols;
        self.active_mut().erase_in_line(mode);
        let col_range = match mode {
            0 => Some((col, cols.saturating_sub(1))),
            1 => Some((0, col)),
            2 => None,
            _ => return,
        };
        self.graphics
            .handle_clear(ClearScope::Line { row, col_range });
    }

    // -- insert/delete, with graphics shift coupling (§4.6 "Scroll coupling") --

    pub fn insert_cells(&mut self, n: u16) {
        let (row, col) = {
            let c = &self.active().cursor;
            (c.row, c.col)
        };
        self.active_mut().insert_cells(row, col, n);
        self.graphics
            .handle_region_overwrite(row, row, col, self.cols.saturating_sub(1));
    }

    pub fn delete_cells(&mut self, n: u16) {
        let (row, col) = {
            let c = &self.active().cursor;
            (c.row, c.col)
        };
        self.active_mut().delete_cells(row, col, n);
        self.graphics
            .handle_region_overwrite(row, row, col, self.cols.saturating_sub(1));
    }

    pub fn insert_lines(&mut self, n: u16) {
        let row = self.active().cursor.row;
        self.active_mut().insert_lines(row, n);
        self.graphics.handle_line_insertion(row, n, self.rows);
    }

    /// SU (`CSI Pn S`): scrolls the whole scroll region up by `n`, same
    /// placement-shift semantics as a scrolled-off newline but without
    /// touching the cursor or scrollback (ECMA-48 SU carries no scrollback
    /// coupling of its own — only a wrap-driven scroll does, §4.3).
    pub fn scroll_up(&mut self, n: u16) {
        let (top, bottom, is_alt) = {
            let b = self.active();
            (b.scroll_top, b.scroll_bottom, self.using_alternate)
        };
        for _ in 0..n {
            self.active_mut().scroll_up(top, bottom);
        }
        self.graphics
            .handle_scroll(ScrollDirection::Up, n, self.rows, is_alt);
    }

    /// SD (`CSI Pn T`).
    pub fn scroll_down(&mut self, n: u16) {
        let (top, bottom) = {
            let b = self.active();
            (b.scroll_top, b.scroll_bottom)
        };
        for _ in 0..n {
            self.active_mut().scroll_down(top, bottom);
        }
        self.graphics
            .handle_scroll(ScrollDirection::Down, n, self.rows, self.using_alternate);
    }

    pub fn delete_lines(&mut self, n: u16) {
        let row = self.active().cursor.row;
        self.active_mut().delete_lines(row, n);
        self.graphics.handle_line_deletion(row, n);
    }

    // -- resize (§4.3 "Resize") ----------------------------------------------

    pub fn resize(&mut self, cols: u16, rows: u16) {
        let (old_cols, old_rows) = (self.cols, self.rows);
        self.primary.resize(cols, rows);
        self.alternate.resize(cols, rows);
        self.cols = cols;
        self.rows = rows;
        self.graphics.handle_resize(old_cols, old_rows, cols, rows);
    }

    /// RIS (full reset, §9): both buffers, scrollback, modes, and graphics
    /// return to their just-constructed state; dimensions are kept.
    pub fn full_reset(&mut self) {
        let (cols, rows, tab_width, scrollback_capacity) = (
            self.cols,
            self.rows,
            self.primary.tab_width,
            self.scrollback.max_size(),
        );
        *self = Self::new(cols, rows, tab_width, scrollback_capacity);
    }

    // -- dirty rows / query surface (§6) -------------------------------------

    pub fn take_dirty(&mut self) -> std::collections::BTreeSet<u16> {
        self.active_mut().take_dirty()
    }

    pub fn visible_line(&self, row: u16) -> &Line {
        self.active().line(row)
    }

    pub fn scrollback_len(&self) -> usize {
        self.scrollback.len()
    }

    /// Scrollback line by age, `0` being the oldest retained.
    pub fn scrollback_line(&self, index: usize) -> Option<&Line> {
        self.scrollback.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternate_switch_restores_primary_cursor() {
        let mut screen = Screen::new(10, 3, 8, 100);
        screen.cup(2, 3);
        screen.switch_to_alternate();
        screen.cup(0, 0);
        screen.switch_to_primary();
        assert_eq!((screen.cursor().row, screen.cursor().col), (2, 3));
    }

    #[test]
    fn alternate_scroll_does_not_populate_scrollback() {
        let mut screen = Screen::new(3, 2, 8, 100);
        screen.switch_to_alternate();
        for _ in 0..5 {
            screen.line_feed();
        }
        assert_eq!(screen.scrollback_len(), 0);
    }

    #[test]
    fn primary_scroll_populates_scrollback() {
        let mut screen = Screen::new(3, 2, 8, 100);
        screen.write_char("A", 1);
        for _ in 0..3 {
            screen.line_feed();
        }
        assert!(screen.scrollback_len() > 0);
    }

    #[test]
    fn erase_full_line_clears_graphics_placements_on_it() {
        use crate::graphics::{ImageData, ImageFormat, Placement};
        let mut screen = Screen::new(10, 3, 8, 100);
        screen.graphics.store_image(
            1,
            ImageData {
                data: vec![0; 4],
                format: ImageFormat::Rgba,
                width_px: 1,
                height_px: 1,
                has_alpha: true,
            },
        );
        screen.graphics.create_placement(Placement {
            id: 1,
            image_id: 1,
            row: 0,
            col: 0,
            w_cells: 1,
            h_cells: 1,
            src_rect: None,
            z_index: None,
            unicode_placeholder: None,
        });
        screen.erase_in_line(2);
        assert!(screen.graphics.get_visible_placements().is_empty());
    }
}
