use std::collections::HashMap;

use super::{ImageData, ImageFormat, Placement, Transmission};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// What a `handleClear` call erases (§4.6 "Clear/erase coupling").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    Screen,
    Line {
        row: u16,
        col_range: Option<(u16, u16)>,
    },
}

/// Owns every piece of graphics state (§3.5) and the operations that keep it
/// coherent as the text grid scrolls, erases, and resizes around it. Holds
/// no back-pointer into `Screen` — the screen calls into this, not the
/// reverse (§9, "one owner, event coupling").
#[derive(Default)]
pub struct GraphicsManager {
    images: HashMap<u32, ImageData>,
    placements_active: HashMap<u32, Placement>,
    placements_scrollback: Vec<Placement>,
    transmissions: HashMap<u32, Transmission>,
    cell_to_placement: HashMap<(u16, u16), u32>,
    next_image_id: u32,
    next_placement_id: u32,
}

impl GraphicsManager {
    pub fn new() -> Self {
        Self::default()
    }

    // -- ID generation (§4.6 "ID generation") ------------------------------

    pub fn generate_image_id(&mut self) -> u32 {
        self.next_image_id += 1;
        self.next_image_id
    }

    pub fn generate_placement_id(&mut self) -> u32 {
        self.next_placement_id += 1;
        self.next_placement_id
    }

    /// Advances the relevant counter past an explicitly-used id, so a
    /// future `generate_*_id` never reissues it.
    pub fn note_explicit_image_id(&mut self, id: u32) {
        self.next_image_id = self.next_image_id.max(id);
    }

    pub fn note_explicit_placement_id(&mut self, id: u32) {
        self.next_placement_id = self.next_placement_id.max(id);
    }

    // -- transmission (§4.6 "Transmission") --------------------------------

    pub fn start_transmission(&mut self, image_id: u32, format: ImageFormat) {
        self.note_explicit_image_id(image_id);
        self.transmissions.insert(
            image_id,
            Transmission {
                format: Some(format),
                chunks: Vec::new(),
            },
        );
    }

    /// No-op for an unknown `image_id` (§7 Graphics error policy).
    pub fn add_chunk(&mut self, image_id: u32, bytes: &[u8]) {
        if let Some(t) = self.transmissions.get_mut(&image_id) {
            t.chunks.push(bytes.to_vec());
        }
    }

    /// Concatenates and discards the transmission slot. Returns `None` for
    /// an unknown id.
    pub fn complete_transmission(&mut self, image_id: u32) -> Option<(ImageFormat, Vec<u8>)> {
        let t = self.transmissions.remove(&image_id)?;
        let format = t.format?;
        let mut combined = Vec::with_capacity(t.chunks.iter().map(Vec::len).sum());
        for chunk in t.chunks {
            combined.extend_from_slice(&chunk);
        }
        Some((format, combined))
    }

    pub fn cancel_transmission(&mut self, image_id: u32) {
        self.transmissions.remove(&image_id);
    }

    // -- image store --------------------------------------------------------

    pub fn store_image(&mut self, image_id: u32, data: ImageData) {
        self.note_explicit_image_id(image_id);
        self.images.insert(image_id, data);
    }

    pub fn get_image(&self, image_id: u32) -> Option<&ImageData> {
        self.images.get(&image_id)
    }

    /// Deletes the image and cascades to every placement referencing it, in
    /// both the active and scrollback sets. Returns the image's pixel
    /// buffer to the caller (ownership transfer — see DESIGN.md) so it can
    /// release any external resources it wraps.
    pub fn delete_image(&mut self, image_id: u32) -> Option<ImageData> {
        let removed = self.images.remove(&image_id);
        let dead: Vec<u32> = self
            .placements_active
            .values()
            .filter(|p| p.image_id == image_id)
            .map(|p| p.id)
            .collect();
        for id in dead {
            self.delete_placement(id);
        }
        self.placements_scrollback
            .retain(|p| p.image_id != image_id);
        removed
    }

    /// `clear()`: releases every image and placement.
    pub fn clear(&mut self) {
        self.images.clear();
        self.placements_active.clear();
        self.placements_scrollback.clear();
        self.cell_to_placement.clear();
        self.transmissions.clear();
    }

    // -- placements ----------------------------------------------------------

    pub fn create_placement(&mut self, placement: Placement) {
        self.note_explicit_placement_id(placement.id);
        // Replacing an id that already carried a placeholder mapping: drop
        // the stale mapping first.
        self.cell_to_placement
            .retain(|_, pid| *pid != placement.id);

        if let Some(_glyph) = placement.unicode_placeholder {
            if placement.row >= 0 {
                self.cell_to_placement
                    .insert((placement.row as u16, placement.col), placement.id);
            }
        }
        self.placements_active.insert(placement.id, placement);
    }

    pub fn delete_placement(&mut self, id: u32) {
        self.placements_active.remove(&id);
        self.placements_scrollback.retain(|p| p.id != id);
        self.cell_to_placement.retain(|_, pid| *pid != id);
    }

    pub fn get_visible_placements(&self) -> Vec<&Placement> {
        self.placements_active.values().collect()
    }

    pub fn get_scrollback_placements(&self) -> Vec<&Placement> {
        self.placements_scrollback.iter().collect()
    }

    pub fn placement_at_cell(&self, row: u16, col: u16) -> Option<u32> {
        self.cell_to_placement.get(&(row, col)).copied()
    }

    // -- scroll coupling (§4.6 "Scroll coupling") ----------------------------

    pub fn handle_scroll(
        &mut self,
        direction: ScrollDirection,
        n: u16,
        screen_rows: u16,
        is_alternate: bool,
    ) {
        let n = n as i32;
        let ids: Vec<u32> = self.placements_active.keys().copied().collect();
        for id in ids {
            let Some(mut p) = self.placements_active.remove(&id) else {
                continue;
            };
            match direction {
                ScrollDirection::Up => {
                    p.row -= n;
                    if p.row < 0 {
                        self.cell_to_placement.retain(|_, pid| *pid != id);
                        if is_alternate {
                            // deleted, image retained
                        } else {
                            self.placements_scrollback.push(p);
                        }
                        continue;
                    }
                }
                ScrollDirection::Down => {
                    p.row += n;
                    if p.row >= screen_rows as i32 {
                        self.cell_to_placement.retain(|_, pid| *pid != id);
                        continue;
                    }
                }
            }
            if let Some(glyph) = p.unicode_placeholder {
                let _ = glyph;
                self.cell_to_placement.retain(|_, pid| *pid != id);
                self.cell_to_placement
                    .insert((p.row as u16, p.col), id);
            }
            self.placements_active.insert(id, p);
        }
    }

    // -- line insertion/deletion coupling -------------------------------------

    pub fn handle_line_insertion(&mut self, row: u16, n: u16, screen_rows: u16) {
        let row = row as i32;
        let n = n as i32;
        let ids: Vec<u32> = self.placements_active.keys().copied().collect();
        for id in ids {
            let Some(mut p) = self.placements_active.remove(&id) else {
                continue;
            };
            if p.row >= row {
                p.row += n;
                if p.row >= screen_rows as i32 {
                    self.cell_to_placement.retain(|_, pid| *pid != id);
                    continue;
                }
                if p.unicode_placeholder.is_some() {
                    self.cell_to_placement.retain(|_, pid| *pid != id);
                    self.cell_to_placement.insert((p.row as u16, p.col), id);
                }
            }
            self.placements_active.insert(id, p);
        }
    }

    pub fn handle_line_deletion(&mut self, row: u16, n: u16) {
        let delete_start = row as i32;
        let delete_end = delete_start + n as i32 - 1;
        let ids: Vec<u32> = self.placements_active.keys().copied().collect();
        for id in ids {
            let Some(mut p) = self.placements_active.remove(&id) else {
                continue;
            };
            let (p_top, p_bottom) = p.row_range();
            let intersects = p_top <= delete_end && p_bottom >= delete_start;
            if intersects {
                self.cell_to_placement.retain(|_, pid| *pid != id);
                continue;
            }
            if p_top > delete_end {
                p.row -= n as i32;
                if p.unicode_placeholder.is_some() {
                    self.cell_to_placement.retain(|_, pid| *pid != id);
                    self.cell_to_placement.insert((p.row as u16, p.col), id);
                }
            }
            self.placements_active.insert(id, p);
        }
    }

    // -- clear/erase coupling (§4.6 "Clear/erase coupling") -------------------

    pub fn handle_clear(&mut self, scope: ClearScope) {
        match scope {
            ClearScope::Screen => {
                self.placements_active.clear();
                self.cell_to_placement.clear();
            }
            ClearScope::Line { row, col_range } => {
                let row = row as i32;
                let dead: Vec<u32> = self
                    .placements_active
                    .values()
                    .filter(|p| {
                        let (top, bottom) = p.row_range();
                        let row_hit = top <= row && row <= bottom;
                        if !row_hit {
                            return false;
                        }
                        match col_range {
                            None => true,
                            Some((c0, c1)) => {
                                let (pc0, pc1) = p.col_range();
                                pc0 <= c1 && pc1 >= c0
                            }
                        }
                    })
                    .map(|p| p.id)
                    .collect();
                for id in dead {
                    self.delete_placement(id);
                }
            }
        }
    }

    // -- resize coupling (§4.6 "Resize coupling") -----------------------------

    pub fn handle_resize(&mut self, _old_cols: u16, _old_rows: u16, new_cols: u16, new_rows: u16) {
        let dead: Vec<u32> = self
            .placements_active
            .values()
            .filter(|p| p.row < 0 || p.row >= new_rows as i32 || p.col >= new_cols)
            .map(|p| p.id)
            .collect();
        for id in dead {
            self.delete_placement(id);
        }
    }

    // -- placeholder cell overwrite -------------------------------------------

    pub fn handle_cell_overwrite(&mut self, row: u16, col: u16) {
        if let Some(id) = self.cell_to_placement.remove(&(row, col)) {
            self.delete_placement(id);
        }
    }

    pub fn handle_region_overwrite(&mut self, r0: u16, r1: u16, c0: u16, c1: u16) {
        let dead: Vec<u32> = self
            .cell_to_placement
            .iter()
            .filter(|((r, c), _)| *r >= r0 && *r <= r1 && *c >= c0 && *c <= c1)
            .map(|(_, id)| *id)
            .collect();
        for id in dead {
            self.delete_placement(id);
        }
    }
}

#[cfg(test)]
fn placement(id: u32, image_id: u32, row: i32, col: u16, w: u16, h: u16) -> Placement {
    Placement {
        id,
        image_id,
        row,
        col,
        w_cells: w,
        h_cells: h,
        src_rect: None,
        z_index: None,
        unicode_placeholder: None,
    }
}

#[cfg(test)]
fn dummy_image() -> ImageData {
    ImageData {
        data: vec![0; 4],
        format: ImageFormat::Rgba,
        width_px: 1,
        height_px: 1,
        has_alpha: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_image_cascades_to_matching_placements_only() {
        let mut gm = GraphicsManager::new();
        gm.store_image(1, dummy_image());
        gm.store_image(2, dummy_image());
        gm.create_placement(placement(10, 1, 0, 0, 1, 1));
        gm.create_placement(placement(11, 1, 5, 0, 1, 1));
        gm.create_placement(placement(12, 2, 0, 0, 1, 1));

        let released = gm.delete_image(1);
        assert!(released.is_some());
        assert!(gm.placements_active.get(&10).is_none());
        assert!(gm.placements_active.get(&11).is_none());
        assert!(gm.placements_active.get(&12).is_some());
        assert!(gm.get_image(1).is_none());
        assert!(gm.get_image(2).is_some());
    }

    #[test]
    fn line_insertion_shifts_placements_below_and_drops_off_screen() {
        let mut gm = GraphicsManager::new();
        gm.store_image(1, dummy_image());
        gm.create_placement(placement(1, 1, 10, 0, 5, 2));

        gm.handle_line_insertion(5, 3, 24);
        assert_eq!(gm.placements_active.get(&1).unwrap().row, 13);

        gm.placements_active.get_mut(&1).unwrap().row = 22;
        gm.handle_line_insertion(5, 3, 24);
        assert!(gm.placements_active.get(&1).is_none());
    }

    #[test]
    fn line_deletion_intersecting_region_is_dropped() {
        let mut gm = GraphicsManager::new();
        gm.store_image(1, dummy_image());
        gm.create_placement(placement(1, 1, 6, 0, 1, 2));

        gm.handle_line_deletion(5, 3);
        assert!(gm.placements_active.get(&1).is_none());
    }

    #[test]
    fn scroll_up_off_primary_moves_to_scrollback() {
        let mut gm = GraphicsManager::new();
        gm.store_image(1, dummy_image());
        gm.create_placement(placement(1, 1, 0, 0, 1, 1));

        gm.handle_scroll(ScrollDirection::Up, 1, 24, false);
        assert!(gm.placements_active.get(&1).is_none());
        assert_eq!(gm.get_scrollback_placements().len(), 1);
    }

    #[test]
    fn scroll_up_off_alternate_is_discarded_not_kept() {
        let mut gm = GraphicsManager::new();
        gm.store_image(1, dummy_image());
        gm.create_placement(placement(1, 1, 0, 0, 1, 1));

        gm.handle_scroll(ScrollDirection::Up, 1, 24, true);
        assert!(gm.placements_active.get(&1).is_none());
        assert!(gm.get_scrollback_placements().is_empty());
    }

    #[test]
    fn explicit_ids_advance_generation_counters() {
        let mut gm = GraphicsManager::new();
        gm.store_image(50, dummy_image());
        assert_eq!(gm.generate_image_id(), 51);

        gm.create_placement(placement(30, 50, 0, 0, 1, 1));
        assert_eq!(gm.generate_placement_id(), 31);
    }

    #[test]
    fn cell_overwrite_deletes_placeholder_placement() {
        let mut gm = GraphicsManager::new();
        gm.store_image(1, dummy_image());
        let mut p = placement(1, 1, 3, 4, 1, 1);
        p.unicode_placeholder = Some('\u{10EEEE}');
        gm.create_placement(p);

        assert_eq!(gm.placement_at_cell(3, 4), Some(1));
        gm.handle_cell_overwrite(3, 4);
        assert!(gm.placements_active.get(&1).is_none());
        assert!(gm.placement_at_cell(3, 4).is_none());
    }
}
