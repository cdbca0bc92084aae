//! Kitty graphics overlay (§3.5, §4.6): image store, placement store,
//! chunked transmission reassembly, and the scroll/erase/resize coupling
//! that keeps placements coherent with the text grid.

mod manager;

pub use manager::{ClearScope, GraphicsManager, ScrollDirection};

/// Pixel format a stored image was decoded from / a transmission declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Rgb,
    Rgba,
    Png,
}

impl ImageFormat {
    /// Maps the Kitty `f=` control-key code. `None` for an unsupported code
    /// (§7 Graphics error: reported only as a missing store, never a panic).
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            24 => Some(ImageFormat::Rgb),
            32 => Some(ImageFormat::Rgba),
            100 => Some(ImageFormat::Png),
            _ => None,
        }
    }
}

/// A decoded image's pixel buffer and metadata. `data`'s lifetime is the
/// image's; it is handed back to the caller (ownership transfer, not a
/// release callback — see DESIGN.md) on `delete_image`.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width_px: u32,
    pub height_px: u32,
    pub has_alpha: bool,
}

/// A sub-rectangle of source pixels (Kitty `x,y,w,h`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One on-screen placement of a stored image (§3.5). `row` is signed: a
/// non-negative row addresses the active buffer; a negative row addresses
/// scrollback, counting upward from the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub id: u32,
    pub image_id: u32,
    pub row: i32,
    pub col: u16,
    pub w_cells: u16,
    pub h_cells: u16,
    pub src_rect: Option<SourceRect>,
    pub z_index: Option<i32>,
    pub unicode_placeholder: Option<char>,
}

impl Placement {
    pub fn row_range(&self) -> (i32, i32) {
        let h = self.h_cells.max(1) as i32;
        (self.row, self.row + h - 1)
    }

    pub fn col_range(&self) -> (u16, u16) {
        let w = self.w_cells.max(1);
        (self.col, self.col + w - 1)
    }
}

/// Reassembly slot for a chunked `transmit` sequence (§4.6 "Transmission").
#[derive(Debug, Clone, Default)]
pub(crate) struct Transmission {
    pub format: Option<ImageFormat>,
    pub chunks: Vec<Vec<u8>>,
}
