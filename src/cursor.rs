use crate::sgr::Attributes;

/// Cursor position, visual state, and the pending-SGR attribute carrier
/// (§3.3 `cursor`).
#[derive(Debug, Clone)]
pub struct Cursor {
    pub row: u16,
    pub col: u16,
    pub visible: bool,
    pub blinking: bool,
    pub attrs: Attributes,
    /// DEC "pending wrap" latch (§9): set once a printable write lands
    /// exactly on the last column; the *next* printable wraps before being
    /// placed rather than this one overflowing immediately.
    pub pending_wrap: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            row: 0,
            col: 0,
            visible: true,
            blinking: false,
            attrs: Attributes::default(),
            pending_wrap: false,
        }
    }
}

/// Snapshot taken by DECSC, restored by DECRC.
#[derive(Debug, Clone)]
pub struct SavedCursor {
    pub row: u16,
    pub col: u16,
    pub attrs: Attributes,
    pub origin: bool,
}
