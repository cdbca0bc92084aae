use std::collections::BTreeSet;

/// Outbound structured events the core emits to its embedder (§6).
///
/// These are distinct from the reply *bytes* written back to the driving
/// process (see `Terminal::write`'s `on_reply` callback) — events are for a
/// host application's own state (window title, clipboard plumbing, redraws),
/// never sent back down the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// OSC 0 / OSC 2.
    TitleChanged(String),
    /// OSC 8. `id` is the optional hyperlink id parameter; `None` clears the
    /// active hyperlink.
    Hyperlink { url: Option<String>, id: Option<String> },
    /// OSC 52 query (`Pd == "?"`).
    ClipboardRequest,
    /// OSC 52 set, already base64-decoded.
    ClipboardUpdate(Vec<u8>),
    Bell,
    /// Caller's cue to redraw; carries the set of dirty row indices that has
    /// just been drained from the active buffer.
    RenderingInvalidated(BTreeSet<u16>),
}
