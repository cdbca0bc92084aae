/// Private-mode flags tracked by the screen (§3.4 `modes`).
#[derive(Debug, Clone)]
pub struct Modes {
    /// DECCKM: application cursor keys.
    pub application_cursor_keys: bool,
    /// DECOM: origin mode — cursor row addressing is relative to the scroll
    /// region top.
    pub origin: bool,
    /// DECAWM: autowrap.
    pub autowrap: bool,
    /// DECTCEM: cursor visible.
    pub cursor_visible: bool,
    /// IRM: insert mode.
    pub insert: bool,
    /// LNM: linefeed/new-line mode.
    pub linefeed_newline: bool,
    /// Mouse tracking variant (mode 1000/1002/1003), at most one active.
    pub mouse_tracking: MouseTracking,
    pub sgr_mouse: bool,
    pub utf8_mouse: bool,
    pub focus_events: bool,
    pub alternate_scroll: bool,
    pub bracketed_paste: bool,
    pub synchronized_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseTracking {
    #[default]
    None,
    Normal,
    ButtonEvent,
    AnyEvent,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            application_cursor_keys: false,
            origin: false,
            autowrap: true,
            cursor_visible: true,
            insert: false,
            linefeed_newline: false,
            mouse_tracking: MouseTracking::None,
            sgr_mouse: false,
            utf8_mouse: false,
            focus_events: false,
            alternate_scroll: false,
            bracketed_paste: false,
            synchronized_output: false,
        }
    }
}
