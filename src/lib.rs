//! Headless VT/ANSI terminal emulation core: a pure in-memory engine that
//! consumes the byte stream produced by a child process and maintains a
//! faithful model of what a DEC/xterm-compatible terminal would display.
//!
//! The crate owns no windowing, font rasterization, or input devices, and it
//! performs no host process I/O; callers drive it by feeding bytes into
//! [`Terminal::write`] and pulling state back out through the query methods.

mod buffer;
mod cell;
mod color;
pub mod config;
mod cursor;
mod dispatcher;
pub mod error;
pub mod events;
mod graphics;
mod modes;
mod parser;
mod scrollback;
mod screen;
mod sgr;
mod width;

pub use cell::{Cell, Line, UnderlineStyle};
pub use color::Color;
pub use config::TerminalConfig;
pub use cursor::Cursor;
pub use error::ConfigError;
pub use events::TerminalEvent;
pub use graphics::{ImageData, ImageFormat, Placement, SourceRect};
pub use modes::{Modes, MouseTracking};
pub use sgr::Attributes;

use dispatcher::Dispatcher;
use parser::{Event, Parser};
use screen::Screen;

/// Which grid is currently being written to (§3.4 `active`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveBuffer {
    Primary,
    Alternate,
}

/// The engine: byte-stream parser, screen model, and graphics overlay
/// wired together behind one owning facade (§2 "Data flows").
pub struct Terminal {
    parser: Parser,
    screen: Screen,
}

impl Terminal {
    pub fn new(config: TerminalConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            parser: Parser::new(),
            screen: Screen::new(
                config.cols,
                config.rows,
                config.tab_width,
                config.scrollback_capacity,
            ),
        })
    }

    /// Feeds driver-produced bytes through the parser and dispatcher.
    /// `on_reply` is invoked, in order, for every reply sequence the engine
    /// must send back to its driving process (DSR, DA, Kitty capability
    /// queries — §6). Returns the structured events raised while processing
    /// this chunk, in the order their triggering bytes appeared.
    pub fn write(&mut self, bytes: &[u8], on_reply: &mut dyn FnMut(&[u8])) -> Vec<TerminalEvent> {
        let mut raw_events = Vec::new();
        self.parser.feed(bytes, &mut raw_events);

        let mut events = Vec::new();
        for event in raw_events {
            dispatch_one(event, &mut self.screen, &mut events, on_reply);
        }

        let dirty = self.screen.take_dirty();
        if !dirty.is_empty() {
            events.push(TerminalEvent::RenderingInvalidated(dirty));
        }
        events
    }

    // -- query surface (§6) --------------------------------------------------

    pub fn cols(&self) -> u16 {
        self.screen.cols()
    }

    pub fn rows(&self) -> u16 {
        self.screen.rows()
    }

    pub fn cursor(&self) -> &Cursor {
        self.screen.cursor()
    }

    pub fn active_buffer(&self) -> ActiveBuffer {
        if self.screen.is_alternate() {
            ActiveBuffer::Alternate
        } else {
            ActiveBuffer::Primary
        }
    }

    /// A visible-grid row, `0` at the top of the current screen.
    pub fn line(&self, row: u16) -> &Line {
        self.screen.visible_line(row)
    }

    pub fn scrollback_len(&self) -> usize {
        self.screen.scrollback_len()
    }

    /// A scrollback row by age; `0` is the oldest retained line.
    pub fn scrollback_line(&self, index: usize) -> Option<&Line> {
        self.screen.scrollback_line(index)
    }

    pub fn visible_placements(&self) -> Vec<&Placement> {
        self.screen.graphics.get_visible_placements()
    }

    pub fn scrollback_placements(&self) -> Vec<&Placement> {
        self.screen.graphics.get_scrollback_placements()
    }

    pub fn image(&self, image_id: u32) -> Option<&ImageData> {
        self.screen.graphics.get_image(image_id)
    }

    /// Resizes both buffers, preserving the overlapping top-left content
    /// rectangle and clamping the cursor (§4.3 "Resize").
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.screen.resize(cols, rows);
    }
}

fn dispatch_one(
    event: Event,
    screen: &mut Screen,
    events: &mut Vec<TerminalEvent>,
    on_reply: &mut dyn FnMut(&[u8]),
) {
    Dispatcher::dispatch(event, screen, events, on_reply);
}
