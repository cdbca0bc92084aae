//! The VT byte-stream parser (§4.1): a state machine over ECMA-48/ANSI
//! escape sequences. CSI/OSC/ESC/DCS parsing and UTF-8 decoding are built on
//! `vte` — the same crate the donor's terminal module parses every escape
//! sequence with — via `vte::Perform`; the one piece `vte` doesn't dispatch
//! at all is APC (it treats `ESC _ ... ST` as an anywhere-ignored string,
//! same as SOS/PM), so the Kitty graphics envelope is layered on top as a
//! thin byte-level wrapper around `vte::Parser::advance` (§10.1).

mod kitty;

pub use kitty::KittyCommand;

use vte::{Params, Perform};

/// One semantic event produced by [`Parser::feed`]. Events are a tagged
/// union rather than a callback-vtable interface (§9).
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A decoded, non-control grapheme and its display width (1 or 2).
    Printable(String, u8),
    Bell,
    Backspace,
    Tab,
    LineFeed,
    CarriageReturn,
    /// `CSI ... <final>`. `params` groups colon sub-parameters under each
    /// semicolon-delimited position (§9, "Parameter representation").
    Csi {
        params: Vec<Vec<u16>>,
        intermediates: Vec<u8>,
        final_byte: u8,
        private_marker: Option<u8>,
    },
    /// `OSC ... (BEL|ST)`. `params` is the semicolon-split payload, raw
    /// bytes; `params[0]` is conventionally the numeric command.
    Osc { params: Vec<Vec<u8>> },
    /// `DCS ... <final> <payload> ST`.
    Dcs {
        params: Vec<Vec<u16>>,
        intermediates: Vec<u8>,
        final_byte: u8,
        payload: Vec<u8>,
    },
    /// `APC <payload> ST` — Kitty graphics commands live here.
    Apc { payload: Vec<u8> },
}

const MAX_STRING_LEN: usize = 1 << 24;

/// Private-marker bytes that may lead a CSI sequence (ECMA-48 "parameter
/// prefix"); `vte` reports these as ordinary intermediates, so this parser
/// pulls the first one back out into `Event::Csi::private_marker` to match
/// the rest of the crate's dispatch shape.
fn is_private_marker(b: u8) -> bool {
    matches!(b, b'<' | b'=' | b'>' | b'?')
}

/// The byte-level state this crate tracks itself, on top of `vte::Parser`,
/// purely to recognize and collect the Kitty/APC envelope `vte` ignores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApcState {
    Normal,
    /// Just saw a bare ESC outside of APC collection; deciding whether the
    /// next byte starts an APC/PM/SOS string or belongs to `vte`.
    SawEsc,
    /// Collecting an APC/PM/SOS payload up to ST.
    InApc,
    /// Inside APC collection, just saw ESC; deciding whether it's `ESC \`.
    InApcEsc,
}

pub struct Parser {
    vte: vte::Parser,
    apc_state: ApcState,
    apc_buf: Vec<u8>,
    /// `false` for PM/SOS (`ESC ^` / `ESC X`), which are collected and
    /// discarded rather than surfaced as an event (§4.1 "parsed only
    /// enough to consume and ignore").
    apc_is_kitty_candidate: bool,
    dcs_params: Vec<Vec<u16>>,
    dcs_intermediates: Vec<u8>,
    dcs_final: u8,
    dcs_buf: Vec<u8>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            vte: vte::Parser::new(),
            apc_state: ApcState::Normal,
            apc_buf: Vec::new(),
            apc_is_kitty_candidate: false,
            dcs_params: Vec::new(),
            dcs_intermediates: Vec::new(),
            dcs_final: 0,
            dcs_buf: Vec::new(),
        }
    }

    /// Resets to `Ground`, clearing all intermediate buffers.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feed a chunk of bytes, appending every semantic event produced to
    /// `events`. Partial sequences are retained across calls.
    pub fn feed(&mut self, bytes: &[u8], events: &mut Vec<Event>) {
        for &byte in bytes {
            self.feed_byte(byte, events);
        }
    }

    fn feed_byte(&mut self, byte: u8, events: &mut Vec<Event>) {
        match self.apc_state {
            ApcState::Normal => {
                if byte == 0x1B {
                    self.apc_state = ApcState::SawEsc;
                } else {
                    self.advance_vte(byte, events);
                }
            }
            ApcState::SawEsc => match byte {
                b'_' => {
                    self.apc_state = ApcState::InApc;
                    self.apc_buf.clear();
                    self.apc_is_kitty_candidate = true;
                }
                b'^' | b'X' => {
                    // PM / SOS: consumed and ignored until ST.
                    self.apc_state = ApcState::InApc;
                    self.apc_buf.clear();
                    self.apc_is_kitty_candidate = false;
                }
                _ => {
                    // Not an APC lead-in: replay the ESC and this byte
                    // through `vte` unchanged.
                    self.apc_state = ApcState::Normal;
                    self.advance_vte(0x1B, events);
                    self.feed_byte(byte, events);
                }
            },
            ApcState::InApc => match byte {
                0x1B => self.apc_state = ApcState::InApcEsc,
                0x9C => self.finish_apc(events),
                _ => {
                    if self.apc_buf.len() < MAX_STRING_LEN {
                        self.apc_buf.push(byte);
                    }
                }
            },
            ApcState::InApcEsc => {
                if byte == b'\\' {
                    self.finish_apc(events);
                } else {
                    // Not a real ST: the string is abandoned and this ESC
                    // begins a fresh sequence; re-feed both bytes.
                    self.apc_state = ApcState::Normal;
                    self.feed_byte(0x1B, events);
                    self.feed_byte(byte, events);
                }
            }
        }
    }

    fn finish_apc(&mut self, events: &mut Vec<Event>) {
        self.apc_state = ApcState::Normal;
        let payload = std::mem::take(&mut self.apc_buf);
        if self.apc_is_kitty_candidate {
            events.push(Event::Apc { payload });
        }
    }

    fn advance_vte(&mut self, byte: u8, events: &mut Vec<Event>) {
        let mut performer = Performer {
            events,
            dcs_params: &mut self.dcs_params,
            dcs_intermediates: &mut self.dcs_intermediates,
            dcs_final: &mut self.dcs_final,
            dcs_buf: &mut self.dcs_buf,
        };
        self.vte.advance(&mut performer, byte);
    }
}

/// Bridges `vte::Perform` callbacks onto this crate's `Event` stream. Holds
/// no state of its own beyond the borrows it's constructed with — the DCS
/// assembly buffers live on `Parser` so they survive across `feed()` calls
/// the same way `vte::Parser`'s own CSI/OSC partial-sequence state does.
struct Performer<'a> {
    events: &'a mut Vec<Event>,
    dcs_params: &'a mut Vec<Vec<u16>>,
    dcs_intermediates: &'a mut Vec<u8>,
    dcs_final: &'a mut u8,
    dcs_buf: &'a mut Vec<u8>,
}

fn grouped_params(params: &Params) -> Vec<Vec<u16>> {
    let groups: Vec<Vec<u16>> = params.iter().map(|g| g.to_vec()).collect();
    if groups.is_empty() {
        vec![vec![0]]
    } else {
        groups
    }
}

/// Splits `vte`'s intermediates into a leading private marker (if any, per
/// `is_private_marker`) and the rest, matching this crate's `Event::Csi`
/// shape (§9).
fn split_private_marker(intermediates: &[u8]) -> (Option<u8>, Vec<u8>) {
    let mut marker = None;
    let mut rest = Vec::with_capacity(intermediates.len());
    for &b in intermediates {
        if marker.is_none() && is_private_marker(b) {
            marker = Some(b);
        } else {
            rest.push(b);
        }
    }
    (marker, rest)
}

impl Perform for Performer<'_> {
    fn print(&mut self, c: char) {
        let width = crate::width::char_width(c);
        self.events.push(Event::Printable(c.to_string(), width));
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            0x07 => self.events.push(Event::Bell),
            0x08 => self.events.push(Event::Backspace),
            0x09 => self.events.push(Event::Tab),
            0x0A | 0x0B | 0x0C => self.events.push(Event::LineFeed),
            0x0D => self.events.push(Event::CarriageReturn),
            _ => {} // NUL and other C0/C1 controls: no grid effect.
        }
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], ignore: bool, action: char) {
        if ignore {
            return;
        }
        let (private_marker, rest_intermediates) = split_private_marker(intermediates);
        self.events.push(Event::Csi {
            params: grouped_params(params),
            intermediates: rest_intermediates,
            final_byte: action as u8,
            private_marker,
        });
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], ignore: bool, byte: u8) {
        if ignore {
            return;
        }
        // Synthetic single-byte ESC finals (DECSC/DECRC/RIS/IND/NEL/RI):
        // marker '#' disambiguates these from a real CSI sequence sharing
        // the same final byte (§9 "Parameter representation").
        self.events.push(Event::Csi {
            params: vec![],
            intermediates: intermediates.to_vec(),
            final_byte: byte,
            private_marker: Some(b'#'),
        });
    }

    fn osc_dispatch(&mut self, params: &[&[u8]], _bell_terminated: bool) {
        self.events.push(Event::Osc {
            params: params.iter().map(|s| s.to_vec()).collect(),
        });
    }

    fn hook(&mut self, params: &Params, intermediates: &[u8], _ignore: bool, action: char) {
        *self.dcs_params = grouped_params(params);
        *self.dcs_intermediates = intermediates.to_vec();
        *self.dcs_final = action as u8;
        self.dcs_buf.clear();
    }

    fn put(&mut self, byte: u8) {
        if self.dcs_buf.len() < MAX_STRING_LEN {
            self.dcs_buf.push(byte);
        }
    }

    fn unhook(&mut self) {
        self.events.push(Event::Dcs {
            params: std::mem::take(self.dcs_params),
            intermediates: std::mem::take(self.dcs_intermediates),
            final_byte: *self.dcs_final,
            payload: std::mem::take(self.dcs_buf),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLACEMENT: char = '\u{FFFD}';

    fn feed(p: &mut Parser, s: &str) -> Vec<Event> {
        let mut events = Vec::new();
        p.feed(s.as_bytes(), &mut events);
        events
    }

    #[test]
    fn plain_text_is_printable() {
        let mut p = Parser::new();
        let events = feed(&mut p, "AB");
        assert_eq!(
            events,
            vec![
                Event::Printable("A".into(), 1),
                Event::Printable("B".into(), 1),
            ]
        );
    }

    #[test]
    fn csi_cup_params() {
        let mut p = Parser::new();
        let events = feed(&mut p, "\x1b[12;34H");
        assert_eq!(
            events,
            vec![Event::Csi {
                params: vec![vec![12], vec![34]],
                intermediates: vec![],
                final_byte: b'H',
                private_marker: None,
            }]
        );
    }

    #[test]
    fn csi_private_marker() {
        let mut p = Parser::new();
        let events = feed(&mut p, "\x1b[?25h");
        assert_eq!(
            events,
            vec![Event::Csi {
                params: vec![vec![25]],
                intermediates: vec![],
                final_byte: b'h',
                private_marker: Some(b'?'),
            }]
        );
    }

    #[test]
    fn csi_colon_subparams_stay_grouped() {
        let mut p = Parser::new();
        let events = feed(&mut p, "\x1b[4:3m");
        assert_eq!(
            events,
            vec![Event::Csi {
                params: vec![vec![4, 3]],
                intermediates: vec![],
                final_byte: b'm',
                private_marker: None,
            }]
        );
    }

    #[test]
    fn split_escape_across_calls_restarts() {
        let mut p = Parser::new();
        let mut events = Vec::new();
        p.feed(b"\x1b[1", &mut events);
        assert!(events.is_empty());
        p.feed(b";2H", &mut events);
        assert_eq!(
            events,
            vec![Event::Csi {
                params: vec![vec![1], vec![2]],
                intermediates: vec![],
                final_byte: b'H',
                private_marker: None,
            }]
        );
    }

    #[test]
    fn osc_terminated_by_bel() {
        let mut p = Parser::new();
        let events = feed(&mut p, "\x1b]0;hello\x07");
        assert_eq!(
            events,
            vec![Event::Osc {
                params: vec![b"0".to_vec(), b"hello".to_vec()],
            }]
        );
    }

    #[test]
    fn osc_terminated_by_st() {
        let mut p = Parser::new();
        let events = feed(&mut p, "\x1b]2;title\x1b\\");
        assert_eq!(
            events,
            vec![Event::Osc {
                params: vec![b"2".to_vec(), b"title".to_vec()],
            }]
        );
    }

    #[test]
    fn invalid_utf8_lead_is_replaced() {
        let mut p = Parser::new();
        let mut events = Vec::new();
        p.feed(&[0xFF, b'A'], &mut events);
        assert_eq!(
            events,
            vec![
                Event::Printable(REPLACEMENT.to_string(), 1),
                Event::Printable("A".into(), 1),
            ]
        );
    }

    #[test]
    fn truncated_utf8_then_ascii_emits_replacement() {
        let mut p = Parser::new();
        let mut events = Vec::new();
        // 0xE2 starts a 3-byte sequence; feed a bad continuation.
        p.feed(&[0xE2, b'A'], &mut events);
        assert_eq!(
            events,
            vec![
                Event::Printable(REPLACEMENT.to_string(), 1),
                Event::Printable("A".into(), 1),
            ]
        );
    }

    #[test]
    fn wide_char_reports_width_2() {
        let mut p = Parser::new();
        let events = feed(&mut p, "中");
        assert_eq!(events, vec![Event::Printable("中".into(), 2)]);
    }

    #[test]
    fn apc_kitty_payload_collected() {
        let mut p = Parser::new();
        let events = feed(&mut p, "\x1b_Ga=t,i=1;AAAA\x1b\\");
        assert_eq!(
            events,
            vec![Event::Apc {
                payload: b"Ga=t,i=1;AAAA".to_vec(),
            }]
        );
    }

    #[test]
    fn apc_split_across_calls_restarts() {
        let mut p = Parser::new();
        let mut events = Vec::new();
        p.feed(b"\x1b_Ga=t", &mut events);
        assert!(events.is_empty());
        p.feed(b";AAAA\x1b\\", &mut events);
        assert_eq!(
            events,
            vec![Event::Apc {
                payload: b"Ga=t;AAAA".to_vec(),
            }]
        );
    }

    #[test]
    fn pm_and_sos_strings_are_silently_discarded() {
        let mut p = Parser::new();
        let events = feed(&mut p, "\x1b^ignored\x1b\\A");
        assert_eq!(events, vec![Event::Printable("A".into(), 1)]);
    }

    #[test]
    fn esc_single_byte_final_is_synthetic_csi() {
        let mut p = Parser::new();
        let events = feed(&mut p, "\x1b7");
        assert_eq!(
            events,
            vec![Event::Csi {
                params: vec![],
                intermediates: vec![],
                final_byte: b'7',
                private_marker: Some(b'#'),
            }]
        );
    }

    #[test]
    fn dcs_passthrough_collects_payload() {
        let mut p = Parser::new();
        let events = feed(&mut p, "\x1bP1$r\x1b\\");
        assert_eq!(
            events,
            vec![Event::Dcs {
                params: vec![vec![1]],
                intermediates: vec![b'$'],
                final_byte: b'r',
                payload: vec![],
            }]
        );
    }

    #[test]
    fn reset_clears_partial_state() {
        let mut p = Parser::new();
        let mut events = Vec::new();
        p.feed(b"\x1b[1", &mut events);
        p.reset();
        events.clear();
        p.feed(b"A", &mut events);
        assert_eq!(events, vec![Event::Printable("A".into(), 1)]);
    }
}
