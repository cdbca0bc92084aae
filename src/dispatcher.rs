//! Maps parser events onto `Screen`/`GraphicsManager` mutations, produces
//! reply bytes for capability queries, and emits outbound `TerminalEvent`s
//! (§4.2, §6).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, trace, warn};

use crate::events::TerminalEvent;
use crate::graphics::{ImageData, ImageFormat, Placement};
use crate::modes::MouseTracking;
use crate::parser::{Event, KittyCommand};
use crate::screen::Screen;

/// One `write()` call's worth of dispatch state. Stateless across calls —
/// everything that must persist (cursor, modes, graphics) lives on `Screen`.
pub struct Dispatcher;

impl Dispatcher {
    pub fn dispatch(
        event: Event,
        screen: &mut Screen,
        events: &mut Vec<TerminalEvent>,
        on_reply: &mut dyn FnMut(&[u8]),
    ) {
        match event {
            Event::Printable(text, width) => screen.write_char(&text, width),
            Event::Bell => events.push(TerminalEvent::Bell),
            Event::Backspace => screen.backspace(),
            Event::Tab => screen.tab(),
            Event::CarriageReturn => screen.carriage_return(),
            Event::LineFeed => {
                if screen.modes.linefeed_newline {
                    screen.carriage_return();
                }
                screen.line_feed();
            }
            Event::Csi {
                params,
                intermediates,
                final_byte,
                private_marker,
            } => {
                trace!(final_byte = final_byte as char, ?params, "csi");
                dispatch_csi(screen, events, on_reply, &params, &intermediates, final_byte, private_marker);
            }
            Event::Osc { params } => dispatch_osc(screen, events, &params),
            Event::Apc { payload } => dispatch_apc(screen, on_reply, &payload),
            Event::Dcs { final_byte, .. } => {
                // Sixel and capability-exchange DCS strings are consumed by
                // the parser and otherwise ignored (§4.1 "parsed only enough
                // to consume and ignore").
                trace!(final_byte = final_byte as char, "dcs ignored");
            }
        }
    }
}

fn param(params: &[Vec<u16>], idx: usize, default: u16) -> u16 {
    params
        .get(idx)
        .and_then(|g| g.first().copied())
        .filter(|&v| v != 0)
        .unwrap_or(default)
}

fn raw_param(params: &[Vec<u16>], idx: usize) -> u16 {
    params.get(idx).and_then(|g| g.first().copied()).unwrap_or(0)
}

fn dispatch_csi(
    screen: &mut Screen,
    events: &mut Vec<TerminalEvent>,
    on_reply: &mut dyn FnMut(&[u8]),
    params: &[Vec<u16>],
    _intermediates: &[u8],
    final_byte: u8,
    private_marker: Option<u8>,
) {
    // Synthetic single-byte ESC finals surfaced by the parser (§9 "Parameter
    // representation" note in parser/mod.rs): marker '#' disambiguates these
    // from a real CSI sequence sharing the same final byte.
    if private_marker == Some(b'#') {
        match final_byte {
            b'7' => screen.save_cursor(),
            b'8' => screen.restore_cursor(),
            b'c' => {
                debug!("full reset (RIS)");
                screen.full_reset();
            }
            b'D' => screen.line_feed(),
            b'M' => screen.reverse_index(),
            b'E' => {
                screen.carriage_return();
                screen.line_feed();
            }
            _ => {}
        }
        return;
    }

    if private_marker == Some(b'?') {
        match final_byte {
            b'h' => set_dec_modes(screen, params, true),
            b'l' => set_dec_modes(screen, params, false),
            _ => {}
        }
        return;
    }

    match final_byte {
        b'A' => screen.cursor_up(param(params, 0, 1)),
        b'B' => screen.cursor_down(param(params, 0, 1)),
        b'C' => screen.cursor_forward(param(params, 0, 1)),
        b'D' => screen.cursor_backward(param(params, 0, 1)),
        b'H' | b'f' => {
            let row = param(params, 0, 1).saturating_sub(1);
            let col = param(params, 1, 1).saturating_sub(1);
            screen.cup(row, col);
        }
        b'G' | b'`' => {
            let col = param(params, 0, 1).saturating_sub(1);
            let row = screen.cursor().row;
            screen.cup(row, col);
        }
        b'd' => {
            let row = param(params, 0, 1).saturating_sub(1);
            let col = screen.cursor().col;
            screen.cup(row, col);
        }
        b'J' => screen.erase_in_display(raw_param(params, 0)),
        b'K' => screen.erase_in_line(raw_param(params, 0)),
        b'L' => screen.insert_lines(param(params, 0, 1)),
        b'M' => screen.delete_lines(param(params, 0, 1)),
        b'@' => screen.insert_cells(param(params, 0, 1)),
        b'P' => screen.delete_cells(param(params, 0, 1)),
        b'S' => screen.scroll_up(param(params, 0, 1)),
        b'T' => screen.scroll_down(param(params, 0, 1)),
        b'r' => {
            let top = param(params, 0, 1).saturating_sub(1);
            let bottom = if raw_param(params, 1) == 0 {
                screen.rows().saturating_sub(1)
            } else {
                param(params, 1, 1).saturating_sub(1)
            };
            screen.set_scroll_region(top, bottom);
        }
        b'm' => {
            let attrs = &mut screen.active_mut().cursor.attrs;
            attrs.apply_sgr(params);
        }
        b'n' => match raw_param(params, 0) {
            5 => on_reply(b"\x1b[0n"),
            6 => {
                let c = screen.cursor();
                let reply = format!("\x1b[{};{}R", c.row + 1, c.col + 1);
                on_reply(reply.as_bytes());
            }
            _ => {}
        },
        b'c' => {
            if private_marker == Some(b'>') {
                on_reply(b"\x1b[>41;0;0c");
            } else {
                on_reply(b"\x1b[?1;2;6;22c");
            }
        }
        b'h' => set_ansi_modes(screen, params, true),
        b'l' => set_ansi_modes(screen, params, false),
        b's' => screen.save_cursor(),
        b'u' => screen.restore_cursor(),
        _ => {}
    }
}

fn set_dec_modes(screen: &mut Screen, params: &[Vec<u16>], enable: bool) {
    for group in params {
        let code = group.first().copied().unwrap_or(0);
        match code {
            1 => screen.modes.application_cursor_keys = enable,
            6 => screen.modes.origin = enable,
            7 => screen.modes.autowrap = enable,
            12 => screen.active_mut().cursor.blinking = enable,
            25 => {
                screen.modes.cursor_visible = enable;
                screen.active_mut().cursor.visible = enable;
            }
            1000 => {
                screen.modes.mouse_tracking = if enable {
                    MouseTracking::Normal
                } else {
                    MouseTracking::None
                };
            }
            1002 => {
                screen.modes.mouse_tracking = if enable {
                    MouseTracking::ButtonEvent
                } else {
                    MouseTracking::None
                };
            }
            1003 => {
                screen.modes.mouse_tracking = if enable {
                    MouseTracking::AnyEvent
                } else {
                    MouseTracking::None
                };
            }
            1004 => screen.modes.focus_events = enable,
            1005 => screen.modes.utf8_mouse = enable,
            1006 => screen.modes.sgr_mouse = enable,
            1047 | 1049 => {
                if enable {
                    debug!("alternate screen enter");
                    screen.switch_to_alternate();
                } else {
                    debug!("alternate screen exit");
                    screen.switch_to_primary();
                }
            }
            1048 => {
                if enable {
                    screen.save_cursor();
                } else {
                    screen.restore_cursor();
                }
            }
            2004 => screen.modes.bracketed_paste = enable,
            2026 => screen.modes.synchronized_output = enable,
            _ => {}
        }
    }
}

fn set_ansi_modes(screen: &mut Screen, params: &[Vec<u16>], enable: bool) {
    for group in params {
        match group.first().copied().unwrap_or(0) {
            4 => {
                screen.modes.insert = enable;
                screen.active_mut().modes_insert_active = enable;
            }
            20 => screen.modes.linefeed_newline = enable,
            _ => {}
        }
    }
}

fn dispatch_osc(screen: &mut Screen, events: &mut Vec<TerminalEvent>, params: &[Vec<u8>]) {
    let Some(cmd) = params.first().and_then(|b| std::str::from_utf8(b).ok()) else {
        return;
    };
    match cmd {
        "0" | "2" => {
            if let Some(title) = params.get(1).map(|b| String::from_utf8_lossy(b).to_string()) {
                events.push(TerminalEvent::TitleChanged(title));
            }
        }
        "8" => {
            let id = params
                .get(1)
                .map(|b| String::from_utf8_lossy(b).to_string())
                .filter(|s| !s.is_empty())
                .and_then(|s| s.strip_prefix("id=").map(str::to_string));
            let uri = params.get(2).map(|b| String::from_utf8_lossy(b).to_string());
            let url = uri.filter(|s| !s.is_empty());
            let active_url = url.as_ref().map(|u| std::rc::Rc::from(u.as_str()));
            screen.active_mut().active_url = active_url;
            events.push(TerminalEvent::Hyperlink { url, id });
        }
        "52" => {
            let Some(data) = params.get(2) else { return };
            if data.as_slice() == b"?" {
                events.push(TerminalEvent::ClipboardRequest);
            } else if let Ok(decoded) = STANDARD.decode(data) {
                events.push(TerminalEvent::ClipboardUpdate(decoded));
            } else {
                warn!("malformed OSC 52 payload");
            }
        }
        _ => {}
    }
}

// -- Kitty graphics (§4.6) --------------------------------------------------

fn dispatch_apc(screen: &mut Screen, on_reply: &mut dyn FnMut(&[u8]), payload: &[u8]) {
    let Some(cmd) = KittyCommand::parse(payload) else {
        return;
    };
    let Some(action) = cmd.action() else {
        warn!("kitty apc with no action");
        return;
    };

    match action {
        't' | 'T' => handle_transmit(screen, &cmd, action == 'T'),
        'p' => handle_put(screen, &cmd),
        'd' => handle_delete(screen, &cmd),
        'q' => {
            let id = cmd.get_u32('i');
            let reply = match id {
                Some(id) => format!("\x1b_Gi={id};OK\x1b\\"),
                None => "\x1b_GOK\x1b\\".to_string(),
            };
            on_reply(reply.as_bytes());
        }
        other => warn!(action = %other, "unsupported kitty action"),
    }
}

fn handle_transmit(screen: &mut Screen, cmd: &KittyCommand, display: bool) {
    let image_id = cmd
        .get_u32('i')
        .unwrap_or_else(|| screen.graphics.generate_image_id());
    let more = cmd.get_u32('m').unwrap_or(0) == 1;

    if screen.graphics.get_image(image_id).is_none() {
        // First chunk of a (possibly multi-chunk) transmission, or a
        // single-shot one: an explicit format is required to start.
        if let Some(format) = cmd.get_u32('f').and_then(ImageFormat::from_code) {
            if cmd.payload.is_empty() && !more {
                // Nothing to decode; still worth logging, never fatal.
                warn!(image_id, "kitty transmit with empty payload");
            }
            screen.graphics.start_transmission(image_id, format);
        } else if let Some(code) = cmd.get_u32('f') {
            warn!(code, "unknown kitty image format code");
            return;
        }
    }
    screen.graphics.add_chunk(image_id, &cmd.payload);

    if !more {
        let Some((format, encoded)) = screen.graphics.complete_transmission(image_id) else {
            return;
        };
        let Ok(raw) = STANDARD.decode(&encoded) else {
            warn!(image_id, "kitty payload is not valid base64");
            return;
        };
        let width_px = cmd.get_u32('s').unwrap_or(0);
        let height_px = cmd.get_u32('v').unwrap_or(0);
        let has_alpha = matches!(format, ImageFormat::Rgba | ImageFormat::Png);
        screen.graphics.store_image(
            image_id,
            ImageData {
                data: raw,
                format,
                width_px,
                height_px,
                has_alpha,
            },
        );
        if display {
            place_image(screen, cmd, image_id);
        }
    }
}

fn handle_put(screen: &mut Screen, cmd: &KittyCommand) {
    let Some(image_id) = cmd.get_u32('i') else {
        warn!("kitty put with no image id");
        return;
    };
    if screen.graphics.get_image(image_id).is_none() {
        warn!(image_id, "kitty put references unknown image");
        return;
    }
    place_image(screen, cmd, image_id);
}

fn place_image(screen: &mut Screen, cmd: &KittyCommand, image_id: u32) {
    let placement_id = cmd
        .get_u32('p')
        .unwrap_or_else(|| screen.graphics.generate_placement_id());
    let cursor = screen.cursor();
    let row = cursor.row;
    let col = cursor.col;

    let src_rect = match (
        cmd.get_u32('x'),
        cmd.get_u32('y'),
        cmd.get_u32('w'),
        cmd.get_u32('h'),
    ) {
        (x, y, Some(w), Some(h)) => Some(crate::graphics::SourceRect {
            x: x.unwrap_or(0),
            y: y.unwrap_or(0),
            width: w,
            height: h,
        }),
        _ => None,
    };

    let unicode_placeholder = if cmd.get_u32('U').unwrap_or(0) == 1 {
        Some('\u{10EEEE}')
    } else {
        None
    };

    screen.graphics.create_placement(Placement {
        id: placement_id,
        image_id,
        row: row as i32,
        col,
        w_cells: cmd.get_u32('c').unwrap_or(1) as u16,
        h_cells: cmd.get_u32('r').unwrap_or(1) as u16,
        src_rect,
        z_index: cmd.get_u32('z').map(|v| v as i32),
        unicode_placeholder,
    });
}

fn handle_delete(screen: &mut Screen, cmd: &KittyCommand) {
    match cmd.get('d').unwrap_or("a") {
        "a" | "A" => {
            let ids: Vec<u32> = screen
                .graphics
                .get_visible_placements()
                .iter()
                .map(|p| p.image_id)
                .collect();
            for id in ids {
                screen.graphics.delete_image(id);
            }
        }
        "i" | "I" => {
            if let Some(id) = cmd.get_u32('i') {
                screen.graphics.delete_image(id);
            }
        }
        other => warn!(kind = %other, "unsupported kitty delete selector"),
    }
}
