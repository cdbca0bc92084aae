//! Whole-engine integration suite: the concrete scenarios and cross-cutting
//! invariants exercised end to end through the public `Terminal` API, byte
//! stream in, query surface out.

use vtcore::{ActiveBuffer, TerminalConfig, UnderlineStyle};

fn term(cols: u16, rows: u16) -> vtcore::Terminal {
    vtcore::Terminal::new(TerminalConfig::new(cols, rows)).unwrap()
}

fn write(t: &mut vtcore::Terminal, bytes: &[u8]) {
    t.write(bytes, &mut |_| {});
}

// Scenario A: cursor clamp.
#[test]
fn scenario_a_cursor_clamp() {
    let mut t = term(80, 24);
    write(&mut t, b"\x1b[999;999H");
    assert_eq!((t.cursor().row, t.cursor().col), (23, 79));
}

// Scenario B: autowrap.
#[test]
fn scenario_b_autowrap() {
    let mut t = term(4, 2);
    write(&mut t, b"ABCD");
    assert_eq!(t.line(0).text(), "ABCD");
    assert!(t.line(0).wrapped);
    write(&mut t, b"E");
    assert_eq!(t.line(1).text().chars().next(), Some('E'));
    assert_eq!((t.cursor().row, t.cursor().col), (1, 1));
}

// Scenario C: scrollback eviction.
#[test]
fn scenario_c_scrollback_eviction() {
    let mut t = vtcore::Terminal::new(
        TerminalConfig::new(10, 3).with_scrollback_capacity(2),
    )
    .unwrap();
    write(&mut t, b"L0\r\nL1\r\nL2\r\nL3\r\nL4");
    assert_eq!(t.scrollback_len(), 2);
    assert!(t.scrollback_line(0).unwrap().text().starts_with("L0"));
    assert!(t.scrollback_line(1).unwrap().text().starts_with("L1"));
    assert!(t.line(0).text().starts_with("L2"));
    assert!(t.line(1).text().starts_with("L3"));
    assert!(t.line(2).text().starts_with("L4"));
}

// Scenario D: SGR colon underline.
#[test]
fn scenario_d_sgr_colon_underline() {
    let mut t = term(80, 24);
    write(&mut t, b"\x1b[4:3mX");
    assert_eq!(t.line(0).cells[0].text.as_ref(), "X");
    assert_eq!(t.line(0).cells[0].underline, UnderlineStyle::Curly);
}

// Scenario E: image delete cascades placements.
#[test]
fn scenario_e_image_delete_cascades_placements() {
    let mut t = term(80, 24);
    write(&mut t, b"\x1b_Ga=t,i=1,f=100;AAAA\x1b\\");
    write(&mut t, b"\x1b_Ga=p,i=1,p=10\x1b\\");
    write(&mut t, b"\x1b[6;1H");
    write(&mut t, b"\x1b_Ga=p,i=1,p=11\x1b\\");
    write(&mut t, b"\x1b_Ga=t,i=2,f=100;AAAA\x1b\\");
    write(&mut t, b"\x1b_Ga=p,i=2,p=12\x1b\\");

    assert_eq!(t.visible_placements().len(), 3);
    write(&mut t, b"\x1b_Ga=d,d=i,i=1\x1b\\");

    let remaining = t.visible_placements();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, 12);
    assert!(t.image(1).is_none());
    assert!(t.image(2).is_some());
}

// Scenario F: line-insertion placement shift.
#[test]
fn scenario_f_line_insertion_shifts_placement() {
    let mut t = term(80, 24);
    write(&mut t, b"\x1b_Ga=t,i=1,f=100;AAAA\x1b\\");
    write(&mut t, b"\x1b[11;1H"); // row 10 (0-based)
    write(&mut t, b"\x1b_Ga=p,i=1,p=1,c=5,r=2\x1b\\");
    write(&mut t, b"\x1b[6;1H"); // row 5
    write(&mut t, b"\x1b[3L"); // IL 3

    let placements = t.visible_placements();
    assert_eq!(placements.len(), 1);
    assert_eq!(placements[0].row, 13);
}

#[test]
fn scenario_f_line_insertion_drops_placement_past_bottom() {
    let mut t = term(80, 24);
    write(&mut t, b"\x1b_Ga=t,i=1,f=100;AAAA\x1b\\");
    write(&mut t, b"\x1b[23;1H"); // row 22
    write(&mut t, b"\x1b_Ga=p,i=1,p=1,c=5,r=2\x1b\\");
    write(&mut t, b"\x1b[6;1H"); // row 5
    write(&mut t, b"\x1b[3L");

    assert!(t.visible_placements().is_empty());
}

// Cross-cutting invariants (§8).

#[test]
fn invariant_dimensions_hold_after_resize() {
    let mut t = term(80, 24);
    t.resize(40, 10);
    for r in 0..t.rows() {
        assert_eq!(t.line(r).cells.len(), t.cols() as usize);
    }
}

#[test]
fn invariant_cursor_stays_in_bounds() {
    let mut t = term(5, 2);
    write(&mut t, b"\x1b[50;50H");
    assert!(t.cursor().row < t.rows());
    assert!(t.cursor().col < t.cols());
}

#[test]
fn invariant_wide_cell_pairing() {
    let mut t = term(10, 1);
    write(&mut t, "中".as_bytes());
    assert_eq!(t.line(0).cells[0].width, 2);
    assert!(t.line(0).cells[1].is_continuation());
}

#[test]
fn invariant_scrollback_never_exceeds_capacity() {
    let mut t = vtcore::Terminal::new(
        TerminalConfig::new(10, 2).with_scrollback_capacity(3),
    )
    .unwrap();
    for _ in 0..20 {
        write(&mut t, b"x\r\n");
    }
    assert!(t.scrollback_len() <= 3);
}

// Round-trip / idempotence laws.

#[test]
fn alternate_screen_round_trip_restores_primary() {
    let mut t = term(20, 5);
    write(&mut t, b"hello");
    write(&mut t, b"\x1b[3;3H");
    assert_eq!(t.active_buffer(), ActiveBuffer::Primary);

    write(&mut t, b"\x1b[?1049h");
    assert_eq!(t.active_buffer(), ActiveBuffer::Alternate);
    write(&mut t, b"garbage\x1b[1;1H");
    write(&mut t, b"\x1b[?1049l");

    assert_eq!(t.active_buffer(), ActiveBuffer::Primary);
    assert_eq!(t.line(0).text().trim_end(), "hello");
    assert_eq!((t.cursor().row, t.cursor().col), (2, 2));
}

#[test]
fn resize_preserves_overlapping_content() {
    let mut t = term(20, 5);
    write(&mut t, b"hello world");
    t.resize(8, 3);
    assert_eq!(&t.line(0).text()[..8], "hello wo");
    t.resize(20, 5);
    assert_eq!(&t.line(0).text()[..8], "hello wo");
}

#[test]
fn cursor_motion_identity_cup() {
    let mut t = term(80, 24);
    write(&mut t, b"\x1b[10;20H");
    assert_eq!((t.cursor().row, t.cursor().col), (9, 19));
}

#[test]
fn device_status_report_replies_with_cursor_position() {
    let mut t = term(80, 24);
    write(&mut t, b"\x1b[5;5H");
    let mut replies = Vec::new();
    t.write(b"\x1b[6n", &mut |bytes| replies.extend_from_slice(bytes));
    assert_eq!(replies, b"\x1b[5;5R");
}
