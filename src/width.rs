use unicode_width::UnicodeWidthChar;

/// Display width of one decoded scalar. `0` marks a combining character,
/// which the write path folds onto the previously written cell instead of
/// occupying a column of its own; everything else is clamped to the 1/2 the
/// grid model supports (§3.1).
pub fn char_width(c: char) -> u8 {
    match UnicodeWidthChar::width(c) {
        Some(0) => 0,
        Some(w) if w >= 2 => 2,
        Some(_) => 1,
        None => 1,
    }
}
