use crate::cell::UnderlineStyle;
use crate::color::Color;

/// The attribute state a cursor carries forward onto every cell it writes
/// (§3.3 `attr_state`, §9 "local carrier").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attributes {
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub inverse: bool,
    pub strikethrough: bool,
    pub blink: bool,
    pub hidden: bool,
    pub underline: UnderlineStyle,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            fg: Color::Default,
            bg: Color::Default,
            bold: false,
            dim: false,
            italic: false,
            inverse: false,
            strikethrough: false,
            blink: false,
            hidden: false,
            underline: UnderlineStyle::None,
        }
    }
}

impl Attributes {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Decode one `CSI ... m` parameter vector, left to right, mutating
    /// `self` (§4.5). Each element of `params` is itself a small vector: the
    /// colon-grouped sub-parameters of one semicolon-delimited position. A
    /// bare semicolon-separated parameter is a one-element group.
    pub fn apply_sgr(&mut self, params: &[Vec<u16>]) {
        let params: &[Vec<u16>] = if params.is_empty() {
            &[vec![0]]
        } else {
            params
        };

        let mut i = 0;
        while i < params.len() {
            let group = &params[i];
            let code = group.first().copied().unwrap_or(0);

            match code {
                0 => self.reset(),
                1 => self.bold = true,
                2 => self.dim = true,
                3 => self.italic = true,
                4 => {
                    // `4:n` colon form selects a style; bare `4` (or `4:1`) is
                    // plain single-underline.
                    self.underline = match group.get(1) {
                        Some(0) => UnderlineStyle::None,
                        Some(1) | None => UnderlineStyle::Single,
                        Some(2) => UnderlineStyle::Double,
                        Some(3) => UnderlineStyle::Curly,
                        Some(4) => UnderlineStyle::Dotted,
                        Some(5) => UnderlineStyle::Dashed,
                        _ => UnderlineStyle::Single,
                    };
                }
                5 => self.blink = true,
                7 => self.inverse = true,
                8 => self.hidden = true,
                9 => self.strikethrough = true,
                21 => self.underline = UnderlineStyle::Double,
                22 => {
                    self.bold = false;
                    self.dim = false;
                }
                23 => self.italic = false,
                24 => self.underline = UnderlineStyle::None,
                25 => self.blink = false,
                27 => self.inverse = false,
                28 => self.hidden = false,
                29 => self.strikethrough = false,
                30..=37 => self.fg = Color::Indexed((code - 30) as u8),
                38 => {
                    if let Some(color) = parse_extended_color(&params, &mut i, group) {
                        self.fg = color;
                    }
                }
                39 => self.fg = Color::Default,
                40..=47 => self.bg = Color::Indexed((code - 40) as u8),
                48 => {
                    if let Some(color) = parse_extended_color(&params, &mut i, group) {
                        self.bg = color;
                    }
                }
                49 => self.bg = Color::Default,
                90..=97 => self.fg = Color::Indexed((code - 90 + 8) as u8),
                100..=107 => self.bg = Color::Indexed((code - 100 + 8) as u8),
                _ => {}
            }
            i += 1;
        }
    }
}

/// Parses the `38`/`48` extended-color sub-forms. Handles both:
/// - semicolon form: `38;5;n` / `38;2;r;g;b` — each piece its own top-level
///   parameter, so `i` advances past them;
/// - colon form: `38:5:n` / `38:2::r:g:b` — all packed into one group.
///
/// Returns the decoded color and advances `i` past whatever top-level
/// parameters it consumed (colon form consumes none extra; semicolon form
/// consumes 2-4 depending on mode).
fn parse_extended_color(params: &[Vec<u16>], i: &mut usize, group: &[u16]) -> Option<Color> {
    if group.len() > 1 {
        // Colon form: 38:5:n or 38:2:<cs>:r:g:b (color-space slot optional/empty).
        return match group.get(1) {
            Some(5) => group.get(2).map(|n| Color::Indexed(*n as u8)),
            Some(2) => {
                let rest: Vec<u16> = group[2..].to_vec();
                let (r, g, b) = if rest.len() >= 4 {
                    (rest[1], rest[2], rest[3])
                } else if rest.len() == 3 {
                    (rest[0], rest[1], rest[2])
                } else {
                    return None;
                };
                Some(Color::Rgb(r as u8, g as u8, b as u8))
            }
            _ => None,
        };
    }

    // Semicolon form: mode lives in the next top-level parameter.
    let mode = params.get(*i + 1)?.first().copied()?;
    match mode {
        5 => {
            let n = params.get(*i + 2)?.first().copied()?;
            *i += 2;
            Some(Color::Indexed(n as u8))
        }
        2 => {
            let r = params.get(*i + 2)?.first().copied()?;
            let g = params.get(*i + 3)?.first().copied()?;
            let b = params.get(*i + 4)?.first().copied()?;
            *i += 4;
            Some(Color::Rgb(r as u8, g as u8, b as u8))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_everything() {
        let mut attrs = Attributes::default();
        attrs.bold = true;
        attrs.fg = Color::Indexed(1);
        attrs.apply_sgr(&[vec![0]]);
        assert_eq!(attrs, Attributes::default());
    }

    #[test]
    fn colon_underline_style() {
        let mut attrs = Attributes::default();
        attrs.apply_sgr(&[vec![4, 3]]);
        assert_eq!(attrs.underline, UnderlineStyle::Curly);
    }

    #[test]
    fn semicolon_4_3_is_two_directives() {
        let mut attrs = Attributes::default();
        attrs.apply_sgr(&[vec![4], vec![3]]);
        assert_eq!(attrs.underline, UnderlineStyle::Single);
        assert!(attrs.italic);
    }

    #[test]
    fn indexed_fg_semicolon_and_colon() {
        let mut a = Attributes::default();
        a.apply_sgr(&[vec![38], vec![5], vec![200]]);
        assert_eq!(a.fg, Color::Indexed(200));

        let mut b = Attributes::default();
        b.apply_sgr(&[vec![38, 5, 201]]);
        assert_eq!(b.fg, Color::Indexed(201));
    }

    #[test]
    fn rgb_bg_semicolon_and_colon() {
        let mut a = Attributes::default();
        a.apply_sgr(&[vec![48], vec![2], vec![1], vec![2], vec![3]]);
        assert_eq!(a.bg, Color::Rgb(1, 2, 3));

        let mut b = Attributes::default();
        b.apply_sgr(&[vec![48, 2, 0, 10, 20, 30]]);
        assert_eq!(b.bg, Color::Rgb(10, 20, 30));
    }

    #[test]
    fn bright_indexed() {
        let mut a = Attributes::default();
        a.apply_sgr(&[vec![91]]);
        assert_eq!(a.fg, Color::Indexed(9));
    }

    #[test]
    fn unknown_codes_are_ignored() {
        let mut a = Attributes::default();
        a.apply_sgr(&[vec![59]]);
        assert_eq!(a, Attributes::default());
    }
}
