use crate::types::Pt;

// The two base-14 faces the renderer draws with. Both are referenced by name
// only, so output never embeds font programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    pub fn resource_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "F1",
            StandardFont::HelveticaBold => "F2",
        }
    }

    fn widths(self) -> &'static [u16; 95] {
        match self {
            StandardFont::Helvetica => &HELVETICA_WIDTHS,
            StandardFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    pub fn advance(self, ch: char) -> u16 {
        let code = ch as u32;
        if (32..=126).contains(&code) {
            return self.widths()[(code - 32) as usize];
        }
        match ch {
            '\u{2026}' | '\u{2014}' | '\u{2030}' => 1000,
            '\u{2013}' => 556,
            '\u{2022}' => 350,
            '\u{2018}' | '\u{2019}' => 222,
            '\u{201C}' | '\u{201D}' => 333,
            '\u{00A0}' => 278,
            _ => MISSING_WIDTH,
        }
    }
}

const MISSING_WIDTH: u16 = 556;

// AFM advance widths for codes 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // A..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333,
    500, 278, 556, 500, 722, 500, 500, 500, // a..z
    334, 260, 334, 584, // {..~
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389,
    556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

pub const ELLIPSIS: &str = "\u{2026}";

pub fn measure_text_width(font: StandardFont, size: Pt, text: &str) -> Pt {
    let units: i64 = text.chars().map(|ch| font.advance(ch) as i64).sum();
    let milli = (size.to_milli_i64() as i128 * units as i128) / 1000;
    Pt::from_milli_i64(milli as i64)
}

// Longest char-boundary prefix of `text` that fits `max_width` with an
// ellipsis appended. Text that already fits is returned unchanged.
pub fn truncate_with_ellipsis(font: StandardFont, size: Pt, text: &str, max_width: Pt) -> String {
    if text.is_empty() {
        return String::new();
    }
    if measure_text_width(font, size, text) <= max_width {
        return text.to_string();
    }
    if max_width <= Pt::ZERO {
        return String::new();
    }
    if measure_text_width(font, size, ELLIPSIS) >= max_width {
        return ELLIPSIS.to_string();
    }

    let mut boundaries: Vec<usize> = text.char_indices().map(|(idx, _)| idx).collect();
    boundaries.push(text.len());

    // Index 0 (empty prefix) always fits at this point.
    let mut lo = 0usize;
    let mut hi = boundaries.len() - 1;
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        let candidate = format!("{}{}", text[..boundaries[mid]].trim_end(), ELLIPSIS);
        if measure_text_width(font, size, &candidate) <= max_width {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    format!("{}{}", text[..boundaries[lo]].trim_end(), ELLIPSIS)
}

// Greedy word wrap. Words wider than the line are broken at char boundaries;
// explicit newlines start a new line.
pub fn wrap_text(font: StandardFont, size: Pt, text: &str, max_width: Pt) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if measure_text_width(font, size, &candidate) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if measure_text_width(font, size, word) <= max_width {
                current = word.to_string();
            } else {
                let mut pieces = break_word(font, size, word, max_width);
                current = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn break_word(font: StandardFont, size: Pt, word: &str, max_width: Pt) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        current.push(ch);
        if measure_text_width(font, size, &current) > max_width && current.chars().count() > 1 {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_with_afm_widths() {
        let size = Pt::from_f32(10.0);
        // "Hi" = 722 + 222
        assert_eq!(
            measure_text_width(StandardFont::Helvetica, size, "Hi"),
            Pt::from_f32(9.44)
        );
        // Bold is wider for the same string.
        assert!(
            measure_text_width(StandardFont::HelveticaBold, size, "Hi")
                > measure_text_width(StandardFont::Helvetica, size, "Hi")
        );
        assert_eq!(
            measure_text_width(StandardFont::Helvetica, size, ELLIPSIS),
            Pt::from_f32(10.0)
        );
    }

    #[test]
    fn truncation_keeps_fitting_text_and_shortens_long_text() {
        let size = Pt::from_f32(9.0);
        let font = StandardFont::Helvetica;
        assert_eq!(truncate_with_ellipsis(font, size, "Acme", Pt::from_f32(100.0)), "Acme");

        let long = "Northwest Regional Industrial Equipment Holdings LLC";
        let max = Pt::from_f32(80.0);
        let out = truncate_with_ellipsis(font, size, long, max);
        assert!(out.ends_with(ELLIPSIS));
        assert!(measure_text_width(font, size, &out) <= max);
        let stem = out.trim_end_matches(ELLIPSIS);
        assert!(long.starts_with(stem));

        // One more character would not fit.
        let next_len = stem.len() + 1;
        let longer = format!("{}{}", &long[..next_len].trim_end(), ELLIPSIS);
        assert!(longer == out || measure_text_width(font, size, &longer) > max);
    }

    #[test]
    fn truncation_handles_multibyte_text() {
        let out = truncate_with_ellipsis(
            StandardFont::Helvetica,
            Pt::from_f32(10.0),
            "Café Müller Gäste Straße",
            Pt::from_f32(40.0),
        );
        assert!(out.ends_with(ELLIPSIS));
    }

    #[test]
    fn wrap_breaks_on_words_and_splits_oversized_words() {
        let size = Pt::from_f32(10.0);
        let lines = wrap_text(
            StandardFont::Helvetica,
            size,
            "one two three four five six",
            Pt::from_f32(60.0),
        );
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(measure_text_width(StandardFont::Helvetica, size, line) <= Pt::from_f32(60.0));
        }
        assert_eq!(lines.join(" "), "one two three four five six");

        let lines = wrap_text(StandardFont::Helvetica, size, "WWWWWWWWWW", Pt::from_f32(30.0));
        assert!(lines.len() >= 3);
        assert_eq!(lines.concat(), "WWWWWWWWWW");
    }
}
