use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Display width in terminal cells.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate to at most `max_cells` cells, ending in `…` when anything was cut.
/// Never splits a grapheme cluster.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells == 0 {
        return String::new();
    }
    let budget = max_cells - 1;
    let mut width = 0;
    let mut out = String::new();
    for g in s.graphemes(true) {
        let gw = UnicodeWidthStr::width(g);
        if width + gw > budget {
            break;
        }
        width += gw;
        out.push_str(g);
    }
    out.push('\u{2026}');
    out
}

/// Left-align `s` in a column `cells` wide, truncating if it does not fit.
pub fn pad_to_width(s: &str, cells: usize) -> String {
    let fitted = truncate_to_width(s, cells);
    let pad = cells.saturating_sub(display_width(&fitted));
    format!("{}{}", fitted, " ".repeat(pad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_of_wide_chars() {
        assert_eq!(display_width("Dig"), 3);
        assert_eq!(display_width("設営"), 4);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(truncate_to_width("Dig", 5), "Dig");
        assert_eq!(truncate_to_width("Dig", 3), "Dig");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate_to_width("Foundation", 5), "Foun…");
        assert_eq!(truncate_to_width("Foundation", 1), "…");
        assert_eq!(truncate_to_width("Foundation", 0), "");
    }

    #[test]
    fn truncate_wide_never_overflows() {
        // each CJK char is 2 cells; 4 cells leaves room for one char + ellipsis
        assert_eq!(truncate_to_width("設営作業", 4), "設…");
    }

    #[test]
    fn truncate_keeps_graphemes_whole() {
        let word = "e\u{301}tage";
        assert_eq!(truncate_to_width(word, 2), "e\u{301}…");
    }

    #[test]
    fn pad_fills_column() {
        assert_eq!(pad_to_width("Dig", 6), "Dig   ");
        assert_eq!(pad_to_width("設営", 6), "設営  ");
        assert_eq!(pad_to_width("Foundation", 6), "Found…");
    }
}
