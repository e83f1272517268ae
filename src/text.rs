use crate::measure::TextMeasure;

pub const ELLIPSIS: &str = "…";
pub const MSG_MAX_CHARS_PER_LINE: usize = 20;
pub const UNAME_MAX_UNITS: f32 = 12.0;

// Collapses every whitespace run, newlines included, to one space.
pub fn clean_message(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Hard wrap by character count; not word aware.
pub fn wrap_by_chars(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() || max_chars == 0 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Truncates `text` so its measured width, ellipsis included, is at most
/// `max_px`. Text that already fits is returned unchanged; when not even the
/// ellipsis fits the result is empty.
pub fn limit_by_pixels<M: TextMeasure + ?Sized>(measure: &M, text: &str, max_px: i32) -> String {
    if text.is_empty() || measure.measure_with_fallback(text) <= max_px {
        return text.to_string();
    }
    let ellipsis_px = measure.measure_with_fallback(ELLIPSIS);
    if ellipsis_px > max_px {
        return String::new();
    }

    let mut kept = String::new();
    for ch in text.chars() {
        kept.push(ch);
        if measure.measure_with_fallback(&kept) + ellipsis_px > max_px {
            kept.pop();
            break;
        }
    }
    // Shaping can make the joined string wider than its parts.
    loop {
        let candidate = format!("{kept}{ELLIPSIS}");
        if kept.is_empty() || measure.measure_with_fallback(&candidate) <= max_px {
            return candidate;
        }
        kept.pop();
    }
}

fn visual_units(ch: char) -> f32 {
    if ch.is_ascii() { 0.5 } else { 1.0 }
}

// ASCII counts half a unit, everything else one; the ellipsis costs one.
pub fn limit_uname_visual(uname: &str, max_units: f32) -> String {
    let mut units = 0.0f32;
    let mut kept: Vec<char> = Vec::new();
    let mut truncated = false;
    for ch in uname.chars() {
        let w = visual_units(ch);
        if units + w > max_units {
            truncated = true;
            break;
        }
        kept.push(ch);
        units += w;
    }
    if !truncated {
        return uname.to_string();
    }
    while units + 1.0 > max_units {
        let Some(last) = kept.pop() else {
            break;
        };
        units -= visual_units(last);
    }
    let mut out: String = kept.into_iter().collect();
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::testing::Monospace;

    #[test]
    fn clean_message_collapses_whitespace() {
        assert_eq!(clean_message("  感谢\n\n老板\t 的SC \r\n"), "感谢 老板 的SC");
        assert_eq!(clean_message(""), "");
        assert_eq!(clean_message(" \n "), "");
    }

    #[test]
    fn wrap_by_chars_splits_on_char_boundaries() {
        assert_eq!(wrap_by_chars("", 20), vec![String::new()]);
        assert_eq!(wrap_by_chars("abc", 20), vec!["abc".to_string()]);
        let text: String = "一二三四五".repeat(5);
        let lines = wrap_by_chars(&text, 20);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].chars().count(), 20);
        assert_eq!(lines[1], "一二三四五");
    }

    #[test]
    fn fitting_text_is_unchanged() {
        let m = Monospace(10);
        assert_eq!(limit_by_pixels(&m, "hello", 50), "hello");
        assert_eq!(limit_by_pixels(&m, "", 0), "");
    }

    #[test]
    fn long_text_is_cut_with_ellipsis() {
        let m = Monospace(10);
        let out = limit_by_pixels(&m, "abcdefghij", 55);
        assert_eq!(out, "abcd…");
        assert!(m.measure_with_fallback(&out) <= 55);
    }

    #[test]
    fn truncation_is_idempotent() {
        let m = Monospace(13);
        for budget in [0, 5, 13, 26, 40, 100, 580] {
            let text = "直播标题🎉 with some latin and more words";
            let once = limit_by_pixels(&m, text, budget);
            let twice = limit_by_pixels(&m, &once, budget);
            assert_eq!(once, twice, "budget {budget}");
            assert!(m.measure_with_fallback(&once) <= budget, "budget {budget}");
        }
    }

    #[test]
    fn ellipsis_alone_or_nothing() {
        let m = Monospace(10);
        assert_eq!(limit_by_pixels(&m, "abc", 10), "…");
        assert_eq!(limit_by_pixels(&m, "abc", 9), "");
    }

    #[test]
    fn uname_within_budget_is_unchanged() {
        assert_eq!(limit_uname_visual("abcdefghijklmnopqrstuvwx", 12.0).len(), 24);
        assert_eq!(limit_uname_visual("十二个汉字十二个汉字十二", 12.0).chars().count(), 12);
    }

    #[test]
    fn uname_over_budget_reserves_ellipsis() {
        let out = limit_uname_visual("十三个汉字十三个汉字十三个", 12.0);
        assert_eq!(out, "十三个汉字十三个汉字十…");

        let out = limit_uname_visual("abcdefghijklmnopqrstuvwxyz", 12.0);
        assert_eq!(out, "abcdefghijklmnopqrstuv…");
    }
}
