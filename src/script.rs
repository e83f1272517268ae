use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

const VARIATION_SELECTOR_16: char = '\u{FE0F}';
const ZERO_WIDTH_JOINER: char = '\u{200D}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRun<'a> {
    pub text: &'a str,
    // Emoji, pictographs and flags; drawn with the emoji face.
    pub special: bool,
}

fn is_modifier(ch: char) -> bool {
    ch == VARIATION_SELECTOR_16 || ch == ZERO_WIDTH_JOINER
}

// Approximate: common emoji blocks plus the "other symbol" category. Misses are
// drawn with the regular face.
pub fn is_special_glyph(ch: char) -> bool {
    if is_modifier(ch) {
        return true;
    }
    let code = ch as u32;
    if matches!(
        code,
        0x1F300..=0x1FAFF | 0x2600..=0x27BF | 0x1F1E6..=0x1F1FF
    ) {
        return true;
    }
    ch.general_category() == GeneralCategory::OtherSymbol
}

pub fn split_runs(text: &str) -> RunSplitter<'_> {
    RunSplitter { text, pos: 0 }
}

pub struct RunSplitter<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for RunSplitter<'a> {
    type Item = TextRun<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.text[self.pos..];
        let mut chars = rest.char_indices();
        let (_, first) = chars.next()?;
        // A leading modifier opens a special run.
        let special = is_special_glyph(first);
        let mut end = rest.len();
        for (idx, ch) in chars {
            if is_modifier(ch) {
                continue;
            }
            if is_special_glyph(ch) != special {
                end = idx;
                break;
            }
        }
        let start = self.pos;
        self.pos += end;
        Some(TextRun {
            text: &self.text[start..start + end],
            special,
        })
    }
}
