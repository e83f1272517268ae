use crate::script::split_runs;
use crate::types::FontFace;
use rustybuzz::{Face as HbFace, UnicodeBuffer};
use ttf_parser::Face;

pub const CHAR_COUNT_FALLBACK_PX: f32 = 10.0;

pub trait TextMeasure {
    fn measure(&self, text: &str, face: FontFace) -> i32;

    // Emoji runs use the emoji face, everything else the regular face.
    fn measure_with_fallback(&self, text: &str) -> i32 {
        split_runs(text)
            .map(|run| {
                let face = if run.special {
                    FontFace::Emoji
                } else {
                    FontFace::Regular
                };
                self.measure(run.text, face)
            })
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureStrategy {
    // Shaped advances, kerning and ligatures included.
    Shaped,
    // Raw per-glyph horizontal advances; loses kerning and ligatures.
    Advance,
    // Glyph bounding boxes; loses side bearings, blank glyphs count as half an em.
    BoundingBox,
    // Fixed width per char; loses everything but never fails.
    CharCount,
}

pub const MEASURE_CHAIN: [MeasureStrategy; 4] = [
    MeasureStrategy::Shaped,
    MeasureStrategy::Advance,
    MeasureStrategy::BoundingBox,
    MeasureStrategy::CharCount,
];

impl MeasureStrategy {
    pub fn measure(self, font_data: &[u8], text: &str, font_size: f32) -> Option<f32> {
        match self {
            MeasureStrategy::Shaped => shaped_width(font_data, text, font_size),
            MeasureStrategy::Advance => advance_width(font_data, text, font_size),
            MeasureStrategy::BoundingBox => bbox_width(font_data, text, font_size),
            MeasureStrategy::CharCount => {
                Some(text.chars().count() as f32 * CHAR_COUNT_FALLBACK_PX)
            }
        }
    }
}

pub fn measure_with_chain(
    chain: &[MeasureStrategy],
    font_data: &[u8],
    text: &str,
    font_size: f32,
) -> (i32, MeasureStrategy) {
    if text.is_empty() {
        return (0, MeasureStrategy::Shaped);
    }
    for strategy in chain {
        if let Some(width) = strategy.measure(font_data, text, font_size) {
            if width.is_finite() {
                return (width.max(0.0) as i32, *strategy);
            }
        }
    }
    let width = MeasureStrategy::CharCount
        .measure(font_data, text, font_size)
        .unwrap_or(0.0);
    (width as i32, MeasureStrategy::CharCount)
}

fn shaped_width(font_data: &[u8], text: &str, font_size: f32) -> Option<f32> {
    let face = HbFace::from_slice(font_data, 0)?;
    let units_per_em = face.units_per_em().max(1) as f32;
    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    let output = rustybuzz::shape(&face, &[], buffer);
    let infos = output.glyph_infos();
    let positions = output.glyph_positions();
    if positions.is_empty() {
        return None;
    }
    // Unmapped glyphs mean the face cannot answer for this text.
    if infos.iter().all(|info| info.glyph_id == 0) {
        return None;
    }
    let units: i64 = positions.iter().map(|pos| pos.x_advance as i64).sum();
    Some(units as f32 * font_size / units_per_em)
}

fn advance_width(font_data: &[u8], text: &str, font_size: f32) -> Option<f32> {
    let face = Face::parse(font_data, 0).ok()?;
    let scale = font_size / face.units_per_em().max(1) as f32;
    let mut total = 0.0f32;
    for ch in text.chars() {
        let gid = face.glyph_index(ch)?;
        total += face.glyph_hor_advance(gid)? as f32 * scale;
    }
    Some(total)
}

fn bbox_width(font_data: &[u8], text: &str, font_size: f32) -> Option<f32> {
    let face = Face::parse(font_data, 0).ok()?;
    let scale = font_size / face.units_per_em().max(1) as f32;
    let mut total = 0.0f32;
    let mut boxed = 0usize;
    for ch in text.chars() {
        let bbox = face
            .glyph_index(ch)
            .and_then(|gid| face.glyph_bounding_box(gid));
        match bbox {
            Some(rect) => {
                total += (rect.x_max - rect.x_min) as f32 * scale;
                boxed += 1;
            }
            None => total += font_size * 0.5,
        }
    }
    if boxed == 0 {
        return None;
    }
    Some(total)
}
