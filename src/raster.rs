use crate::error::RenderError;
use crate::font::RegisteredFont;
use crate::types::Color;
use base64::Engine;
use rustybuzz::{Face as HbFace, UnicodeBuffer};
use tiny_skia::{
    BlendMode, FillRule, FilterQuality, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Rect, Transform,
};
use ttf_parser::{GlyphId, OutlineBuilder, RasterImageFormat};

pub(crate) fn new_pixmap(width: u32, height: u32) -> Result<Pixmap, RenderError> {
    Pixmap::new(width, height).ok_or_else(|| {
        RenderError::Canvas(format!("invalid raster size {width}x{height}"))
    })
}

pub(crate) fn fill_rounded_rect(
    pixmap: &mut Pixmap,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    radius: f32,
    color: Color,
) {
    if width <= 0.0 || height <= 0.0 {
        return;
    }
    let paint = fill_paint(color);
    if radius <= 0.0 {
        if let Some(rect) = Rect::from_xywh(x, y, width, height) {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
        return;
    }
    let Some(path) = rounded_rect_path(x, y, width, height, radius) else {
        return;
    };
    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
}

fn rounded_rect_path(x: f32, y: f32, width: f32, height: f32, radius: f32) -> Option<Path> {
    let r = radius.min(width / 2.0).min(height / 2.0);
    let k = 0.55228475;
    let c = r * k;
    let right = x + width;
    let bottom = y + height;

    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(right - r, y);
    pb.cubic_to(right - r + c, y, right, y + r - c, right, y + r);
    pb.line_to(right, bottom - r);
    pb.cubic_to(right, bottom - r + c, right - r + c, bottom, right - r, bottom);
    pb.line_to(x + r, bottom);
    pb.cubic_to(x + r - c, bottom, x, bottom - r + c, x, bottom - r);
    pb.line_to(x, y + r);
    pb.cubic_to(x, y + r - c, x + r - c, y, x + r, y);
    pb.close();
    pb.finish()
}

// Draws `text` with its top edge at `top`; the baseline sits one ascender
// below. Returns the number of glyph outlines filled.
pub(crate) fn draw_string(
    pixmap: &mut Pixmap,
    font: &RegisteredFont,
    text: &str,
    x: f32,
    top: f32,
    color: Color,
) -> usize {
    if text.is_empty() {
        return 0;
    }
    let Ok(face) = ttf_parser::Face::parse(&font.data, 0) else {
        return 0;
    };
    let baseline_y = top + font.ascender;
    let paint = fill_paint(color);
    let mut drawn = 0usize;
    for placement in layout_text_glyphs(&font.data, text, font.size, x, baseline_y) {
        let gid = GlyphId(placement.glyph_id);
        let mut builder =
            GlyphPathBuilder::new(placement.origin_x, placement.origin_y, placement.scale);
        if face.outline_glyph(gid, &mut builder).is_none() {
            // Color emoji faces carry PNG strikes instead of outlines.
            if draw_bitmap_glyph(pixmap, &face, gid, font.size, placement) {
                drawn += 1;
            }
            continue;
        }
        let Some(path) = builder.finish() else {
            continue;
        };
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        drawn += 1;
    }
    drawn
}

fn draw_bitmap_glyph(
    pixmap: &mut Pixmap,
    face: &ttf_parser::Face<'_>,
    gid: GlyphId,
    font_size: f32,
    placement: GlyphPlacement,
) -> bool {
    let ppem = font_size.round().clamp(1.0, u16::MAX as f32) as u16;
    let Some(raster) = face.glyph_raster_image(gid, ppem) else {
        return false;
    };
    if raster.format != RasterImageFormat::PNG || raster.pixels_per_em == 0 {
        return false;
    }
    let Some(image) = decode_png_to_pixmap(raster.data) else {
        return false;
    };
    let scale = font_size / raster.pixels_per_em as f32;
    let left = placement.origin_x + raster.x as f32 * scale;
    let top = placement.origin_y - (raster.y as f32 + raster.height as f32) * scale;
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(
        0,
        0,
        image.as_ref(),
        &paint,
        Transform::from_row(scale, 0.0, 0.0, scale, left, top),
        None,
    );
    true
}

fn decode_png_to_pixmap(data: &[u8]) -> Option<Pixmap> {
    let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Png).ok()?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixmap = Pixmap::new(width, height)?;
    for (src_px, dst_px) in rgba
        .as_raw()
        .chunks_exact(4)
        .zip(pixmap.data_mut().chunks_exact_mut(4))
    {
        let a = src_px[3];
        dst_px[0] = premul_u8(src_px[0], a);
        dst_px[1] = premul_u8(src_px[1], a);
        dst_px[2] = premul_u8(src_px[2], a);
        dst_px[3] = a;
    }
    Some(pixmap)
}

fn premul_u8(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

pub(crate) fn crop(pixmap: &Pixmap, y: u32, height: u32) -> Result<Pixmap, RenderError> {
    if y.saturating_add(height) > pixmap.height() {
        return Err(RenderError::Canvas(format!(
            "crop {y}+{height} outside canvas of height {}",
            pixmap.height()
        )));
    }
    let rect = tiny_skia::IntRect::from_xywh(0, y as i32, pixmap.width(), height)
        .ok_or_else(|| RenderError::Canvas(format!("invalid crop height {height}")))?;
    pixmap
        .clone_rect(rect)
        .ok_or_else(|| RenderError::Canvas(format!("crop {rect:?} outside canvas")))
}

// Copies the top `height` rows of `source` into a new pixmap of `height`
// rows, padding with transparency when the source is shorter.
pub(crate) fn extend_to(source: &Pixmap, height: u32) -> Result<Pixmap, RenderError> {
    let mut out = new_pixmap(source.width(), height)?;
    out.draw_pixmap(
        0,
        0,
        source.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    Ok(out)
}

// Replaces the covered pixels, transparency included.
pub(crate) fn paste(target: &mut Pixmap, source: &Pixmap, y: i32) {
    let paint = PixmapPaint {
        blend_mode: BlendMode::Source,
        ..PixmapPaint::default()
    };
    target.draw_pixmap(
        0,
        y,
        source.as_ref(),
        &paint,
        Transform::identity(),
        None,
    );
}

pub(crate) fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, RenderError> {
    pixmap
        .encode_png()
        .map_err(|e| RenderError::Encode(e.to_string()))
}

pub(crate) fn to_base64(png: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(png)
}

#[derive(Clone, Copy)]
struct GlyphPlacement {
    glyph_id: u16,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

fn layout_text_glyphs(
    font_data: &[u8],
    text: &str,
    font_size: f32,
    baseline_x: f32,
    baseline_y: f32,
) -> Vec<GlyphPlacement> {
    let Some(face) = HbFace::from_slice(font_data, 0) else {
        return layout_text_glyphs_unshaped(font_data, text, font_size, baseline_x, baseline_y);
    };
    let hb_units = face.units_per_em().max(1) as f32;
    let scale = font_size / hb_units;
    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    let output = rustybuzz::shape(&face, &[], buffer);
    let infos = output.glyph_infos();
    let positions = output.glyph_positions();
    if infos.is_empty() || infos.len() != positions.len() {
        return layout_text_glyphs_unshaped(font_data, text, font_size, baseline_x, baseline_y);
    }

    let mut out = Vec::with_capacity(infos.len());
    let mut pen_x = 0.0f32;
    for (info, pos) in infos.iter().zip(positions.iter()) {
        let gid = info.glyph_id as u16;
        let advance = pos.x_advance as f32 * scale;
        if gid != 0 {
            out.push(GlyphPlacement {
                glyph_id: gid,
                origin_x: baseline_x + pen_x + pos.x_offset as f32 * scale,
                // Font units grow upwards, pixmap rows grow downwards.
                origin_y: baseline_y - pos.y_offset as f32 * scale,
                scale,
            });
        }
        pen_x += advance;
    }
    out
}

fn layout_text_glyphs_unshaped(
    font_data: &[u8],
    text: &str,
    font_size: f32,
    baseline_x: f32,
    baseline_y: f32,
) -> Vec<GlyphPlacement> {
    let Ok(face) = ttf_parser::Face::parse(font_data, 0) else {
        return Vec::new();
    };
    let scale = font_size / face.units_per_em().max(1) as f32;

    let mut out = Vec::new();
    let mut pen_x = 0.0f32;
    for ch in text.chars() {
        let gid = face.glyph_index(ch).map(|id| id.0).unwrap_or(0);
        if gid == 0 {
            pen_x += font_size * 0.5;
            continue;
        }
        out.push(GlyphPlacement {
            glyph_id: gid,
            origin_x: baseline_x + pen_x,
            origin_y: baseline_y,
            scale,
        });
        let mut adv = face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0) as f32 * scale;
        if adv <= 0.0 {
            adv = font_size * 0.5;
        }
        pen_x += adv;
    }
    out
}

struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn px(&self, x: f32) -> f32 {
        self.origin_x + x * self.scale
    }

    fn py(&self, y: f32) -> f32 {
        self.origin_y - y * self.scale
    }

    fn finish(self) -> Option<Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = (self.px(x), self.py(y));
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = (self.px(x), self.py(y));
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1, x, y) = (self.px(x1), self.py(y1), self.px(x), self.py(y));
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = (self.px(x1), self.py(y1));
        let (x2, y2) = (self.px(x2), self.py(y2));
        let (x, y) = (self.px(x), self.py(y));
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

fn fill_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_sk());
    paint.anti_alias = true;
    paint
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(pixmap: &Pixmap, x: u32, y: u32) -> (u8, u8, u8, u8) {
        let p = pixmap.pixel(x, y).unwrap().demultiply();
        (p.red(), p.green(), p.blue(), p.alpha())
    }

    #[test]
    fn zero_radius_fills_corners() {
        let mut pixmap = new_pixmap(20, 20).unwrap();
        fill_rounded_rect(&mut pixmap, 0.0, 0.0, 20.0, 20.0, 0.0, Color::DEEPSKYBLUE);
        assert_eq!(pixel(&pixmap, 0, 0), (0, 191, 255, 255));
        assert_eq!(pixel(&pixmap, 19, 19), (0, 191, 255, 255));
    }

    #[test]
    fn rounded_corners_stay_transparent() {
        let mut pixmap = new_pixmap(40, 40).unwrap();
        fill_rounded_rect(&mut pixmap, 0.0, 0.0, 40.0, 40.0, 12.0, Color::WHITE);
        assert_eq!(pixel(&pixmap, 0, 0).3, 0);
        assert_eq!(pixel(&pixmap, 20, 20), (255, 255, 255, 255));
    }

    #[test]
    fn crop_and_paste_keep_content() {
        let mut pixmap = new_pixmap(10, 30).unwrap();
        fill_rounded_rect(&mut pixmap, 0.0, 20.0, 10.0, 10.0, 0.0, Color::GRAY);
        let band = crop(&pixmap, 20, 10).unwrap();
        assert_eq!(band.height(), 10);
        assert_eq!(pixel(&band, 5, 5), (169, 169, 169, 255));

        let mut grown = extend_to(&pixmap, 50).unwrap();
        assert_eq!(grown.height(), 50);
        paste(&mut grown, &band, 40);
        assert_eq!(pixel(&grown, 5, 45), (169, 169, 169, 255));
        assert_eq!(pixel(&grown, 5, 35).3, 0);
    }

    #[test]
    fn paste_replaces_with_transparent_pixels() {
        let mut band = new_pixmap(40, 20).unwrap();
        fill_rounded_rect(&mut band, 0.0, -20.0, 40.0, 40.0, 12.0, Color::WHITE);
        assert_eq!(pixel(&band, 0, 19).3, 0);

        let mut target = new_pixmap(40, 60).unwrap();
        fill_rounded_rect(&mut target, 0.0, 0.0, 40.0, 60.0, 0.0, Color::GRAY);
        paste(&mut target, &band, 40);
        assert_eq!(pixel(&target, 0, 59).3, 0);
        assert_eq!(pixel(&target, 39, 59).3, 0);
        assert_eq!(pixel(&target, 20, 50), (255, 255, 255, 255));
        assert_eq!(pixel(&target, 0, 10), (169, 169, 169, 255));
    }

    #[test]
    fn crop_outside_canvas_is_an_error() {
        let pixmap = new_pixmap(10, 10).unwrap();
        assert!(matches!(crop(&pixmap, 5, 20), Err(RenderError::Canvas(_))));
    }

    #[test]
    fn premultiply_rounds_like_skia() {
        assert_eq!(premul_u8(255, 255), 255);
        assert_eq!(premul_u8(255, 0), 0);
        assert_eq!(premul_u8(200, 128), 100);
    }

    #[test]
    fn decodes_png_strike_into_pixmap() {
        let mut source = new_pixmap(3, 2).unwrap();
        fill_rounded_rect(&mut source, 0.0, 0.0, 3.0, 2.0, 0.0, Color::DEEPSKYBLUE);
        let png = encode_png(&source).unwrap();
        let decoded = decode_png_to_pixmap(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        assert_eq!(pixel(&decoded, 2, 1), (0, 191, 255, 255));
        assert!(decode_png_to_pixmap(b"not a png").is_none());
    }

    #[test]
    fn zero_sized_pixmap_is_rejected() {
        assert!(new_pixmap(0, 10).is_err());
    }

    #[test]
    fn png_encodes_and_base64_wraps() {
        let pixmap = new_pixmap(4, 4).unwrap();
        let png = encode_png(&pixmap).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert!(to_base64(&png).starts_with("iVBORw0KGgo"));
    }
}
