use crate::error::RenderError;
use crate::font::FontRegistry;
use crate::measure::TextMeasure;
use crate::raster;
use crate::script::split_runs;
use crate::types::{Color, FontFace, Point, TextSegment};
use tiny_skia::Pixmap;

pub const DEFAULT_ROW_SPACE: i32 = 25;
pub const AUTO_SIZE_MARGIN: i32 = 10;

// Recorded by the layout engine, replayed by `Canvas::execute`.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FillRoundedRect {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        radius: i32,
        color: Color,
    },
    DrawText {
        x: i32,
        y: i32,
        segments: Vec<TextSegment>,
    },
}

/// A fixed-width drawing surface with a persistent text cursor.
///
/// Canvases are allocated at an upper-bound height, drawn top-down and then
/// cropped by [`Canvas::finalize`] to the cursor's final y. Methods that move
/// the cursor say so.
pub struct Canvas<'a> {
    fonts: &'a FontRegistry,
    pixmap: Pixmap,
    cursor: Point,
    row_space: i32,
    bottom_band: Option<Pixmap>,
}

impl<'a> Canvas<'a> {
    pub fn new(fonts: &'a FontRegistry, width: u32, height: u32) -> Result<Self, RenderError> {
        Ok(Self {
            fonts,
            pixmap: raster::new_pixmap(width, height)?,
            cursor: Point::ORIGIN,
            row_space: DEFAULT_ROW_SPACE,
            bottom_band: None,
        })
    }

    pub fn width(&self) -> i32 {
        self.pixmap.width() as i32
    }

    pub fn height(&self) -> i32 {
        self.pixmap.height() as i32
    }

    pub fn pos(&self) -> Point {
        self.cursor
    }

    pub fn set_pos(&mut self, x: i32, y: i32) {
        self.cursor = Point::new(x, y);
    }

    pub fn move_pos(&mut self, dx: i32, dy: i32) {
        self.cursor = Point::new(self.cursor.x + dx, self.cursor.y + dy);
    }

    pub fn set_row_space(&mut self, row_space: i32) {
        self.row_space = row_space;
    }

    pub fn line_advance(&self) -> i32 {
        self.fonts.text_font_size() + self.row_space
    }

    /// Draws `segments` left to right from the cursor.
    ///
    /// Afterwards the cursor returns to its starting x and moves down by one
    /// text line plus the row spacing.
    pub fn draw_text(&mut self, segments: &[TextSegment]) {
        let Point { x, y } = self.cursor;
        self.draw_segments(segments, x, y);
        self.cursor = Point::new(x, y + self.line_advance());
    }

    /// Draws `segments` at `(x, y)`. The cursor is not touched.
    pub fn draw_text_at(&mut self, segments: &[TextSegment], x: i32, y: i32) {
        self.draw_segments(segments, x, y);
    }

    /// Right-aligns `text` against `width - margin_right`.
    ///
    /// The line is drawn at the cursor's y, pushed down to at least
    /// `min_y + AUTO_SIZE_MARGIN`. Afterwards the cursor's y sits one text
    /// line plus the row spacing below the drawn line; x is unchanged.
    pub fn draw_text_right(&mut self, margin_right: i32, text: &str, color: Color, min_y: i32) {
        let text_width = self.fonts.measure_with_fallback(text);
        let x = self.width() - margin_right - text_width;
        let y = self.cursor.y.max(min_y + AUTO_SIZE_MARGIN);
        self.draw_segments(&[TextSegment::new(text, color)], x, y);
        self.cursor.y = y + self.line_advance();
    }

    pub fn draw_rounded_rectangle(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        radius: i32,
        color: Color,
    ) {
        raster::fill_rounded_rect(
            &mut self.pixmap,
            x as f32,
            y as f32,
            width as f32,
            height as f32,
            radius as f32,
            color,
        );
    }

    pub fn execute(&mut self, commands: &[Command]) {
        for command in commands {
            match command {
                Command::FillRoundedRect {
                    x,
                    y,
                    width,
                    height,
                    radius,
                    color,
                } => self.draw_rounded_rectangle(*x, *y, *width, *height, *radius, *color),
                Command::DrawText { x, y, segments } => self.draw_segments(segments, *x, *y),
            }
        }
    }

    /// Captures the bottom `height` rows of the allocated canvas so that
    /// `finalize` can pin them below the content. Call this before drawing
    /// variable-height content.
    pub fn copy_bottom(&mut self, height: i32) -> Result<(), RenderError> {
        let height = height.clamp(1, self.height()) as u32;
        let y = self.pixmap.height() - height;
        self.bottom_band = Some(raster::crop(&self.pixmap, y, height)?);
        Ok(())
    }

    /// Crops the canvas to the cursor's y.
    ///
    /// With a captured bottom band the image is `cursor.y + band height` tall
    /// and the band is pasted at `cursor.y`; without one the height is clamped
    /// to `[1, allocated height]`.
    pub fn finalize(self) -> Result<Pixmap, RenderError> {
        let content = self.cursor.y.max(0) as u32;
        match self.bottom_band {
            Some(band) => {
                let total = content.saturating_add(band.height()).max(1);
                let mut out = if total <= self.pixmap.height() {
                    raster::crop(&self.pixmap, 0, total)?
                } else {
                    raster::extend_to(&self.pixmap, total)?
                };
                raster::paste(&mut out, &band, content as i32);
                Ok(out)
            }
            None => {
                let height = content.clamp(1, self.pixmap.height());
                raster::crop(&self.pixmap, 0, height)
            }
        }
    }

    pub fn encode_png(self) -> Result<Vec<u8>, RenderError> {
        raster::encode_png(&self.finalize()?)
    }

    pub fn to_base64(self) -> Result<String, RenderError> {
        Ok(raster::to_base64(&self.encode_png()?))
    }

    fn draw_segments(&mut self, segments: &[TextSegment], x: i32, y: i32) {
        let mut pen_x = x;
        for segment in segments {
            for run in split_runs(&segment.text) {
                let face = if run.special {
                    FontFace::Emoji
                } else {
                    segment.face
                };
                raster::draw_string(
                    &mut self.pixmap,
                    self.fonts.resolve(face),
                    run.text,
                    pen_x as f32,
                    y as f32,
                    segment.color,
                );
                pen_x += self.fonts.measure(run.text, face);
            }
        }
    }
}
