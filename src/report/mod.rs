//! Report builders.
//!
//! Each report turns typed records into [`RenderRow`](crate::table::RenderRow)s
//! and a [`TableLayout`] (or, for the revenue card, a command list) without
//! touching fonts for anything but width measurement, then hands the result
//! to a [`Canvas`] for rasterization.

pub mod live_list;
pub mod ranking;
pub mod revenue_card;
pub mod sessions;
pub mod super_chat;

use crate::canvas::Canvas;
use crate::error::RenderError;
use crate::font::FontRegistry;
use crate::model::format_timestamp;
use crate::table::TableLayout;
use crate::types::Color;
use chrono::NaiveDateTime;

pub const HEADER_H: i32 = 160;
pub const TABLE_BOTTOM_PADDING: i32 = 40;
pub const CANVAS_RADIUS: i32 = 35;
pub const FOOTER_X_FROM_RIGHT: i32 = 220;
pub const NOTE_X: i32 = 20;
pub const NOTE_Y_FIRST: i32 = 90;
pub const NOTE_Y_SECOND: i32 = 120;
pub const TIP_X_OFFSET: i32 = 300;

// Per-request rendering inputs shared by every report.
#[derive(Clone, Copy)]
pub struct ReportContext<'a> {
    pub fonts: &'a FontRegistry,
    pub footer: &'a str,
    pub now: NaiveDateTime,
}

impl ReportContext<'_> {
    pub fn now_text(&self) -> String {
        format_timestamp(self.now)
    }
}

// White rounded card sized to the table, footer right-aligned under it.
pub(crate) fn render_table(ctx: &ReportContext<'_>, layout: &TableLayout) -> Result<String, RenderError> {
    let width = layout.width.max(1);
    let height = layout.height + TABLE_BOTTOM_PADDING;
    let mut canvas = Canvas::new(ctx.fonts, width as u32, height as u32)?;
    canvas.draw_rounded_rectangle(0, 0, width, height, CANVAS_RADIUS, Color::WHITE);
    canvas.execute(&layout.commands);
    canvas.set_pos(width - FOOTER_X_FROM_RIGHT, height - TABLE_BOTTOM_PADDING);
    canvas.draw_text_right(0, ctx.footer, Color::GRAY, 0);
    canvas.to_base64()
}


#[cfg(test)]
mod tests {
    use super::testing::{at, decode};
    use super::*;
    use crate::font::testing::system_registry;
    use crate::table::{Column, TitleBlock, layout_table};

    #[test]
    fn table_image_is_cropped_to_table() {
        let Some(fonts) = system_registry() else {
            return;
        };
        let ctx = ReportContext {
            fonts: &fonts,
            footer: "Designed by QianQiuZy",
            now: at("2025-09-01 08:00:00"),
        };
        let columns = [Column::new(300, "主播名称"), Column::new(200, "总计")];
        let layout = layout_table(&TitleBlock::new("T", HEADER_H), &columns, &[], 0, None, "（无记录）");
        let image = decode(&render_table(&ctx, &layout).unwrap());
        assert_eq!(image.width(), 540);
        assert_eq!(image.height(), (160 + 60 + 60 + 40) as u32);
        // Rounded outer corner stays transparent, the header band is blue.
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(image.get_pixel(300, 165).0, [0, 191, 255, 255]);
    }
}
