use super::{NOTE_X, NOTE_Y_FIRST, ReportContext, TIP_X_OFFSET, render_table};
use crate::error::RenderError;
use crate::format::seconds_to_hms;
use crate::measure::TextMeasure;
use crate::model::{RoomStatus, parse_timestamp};
use crate::table::{CELL_PADDING, Cell, Column, RenderRow, TableLayout, TitleBlock, layout_table};
use chrono::NaiveDateTime;

pub const LIVE_HEADER_H: i32 = 140;
pub const LIVE_TIP: &str = "仅列出当前正在直播的房间";
pub const NOBODY_LIVE: &str = "当前没有主播正在直播。";

const TITLE_COLUMN_WIDTH: i32 = 600;

pub const COLUMNS: [Column; 4] = [
    Column::new(350, "开播时间"),
    Column::new(300, "主播名称"),
    Column::new(200, "已开播时长"),
    Column::new(TITLE_COLUMN_WIDTH, "直播标题"),
];

// Live rooms only, latest start first. `live_time` is compared as text; the
// upstream format sorts lexically.
pub fn select_live(rooms: Vec<RoomStatus>) -> Vec<RoomStatus> {
    let mut live: Vec<RoomStatus> = rooms.into_iter().filter(RoomStatus::is_live).collect();
    live.sort_by(|a, b| b.live_time.cmp(&a.live_time));
    live
}

pub fn elapsed_since(live_time: &str, now: NaiveDateTime) -> String {
    match parse_timestamp(live_time) {
        Some(start) => seconds_to_hms((now - start).num_seconds()),
        None => seconds_to_hms(0),
    }
}

pub fn live_rows<M: TextMeasure + ?Sized>(
    measure: &M,
    rooms: &[RoomStatus],
    now: NaiveDateTime,
) -> Vec<RenderRow> {
    let title_px = TITLE_COLUMN_WIDTH - 2 * CELL_PADDING;
    rooms
        .iter()
        .map(|room| {
            RenderRow::new(vec![
                Cell::text(room.live_time.clone()),
                Cell::text(room.anchor_name.clone()),
                Cell::text(elapsed_since(&room.live_time, now)),
                Cell::text(crate::text::limit_by_pixels(measure, &room.title, title_px)),
            ])
        })
        .collect()
}

pub fn layout_live_list(title: &str, rows: &[RenderRow], now_text: &str) -> TableLayout {
    let block = TitleBlock::new(title, LIVE_HEADER_H)
        .note(NOTE_X, NOTE_Y_FIRST, now_text)
        .note(NOTE_X + TIP_X_OFFSET, NOTE_Y_FIRST, LIVE_TIP);
    layout_table(&block, &COLUMNS, rows, 0, None, "")
}

/// Renders the rooms currently live. `Ok(None)` means nobody is live and the
/// caller should answer with [`NOBODY_LIVE`] instead of an image.
pub fn render_live_list(
    ctx: &ReportContext<'_>,
    title: &str,
    rooms: Vec<RoomStatus>,
) -> Result<Option<String>, RenderError> {
    let live = select_live(rooms);
    if live.is_empty() {
        return Ok(None);
    }
    let rows = live_rows(ctx.fonts, &live, ctx.now);
    let layout = layout_live_list(title, &rows, &ctx.now_text());
    render_table(ctx, &layout).map(Some)
}
