use super::{HEADER_H, NOTE_X, NOTE_Y_FIRST, NOTE_Y_SECOND, ReportContext, render_table};
use crate::error::RenderError;
use crate::format::{format_money, seconds_to_hms};
use crate::measure::TextMeasure;
use crate::model::{SessionRecord, SessionTotals};
use crate::table::{CELL_PADDING, Cell, Column, RenderRow, TableLayout, TitleBlock, layout_table};
use crate::text::limit_by_pixels;
use chrono::NaiveDateTime;

pub const NO_SESSIONS: &str = "（无记录）";

const TITLE_COLUMN_WIDTH: i32 = 600;

pub const COLUMNS: [Column; 13] = [
    Column::new(350, "开播时间"),
    Column::new(350, "下播时间"),
    Column::new(200, "本场直播时间"),
    Column::new(120, "弹幕数"),
    Column::new(150, "平均同接"),
    Column::new(150, "最高同接"),
    Column::new(TITLE_COLUMN_WIDTH, "本场直播标题"),
    Column::new(100, "盲盒数"),
    Column::new(120, "盲盒盈亏"),
    Column::new(150, "礼物"),
    Column::new(150, "舰长"),
    Column::new(150, "SC"),
    Column::new(200, "总计"),
];

pub fn session_row<M: TextMeasure + ?Sized>(
    measure: &M,
    session: &SessionRecord,
    now: NaiveDateTime,
) -> RenderRow {
    let title_px = TITLE_COLUMN_WIDTH - 2 * CELL_PADDING;
    RenderRow::new(vec![
        Cell::text(session.start_display()),
        Cell::text(session.end_display()),
        Cell::text(seconds_to_hms(session.duration_seconds(now))),
        Cell::text(session.danmaku_count.to_string()),
        Cell::text(session.avg_concurrency_rounded().to_string()),
        Cell::text(session.max_concurrency.to_string()),
        Cell::text(limit_by_pixels(measure, &session.title, title_px)),
        Cell::text(session.blind_box_count.to_string()),
        Cell::text(format_money(session.blind_box_profit)),
        Cell::text(format_money(session.gift)),
        Cell::text(format_money(session.guard)),
        Cell::text(format_money(session.super_chat)),
        Cell::text(format_money(session.subtotal())),
    ])
}

// Concurrency has no meaningful sum, so those columns stay blank.
pub fn summary_row(totals: &SessionTotals) -> RenderRow {
    RenderRow::summary(vec![
        Cell::text(format!("场次：{}", totals.count)),
        Cell::blank(),
        Cell::text(seconds_to_hms(totals.seconds)),
        Cell::text(totals.danmaku.to_string()),
        Cell::blank(),
        Cell::blank(),
        Cell::blank(),
        Cell::text(totals.blind_box_count.to_string()),
        Cell::text(format_money(totals.blind_box_profit)),
        Cell::text(format_money(totals.gift)),
        Cell::text(format_money(totals.guard)),
        Cell::text(format_money(totals.super_chat)),
        Cell::text(format_money(totals.sum)),
    ])
}

pub fn title_block(anchor: &str, period_label: &str, room_id: &str, now_text: &str) -> TitleBlock {
    TitleBlock::new(format!("{anchor}{period_label}直播情况"), HEADER_H)
        .note(NOTE_X, NOTE_Y_FIRST, format!("房间号：{room_id}"))
        .note(NOTE_X, NOTE_Y_SECOND, format!("查询时间：{now_text}"))
}

/// Lays out one row per session followed by a totals row. With no sessions
/// only the placeholder row is drawn and the totals row is left out.
pub fn layout_sessions<M: TextMeasure + ?Sized>(
    measure: &M,
    block: &TitleBlock,
    sessions: &[SessionRecord],
    now: NaiveDateTime,
) -> TableLayout {
    let rows: Vec<RenderRow> = sessions
        .iter()
        .map(|s| session_row(measure, s, now))
        .collect();
    let summary = (!sessions.is_empty()).then(|| summary_row(&SessionTotals::of(sessions, now)));
    layout_table(block, &COLUMNS, &rows, 0, summary.as_ref(), NO_SESSIONS)
}

pub fn render_sessions(
    ctx: &ReportContext<'_>,
    anchor: &str,
    period_label: &str,
    room_id: &str,
    sessions: &[SessionRecord],
) -> Result<String, RenderError> {
    let block = title_block(anchor, period_label, room_id, &ctx.now_text());
    let layout = layout_sessions(ctx.fonts, &block, sessions, ctx.now);
    render_table(ctx, &layout)
}
