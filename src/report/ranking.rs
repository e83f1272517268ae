use super::{HEADER_H, NOTE_X, NOTE_Y_FIRST, NOTE_Y_SECOND, ReportContext, TIP_X_OFFSET, render_table};
use crate::error::RenderError;
use crate::format::{format_count, format_duration, format_fans, format_money};
use crate::model::StatRecord;
use crate::period::MonthCode;
use crate::table::{Cell, Column, RenderRow, TableLayout, TitleBlock, layout_table};
use crate::types::Color;

pub const COLUMNS: [Column; 15] = [
    Column::new(300, "主播名称"),
    Column::new(140, "粉丝数"),
    Column::new(150, "直播状态"),
    Column::new(200, "直播时间"),
    Column::new(100, "有效天"),
    Column::new(90, "舰长"),
    Column::new(90, "提督"),
    Column::new(90, "总督"),
    Column::new(120, "粉丝团"),
    Column::new(100, "盲盒数"),
    Column::new(130, "盲盒盈亏"),
    Column::new(150, "礼物"),
    Column::new(150, "SC"),
    Column::new(150, "上舰"),
    Column::new(200, "总计"),
];

pub const RESET_NOTE: &str = "数据为每月1号开始统计，月底清零。";

// Descending by recomputed total; equal totals keep upstream order.
pub fn sort_by_total(records: &mut [StatRecord]) {
    records.sort_by(|a, b| b.total().total_cmp(&a.total()));
}

pub fn ranking_row(record: &StatRecord) -> RenderRow {
    let status = if record.is_live() {
        Cell::colored("直播中", Color::DEEPSKYBLUE)
    } else {
        Cell::text("未开播")
    };
    RenderRow::new(vec![
        Cell::text(record.anchor_name.clone()),
        Cell::text(format_fans(record.attention)),
        status,
        Cell::text(format_duration(&record.live_duration)),
        Cell::text(record.effective_days.clone()),
        Cell::text(format_count(record.guard_1)),
        Cell::text(format_count(record.guard_2)),
        Cell::text(format_count(record.guard_3)),
        Cell::text(format_count(record.fans_count)),
        Cell::text(format_count(record.blind_box_count)),
        Cell::text(format_money(record.blind_box_profit)),
        Cell::text(format_money(record.gift)),
        Cell::text(format_money(record.super_chat)),
        Cell::text(format_money(record.guard)),
        Cell::text(format_money(record.total())),
    ])
}

pub fn title_block(title: &str, month: MonthCode, now_text: &str) -> TitleBlock {
    TitleBlock::new(title, HEADER_H)
        .note(NOTE_X, NOTE_Y_FIRST, now_text)
        .note(NOTE_X + TIP_X_OFFSET, NOTE_Y_FIRST, RESET_NOTE)
        .note(NOTE_X, NOTE_Y_SECOND, format!("统计月份：{}", month.display()))
}

pub fn layout_ranking(
    title: &str,
    records: &mut [StatRecord],
    month: MonthCode,
    now_text: &str,
) -> TableLayout {
    sort_by_total(records);
    let rows: Vec<RenderRow> = records.iter().map(ranking_row).collect();
    layout_table(
        &title_block(title, month, now_text),
        &COLUMNS,
        &rows,
        0,
        None,
        "",
    )
}

pub fn render_ranking(
    ctx: &ReportContext<'_>,
    title: &str,
    records: &mut [StatRecord],
    month: MonthCode,
) -> Result<String, RenderError> {
    let layout = layout_ranking(title, records, month, &ctx.now_text());
    render_table(ctx, &layout)
}
