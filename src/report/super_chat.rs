use super::{HEADER_H, NOTE_X, NOTE_Y_FIRST, NOTE_Y_SECOND, ReportContext, TABLE_BOTTOM_PADDING, render_table};
use crate::error::RenderError;
use crate::model::{SuperChatEntry, sort_by_send_time};
use crate::paginate::{PageBudget, paginate};
use crate::period::MonthCode;
use crate::table::{BASE_ROW_H, Cell, Column, RenderRow, TableLayout, TitleBlock, layout_table};
use crate::text::{MSG_MAX_CHARS_PER_LINE, UNAME_MAX_UNITS, clean_message, limit_uname_visual, wrap_by_chars};

pub const NO_SUPER_CHATS: &str = "（本月暂无 SC 记录）";
pub const FORWARD_TITLE: &str = "查SC";

const UID_MAX_CHARS: usize = 16;
const PRICE_MAX_CHARS: usize = 5;

pub const COLUMNS: [Column; 5] = [
    Column::new(350, "发送时间"),
    Column::new(350, "发送人"),
    Column::new(300, "UID"),
    Column::new(100, "价格"),
    Column::new(700, "内容"),
];

fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

// Whole yuan, ties to even.
pub fn format_price(price: f64) -> String {
    let rounded = if price.is_finite() {
        price.round_ties_even() as i64
    } else {
        0
    };
    take_chars(&rounded.to_string(), PRICE_MAX_CHARS)
}

pub fn super_chat_row(entry: &SuperChatEntry) -> RenderRow {
    let message = wrap_by_chars(&clean_message(&entry.message), MSG_MAX_CHARS_PER_LINE);
    RenderRow::new(vec![
        Cell::text(entry.send_time.clone()),
        Cell::text(limit_uname_visual(&entry.uname, UNAME_MAX_UNITS)),
        Cell::text(take_chars(&entry.uid, UID_MAX_CHARS)),
        Cell::text(format_price(entry.price)),
        Cell::multiline(message),
    ])
}

pub fn page_budget(max_page_height: i32) -> PageBudget {
    PageBudget {
        max_page_height,
        header_height: HEADER_H,
        table_header_height: BASE_ROW_H,
        padding: TABLE_BOTTOM_PADDING,
    }
}

pub fn title_block(
    anchor: &str,
    month: MonthCode,
    room_id: &str,
    now_text: &str,
    total: usize,
    page_no: usize,
    page_count: usize,
) -> TitleBlock {
    let count = if total == 0 {
        "暂无记录".to_string()
    } else {
        format!("共 {total} 条")
    };
    TitleBlock::new(
        format!("{anchor} {} SC 记录（{page_no}/{page_count}）", month.display()),
        HEADER_H,
    )
    .note(NOTE_X, NOTE_Y_FIRST, format!("房间号：{room_id}"))
    .note(NOTE_X, NOTE_Y_SECOND, format!("查询时间：{now_text}  |  {count}"))
}

/// Sorts `entries` by send time and lays them out over as many pages as the
/// height budget needs. There is always at least one page.
pub fn layout_super_chats(
    anchor: &str,
    month: MonthCode,
    room_id: &str,
    now_text: &str,
    entries: &mut [SuperChatEntry],
    budget: PageBudget,
) -> Vec<TableLayout> {
    sort_by_send_time(entries);
    let rows: Vec<RenderRow> = entries.iter().map(super_chat_row).collect();
    let pages = paginate(&rows, budget);
    let page_count = pages.len();
    pages
        .iter()
        .enumerate()
        .map(|(idx, page)| {
            let block = title_block(
                anchor,
                month,
                room_id,
                now_text,
                rows.len(),
                idx + 1,
                page_count,
            );
            layout_table(
                &block,
                &COLUMNS,
                page.rows,
                page.start_index,
                None,
                NO_SUPER_CHATS,
            )
        })
        .collect()
}

pub fn render_super_chats(
    ctx: &ReportContext<'_>,
    anchor: &str,
    month: MonthCode,
    room_id: &str,
    entries: &mut [SuperChatEntry],
    max_page_height: i32,
) -> Result<Vec<String>, RenderError> {
    let layouts = layout_super_chats(
        anchor,
        month,
        room_id,
        &ctx.now_text(),
        entries,
        page_budget(max_page_height),
    );
    tracing::debug!(pages = layouts.len(), "super chat pages laid out");
    layouts
        .iter()
        .map(|layout| render_table(ctx, layout))
        .collect()
}
