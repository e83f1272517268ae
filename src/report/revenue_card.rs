use super::{CANVAS_RADIUS, ReportContext};
use crate::canvas::{Canvas, Command};
use crate::error::RenderError;
use crate::format::{format_duration_hours, format_money};
use crate::model::StatRecord;
use crate::period::MonthCode;
use crate::types::{Color, TextSegment};

pub const CARD_WIDTH: i32 = 720;
// Allocated height; the card is cropped to its content.
pub const CARD_MAX_HEIGHT: i32 = 8000;
pub const CARD_LEFT: i32 = 24;
pub const CARD_TOP: i32 = 24;
const FOOTER_BAND: i32 = 65;
const FOOTER_X_FROM_RIGHT: i32 = 260;
const FOOTER_OFFSET: i32 = 10;

fn separator() -> String {
    "—".repeat(60)
}

// What the card shows, already resolved from one merged monthly record.
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueCard {
    pub anchor: String,
    pub room_id: String,
    pub attention: i64,
    pub month: MonthCode,
    pub period_label: String,
    pub live_duration: String,
    pub effective_days: String,
    pub gift: f64,
    pub guard: f64,
    pub super_chat: f64,
}

impl RevenueCard {
    pub fn from_record(record: &StatRecord, month: MonthCode, current: MonthCode) -> Self {
        Self {
            anchor: record.anchor_name.clone(),
            room_id: if record.room_id.is_empty() {
                "0".to_string()
            } else {
                record.room_id.clone()
            },
            attention: record.attention,
            month,
            period_label: month.label(current),
            live_duration: record.live_duration.clone(),
            effective_days: record.effective_days.clone(),
            gift: record.gift,
            guard: record.guard,
            super_chat: record.super_chat,
        }
    }

    pub fn total(&self) -> f64 {
        self.gift + self.guard + self.super_chat
    }
}

fn line(y: i32, segments: Vec<TextSegment>) -> Command {
    Command::DrawText {
        x: CARD_LEFT,
        y,
        segments,
    }
}

fn labelled(label: impl Into<String>, value: impl Into<String>) -> Vec<TextSegment> {
    vec![
        TextSegment::new(label, Color::DEEPSKYBLUE),
        TextSegment::new(value, Color::BLACK),
    ]
}

/// Content lines of the card and the y just below the last one.
pub fn card_commands(card: &RevenueCard, now_text: &str) -> (Vec<Command>, i32) {
    let label = &card.period_label;
    let days = if card.effective_days.is_empty() {
        "0"
    } else {
        card.effective_days.as_str()
    };
    let mut commands = Vec::new();
    let mut y = CARD_TOP;
    let mut push = |segments: Vec<TextSegment>, step: i32| {
        commands.push(line(y, segments));
        y += step;
    };

    push(
        vec![TextSegment::bold(format!("{} · 流水概览", card.anchor), Color::BLACK)],
        52,
    );
    push(
        vec![TextSegment::new(
            format!("统计月份：{}（{label}）", card.month.display()),
            Color::GRAY,
        )],
        42,
    );
    push(
        vec![TextSegment::new(
            format!("房间号：{}    粉丝数：{}", card.room_id, card.attention),
            Color::GRAY,
        )],
        42,
    );
    push(
        vec![TextSegment::new(format!("查询时间：{now_text}"), Color::GRAY)],
        30,
    );
    push(vec![TextSegment::new(separator(), Color::LIGHTGRAY)], 34);

    push(
        labelled(format!("{label}时长："), format_duration_hours(&card.live_duration)),
        42,
    );
    push(labelled("有效天：", days), 30);
    push(vec![TextSegment::new(separator(), Color::LIGHTGRAY)], 34);

    push(
        vec![TextSegment::new(format!("{label}流水："), Color::DEEPSKYBLUE)],
        42,
    );
    push(labelled("礼物：", format_money(card.gift)), 42);
    push(labelled("舰长：", format_money(card.guard)), 42);
    push(labelled("SC：", format_money(card.super_chat)), 42);
    push(labelled("总计：", format_money(card.total())), 40);

    (commands, y)
}

// The footer is drawn into the bottom band of the allocation first, so the
// cropped card keeps its rounded bottom corners.
pub fn render_revenue_card(ctx: &ReportContext<'_>, card: &RevenueCard) -> Result<String, RenderError> {
    let mut canvas = Canvas::new(ctx.fonts, CARD_WIDTH as u32, CARD_MAX_HEIGHT as u32)?;
    canvas.draw_rounded_rectangle(0, 0, CARD_WIDTH, CARD_MAX_HEIGHT, CANVAS_RADIUS, Color::WHITE);
    canvas.set_pos(
        CARD_WIDTH - FOOTER_X_FROM_RIGHT,
        CARD_MAX_HEIGHT - FOOTER_BAND + FOOTER_OFFSET,
    );
    canvas.draw_text_right(0, ctx.footer, Color::GRAY, 0);
    canvas.copy_bottom(FOOTER_BAND)?;

    let (commands, end_y) = card_commands(card, &ctx.now_text());
    canvas.execute(&commands);
    canvas.set_pos(CARD_LEFT, end_y);
    canvas.to_base64()
}
