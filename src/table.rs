use crate::canvas::Command;
use crate::paginate::RowHeight;
use crate::types::{Color, TextSegment};

pub const ORIGIN_X: i32 = 20;
pub const TABLE_MARGIN: i32 = 40;
pub const CELL_PADDING: i32 = 10;
pub const BASELINE_OFFSET: i32 = 18;
pub const HEADER_RADIUS: i32 = 12;
pub const BASE_ROW_H: i32 = 60;
pub const EXTRA_PER_LINE: i32 = 28;
pub const TITLE_Y: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub width: i32,
    pub header: &'static str,
}

impl Column {
    pub const fn new(width: i32, header: &'static str) -> Self {
        Self { width, header }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub lines: Vec<String>,
    pub color: Color,
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Self::colored(text, Color::BLACK)
    }

    pub fn colored(text: impl Into<String>, color: Color) -> Self {
        Self {
            lines: vec![text.into()],
            color,
        }
    }

    pub fn blank() -> Self {
        Self::text("")
    }

    pub fn multiline(lines: Vec<String>) -> Self {
        let lines = if lines.is_empty() {
            vec![String::new()]
        } else {
            lines
        };
        Self {
            lines,
            color: Color::BLACK,
        }
    }

    fn line_count(&self) -> usize {
        self.lines.len().max(1)
    }
}

// One pre-formatted table row. Height is fixed at construction from the
// tallest cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRow {
    cells: Vec<Cell>,
    height: i32,
    background: Option<Color>,
}

impl RenderRow {
    pub fn new(cells: Vec<Cell>) -> Self {
        let lines = cells.iter().map(Cell::line_count).max().unwrap_or(1);
        let height = BASE_ROW_H + (lines as i32 - 1) * EXTRA_PER_LINE;
        Self {
            cells,
            height,
            background: None,
        }
    }

    // Summary rows keep a fixed background instead of the stripe colour.
    pub fn summary(cells: Vec<Cell>) -> Self {
        Self {
            background: Some(Color::LIGHTGRAY),
            ..Self::new(cells)
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn height(&self) -> i32 {
        self.height
    }
}

impl RowHeight for RenderRow {
    fn row_height(&self) -> i32 {
        self.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleNote {
    pub x: i32,
    pub y: i32,
    pub text: String,
}

// Everything above the table header band. `height` is where the band starts.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleBlock {
    pub title: String,
    pub notes: Vec<TitleNote>,
    pub height: i32,
}

impl TitleBlock {
    pub fn new(title: impl Into<String>, height: i32) -> Self {
        Self {
            title: title.into(),
            notes: Vec::new(),
            height,
        }
    }

    pub fn note(mut self, x: i32, y: i32, text: impl Into<String>) -> Self {
        self.notes.push(TitleNote {
            x,
            y,
            text: text.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub commands: Vec<Command>,
    pub width: i32,
    // Bottom edge of the last drawn row.
    pub height: i32,
}

pub fn table_width(columns: &[Column]) -> i32 {
    columns.iter().map(|c| c.width).sum::<i32>() + TABLE_MARGIN
}

pub fn stripe_color(global_index: usize) -> Color {
    if global_index % 2 == 0 {
        Color::LIGHTGRAY
    } else {
        Color::WHITE
    }
}

/// Lays out a title block, a header band and the given rows.
///
/// `start_index` is the global index of `rows[0]` and keys the stripe colour,
/// so a later page continues the striping of the page before it. An empty
/// `rows` draws one white row holding `placeholder`.
pub fn layout_table(
    title: &TitleBlock,
    columns: &[Column],
    rows: &[RenderRow],
    start_index: usize,
    summary: Option<&RenderRow>,
    placeholder: &str,
) -> TableLayout {
    let width = table_width(columns);
    let band_width = width - TABLE_MARGIN;
    let mut commands = Vec::new();

    commands.push(Command::DrawText {
        x: ORIGIN_X,
        y: TITLE_Y,
        segments: vec![TextSegment::bold(title.title.clone(), Color::BLACK)],
    });
    for note in &title.notes {
        commands.push(Command::DrawText {
            x: note.x,
            y: note.y,
            segments: vec![TextSegment::new(note.text.clone(), Color::GRAY)],
        });
    }

    let mut cur_y = title.height;
    commands.push(Command::FillRoundedRect {
        x: ORIGIN_X,
        y: cur_y,
        width: band_width,
        height: BASE_ROW_H,
        radius: HEADER_RADIUS,
        color: Color::DEEPSKYBLUE,
    });
    let mut cur_x = ORIGIN_X + CELL_PADDING;
    for column in columns {
        commands.push(Command::DrawText {
            x: cur_x,
            y: cur_y + BASELINE_OFFSET,
            segments: vec![TextSegment::new(column.header, Color::WHITE)],
        });
        cur_x += column.width;
    }
    cur_y += BASE_ROW_H;

    if rows.is_empty() {
        let row = RenderRow::new(vec![Cell::text(placeholder)]);
        cur_y = push_row(&mut commands, columns, &row, Color::WHITE, band_width, cur_y);
    }
    for (offset, row) in rows.iter().enumerate() {
        let background = row
            .background
            .unwrap_or_else(|| stripe_color(start_index + offset));
        cur_y = push_row(&mut commands, columns, row, background, band_width, cur_y);
    }
    if let Some(row) = summary {
        let background = row.background.unwrap_or(Color::LIGHTGRAY);
        cur_y = push_row(&mut commands, columns, row, background, band_width, cur_y);
    }

    TableLayout {
        commands,
        width,
        height: cur_y,
    }
}

fn push_row(
    commands: &mut Vec<Command>,
    columns: &[Column],
    row: &RenderRow,
    background: Color,
    band_width: i32,
    top: i32,
) -> i32 {
    commands.push(Command::FillRoundedRect {
        x: ORIGIN_X,
        y: top,
        width: band_width,
        height: row.height,
        radius: 0,
        color: background,
    });
    let mut cur_x = ORIGIN_X + CELL_PADDING;
    // Extra cells past the last column are dropped.
    for (column, cell) in columns.iter().zip(row.cells.iter()) {
        let mut y = top + BASELINE_OFFSET;
        for line in &cell.lines {
            if !line.is_empty() {
                commands.push(Command::DrawText {
                    x: cur_x,
                    y,
                    segments: vec![TextSegment::new(line.clone(), cell.color)],
                });
            }
            y += EXTRA_PER_LINE;
        }
        cur_x += column.width;
    }
    top + row.height
}
