//! Paginates a [`Story`] into positioned draw operations.
//!
//! Coordinates are PDF points with the origin at the bottom-left corner of the
//! page. Text widths come from the Helvetica AFM metrics, which is what the
//! built-in PDF fonts use.

use crate::report::story::{Block, HeadingLevel, Markup, Story};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

impl PageGeometry {
    pub const A4: PageGeometry = PageGeometry {
        width: 595.28,
        height: 841.89,
        margin_left: 72.0,
        margin_right: 72.0,
        margin_top: 72.0,
        margin_bottom: 18.0,
    };

    pub fn frame_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    fn frame_top(&self) -> f32 {
        self.height - self.margin_top
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor::new(0.0, 0.0, 0.0);
    pub const RED: RgbColor = RgbColor::new(1.0, 0.0, 0.0);
    pub const DARK_BLUE: RgbColor = RgbColor::new(0.0, 0.0, 0.545);
    pub const DARK_GREEN: RgbColor = RgbColor::new(0.0, 0.392, 0.0);
    pub const LIGHT_BLUE: RgbColor = RgbColor::new(0.678, 0.847, 0.902);
    pub const WHITE_SMOKE: RgbColor = RgbColor::new(0.961, 0.961, 0.961);
    pub const BEIGE: RgbColor = RgbColor::new(0.961, 0.961, 0.863);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// `y` is the text baseline.
    Text {
        x: f32,
        y: f32,
        size: f32,
        font: Font,
        color: RgbColor,
        text: String,
    },
    FillRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: RgbColor,
    },
    StrokeRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: RgbColor,
        line_width: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy)]
struct TextStyle {
    font: Font,
    size: f32,
    leading: f32,
    space_before: f32,
    space_after: f32,
    color: RgbColor,
    align: Align,
    /// Border colour and padding, drawn as a box around the text.
    border: Option<(RgbColor, f32)>,
}

const TITLE: TextStyle = TextStyle {
    font: Font::HelveticaBold,
    size: 24.0,
    leading: 28.8,
    space_before: 0.0,
    space_after: 30.0,
    color: RgbColor::DARK_BLUE,
    align: Align::Center,
    border: None,
};

const SECTION: TextStyle = TextStyle {
    font: Font::HelveticaBold,
    size: 16.0,
    leading: 19.2,
    space_before: 20.0,
    space_after: 12.0,
    color: RgbColor::DARK_BLUE,
    align: Align::Left,
    border: Some((RgbColor::DARK_BLUE, 5.0)),
};

const SUBSECTION: TextStyle = TextStyle {
    font: Font::HelveticaBold,
    size: 14.0,
    leading: 16.8,
    space_before: 12.0,
    space_after: 8.0,
    color: RgbColor::DARK_GREEN,
    align: Align::Left,
    border: None,
};

const BODY: TextStyle = TextStyle {
    font: Font::Helvetica,
    size: 10.0,
    leading: 12.0,
    space_before: 0.0,
    space_after: 0.0,
    color: RgbColor::BLACK,
    align: Align::Left,
    border: None,
};

const DECISION: TextStyle = TextStyle {
    font: Font::HelveticaBold,
    size: 14.0,
    leading: 16.8,
    space_before: 0.0,
    space_after: 12.0,
    color: RgbColor::RED,
    align: Align::Center,
    border: None,
};

const TABLE_COL_WIDTHS: [f32; 2] = [144.0, 216.0];
const CELL_PAD_X: f32 = 6.0;
const CELL_PAD_TOP: f32 = 3.0;
const CELL_PAD_BOTTOM: f32 = 3.0;
const HEADER_PAD_BOTTOM: f32 = 12.0;
const HEADER_FONT_SIZE: f32 = 12.0;
const GRID_WIDTH: f32 = 1.0;

struct RowStyle {
    font: Font,
    size: f32,
    fill: RgbColor,
    text_color: RgbColor,
    pad_bottom: f32,
}

impl RowStyle {
    fn leading(&self) -> f32 {
        self.size * 1.2
    }
}

/// Paginates the story. Always returns at least one page.
pub fn layout(story: &Story, geometry: &PageGeometry) -> Vec<Page> {
    let mut flow = Flow::new(*geometry);
    for block in &story.blocks {
        match block {
            Block::Heading { level, text } => {
                let style = match level {
                    HeadingLevel::Title => TITLE,
                    HeadingLevel::Section => SECTION,
                    HeadingLevel::Subsection => SUBSECTION,
                };
                flow.text_block(text, style, true);
            }
            Block::Paragraph(text) => flow.text_block(text, BODY, false),
            Block::Decision(text) => flow.text_block(text, DECISION, false),
            Block::SummaryTable(rows) => flow.table(rows),
            Block::Spacer(h) => flow.spacer(*h),
            Block::PageBreak => flow.page_break(),
        }
    }
    flow.finish()
}

struct Flow {
    geometry: PageGeometry,
    pages: Vec<Page>,
    current: Page,
    /// Top of the free area on the current page.
    y: f32,
}

impl Flow {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
            current: Page::default(),
            y: geometry.frame_top(),
        }
    }

    fn at_top(&self) -> bool {
        self.current.ops.is_empty()
    }

    fn remaining(&self) -> f32 {
        self.y - self.geometry.margin_bottom
    }

    fn new_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
        self.y = self.geometry.frame_top();
    }

    /// Starts a new page unless `h` fits or the page is still empty.
    fn reserve(&mut self, h: f32) {
        if h > self.remaining() && !self.at_top() {
            self.new_page();
        }
    }

    fn spacer(&mut self, h: f32) {
        if self.at_top() {
            return;
        }
        self.y -= h.min(self.remaining());
    }

    fn page_break(&mut self) {
        if !self.at_top() {
            self.new_page();
        }
    }

    fn text_block(&mut self, text: &Markup, style: TextStyle, keep_with_next: bool) {
        let plain = printable_text(&text.to_plain());
        let pad = style.border.map(|(_, p)| p).unwrap_or(0.0);
        let width = self.geometry.frame_width() - 2.0 * pad;
        let lines = wrap_text(&plain, style.font, style.size, width);
        if lines.is_empty() {
            return;
        }

        if !self.at_top() {
            self.y -= style.space_before.min(self.remaining());
        }

        if let Some((color, pad)) = style.border {
            // Bordered headings are never split across pages.
            let box_h = lines.len() as f32 * style.leading + 2.0 * pad;
            let follow = if keep_with_next { 2.0 * BODY.leading } else { 0.0 };
            self.reserve(box_h + follow);
            let top = self.y;
            self.current.ops.push(DrawOp::StrokeRect {
                x: self.geometry.margin_left,
                y: top - box_h,
                w: self.geometry.frame_width(),
                h: box_h,
                color,
                line_width: GRID_WIDTH,
            });
            self.y -= pad;
            for line in lines {
                self.line(line, style, pad);
            }
            self.y = top - box_h;
        } else {
            if keep_with_next {
                self.reserve(lines.len() as f32 * style.leading + 2.0 * BODY.leading);
            }
            for line in lines {
                if style.leading > self.remaining() {
                    self.new_page();
                }
                self.line(line, style, 0.0);
            }
        }

        self.y -= style.space_after.min(self.remaining());
    }

    fn line(&mut self, line: String, style: TextStyle, pad: f32) {
        let inner = self.geometry.frame_width() - 2.0 * pad;
        let x = match style.align {
            Align::Left => self.geometry.margin_left + pad,
            Align::Center => {
                let w = text_width(&line, style.font, style.size);
                self.geometry.margin_left + pad + ((inner - w) / 2.0).max(0.0)
            }
        };
        let baseline = self.y - style.leading + descent(style.size);
        self.current.ops.push(DrawOp::Text {
            x,
            y: baseline,
            size: style.size,
            font: style.font,
            color: style.color,
            text: line,
        });
        self.y -= style.leading;
    }

    fn table(&mut self, rows: &[(String, String)]) {
        let table_w: f32 = TABLE_COL_WIDTHS.iter().sum();
        let x0 = self.geometry.margin_left + ((self.geometry.frame_width() - table_w) / 2.0).max(0.0);

        for (idx, (key, value)) in rows.iter().enumerate() {
            let style = if idx == 0 {
                RowStyle {
                    font: Font::HelveticaBold,
                    size: HEADER_FONT_SIZE,
                    fill: RgbColor::LIGHT_BLUE,
                    text_color: RgbColor::WHITE_SMOKE,
                    pad_bottom: HEADER_PAD_BOTTOM,
                }
            } else {
                RowStyle {
                    font: Font::Helvetica,
                    size: BODY.size,
                    fill: RgbColor::BEIGE,
                    text_color: RgbColor::BLACK,
                    pad_bottom: CELL_PAD_BOTTOM,
                }
            };
            let leading = style.leading();

            let cells: Vec<Vec<String>> = [key, value]
                .iter()
                .zip(TABLE_COL_WIDTHS)
                .map(|(text, col_w)| {
                    wrap_text(&printable_text(text), style.font, style.size, col_w - 2.0 * CELL_PAD_X)
                })
                .collect();
            let total = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);

            // A row taller than the free space is continued on the next page,
            // repeating the row background and grid for each slice.
            let mut drawn = 0;
            while drawn < total {
                let left = total - drawn;
                self.reserve(CELL_PAD_TOP + left as f32 * leading + style.pad_bottom);
                let room = self.remaining() - CELL_PAD_TOP - style.pad_bottom;
                let fits = ((room / leading).floor().max(1.0) as usize).min(left);

                self.row_slice(x0, &cells, drawn..drawn + fits, &style);
                drawn += fits;
                if drawn < total {
                    self.new_page();
                }
            }
        }
    }

    fn row_slice(
        &mut self,
        x0: f32,
        cells: &[Vec<String>],
        lines: std::ops::Range<usize>,
        style: &RowStyle,
    ) {
        let leading = style.leading();
        let row_h = CELL_PAD_TOP + lines.len() as f32 * leading + style.pad_bottom;
        let top = self.y;

        let mut x = x0;
        for (cell, col_w) in cells.iter().zip(TABLE_COL_WIDTHS) {
            self.current.ops.push(DrawOp::FillRect {
                x,
                y: top - row_h,
                w: col_w,
                h: row_h,
                color: style.fill,
            });
            let mut line_top = top - CELL_PAD_TOP;
            for line in cell.iter().skip(lines.start).take(lines.len()) {
                self.current.ops.push(DrawOp::Text {
                    x: x + CELL_PAD_X,
                    y: line_top - leading + descent(style.size),
                    size: style.size,
                    font: style.font,
                    color: style.text_color,
                    text: line.clone(),
                });
                line_top -= leading;
            }
            self.current.ops.push(DrawOp::StrokeRect {
                x,
                y: top - row_h,
                w: col_w,
                h: row_h,
                color: RgbColor::BLACK,
                line_width: GRID_WIDTH,
            });
            x += col_w;
        }

        self.y = top - row_h;
    }

    fn finish(mut self) -> Vec<Page> {
        if !self.current.ops.is_empty() || self.pages.is_empty() {
            self.new_page();
        }
        self.pages
    }
}

fn descent(size: f32) -> f32 {
    size * 0.2
}

/// Greedy word wrap; words wider than the line are split by character.
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let space = text_width(" ", font, size);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_w = 0.0f32;

    for word in text.split_whitespace() {
        let word_w = text_width(word, font, size);

        if word_w > max_width {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line_w = 0.0;
            }
            for c in word.chars() {
                let cw = char_width(c, font) * size / 1000.0;
                if line_w + cw > max_width && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    line_w = 0.0;
                }
                line.push(c);
                line_w += cw;
            }
            continue;
        }

        if line.is_empty() {
            line.push_str(word);
            line_w = word_w;
        } else if line_w + space + word_w <= max_width {
            line.push(' ');
            line.push_str(word);
            line_w += space + word_w;
        } else {
            lines.push(std::mem::replace(&mut line, word.to_string()));
            line_w = word_w;
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    text.chars().map(|c| char_width(c, font)).sum::<f32>() * size / 1000.0
}

/// Built-in fonts only cover WinAnsi; common typographic characters are
/// folded to ASCII and anything else becomes `?`.
pub fn printable_text(text: &str) -> String {
    text.replace('\u{2026}', "...")
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{2032}' => '\'',
            '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{2033}' => '"',
            '\u{2010}'..='\u{2015}' | '\u{2212}' => '-',
            '\u{2022}' | '\u{00b7}' => '*',
            '\u{00a0}' => ' ',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            c if ('\u{00a1}'..='\u{00ff}').contains(&c) => c,
            _ => '?',
        })
        .collect()
}

/// Advance widths in 1/1000 em, from the Helvetica and Helvetica-Bold AFMs.
/// Latin-1 characters outside ASCII fall back to the digit width.
fn char_width(c: char, font: Font) -> f32 {
    match font {
        Font::Helvetica => regular_width(c),
        Font::HelveticaBold => bold_width(c),
    }
}

fn regular_width(c: char) -> f32 {
    match c {
        ' ' | '!' | ',' | '.' | '/' | ':' | ';' | '[' | '\\' | ']' | 'f' | 't' | 'I' => 278.0,
        '"' => 355.0,
        '\'' => 191.0,
        '(' | ')' | '-' | '`' | 'r' => 333.0,
        '*' => 389.0,
        '+' | '<' | '=' | '>' | '~' => 584.0,
        '%' => 889.0,
        '&' => 667.0,
        '@' => 1015.0,
        '^' => 469.0,
        '{' | '}' => 334.0,
        '|' => 260.0,
        'i' | 'j' | 'l' => 222.0,
        'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' | 'J' => 500.0,
        'm' | 'M' => 833.0,
        'w' => 722.0,
        'W' => 944.0,
        'A' | 'B' | 'E' | 'K' | 'P' | 'S' | 'V' | 'X' | 'Y' => 667.0,
        'C' | 'D' | 'H' | 'N' | 'R' | 'U' => 722.0,
        'F' | 'T' | 'Z' => 611.0,
        'G' | 'O' | 'Q' => 778.0,
        _ => 556.0,
    }
}

fn bold_width(c: char) -> f32 {
    match c {
        ' ' | ',' | '.' | '/' | '\\' | 'I' | 'i' | 'j' | 'l' => 278.0,
        '!' | '(' | ')' | '-' | ':' | ';' | '[' | ']' | '`' | 'f' | 't' => 333.0,
        '"' => 474.0,
        '\'' => 238.0,
        '*' => 389.0,
        '{' | '}' | 'r' => 389.0,
        '+' | '<' | '=' | '>' | '^' | '~' => 584.0,
        '%' => 889.0,
        '@' => 975.0,
        '|' => 280.0,
        '?' | 'F' | 'L' | 'T' | 'Z' => 611.0,
        'b' | 'd' | 'g' | 'h' | 'n' | 'o' | 'p' | 'q' | 'u' => 611.0,
        'z' => 500.0,
        'm' | 'M' => 889.0,
        'w' => 778.0,
        'W' => 944.0,
        '&' | 'A' | 'B' | 'C' | 'D' | 'H' | 'K' | 'N' | 'R' | 'U' => 722.0,
        'E' | 'P' | 'S' | 'V' | 'X' | 'Y' => 667.0,
        'G' | 'O' | 'Q' => 778.0,
        _ => 556.0,
    }
}
