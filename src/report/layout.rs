//! Page layout plan
//!
//! The composer places everything into a [`DocumentPlan`]: a backend-free list
//! of positioned elements per page. The vertical position is a [`PageCursor`]
//! value passed into and returned from every placement call.

use serde::Serialize;

use crate::config::LayoutConfig;
use crate::report::wrap::wrap_text;

pub type Rgb8 = (u8, u8, u8);

pub const COLOR_BLACK: Rgb8 = (0, 0, 0);
pub const COLOR_WHITE: Rgb8 = (255, 255, 255);
pub const COLOR_GRAY: Rgb8 = (128, 128, 128);
pub const COLOR_NAVY: Rgb8 = (29, 53, 87); // #1d3557
pub const COLOR_STEEL: Rgb8 = (69, 123, 157); // #457b9d

/// Rendered in place of any missing value
pub const PLACEHOLDER: &str = "-";

/// Helvetica averages roughly half an em per character
const AVG_CHAR_WIDTH_EM: f32 = 0.5;
const CELL_PADDING: f32 = 3.0;
const CONTINUATION_SIZE: f32 = 10.0;
const HEADING_SIZE: f32 = 13.0;
pub const BODY_SIZE: f32 = 10.5;
const TABLE_SIZE: f32 = 9.0;
const FOOTER_SIZE: f32 = 9.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FontStyle {
    Regular,
    Bold,
    Oblique,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    /// Text with its baseline at `y`
    Text {
        x: f32,
        y: f32,
        size: f32,
        font: FontStyle,
        color: Rgb8,
        text: String,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
        color: Rgb8,
        thickness: f32,
    },
    /// Filled rectangle, `y` is the bottom edge
    Band {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb8,
    },
    /// Chart image, `y` is the bottom edge
    Chart {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

impl Element {
    pub fn text(&self) -> Option<&str> {
        match self {
            Element::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn is_chart(&self) -> bool {
        matches!(self, Element::Chart { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PagePlan {
    pub elements: Vec<Element>,
}

impl PagePlan {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(Element::text)
    }

    pub fn has_chart(&self) -> bool {
        self.elements.iter().any(Element::is_chart)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentPlan {
    pub title: String,
    pub page_width: f32,
    pub page_height: f32,
    pub pages: Vec<PagePlan>,
}

impl DocumentPlan {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Index of the page holding the chart, if one was placed
    pub fn chart_page(&self) -> Option<usize> {
        self.pages.iter().position(PagePlan::has_chart)
    }

    pub fn chart_count(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|p| p.elements.iter())
            .filter(|e| e.is_chart())
            .count()
    }

    /// All text on all pages, in placement order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flat_map(PagePlan::texts)
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|t| t.contains(needle))
    }
}

/// Vertical position of the next baseline on a given page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCursor {
    pub page: usize,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub title: &'static str,
    pub width: f32,
}

impl Column {
    pub const fn new(title: &'static str, width: f32) -> Self {
        Self { title, width }
    }

    fn max_chars(&self) -> usize {
        (((self.width - 2.0 * CELL_PADDING) / (TABLE_SIZE * AVG_CHAR_WIDTH_EM)).floor() as usize).max(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub columns: Vec<Column>,
    pub header_color: Rgb8,
}

/// Text style shorthand for [`PageLayout::line`]
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub size: f32,
    pub font: FontStyle,
    pub color: Rgb8,
}

impl TextStyle {
    pub const BODY: TextStyle = TextStyle {
        size: BODY_SIZE,
        font: FontStyle::Regular,
        color: COLOR_BLACK,
    };
    pub const BODY_BOLD: TextStyle = TextStyle {
        size: BODY_SIZE,
        font: FontStyle::Bold,
        color: COLOR_BLACK,
    };
    pub const NOTE: TextStyle = TextStyle {
        size: TABLE_SIZE,
        font: FontStyle::Oblique,
        color: COLOR_GRAY,
    };
}

/// Page builder; owns the finished pages, never the cursor
pub struct PageLayout<'a> {
    config: &'a LayoutConfig,
    continuation: String,
    pages: Vec<PagePlan>,
    open_table: Option<TableSpec>,
}

impl<'a> PageLayout<'a> {
    /// Start page 1; the returned cursor sits on the first baseline
    pub fn new(config: &'a LayoutConfig, continuation: impl Into<String>) -> (Self, PageCursor) {
        let layout = Self {
            config,
            continuation: continuation.into(),
            pages: vec![PagePlan::default()],
            open_table: None,
        };
        (layout, PageCursor { page: 0, y: config.top() })
    }

    pub fn push(&mut self, cursor: PageCursor, element: Element) {
        self.pages[cursor.page].elements.push(element);
    }

    /// Whether `lines` consecutive lines starting at the cursor stay above the bottom margin
    pub fn fits_lines(&self, cursor: PageCursor, lines: usize) -> bool {
        let last_baseline = cursor.y - lines.saturating_sub(1) as f32 * self.config.line_height;
        last_baseline >= self.config.bottom_margin
    }

    /// Finalize the current page and continue on a fresh one
    pub fn page_break(&mut self, cursor: PageCursor) -> PageCursor {
        self.pages.push(PagePlan::default());
        let mut next = PageCursor {
            page: cursor.page + 1,
            y: self.config.top(),
        };

        let header = format!("{} (cont.)", self.continuation);
        self.push(
            next,
            Element::Text {
                x: self.config.margin_left,
                y: next.y,
                size: CONTINUATION_SIZE,
                font: FontStyle::Bold,
                color: COLOR_NAVY,
                text: header,
            },
        );
        self.rule(next, next.y - 6.0);
        next.y -= 2.0 * self.config.line_height;

        if let Some(spec) = self.open_table.clone() {
            next = self.table_header(next, &spec);
        }
        next
    }

    /// Break unless `lines` lines fit
    pub fn ensure_lines(&mut self, cursor: PageCursor, lines: usize) -> PageCursor {
        if self.fits_lines(cursor, lines) {
            cursor
        } else {
            self.page_break(cursor)
        }
    }

    pub fn gap(&self, cursor: PageCursor, height: f32) -> PageCursor {
        PageCursor {
            y: cursor.y - height,
            ..cursor
        }
    }

    /// Place one line of text and advance by the line height
    pub fn line(&mut self, cursor: PageCursor, x: f32, text: &str, style: TextStyle) -> PageCursor {
        let cursor = self.ensure_lines(cursor, 1);
        self.push(
            cursor,
            Element::Text {
                x,
                y: cursor.y,
                size: style.size,
                font: style.font,
                color: style.color,
                text: text.to_string(),
            },
        );
        self.gap(cursor, self.config.line_height)
    }

    /// Wrap `text` to the configured width and place every line;
    /// blank text becomes a single placeholder line
    pub fn paragraph(&mut self, cursor: PageCursor, text: &str, style: TextStyle) -> PageCursor {
        let lines = wrap_text(text, self.config.max_chars_per_line);
        if lines.is_empty() {
            return self.line(cursor, self.config.margin_left, PLACEHOLDER, style);
        }
        let x = self.config.margin_left;
        lines
            .iter()
            .fold(cursor, |cursor, line| self.line(cursor, x, line, style))
    }

    /// Section heading, kept on the same page as at least two following lines
    pub fn heading(&mut self, cursor: PageCursor, title: &str) -> PageCursor {
        let cursor = self.ensure_lines(cursor, 3);
        self.push(
            cursor,
            Element::Text {
                x: self.config.margin_left,
                y: cursor.y,
                size: HEADING_SIZE,
                font: FontStyle::Bold,
                color: COLOR_NAVY,
                text: title.to_string(),
            },
        );
        self.gap(cursor, self.config.line_height + 4.0)
    }

    pub fn rule(&mut self, cursor: PageCursor, y: f32) {
        self.push(
            cursor,
            Element::Rule {
                x1: self.config.margin_left,
                x2: self.config.page_width - self.config.margin_right,
                y,
                color: COLOR_GRAY,
                thickness: 0.5,
            },
        );
    }

    /// Emit the header row and keep it for re-emission after page breaks
    pub fn begin_table(&mut self, cursor: PageCursor, spec: TableSpec) -> PageCursor {
        // Header plus one row
        let cursor = self.ensure_lines(cursor, 2);
        let cursor = self.table_header(cursor, &spec);
        self.open_table = Some(spec);
        cursor
    }

    fn table_header(&mut self, cursor: PageCursor, spec: &TableSpec) -> PageCursor {
        let lh = self.config.line_height;
        let total_width: f32 = spec.columns.iter().map(|c| c.width).sum();
        self.push(
            cursor,
            Element::Band {
                x: self.config.margin_left,
                y: cursor.y - lh * 0.3,
                width: total_width,
                height: lh,
                color: spec.header_color,
            },
        );
        let mut x = self.config.margin_left;
        for column in &spec.columns {
            self.push(
                cursor,
                Element::Text {
                    x: x + CELL_PADDING,
                    y: cursor.y,
                    size: TABLE_SIZE,
                    font: FontStyle::Bold,
                    color: COLOR_WHITE,
                    text: column.title.to_string(),
                },
            );
            x += column.width;
        }
        self.gap(cursor, lh)
    }

    /// Place one row; cells wrap within their column and the row stays on one
    /// page whenever it fits on an empty one
    pub fn table_row(&mut self, cursor: PageCursor, cells: &[String]) -> PageCursor {
        let Some(spec) = self.open_table.clone() else {
            return cursor;
        };

        let wrapped: Vec<Vec<String>> = spec
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let text = cells.get(i).map(String::as_str).unwrap_or("");
                let lines = wrap_text(text, column.max_chars());
                if lines.is_empty() {
                    vec![PLACEHOLDER.to_string()]
                } else {
                    lines
                }
            })
            .collect();
        let row_lines = wrapped.iter().map(Vec::len).max().unwrap_or(1);

        let mut cursor = self.ensure_lines(cursor, row_lines.min(self.fresh_table_capacity()));
        for line_idx in 0..row_lines {
            if line_idx > 0 {
                cursor = self.ensure_lines(cursor, 1);
            }
            let mut x = self.config.margin_left;
            for (column, lines) in spec.columns.iter().zip(&wrapped) {
                if let Some(text) = lines.get(line_idx) {
                    self.push(
                        cursor,
                        Element::Text {
                            x: x + CELL_PADDING,
                            y: cursor.y,
                            size: TABLE_SIZE,
                            font: FontStyle::Regular,
                            color: COLOR_BLACK,
                            text: text.clone(),
                        },
                    );
                }
                x += column.width;
            }
            cursor = self.gap(cursor, self.config.line_height);
        }
        cursor
    }

    pub fn end_table(&mut self, cursor: PageCursor) -> PageCursor {
        self.open_table = None;
        self.rule(cursor, cursor.y + self.config.line_height * 0.6);
        self.gap(cursor, self.config.line_height * 0.5)
    }

    /// Lines a table row can use on a page that starts with the continuation
    /// header and the table header
    fn fresh_table_capacity(&self) -> usize {
        let lh = self.config.line_height;
        let first = self.config.top() - 3.0 * lh;
        (((first - self.config.bottom_margin) / lh).floor() as usize + 1).max(1)
    }

    /// Place an atomic block of `height` points, breaking first if it does not fit
    pub fn chart(&mut self, cursor: PageCursor, width: f32, height: f32) -> PageCursor {
        let cursor = if cursor.y - height >= self.config.bottom_margin {
            cursor
        } else {
            self.page_break(cursor)
        };
        self.push(
            cursor,
            Element::Chart {
                x: self.config.margin_left,
                y: cursor.y - height,
                width,
                height,
            },
        );
        self.gap(cursor, height + self.config.line_height)
    }

    /// Largest block height that fits on a fresh page
    pub fn max_block_height(&self) -> f32 {
        self.config.top() - 2.0 * self.config.line_height - self.config.bottom_margin
    }

    /// Anchor the footer to the last page and hand back the plan
    pub fn finish(mut self, title: impl Into<String>, footer: &str) -> DocumentPlan {
        let last = PageCursor {
            page: self.pages.len() - 1,
            y: self.config.footer_offset,
        };
        self.push(
            last,
            Element::Text {
                x: self.config.margin_left,
                y: self.config.footer_offset,
                size: FOOTER_SIZE,
                font: FontStyle::Oblique,
                color: COLOR_GRAY,
                text: footer.to_string(),
            },
        );
        DocumentPlan {
            title: title.into(),
            page_width: self.config.page_width,
            page_height: self.config.page_height,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> LayoutConfig {
        LayoutConfig {
            page_height: 300.0,
            margin_top: 40.0,
            bottom_margin: 100.0,
            footer_offset: 50.0,
            line_height: 10.0,
            max_chars_per_line: 20,
            ..Default::default()
        }
    }

    fn text_baselines(plan: &DocumentPlan) -> Vec<f32> {
        plan.pages
            .iter()
            .flat_map(|p| p.elements.iter())
            .filter_map(|e| match e {
                Element::Text { y, .. } => Some(*y),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_lines_break_at_bottom_margin() {
        let config = small_config();
        let (mut layout, mut cursor) = PageLayout::new(&config, "Report");
        // top = 260, bottom = 100: baselines 260..=100 give 17 lines on page 1
        for i in 0..20 {
            cursor = layout.line(cursor, 10.0, &format!("line {}", i), TextStyle::BODY);
        }
        let plan = layout.finish("Report", "footer");

        assert_eq!(plan.page_count(), 2);
        assert!(plan.pages[0].texts().any(|t| t == "line 16"));
        let page2: Vec<_> = plan.pages[1].texts().collect();
        assert_eq!(page2[0], "Report (cont.)");
        assert_eq!(page2[1], "line 17");
    }

    #[test]
    fn test_no_content_below_bottom_margin() {
        let config = small_config();
        let (mut layout, mut cursor) = PageLayout::new(&config, "Report");
        for _ in 0..12 {
            cursor = layout.paragraph(cursor, "a fairly long sentence that wraps a few times", TextStyle::BODY);
        }
        let plan = layout.finish("Report", "footer");
        let baselines = text_baselines(&plan);
        // Everything but the footer respects the margin
        let (footer, content) = baselines.split_last().unwrap();
        assert_eq!(*footer, config.footer_offset);
        assert!(content.iter().all(|y| *y >= config.bottom_margin));
    }

    #[test]
    fn test_blank_paragraph_renders_placeholder() {
        let config = small_config();
        let (mut layout, cursor) = PageLayout::new(&config, "Report");
        let after = layout.paragraph(cursor, "  ", TextStyle::BODY);
        assert_eq!(after.y, cursor.y - config.line_height);
        let plan = layout.finish("Report", "f");
        assert!(plan.pages[0].texts().any(|t| t == PLACEHOLDER));
    }

    #[test]
    fn test_table_header_repeats_after_break() {
        let config = small_config();
        let (mut layout, mut cursor) = PageLayout::new(&config, "Report");
        let spec = TableSpec {
            columns: vec![Column::new("Day", 40.0), Column::new("Drug", 120.0)],
            header_color: COLOR_NAVY,
        };
        cursor = layout.begin_table(cursor, spec);
        for day in 0..30 {
            cursor = layout.table_row(cursor, &[day.to_string(), "Amoxicillin".into()]);
        }
        layout.end_table(cursor);
        let plan = layout.finish("Report", "f");

        assert!(plan.page_count() > 1);
        for page in &plan.pages {
            assert!(page.texts().any(|t| t == "Day"), "header missing on a page");
        }
    }

    #[test]
    fn test_table_row_is_not_split_when_it_fits() {
        let config = small_config();
        let (mut layout, mut cursor) = PageLayout::new(&config, "Report");
        cursor = layout.begin_table(
            cursor,
            TableSpec {
                columns: vec![Column::new("Note", 20.0)],
                header_color: COLOR_STEEL,
            },
        );
        // Three characters per line: the row wraps to four lines, and only two fit
        cursor.y = config.bottom_margin + config.line_height;
        let after = layout.table_row(cursor, &["aa bb cc dd".into()]);
        assert_eq!(after.page, 1);
        let plan = layout.finish("Report", "f");
        assert!(!plan.pages[0].texts().any(|t| t == "aa"));
        assert!(plan.pages[1].texts().any(|t| t == "aa"));
    }

    #[test]
    fn test_chart_moves_to_next_page_when_short_of_space() {
        let config = small_config();
        let (mut layout, cursor) = PageLayout::new(&config, "Report");
        let cursor = layout.gap(cursor, 100.0); // y = 160, 60 points left
        let after = layout.chart(cursor, 100.0, 80.0);
        assert_eq!(after.page, 1);

        let plan = layout.finish("Report", "f");
        assert_eq!(plan.chart_count(), 1);
        assert_eq!(plan.chart_page(), Some(1));
    }

    #[test]
    fn test_chart_inline_when_it_fits() {
        let config = small_config();
        let (mut layout, cursor) = PageLayout::new(&config, "Report");
        let after = layout.chart(cursor, 100.0, 80.0);
        assert_eq!(after.page, 0);
        let plan = layout.finish("Report", "f");
        assert_eq!(plan.chart_page(), Some(0));
    }

    #[test]
    fn test_footer_only_on_last_page() {
        let config = small_config();
        let (mut layout, cursor) = PageLayout::new(&config, "Report");
        let cursor = layout.page_break(cursor);
        layout.page_break(cursor);
        let plan = layout.finish("Report", "Generated by test");
        let footers: Vec<_> = plan
            .pages
            .iter()
            .map(|p| p.texts().filter(|t| *t == "Generated by test").count())
            .collect();
        assert_eq!(footers, [0, 0, 1]);
    }

    #[test]
    fn test_column_capacity() {
        // (60 - 6) / 4.5 = 12
        assert_eq!(Column::new("x", 60.0).max_chars(), 12);
        assert_eq!(Column::new("x", 2.0).max_chars(), 1);
    }
}
