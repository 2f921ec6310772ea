//! Render targets for the metrics table body.

use std::io::Write;
use tracing::warn;

/// One table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Link { text: String, href: String },
}

impl Cell {
    /// Visible text of the cell.
    pub fn text(&self) -> &str {
        match self {
            Cell::Text(text) | Cell::Link { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

/// A table body that is repainted in place.
///
/// A paint is `clear`, then `append_row` once per row, then `finish`.
pub trait TableBody: Send {
    fn clear(&mut self);

    fn append_row(&mut self, row: Row);

    /// Called once after the last row of a paint has been appended.
    fn finish(&mut self) {}
}

/// Table body kept as `<tr>` markup, one string per row.
#[derive(Debug, Default)]
pub struct HtmlTableBody {
    rows: Vec<String>,
}

impl HtmlTableBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Concatenated markup of every row, suitable as the inner HTML of a `<tbody>`.
    pub fn to_html(&self) -> String {
        self.rows.concat()
    }
}

impl TableBody for HtmlTableBody {
    fn clear(&mut self) {
        self.rows.clear();
    }

    fn append_row(&mut self, row: Row) {
        self.rows.push(row_markup(&row));
    }
}

fn row_markup(row: &Row) -> String {
    let mut html = String::from("<tr>");
    for cell in &row.cells {
        html.push_str("<td>");
        match cell {
            Cell::Text(text) => html.push_str(&escape_html(text)),
            Cell::Link { text, href } => {
                html.push_str(&format!("<a href=\"{}\">{}</a>", escape_html(href), escape_html(text)));
            }
        }
        html.push_str("</td>");
    }
    html.push_str("</tr>");
    html
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Plain-text table redrawn to a writer at the end of every paint.
pub struct TerminalTable<W: Write + Send> {
    headers: Vec<String>,
    rows: Vec<Row>,
    out: W,
    clear_screen: bool,
}

impl<W: Write + Send> TerminalTable<W> {
    pub fn new(headers: &[&str], out: W) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            out,
            clear_screen: false,
        }
    }

    /// Emit an ANSI clear-screen before each redraw.
    pub fn with_clear_screen(mut self, clear_screen: bool) -> Self {
        self.clear_screen = clear_screen;
        self
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// The aligned table as it is written on `finish`.
    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.cells.iter().enumerate() {
                let len = cell.text().chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }

        let mut out = String::new();
        out.push_str(&format_line(self.headers.iter().map(String::as_str), &widths));
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&format_line(rule.iter().map(String::as_str), &widths));
        for row in &self.rows {
            out.push_str(&format_line(row.cells.iter().map(Cell::text), &widths));
        }
        out
    }

    fn redraw(&mut self) -> std::io::Result<()> {
        let table = self.render();
        if self.clear_screen {
            self.out.write_all(b"\x1b[2J\x1b[H")?;
        }
        self.out.write_all(table.as_bytes())?;
        self.out.flush()
    }
}

fn format_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(text, width)| format!("{:<width$}", text, width = *width))
        .collect();
    format!("{}\n", padded.join("  ").trim_end())
}

impl<W: Write + Send> TableBody for TerminalTable<W> {
    fn clear(&mut self) {
        self.rows.clear();
    }

    fn append_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    fn finish(&mut self) {
        if let Err(e) = self.redraw() {
            warn!(
                event = "dashboard.table.redraw_failed",
                error = %e,
                message = "Could not write table to terminal"
            );
        }
    }
}
