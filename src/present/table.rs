//! Plain-text result tables.
//!
//! Renders query results as box-drawn tables with auto-sized columns and a
//! row-count footer.

use crate::db::{QueryResult, Value};

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 40;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 4;

/// Renders a query result as a text table.
pub struct ResultTable<'a> {
    result: &'a QueryResult,
}

impl<'a> ResultTable<'a> {
    pub fn new(result: &'a QueryResult) -> Self {
        Self { result }
    }

    /// Width of each column: the widest header or cell, clamped to
    /// `MIN_COLUMN_WIDTH..=MAX_COLUMN_WIDTH`.
    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .result
            .columns
            .iter()
            .map(|col| display_width(&col.name))
            .collect();

        for row in &self.result.rows {
            for (width, value) in widths.iter_mut().zip(row) {
                *width = (*width).max(display_width(&value.to_display_string()));
            }
        }

        widths
            .into_iter()
            .map(|w| w.clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH))
            .collect()
    }

    /// Renders the table, footer included, as lines of text.
    pub fn render_lines(&self) -> Vec<String> {
        if self.result.columns.is_empty() {
            return vec![match self.result.rows_affected {
                Some(n) => format!("{n} row{} affected", plural(n as usize)),
                None => "(empty result)".to_string(),
            }];
        }

        let widths = self.column_widths();
        let mut lines = Vec::with_capacity(self.result.rows.len() + 5);

        lines.push(border(&widths, '┌', '┬', '┐'));
        lines.push(row_line(
            self.result.columns.iter().map(|c| c.name.clone()),
            &widths,
        ));
        lines.push(border(&widths, '├', '┼', '┤'));
        for row in &self.result.rows {
            lines.push(row_line(row.iter().map(Value::to_display_string), &widths));
        }
        lines.push(border(&widths, '└', '┴', '┘'));

        lines.push(format!(
            "{} row{} returned ({}ms)",
            self.result.row_count,
            plural(self.result.row_count),
            self.result.execution_time.as_millis()
        ));
        if let Some(warning) = self.result.truncation_warning() {
            lines.push(warning);
        }

        lines
    }

    pub fn render(&self) -> String {
        self.render_lines().join("\n")
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn display_width(s: &str) -> usize {
    s.chars().count()
}

/// Truncates to `max_width` characters, ending in "..." when cut.
fn truncate(s: &str, max_width: usize) -> String {
    if display_width(s) <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let kept: String = s.chars().take(max_width - 3).collect();
        format!("{kept}...")
    }
}

fn border(widths: &[usize], left: char, mid: char, right: char) -> String {
    let segments: Vec<String> = widths.iter().map(|&w| "─".repeat(w + 2)).collect();
    format!("{left}{}{right}", segments.join(&mid.to_string()))
}

fn row_line(cells: impl Iterator<Item = String>, widths: &[usize]) -> String {
    let mut line = String::from("│");
    for (cell, &width) in cells.zip(widths) {
        // Newlines inside a value would break the grid.
        let flat = cell.replace(['\n', '\r'], " ");
        line.push_str(&format!(" {:width$} │", truncate(&flat, width), width = width));
    }
    line
}
