//! Table formatting utilities for CLI list commands
//!
//! Every list command builds [`TableRow`]s of typed [`CellValue`]s and hands
//! them to a [`TableFormatter`], which renders aligned columns (colored when
//! stdout is a terminal), CSV, Markdown or bare ids.
//!
//! # Text Wrapping
//!
//! `TableConfig::with_wrap(width)` word-wraps text cells onto extra lines
//! instead of truncating them. CSV and id output are always single-line.

use chrono::{DateTime, NaiveDate, Utc};
use console::style;

use crate::cli::helpers::{format_local, truncate_str};
use crate::cli::OutputFormat;

/// Configuration for table output
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Maximum width for text columns before wrapping (None = truncate instead)
    pub wrap_width: Option<usize>,
    /// Show summary line after table (e.g., "5 handovers found")
    pub show_summary: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            wrap_width: None,
            show_summary: true,
        }
    }
}

impl TableConfig {
    /// Create config with text wrapping enabled at the specified width
    pub fn with_wrap(width: usize) -> Self {
        Self {
            wrap_width: Some(width),
            show_summary: true,
        }
    }

    /// Create config optimized for piping (no wrapping, no summary)
    pub fn for_pipe() -> Self {
        Self {
            wrap_width: None,
            show_summary: false,
        }
    }
}

/// Wrap text to fit within a maximum width, breaking at word boundaries
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if text.chars().count() <= max_width || max_width < 5 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        if !current.is_empty() && current.chars().count() + 1 + word.len() <= max_width {
            current.push(' ');
            current.extend(word);
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        // Force-break words longer than a line
        while word.len() > max_width {
            let rest = word.split_off(max_width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        current = word.into_iter().collect();
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Record id (cyan)
    Id(i64),
    /// Plain text, truncated to the column width
    Text(String),
    /// Status with color coding
    Status(String),
    /// Priority or severity with color coding
    Level(String),
    /// Calendar date
    Date(NaiveDate),
    /// Timestamp, shown in local time
    DateTime(DateTime<Utc>),
    /// Right-aligned count
    Count(u32),
    /// Empty/placeholder
    Empty,
}

impl CellValue {
    /// Text cell, or [`CellValue::Empty`] when blank
    pub fn text_or_empty(s: &str) -> Self {
        if s.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }

    /// Format for aligned column output (with colors if terminal)
    pub fn format_tsv(&self, width: usize) -> String {
        match self {
            CellValue::Id(id) => format!("{:<width$}", style(id).cyan(), width = width),
            CellValue::Text(s) => {
                format!("{:<width$}", truncate_str(s, width.saturating_sub(2)), width = width)
            }
            CellValue::Status(s) => {
                let styled = match s.as_str() {
                    "completed" | "approved" | "implemented" | "resolved" | "passed" => {
                        style(s).green()
                    }
                    "blocked" | "rejected" | "failed" => style(s).red(),
                    "in_progress" | "in_review" | "running" | "partial" => style(s).yellow(),
                    "closed" | "not_run" => style(s).dim(),
                    _ => style(s).white(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Level(s) => {
                let styled = match s.as_str() {
                    "critical" => style(s).red().bold(),
                    "high" => style(s).yellow(),
                    "low" => style(s).dim(),
                    _ => style(s).white(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Date(d) => format!("{:<width$}", d.format("%Y-%m-%d"), width = width),
            CellValue::DateTime(dt) => format!("{:<width$}", format_local(dt), width = width),
            CellValue::Count(n) => format!("{:>width$}", n, width = width),
            CellValue::Empty => format!("{:<width$}", style("-").dim(), width = width),
        }
    }

    /// Format for Markdown output (no colors, escaped pipes)
    pub fn format_md(&self) -> String {
        let raw = match self {
            CellValue::Empty => "-".to_string(),
            CellValue::Text(s) => s.replace('\n', " "),
            other => other.raw(),
        };
        raw.replace('|', "\\|")
    }

    /// Get raw string value (no formatting)
    pub fn raw(&self) -> String {
        match self {
            CellValue::Id(id) => id.to_string(),
            CellValue::Text(s) | CellValue::Status(s) | CellValue::Level(s) => s.clone(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::DateTime(dt) => format_local(dt),
            CellValue::Count(n) => n.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    /// Display width of this cell's content (for dynamic column sizing)
    pub fn display_width(&self) -> usize {
        match self {
            CellValue::Date(_) => 10,
            CellValue::DateTime(_) => 16,
            CellValue::Empty => 1,
            other => other.raw().chars().count(),
        }
    }
}

/// Column definition with header label and maximum width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// A row of cell values for table output
pub struct TableRow {
    pub id: i64,
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Table formatter that outputs rows in various formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    plural: &'static str,
    config: TableConfig,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], plural: &'static str) -> Self {
        Self {
            columns,
            plural,
            config: TableConfig::default(),
        }
    }

    /// Configure the formatter with custom settings
    pub fn with_config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// Render rows in the specified format
    pub fn render<I>(&self, rows: I, format: OutputFormat) -> String
    where
        I: IntoIterator<Item = TableRow>,
    {
        let rows: Vec<TableRow> = rows.into_iter().collect();

        // CSV, JSON and YAML are written from the records themselves, not table rows
        match format {
            OutputFormat::Md => self.render_md(&rows),
            OutputFormat::Id => rows.iter().map(|r| format!("{}\n", r.id)).collect(),
            _ => self.render_tsv(&rows),
        }
    }

    /// Print rows in the specified format
    pub fn output<I>(&self, rows: I, format: OutputFormat)
    where
        I: IntoIterator<Item = TableRow>,
    {
        print!("{}", self.render(rows, format));
    }

    /// Column widths from actual content, capped at each column's maximum
    fn calculate_widths(&self, rows: &[TableRow]) -> Vec<usize> {
        let id_width = rows
            .iter()
            .map(|r| r.id.to_string().len())
            .max()
            .unwrap_or(2)
            .max(2);

        let mut widths = vec![id_width];
        for col in self.columns {
            let max_content = rows
                .iter()
                .filter_map(|r| r.get(col.key))
                .map(|v| v.display_width())
                .max()
                .unwrap_or(0);
            // +2 leaves room for the truncation buffer in format_tsv
            let natural = col.header.len().max(max_content.saturating_add(2));
            widths.push(natural.min(col.width));
        }
        widths
    }

    fn render_tsv(&self, rows: &[TableRow]) -> String {
        let widths = self.calculate_widths(rows);
        let mut out = String::new();

        let mut header = vec![format!("{:<width$}", style("ID").bold().dim(), width = widths[0])];
        for (col, width) in self.columns.iter().zip(&widths[1..]) {
            header.push(format!("{:<width$}", style(col.header).bold(), width = width));
        }
        out.push_str(&header.join(" "));
        out.push('\n');

        let total_width: usize = widths.iter().sum::<usize>() + widths.len() - 1;
        out.push_str(&"-".repeat(total_width));
        out.push('\n');

        for row in rows {
            match self.config.wrap_width {
                Some(wrap) => self.render_row_wrapped(&mut out, row, &widths, wrap),
                None => self.render_row_truncated(&mut out, row, &widths),
            }
        }

        if self.config.show_summary {
            out.push('\n');
            out.push_str(&format!("{} {} found.\n", style(rows.len()).cyan(), self.plural));
        }
        out
    }

    fn render_row_truncated(&self, out: &mut String, row: &TableRow, widths: &[usize]) {
        let mut parts = vec![CellValue::Id(row.id).format_tsv(widths[0])];
        for (col, &width) in self.columns.iter().zip(&widths[1..]) {
            parts.push(
                row.get(col.key)
                    .unwrap_or(&CellValue::Empty)
                    .format_tsv(width),
            );
        }
        out.push_str(parts.join(" ").trim_end());
        out.push('\n');
    }

    fn render_row_wrapped(&self, out: &mut String, row: &TableRow, widths: &[usize], wrap: usize) {
        let mut cells: Vec<Vec<String>> = vec![vec![row.id.to_string()]];
        for col in self.columns {
            let lines = match row.get(col.key) {
                Some(CellValue::Text(s)) => wrap_text(s, wrap),
                Some(value) => vec![value.raw()],
                None => vec!["-".to_string()],
            };
            cells.push(lines);
        }

        let max_lines = cells.iter().map(Vec::len).max().unwrap_or(1);
        for line_idx in 0..max_lines {
            let parts: Vec<String> = cells
                .iter()
                .enumerate()
                .map(|(col_idx, lines)| {
                    let width = widths.get(col_idx).copied().unwrap_or(10);
                    let content = lines.get(line_idx).map(String::as_str).unwrap_or("");
                    if col_idx == 0 && line_idx == 0 {
                        format!("{:<width$}", style(content).cyan(), width = width)
                    } else {
                        format!("{:<width$}", content, width = width)
                    }
                })
                .collect();
            out.push_str(parts.join(" ").trim_end());
            out.push('\n');
        }
        if max_lines > 1 {
            out.push('\n');
        }
    }

    fn render_md(&self, rows: &[TableRow]) -> String {
        let mut out = String::new();
        let mut headers = vec!["ID"];
        headers.extend(self.columns.iter().map(|c| c.header));
        out.push_str(&format!("| {} |\n", headers.join(" | ")));
        let separators: Vec<&str> = headers.iter().map(|_| "---").collect();
        out.push_str(&format!("|{}|\n", separators.join("|")));

        for row in rows {
            let mut values = vec![row.id.to_string()];
            for col in self.columns {
                values.push(
                    row.get(col.key)
                        .map(CellValue::format_md)
                        .unwrap_or_else(|| "-".to_string()),
                );
            }
            out.push_str(&format!("| {} |\n", values.join(" | ")));
        }
        out
    }
}
