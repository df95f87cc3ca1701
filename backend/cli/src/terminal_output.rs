//! Terminal output utilities: notes, tables, and analysis rendering.

use oracare_core::{AnalysisRecord, AnalysisResult};

// ---------------------------------------------------------------------------
// ANSI Color/Style helpers
// ---------------------------------------------------------------------------

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

/// Strip ANSI escape codes from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn paint(color: &str, text: &str) -> String {
    if supports_color() {
        format!("{color}{text}{RESET}")
    } else {
        text.to_string()
    }
}

// ---------------------------------------------------------------------------
// Formatted notes
// ---------------------------------------------------------------------------

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        eprintln!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        eprintln!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

// ---------------------------------------------------------------------------
// Table rendering
// ---------------------------------------------------------------------------

pub enum Align {
    Left,
    Right,
}

pub struct Column {
    pub header: String,
    pub align: Align,
    pub max_width: Option<usize>,
}

impl Column {
    pub fn left(header: impl Into<String>) -> Self {
        Self { header: header.into(), align: Align::Left, max_width: None }
    }

    pub fn right(header: impl Into<String>) -> Self {
        Self { header: header.into(), align: Align::Right, max_width: None }
    }

    pub fn max_width(mut self, width: usize) -> Self {
        self.max_width = Some(width);
        self
    }
}

/// Render a table; cells wider than a column's `max_width` are cut with `…`.
pub fn render_table(columns: &[Column], rows: &[Vec<String>]) -> String {
    let num_cols = columns.len();
    let cell = |row: &Vec<String>, i: usize| -> String {
        let raw = row.get(i).map(String::as_str).unwrap_or("");
        match columns[i].max_width {
            Some(max) => truncate(raw, max),
            None => raw.to_string(),
        }
    };

    let mut widths: Vec<usize> = columns.iter().map(|c| c.header.chars().count()).collect();
    for row in rows {
        for (i, width) in widths.iter_mut().enumerate() {
            *width = (*width).max(strip_ansi(&cell(row, i)).chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| pad_cell(&col.header, widths[i], &col.align))
        .collect();
    out.push_str(&format!("  {}\n", paint(BOLD, header.join("  ").trim_end())));

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}\n", sep.join("  ")));

    for row in rows {
        let cells: Vec<String> = (0..num_cols)
            .map(|i| pad_cell(&cell(row, i), widths[i], &columns[i].align))
            .collect();
        out.push_str(&format!("  {}\n", cells.join("  ").trim_end()));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn pad_cell(s: &str, width: usize, align: &Align) -> String {
    let pad = width.saturating_sub(strip_ansi(s).chars().count());
    match align {
        Align::Left => format!("{s}{}", " ".repeat(pad)),
        Align::Right => format!("{}{s}", " ".repeat(pad)),
    }
}

// ---------------------------------------------------------------------------
// Analysis rendering
// ---------------------------------------------------------------------------

/// The result card shown after an analysis.
pub fn render_result(result: &AnalysisResult) -> String {
    let confidence_color = match result.confidence {
        75..=100 => GREEN,
        40..=74 => YELLOW,
        _ => RED,
    };
    format!(
        "{}\n  {}\n\n{} {}\n\n{}\n  {}\n",
        paint(BOLD, "Summary"),
        result.summary,
        paint(BOLD, "Confidence:"),
        paint(confidence_color, &format!("{}%", result.confidence)),
        paint(BOLD, "Recommendations"),
        result.recommendations,
    )
}

/// One line per record, newest first as given.
pub fn render_history(records: &[AnalysisRecord]) -> String {
    let columns = [
        Column::left("ID"),
        Column::left("Date"),
        Column::right("Conf."),
        Column::left("Summary").max_width(60),
    ];
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.id.clone(),
                r.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                format!("{}%", r.result.confidence),
                r.result.summary.replace('\n', " "),
            ]
        })
        .collect();
    render_table(&columns, &rows)
}
