//! Terminal output helpers.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table as ComfyTable};
use owo_colors::{OwoColorize, Stream};

/// Print a section header.
pub fn header(text: &str) {
    println!("{}", text.if_supports_color(Stream::Stdout, |t| t.cyan().bold().to_string()));
}

/// Print a success line.
pub fn success(text: &str) {
    println!("{} {text}", "✓".if_supports_color(Stream::Stdout, |t| t.green().to_string()));
}

/// Print an informational line.
pub fn info(text: &str) {
    println!("{} {text}", "•".if_supports_color(Stream::Stdout, |t| t.blue().to_string()));
}

/// Print a warning to stderr.
pub fn warning(text: &str) {
    eprintln!("{} {text}", "!".if_supports_color(Stream::Stderr, |t| t.yellow().to_string()));
}

/// Print an error to stderr.
pub fn error(text: &str) {
    eprintln!(
        "{} {text}",
        "error:".if_supports_color(Stream::Stderr, |t| t.red().bold().to_string())
    );
}

/// Styled URL.
pub fn url(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.blue().underline().to_string())
        .to_string()
}

/// Table printed to stdout.
#[derive(Debug)]
pub struct Table {
    inner: ComfyTable,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// Empty table.
    pub fn new() -> Self {
        let mut inner = ComfyTable::new();
        inner
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic);
        Self { inner }
    }

    /// Set column headers.
    pub fn headers<I, S>(&mut self, headers: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.inner
            .set_header(headers.into_iter().map(|h| h.to_string()).collect::<Vec<_>>());
    }

    /// Append a row.
    pub fn row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.inner
            .add_row(cells.into_iter().map(|c| c.to_string()).collect::<Vec<_>>());
    }

    /// Print to stdout.
    pub fn print(&self) {
        println!("{}", self.inner);
    }
}
