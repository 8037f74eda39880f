//! Presentation seam: where consolidated progress ends up

use std::collections::HashMap;
use std::io::Write;

use colored::*;
use tracing::debug;

use crate::domain::FilterId;

/// Receives the consolidated progress of the pipeline
pub trait ProgressDisplay {
    fn set_local_progress(&mut self, name: &str, percent: u8);
}

/// Turns a `FilterId` into a human-readable stage name
///
/// Names are cosmetic; a resolver that knows nothing is always valid.
pub trait NameResolver {
    fn display_name(&self, id: FilterId) -> Option<String>;
}

impl NameResolver for HashMap<FilterId, String> {
    fn display_name(&self, id: FilterId) -> Option<String> {
        self.get(&id).cloned()
    }
}

/// Resolver that knows no names
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNames;

impl NameResolver for NoNames {
    fn display_name(&self, _id: FilterId) -> Option<String> {
        None
    }
}

/// One update delivered to a display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayUpdate {
    pub name: String,
    pub percent: u8,
}

/// Display that keeps every update it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    updates: Vec<DisplayUpdate>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> &[DisplayUpdate] {
        &self.updates
    }

    pub fn last(&self) -> Option<&DisplayUpdate> {
        self.updates.last()
    }
}

impl ProgressDisplay for RecordingDisplay {
    fn set_local_progress(&mut self, name: &str, percent: u8) {
        self.updates.push(DisplayUpdate {
            name: name.to_string(),
            percent,
        });
    }
}

/// Single-line terminal progress bar
///
/// Redraws only when the name or percentage changes.
pub struct ConsoleDisplay<W: Write> {
    out: W,
    width: usize,
    label: String,
    last: Option<(String, u8)>,
}

impl ConsoleDisplay<std::io::Stdout> {
    pub fn stdout(label: impl Into<String>) -> Self {
        Self::new(std::io::stdout(), label)
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W, label: impl Into<String>) -> Self {
        Self {
            out,
            width: 30,
            label: label.into(),
            last: None,
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    /// End the progress line
    pub fn finish(&mut self) {
        if self.last.take().is_some() {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&self, name: &str, percent: u8) -> String {
        let filled = self.width * usize::from(percent.min(100)) / 100;
        let bar = format!("{}{}", "#".repeat(filled), "-".repeat(self.width - filled));
        let bar = if percent >= 100 { bar.green() } else { bar.cyan() };
        format!(
            "\r{} {:<24} [{}] {:>3}%",
            self.label.bold(),
            name,
            bar,
            percent.to_string().yellow()
        )
    }
}

impl<W: Write> ProgressDisplay for ConsoleDisplay<W> {
    fn set_local_progress(&mut self, name: &str, percent: u8) {
        if self.last.as_ref().is_some_and(|(n, p)| n == name && *p == percent) {
            return;
        }
        let line = self.render(name, percent);
        if let Err(e) = write!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            debug!(error = %e, "ConsoleDisplay::set_local_progress: write failed");
        }
        self.last = Some((name.to_string(), percent));
    }
}
