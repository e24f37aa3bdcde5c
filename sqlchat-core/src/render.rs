//! Render dispatch for conversation entries
//!
//! `render_entry` is a pure mapping from one entry to a presentation fragment
//! chosen by the entry's variant. Painting the fragment (terminal, HTML, ...)
//! is left to the presentation layer.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};

use crate::config::ChatConfig;
use crate::models::{ConversationEntry, EntryContent, EntryId, Sender, TableRows};

pub const USER_LABEL: &str = "You";
pub const ASSISTANT_LABEL: &str = "SQL Assistant";

// ============================================================================
// Fragments
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Unformatted content.
    Text(String),
    Label(String),
    EmphasizedLabel(String),
    /// Preformatted, monospace content.
    Code(String),
    Prose(String),
    Grid(Grid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEntry {
    pub id: EntryId,
    pub sender: Sender,
    pub sender_label: &'static str,
    /// Local creation time as `HH:MM`.
    pub time_label: String,
    pub blocks: Vec<Block>,
}

// ============================================================================
// Dispatch
// ============================================================================

pub fn render_entry(entry: &ConversationEntry) -> RenderedEntry {
    let text = entry.text().to_string();

    let blocks = match entry.content() {
        EntryContent::Plain | EntryContent::Unknown => vec![Block::Text(text)],
        EntryContent::Sql { sql } => vec![Block::Label(text), Block::Code(sql.clone())],
        EntryContent::Explanation { explanation } => {
            vec![Block::EmphasizedLabel(text), Block::Prose(explanation.clone())]
        }
        EntryContent::Table { rows, columns } => {
            let mut blocks = vec![Block::Label(text)];
            if !rows.is_empty() {
                blocks.push(Block::Grid(Grid {
                    headers: column_headers(rows, columns.as_deref()),
                    rows: rows.rows().to_vec(),
                }));
            }
            blocks
        }
    };

    RenderedEntry {
        id: entry.id(),
        sender: entry.sender(),
        sender_label: sender_label(entry.sender()),
        time_label: format_time(entry.timestamp()),
        blocks,
    }
}

pub fn render_log(entries: &[ConversationEntry]) -> Vec<RenderedEntry> {
    entries.iter().map(render_entry).collect()
}

/// Header cells for a grid. Column names are used when the service sent
/// one per column, otherwise headers are numbered from 1.
pub fn column_headers(rows: &TableRows, columns: Option<&[String]>) -> Vec<String> {
    let width = rows.column_count();
    match columns {
        Some(names) if names.len() == width => names.to_vec(),
        _ => (1..=width).map(|i| format!("Column {i}")).collect(),
    }
}

pub fn sender_label(sender: Sender) -> &'static str {
    match sender {
        Sender::User => USER_LABEL,
        Sender::Assistant => ASSISTANT_LABEL,
    }
}

pub fn format_time(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

// ============================================================================
// Typing indicator
// ============================================================================

/// Animated dots shown while a response is awaited. Derived from the
/// session's awaiting flag; never part of the log.
#[derive(Debug, Clone)]
pub struct TypingIndicator {
    speed: Duration,
    dot_count: usize,
    dots: usize,
}

impl TypingIndicator {
    /// `speed` is the time for one full cycle of `dot_count` dots.
    pub fn new(speed: Duration, dot_count: usize) -> Self {
        Self {
            speed,
            dot_count: dot_count.max(1),
            dots: 0,
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(
            Duration::from_millis(config.typing_speed_ms),
            config.typing_dot_count,
        )
    }

    pub fn frame_interval(&self) -> Duration {
        let count = u32::try_from(self.dot_count).unwrap_or(u32::MAX);
        (self.speed / count).max(Duration::from_millis(1))
    }

    /// Advance one frame: one more dot, wrapping to none after `dot_count`.
    pub fn next_frame(&mut self) -> String {
        self.dots = if self.dots >= self.dot_count {
            0
        } else {
            self.dots + 1
        };
        ".".repeat(self.dots)
    }

    pub fn reset(&mut self) {
        self.dots = 0;
    }
}

impl Default for TypingIndicator {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
