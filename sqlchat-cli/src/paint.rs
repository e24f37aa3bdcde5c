//! Terminal painting of rendered entries

use std::io::{self, IsTerminal, Write};

use sqlchat_core::render::{Block, Grid, RenderedEntry, ASSISTANT_LABEL};

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";
const CLEAR_LINE: &str = "\r\x1b[2K";

#[derive(Debug, Clone, Copy)]
pub struct Painter {
    ansi: bool,
}

impl Painter {
    pub fn new(ansi: bool) -> Self {
        Self { ansi }
    }

    /// ANSI styling only when stdout is a terminal.
    pub fn for_stdout() -> Self {
        Self::new(io::stdout().is_terminal())
    }

    fn style(&self, code: &str, text: &str) -> String {
        if self.ansi {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    pub fn paint_entry(&self, out: &mut impl Write, entry: &RenderedEntry) -> io::Result<()> {
        writeln!(
            out,
            "{} {}",
            self.style(BOLD, entry.sender_label),
            self.style(DIM, &entry.time_label)
        )?;

        for block in &entry.blocks {
            match block {
                Block::Text(text) | Block::Label(text) | Block::Prose(text) => {
                    for line in text.lines() {
                        writeln!(out, "  {line}")?;
                    }
                }
                Block::EmphasizedLabel(text) => writeln!(out, "  {}", self.style(BOLD, text))?,
                Block::Code(code) => {
                    for line in code.lines() {
                        writeln!(out, "    {}", self.style(CYAN, line))?;
                    }
                }
                Block::Grid(grid) => {
                    for line in format_grid(grid) {
                        writeln!(out, "  {line}")?;
                    }
                }
            }
        }
        writeln!(out)
    }

    /// Redraw the typing line in place. No-op without a terminal.
    pub fn paint_typing(&self, out: &mut impl Write, dots: &str) -> io::Result<()> {
        if !self.ansi {
            return Ok(());
        }
        write!(out, "{CLEAR_LINE}{DIM}{ASSISTANT_LABEL} is typing{dots}{RESET}")?;
        out.flush()
    }

    pub fn clear_typing(&self, out: &mut impl Write) -> io::Result<()> {
        if !self.ansi {
            return Ok(());
        }
        write!(out, "{CLEAR_LINE}")?;
        out.flush()
    }
}

/// Lay a grid out as aligned text lines: header, rule, rows.
pub fn format_grid(grid: &Grid) -> Vec<String> {
    let mut widths: Vec<usize> = grid.headers.iter().map(|h| h.chars().count()).collect();
    for row in &grid.rows {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
    }

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(grid.rows.len() + 2);
    lines.push(format_row(grid.headers.as_slice()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    lines.extend(grid.rows.iter().map(|row| format_row(row.as_slice())));
    lines
}
