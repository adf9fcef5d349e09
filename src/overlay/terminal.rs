//! Terminal-backed overlay canvas
//!
//! Maps canvas coordinates onto a character grid: one cell is
//! `CELL_WIDTH` units wide and one line height tall. Drawing is buffered
//! between `fill` and `present`, then flushed as a single ratatui frame.

use std::io::{self, stdout, Stdout};

use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle},
    ExecutableCommand,
};
use ratatui::prelude::*;
use ratatui::widgets::Block;

use crate::config::OverlayConfig;

use super::render::Canvas;

/// Horizontal canvas units per terminal column
pub const CELL_WIDTH: u32 = 10;

/// Raw mode plus alternate screen, restored on drop
pub struct TerminalSession {
    active: bool,
}

impl TerminalSession {
    /// Enter raw mode and the alternate screen, titling the window
    pub fn enter(title: &str) -> io::Result<Self> {
        enable_raw_mode()?;
        let session = Self { active: true };
        stdout().execute(EnterAlternateScreen)?;
        // Not every terminal honors titles
        if let Err(e) = stdout().execute(SetTitle(title)) {
            tracing::debug!("Failed to set terminal title: {}", e);
        }
        Ok(session)
    }

    /// Restore the terminal, reporting failures through tracing
    pub fn exit(mut self) -> io::Result<()> {
        self.active = false;
        stdout().execute(LeaveAlternateScreen)?;
        disable_raw_mode()?;
        tracing::debug!("Terminal restored");
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        // Tracing output may be routed to this very terminal
        if let Err(e) = stdout().execute(LeaveAlternateScreen) {
            eprintln!("Terminal teardown: failed to leave alternate screen: {}", e);
        }
        if let Err(e) = disable_raw_mode() {
            eprintln!("Terminal teardown: failed to disable raw mode: {}", e);
        }
    }
}

#[derive(Debug, Clone)]
struct TextOp {
    column: u16,
    row: u16,
    text: String,
    color: Color,
}

/// [`Canvas`] drawing onto a ratatui terminal
pub struct TerminalCanvas<B: Backend> {
    terminal: Terminal<B>,
    cell_height: u32,
    background: Color,
    pending: Vec<TextOp>,
    session: Option<TerminalSession>,
}

impl TerminalCanvas<CrosstermBackend<Stdout>> {
    /// Take over stdout as the overlay surface
    pub fn stdout(config: &OverlayConfig) -> io::Result<Self> {
        let session = TerminalSession::enter(&config.window_name)?;
        let mut canvas = Self::new(CrosstermBackend::new(stdout()), config.line_height)?;
        canvas.terminal.hide_cursor()?;
        canvas.terminal.clear()?;
        canvas.session = Some(session);
        Ok(canvas)
    }

    /// Restore the terminal before the canvas goes away
    pub fn close(mut self) -> io::Result<()> {
        self.terminal.show_cursor()?;
        match self.session.take() {
            Some(session) => session.exit(),
            None => Ok(()),
        }
    }
}

impl<B: Backend> TerminalCanvas<B> {
    /// Wrap `backend`; each text row is `line_height` canvas units tall
    pub fn new(backend: B, line_height: u32) -> io::Result<Self> {
        Ok(Self {
            terminal: Terminal::new(backend)?,
            cell_height: line_height.max(1),
            background: Color::Reset,
            pending: Vec::new(),
            session: None,
        })
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }

    /// Grid cell holding a baseline at (`x`, `y`)
    fn cell(&self, x: u32, y: u32) -> (u16, u16) {
        let column = x / CELL_WIDTH;
        let row = y.saturating_sub(1) / self.cell_height;
        (
            column.min(u16::MAX as u32) as u16,
            row.min(u16::MAX as u32) as u16,
        )
    }
}

impl<B: Backend> Canvas for TerminalCanvas<B> {
    fn size(&self) -> io::Result<(u32, u32)> {
        let area = self.terminal.size()?;
        Ok((
            area.width as u32 * CELL_WIDTH,
            area.height as u32 * self.cell_height,
        ))
    }

    fn fill(&mut self, color: Color) -> io::Result<()> {
        self.background = color;
        self.pending.clear();
        Ok(())
    }

    fn draw_text(&mut self, x: u32, y: u32, text: &str, color: Color) -> io::Result<()> {
        let (column, row) = self.cell(x, y);
        self.pending.push(TextOp {
            column,
            row,
            text: text.to_string(),
            color,
        });
        Ok(())
    }

    fn present(&mut self) -> io::Result<()> {
        let background = self.background;
        let ops = std::mem::take(&mut self.pending);

        self.terminal.draw(|frame| {
            let area = frame.size();
            frame.render_widget(Block::default().style(Style::default().bg(background)), area);

            let buf = frame.buffer_mut();
            for op in &ops {
                if op.row >= area.height || op.column >= area.width {
                    continue;
                }
                let width = (area.width - op.column) as usize;
                buf.set_stringn(
                    area.x + op.column,
                    area.y + op.row,
                    &op.text,
                    width,
                    Style::default().fg(op.color).bg(background),
                );
            }
        })?;
        Ok(())
    }
}
