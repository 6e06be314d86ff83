// SPDX-License-Identifier: GPL-3.0-only

//! Full-screen terminal view
//!
//! Redraws the verbose report in place on the alternate screen, with a
//! status bar at the bottom. `q`, `Esc` and Ctrl+C quit; raw mode swallows
//! SIGINT, so Ctrl+C arrives here as a key press.

use std::io::{self, Stdout, stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};
use tracing::{debug, warn};

use crate::errors::AppResult;
use crate::monitor::{MonitorStatus, ReportSink};
use crate::report::{HistogramRow, Report};

/// Report sink drawing on the alternate screen
pub struct TerminalSink {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl TerminalSink {
    /// Switch the terminal to raw mode and the alternate screen
    pub fn enter() -> AppResult<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        debug!("Entered terminal view");
        Ok(Self {
            terminal,
            active: true,
        })
    }

    /// Give the terminal back to the shell
    pub fn restore(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for TerminalSink {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!(error = %e, "Failed to restore terminal");
        }
    }
}

impl ReportSink for TerminalSink {
    fn show(&mut self, report: &Report, status: &MonitorStatus) -> AppResult<()> {
        self.terminal.draw(|f| {
            let area = f.area();
            let report_area = Rect {
                height: area.height.saturating_sub(1),
                ..area
            };
            let status_area = Rect {
                y: area.y + area.height.saturating_sub(1),
                height: 1.min(area.height),
                ..area
            };

            f.render_widget(ReportView { report }, report_area);
            f.render_widget(
                StatusBar {
                    message: &status_message(status),
                    alert: status.degraded,
                },
                status_area,
            );
        })?;
        Ok(())
    }

    fn poll_quit(&mut self) -> AppResult<bool> {
        if !event::poll(Duration::ZERO)? {
            return Ok(false);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(false);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(false);
        }

        let ctrl_c =
            key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
        Ok(ctrl_c || matches!(key.code, KeyCode::Char('q') | KeyCode::Esc))
    }
}

fn status_message(status: &MonitorStatus) -> String {
    format!(
        " {} | {} | frames {} | skipped {} | {} (>{}% invalid) | 'q' quit",
        status.source,
        status.mode.display_name(),
        status.summary.frames_received,
        status.summary.frames_degenerate + status.summary.frames_rejected,
        if status.degraded { "DEGRADED" } else { "ok" },
        status.threshold_percent,
    )
}

/// Renders a report line by line
struct ReportView<'a> {
    report: &'a Report,
}

impl Widget for ReportView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bottom = area.y + area.height;
        let mut y = area.y;

        match self.report {
            Report::Value(value) => {
                if area.height > 0 {
                    buf.set_stringn(area.x, y, value, area.width as usize, Style::default());
                }
            }
            Report::Verbose(report) => {
                for line in &report.summary {
                    if y >= bottom {
                        return;
                    }
                    buf.set_stringn(area.x, y, line, area.width as usize, Style::default());
                    y += 1;
                }
                for row in &report.rows {
                    if y >= bottom {
                        return;
                    }
                    render_row(row, area.x, y, area.width, buf);
                    y += 1;
                }
            }
        }
    }
}

fn render_row(row: &HistogramRow, x: u16, y: u16, width: u16, buf: &mut Buffer) {
    let label = format!("{}: ", row.label);
    let (label_end, _) = buf.set_stringn(x, y, &label, width as usize, Style::default());

    let color = if row.label.trim() == "Out" {
        Color::Red
    } else if row.is_median {
        Color::Yellow
    } else {
        Color::Green
    };
    let bar: String = std::iter::repeat_n(row.bar_char(), row.bar_len).collect();
    let remaining = (x + width).saturating_sub(label_end) as usize;
    buf.set_stringn(label_end, y, &bar, remaining, Style::default().fg(color));
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
    alert: bool,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg = if self.alert { Color::Red } else { Color::DarkGray };
        let style = Style::default().fg(Color::White).bg(bg);

        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(bg);
            }
        }
        buf.set_stringn(area.x, area.y, self.message, area.width as usize, style);
    }
}
