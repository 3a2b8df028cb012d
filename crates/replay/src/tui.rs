use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::session::{RowView, SessionStats};

const COLUMNS: usize = 4;
const COLUMN_HEIGHT: usize = 20;

pub struct TabView<'a> {
    pub rows: &'a [RowView],
    pub stats: &'a SessionStats,
    pub packets: usize,
    pub header: Option<(String, String)>,
    pub passthrough: bool,
}

pub fn render(frame: &mut Frame, view: &TabView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(COLUMN_HEIGHT as u16 + 2),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], view);
    render_grid(frame, chunks[1], view.rows);
    render_help(frame, chunks[2]);
}

fn render_header(frame: &mut Frame, area: Rect, view: &TabView) {
    let title = match &view.header {
        Some((header, _)) if !header.is_empty() => format!(" {header} "),
        _ => String::from(" Tab List "),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mode = if view.passthrough {
        "passthrough"
    } else {
        "virtualized"
    };
    let stats = view.stats;
    let text = format!(
        "Mode: {mode}  |  Rows: {}  |  Steps: {}  |  Pass/Mod/Cancel: {}/{}/{}  |  Rejected: {}  |  Packets: {}",
        view.rows.len(),
        stats.steps,
        stats.passed,
        stats.modified,
        stats.cancelled,
        stats.rejected,
        view.packets
    );

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);
}

/// Rows fill columns top to bottom, the way the client lays them out.
fn render_grid(frame: &mut Frame, area: Rect, rows: &[RowView]) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, COLUMNS as u32); COLUMNS])
        .split(area);

    for (column, chunk) in columns.iter().enumerate() {
        let start = column * COLUMN_HEIGHT;
        let lines: Vec<Line> = rows
            .iter()
            .skip(start)
            .take(COLUMN_HEIGHT)
            .map(row_line)
            .collect();

        let block = Block::default()
            .title(format!(" {}-{} ", start, start + COLUMN_HEIGHT - 1))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        frame.render_widget(Paragraph::new(lines).block(block), *chunk);
    }
}

fn row_line(row: &RowView) -> Line<'static> {
    let style = if row.real {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Gray)
    };
    let label = if row.text.is_empty() {
        short_id(row)
    } else {
        row.text.clone()
    };

    Line::from(vec![
        Span::styled(format!("{:>2} ", row.index), Style::default().fg(Color::DarkGray)),
        Span::styled(label, style),
        Span::styled(
            format!(" {}ms", row.latency),
            Style::default().fg(Color::Yellow),
        ),
    ])
}

fn short_id(row: &RowView) -> String {
    let id = row.occupant.to_string();
    id.chars().take(8).collect()
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("Press 'q' or ESC to quit")
        .block(block)
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );
    frame.render_widget(text, area);
}
