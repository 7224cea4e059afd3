//! Rendering of the display model. Reads controller state, never mutates it.

use crate::session::{
    ChatEntry, LogEntry, SendAffordance, Sender, SessionController, Severity, SpanKind, Tone,
    SLOT_COUNT,
};
use crate::utf8_safe::{display_width, ellipsize_columns, wrap_by_columns};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

const BORDER: Color = Color::Rgb(90, 140, 200);
const DIM: Color = Color::Rgb(120, 125, 135);
const TEXT: Color = Color::Rgb(210, 210, 205);
const USER: Color = Color::Rgb(120, 200, 255);
const AI: Color = Color::Rgb(150, 220, 160);
const FAILURE: Color = Color::Rgb(255, 95, 95);
const WARN: Color = Color::Rgb(255, 200, 90);
const SYSTEM: Color = Color::Rgb(110, 210, 230);
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Success => AI,
        Tone::Danger => FAILURE,
        Tone::Warning => WARN,
        Tone::Muted => DIM,
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => TEXT,
        Severity::Warn => WARN,
        Severity::Error => FAILURE,
        Severity::System => SYSTEM,
    }
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(BORDER).add_modifier(Modifier::BOLD),
        ))
}

/// Render header, inventory, transcript, log, input and key hints.
pub(super) fn draw(frame: &mut Frame<'_>, ctrl: &SessionController) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.size());
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[2]);

    frame.render_widget(Paragraph::new(header_line(ctrl)).block(panel("Sortpanel")), rows[0]);
    frame.render_widget(
        Paragraph::new(inventory_line(ctrl)).block(panel("Inventory")),
        rows[1],
    );
    draw_transcript(frame, ctrl, body[0]);
    draw_log(frame, ctrl, body[1]);
    draw_input(frame, ctrl, rows[3]);
    frame.render_widget(Paragraph::new(footer_line(ctrl)), rows[4]);
}

fn header_line(ctrl: &SessionController) -> Line<'static> {
    let projection = ctrl.state().projection();
    let link = ctrl.connectivity();
    let (link_label, link_color) = if link.link_lost() {
        ("LINK LOST", FAILURE)
    } else if link.status_stale() {
        ("STALE", WARN)
    } else if !link.status_seen() {
        ("CONNECTING", DIM)
    } else {
        (projection.link_badge, tone_color(projection.link_tone))
    };
    let model = match ctrl.model_name() {
        None => "…".to_string(),
        Some("") => "not configured".to_string(),
        Some(name) => name.to_string(),
    };
    let sep = || Span::styled("  │  ", Style::default().fg(DIM));
    Line::from(vec![
        Span::styled(
            projection.status_label,
            Style::default()
                .fg(tone_color(projection.status_tone))
                .add_modifier(Modifier::BOLD),
        ),
        sep(),
        Span::styled(link_label, Style::default().fg(link_color)),
        sep(),
        Span::styled(
            projection.ai_badge,
            Style::default().fg(tone_color(projection.ai_tone)),
        ),
        sep(),
        Span::styled("model ", Style::default().fg(DIM)),
        Span::styled(model, Style::default().fg(TEXT)),
    ])
}

fn inventory_line(ctrl: &SessionController) -> Line<'static> {
    let mut spans = Vec::with_capacity(SLOT_COUNT * 2);
    for (idx, occupied) in ctrl.state().inventory().iter().enumerate() {
        let (label, color) = if *occupied {
            ("■ full", WARN)
        } else {
            ("□ free", DIM)
        };
        spans.push(Span::styled(
            format!("Bin {} ", idx + 1),
            Style::default().fg(TEXT),
        ));
        spans.push(Span::styled(format!("{label}   "), Style::default().fg(color)));
    }
    Line::from(spans)
}

/// Transcript as display lines, wrapped to `width` columns.
pub(super) fn transcript_lines(ctrl: &SessionController, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for entry in ctrl.transcript().entries() {
        push_entry_lines(&mut lines, entry, width);
    }
    lines
}

fn push_entry_lines(lines: &mut Vec<Line<'static>>, entry: &ChatEntry, width: usize) {
    let sender_color = match entry.sender {
        Sender::User => USER,
        Sender::Ai => AI,
        Sender::System => SYSTEM,
    };
    lines.push(Line::from(vec![
        Span::styled(
            entry.sender.label().to_string(),
            Style::default()
                .fg(sender_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {}", entry.timestamp.format("%H:%M:%S")),
            Style::default().fg(DIM),
        ),
    ]));
    for span in &entry.spans {
        if span.text.is_empty() {
            continue;
        }
        let style = if span.failure_style() {
            Style::default().fg(FAILURE)
        } else if span.kind == SpanKind::Continuation {
            Style::default().fg(severity_color(span.severity))
        } else {
            Style::default().fg(TEXT)
        };
        for text in wrap_by_columns(&span.text, width.saturating_sub(2)) {
            lines.push(Line::from(Span::styled(format!("  {text}"), style)));
        }
    }
    if entry.loading {
        lines.push(Line::from(Span::styled(
            "  thinking…",
            Style::default().fg(DIM).add_modifier(Modifier::ITALIC),
        )));
    }
    lines.push(Line::from(""));
}

fn draw_transcript(frame: &mut Frame<'_>, ctrl: &SessionController, area: Rect) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let lines = if ctrl.transcript().is_empty() {
        vec![Line::from(Span::styled(
            "No messages yet. Type a command and press Enter.",
            Style::default().fg(DIM),
        ))]
    } else {
        transcript_lines(ctrl, inner_width)
    };
    let visible = bottom_window(lines, inner_height, ctrl.scroll_offset() as usize);
    frame.render_widget(Paragraph::new(visible).block(panel("Chat")), area);
}

/// Keep the `height` lines ending `offset` lines above the bottom.
pub(super) fn bottom_window<T>(mut lines: Vec<T>, height: usize, offset: usize) -> Vec<T> {
    let max_offset = lines.len().saturating_sub(height);
    let end = lines.len() - offset.min(max_offset);
    let start = end.saturating_sub(height);
    lines.truncate(end);
    lines.drain(..start);
    lines
}

fn log_line(entry: &LogEntry, width: usize) -> Line<'static> {
    let prefix = entry
        .timestamp
        .map(|at| format!("[{}] ", at.format(TIMESTAMP_FORMAT)))
        .unwrap_or_default();
    let text = ellipsize_columns(&entry.text, width.saturating_sub(display_width(&prefix)));
    Line::from(vec![
        Span::styled(prefix, Style::default().fg(DIM)),
        Span::styled(text, Style::default().fg(severity_color(entry.severity))),
    ])
}

fn draw_log(frame: &mut Frame<'_>, ctrl: &SessionController, area: Rect) {
    let width = area.width.saturating_sub(2) as usize;
    let height = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = ctrl
        .log()
        .entries()
        .rev()
        .take(height)
        .rev()
        .map(|entry| log_line(entry, width))
        .collect();
    frame.render_widget(Paragraph::new(lines).block(panel("Log")), area);
}

fn draw_input(frame: &mut Frame<'_>, ctrl: &SessionController, area: Rect) {
    let projection = ctrl.state().projection();
    let inner_width = area.width.saturating_sub(2) as usize;
    let input = ctrl.input();
    let (text, style) = if input.is_empty() {
        (
            projection.placeholder.to_string(),
            Style::default().fg(DIM).add_modifier(Modifier::ITALIC),
        )
    } else {
        // Show the tail so the cursor end stays visible.
        let width = display_width(input);
        let skip = width.saturating_sub(inner_width.saturating_sub(1));
        (
            crate::utf8_safe::window_by_columns(input, skip, inner_width).to_string(),
            Style::default().fg(TEXT),
        )
    };
    let (hint, hint_color) = match projection.send {
        SendAffordance::Send => (" Enter send ", AI),
        SendAffordance::Interrupt => (" Enter interrupt ", FAILURE),
    };
    let block = panel(if projection.input_enabled {
        "Message"
    } else {
        "Locked"
    })
    .title_bottom(Line::from(Span::styled(
        hint,
        Style::default().fg(hint_color).add_modifier(Modifier::BOLD),
    )));
    frame.render_widget(Paragraph::new(text.clone()).style(style).block(block), area);

    if projection.input_enabled {
        let shown = if input.is_empty() { 0 } else { display_width(&text) };
        let offset = shown.min(inner_width) as u16;
        frame.set_cursor(area.x + 1 + offset, area.y + 1);
    }
}

fn footer_line(ctrl: &SessionController) -> Line<'static> {
    let projection = ctrl.state().projection();
    let key = |k: &'static str| {
        Span::styled(k, Style::default().fg(USER).add_modifier(Modifier::BOLD))
    };
    let label = |l: String| Span::styled(l, Style::default().fg(DIM));
    Line::from(vec![
        key(" Ctrl+S "),
        Span::styled(
            projection.primary_label,
            Style::default().fg(tone_color(projection.primary_tone)),
        ),
        label("  ".into()),
        key("Ctrl+L "),
        label("clear log  ".into()),
        key("PgUp/PgDn "),
        label("scroll  ".into()),
        key("Esc "),
        label("clear input  ".into()),
        key("Ctrl+C "),
        label("quit".into()),
    ])
}
