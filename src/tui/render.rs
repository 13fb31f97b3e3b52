/// Ratatui draw entry-point for Backster.
/// Thin dispatcher: most rendering lives in chat.rs and overlays.rs.
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::{AppState, Mode, SessionStatus};
use super::chat::{draw_history, spinner_frame};
use super::overlays::{EMPLOYMENT_PICKER_HEIGHT, draw_citation_browser, draw_employment_picker};

// ── Splash screen ─────────────────────────────────────────────────────────────

const LOGO: &str = r#"
  ██████╗  █████╗  ██████╗██╗  ██╗███████╗████████╗███████╗██████╗
  ██╔══██╗██╔══██╗██╔════╝██║ ██╔╝██╔════╝╚══██╔══╝██╔════╝██╔══██╗
  ██████╔╝███████║██║     █████╔╝ ███████╗   ██║   █████╗  ██████╔╝
  ██╔══██╗██╔══██║██║     ██╔═██╗ ╚════██║   ██║   ██╔══╝  ██╔══██╗
  ██████╔╝██║  ██║╚██████╗██║  ██╗███████║   ██║   ███████╗██║  ██║
  ╚═════╝ ╚═╝  ╚═╝ ╚═════╝╚═╝  ╚═╝╚══════╝   ╚═╝   ╚══════╝╚═╝  ╚═╝
"#;

pub fn draw_splash(f: &mut Frame, state: &AppState) {
    let area = f.area();
    f.render_widget(
        Block::default().style(Style::default().bg(Color::Black)),
        area,
    );

    let accent = park_accent(state.chat.park().style);
    let logo_lines: Vec<Line> = LOGO
        .lines()
        .enumerate()
        .map(|(i, line)| {
            let color = match i % 6 {
                0 => Color::DarkGray,
                1 | 5 => accent,
                2 | 4 => Color::Rgb(220, 220, 220),
                _ => Color::White,
            };
            Line::from(Span::styled(
                line.to_string(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
        })
        .collect();

    let logo_height = logo_lines.len() as u16;
    let y = area.height.saturating_sub(logo_height + 4) / 2;

    let logo_area = Rect {
        x: area.x,
        y: area.y + y,
        width: area.width,
        height: logo_height.min(area.height),
    };
    let subtitle_area = Rect {
        x: area.x,
        y: (logo_area.y + logo_height + 1).min(area.bottom().saturating_sub(1)),
        width: area.width,
        height: 1,
    };

    f.render_widget(
        Paragraph::new(logo_lines).alignment(Alignment::Center),
        logo_area,
    );
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("din digitala kollega", Style::default().fg(Color::DarkGray)),
            Span::styled("  ·  ", Style::default().fg(Color::DarkGray)),
            Span::styled(state.chat.park().name, Style::default().fg(accent)),
        ])).alignment(Alignment::Center),
        subtitle_area,
    );
}

// ── Park accent ───────────────────────────────────────────────────────────────

/// Accent colour for a park style key.
pub fn park_accent(style: &str) -> Color {
    match style {
        "gronalund"  => Color::Rgb(0, 170, 90),
        "furuvik"    => Color::Rgb(230, 120, 30),
        "kolmarden"  => Color::Rgb(60, 150, 220),
        "sommarland" => Color::Rgb(240, 200, 40),
        _            => Color::Cyan,
    }
}

// ── Main draw entry point ─────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, state: &AppState) {
    let area = f.area();

    let bottom = if state.mode == Mode::Onboarding {
        EMPLOYMENT_PICKER_HEIGHT
    } else {
        3
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),         // history
            Constraint::Length(1),      // status bar
            Constraint::Length(bottom), // input box or employment picker
        ])
        .split(area);

    draw_history(f, state, chunks[0]);
    draw_status_bar(f, state, chunks[1]);

    if state.mode == Mode::Onboarding {
        draw_employment_picker(f, state, chunks[2]);
    } else {
        draw_input(f, state, chunks[2]);
    }

    if state.chat.snapshot().citations.is_visible() {
        draw_citation_browser(f, state, chunks[0]);
    }
}

// ── Status bar ────────────────────────────────────────────────────────────────

fn draw_status_bar(f: &mut Frame, state: &AppState, area: Rect) {
    let accent = park_accent(state.chat.park().style);

    let (session_glyph, session_label, session_color) = match state.session_status {
        SessionStatus::Connecting => ("◌", "ansluter…", Color::DarkGray),
        SessionStatus::Ready => ("●", "ansluten", Color::Rgb(80, 200, 80)),
        SessionStatus::Unavailable => ("○", "ej ansluten", Color::Rgb(200, 80, 80)),
    };

    let mut spans = vec![
        Span::styled(" ▲", Style::default().fg(accent).add_modifier(Modifier::BOLD)),
        Span::styled(" backster", Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        Span::styled("  ", Style::default()),
        Span::styled(state.chat.park().name, Style::default().fg(accent).add_modifier(Modifier::BOLD)),
        Span::styled("  ·  ", Style::default().fg(Color::DarkGray)),
        Span::styled(state.profile.clone(), Style::default().fg(Color::Rgb(100, 180, 220))),
        Span::styled("  ", Style::default()),
        Span::styled(format!("{session_glyph} {session_label}"), Style::default().fg(session_color)),
    ];

    if let Some(kind) = state.chat.snapshot().conversation.classification() {
        spans.push(Span::styled("  ·  ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(kind.label(), Style::default().fg(Color::Rgb(160, 140, 255))));
    }

    if state.chat.snapshot().is_in_flight() {
        let (glyph, _, color) = spinner_frame(state.spinner_tick);
        spans.push(Span::styled("  ", Style::default()));
        spans.push(Span::styled(glyph, Style::default().fg(color).add_modifier(Modifier::BOLD)));
    }

    if state.scroll > 0 {
        spans.push(Span::styled(
            format!("  ↑{}", state.scroll),
            Style::default().fg(Color::Rgb(200, 160, 50)).add_modifier(Modifier::BOLD),
        ));
    }

    f.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Rgb(10, 10, 18))),
        area,
    );
}

// ── Input box ─────────────────────────────────────────────────────────────────

fn draw_input(f: &mut Frame, state: &AppState, area: Rect) {
    let accent = park_accent(state.chat.park().style);
    let snapshot = state.chat.snapshot();
    let dimmed = snapshot.citations.is_visible() || snapshot.is_in_flight();
    let (border_color, prompt_color, prompt_char) = if dimmed {
        (Color::Rgb(40, 40, 60), Color::DarkGray, "·")
    } else {
        (Color::Rgb(60, 60, 80), accent, "❯")
    };

    let prompt_span = Span::styled(
        format!("  {prompt_char} "),
        Style::default().fg(prompt_color).add_modifier(Modifier::BOLD),
    );

    let content_span = if state.chat.input().is_empty() {
        let hint = match state.session_status {
            SessionStatus::Unavailable => "Esc avslutar",
            _ if state.chat.snapshot().is_in_flight() => "väntar på svar…",
            _ => "skriv din fråga · Enter skickar · Ctrl+O källor · Esc avslutar",
        };
        Span::styled(hint, Style::default().fg(Color::Rgb(70, 70, 90)))
    } else {
        Span::styled(state.chat.input().to_string(), Style::default().fg(Color::White))
    };

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(Color::Rgb(8, 8, 14)));

    let paragraph = Paragraph::new(Line::from(vec![prompt_span, content_span]))
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, area);

    // Position cursor at the actual edit cursor, not end of string
    if state.mode == Mode::Normal && !snapshot.citations.is_visible() {
        use unicode_width::UnicodeWidthStr;
        // prompt is "  ❯ ": ❯ is 1 wide, total visible width is 4 cols
        let prompt_width: u16 = 4;
        let input = state.chat.input();
        let text_before_cursor = input.get(..state.cursor).unwrap_or(input);
        let cursor_x = area.x + prompt_width + text_before_cursor.width() as u16;
        let cursor_y = area.y + 1; // +1 for top border
        if cursor_x < area.x + area.width {
            f.set_cursor_position((cursor_x, cursor_y));
        }
    }
}
