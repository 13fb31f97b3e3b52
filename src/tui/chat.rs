/// Chat history pane rendering: build_items, draw_history, spinner, utilities.
use chrono::Local;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, List, ListItem},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::AppState;
use super::render::park_accent;
use crate::conversation::{Message, Role};

// ── Spinner ────────────────────────────────────────────────────────────────────

pub const SPINNER_GLYPHS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const SPINNER_MSGS: &[(&str, Color)] = &[
    ("letar i handböckerna…", Color::Cyan),
    ("läser rutiner…",        Color::Cyan),
    ("formulerar svar…",      Color::Rgb(0, 200, 255)),
    ("nästan klart…",         Color::Rgb(0, 220, 180)),
];

pub fn spinner_frame(tick: u32) -> (&'static str, &'static str, Color) {
    let glyph = SPINNER_GLYPHS[(tick as usize) % SPINNER_GLYPHS.len()];
    // Message cycles more slowly: changes every ~2 seconds (120ms × 16 ticks)
    let msg_idx = (tick as usize / 16) % SPINNER_MSGS.len();
    let (msg, color) = SPINNER_MSGS[msg_idx];
    (glyph, msg, color)
}

// ── History items builder ──────────────────────────────────────────────────────

pub fn build_items(state: &AppState, term_width: u16) -> Vec<ListItem<'static>> {
    let mut items: Vec<ListItem<'static>> = Vec::new();
    let log = &state.chat.snapshot().conversation.log;

    for message in log.iter() {
        match message.role {
            Role::User => push_user_bubble(&mut items, state, message, term_width),
            Role::Bot => push_bot_message(&mut items, state, message, term_width),
        }
    }

    if state.chat.snapshot().is_in_flight() {
        let (glyph, msg, color) = spinner_frame(state.spinner_tick);
        items.push(ListItem::new(Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{glyph} "), Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(msg.to_string(), Style::default().fg(color).add_modifier(Modifier::DIM)),
        ])));
    }

    items
}

fn push_user_bubble(items: &mut Vec<ListItem<'static>>, state: &AppState, message: &Message, term_width: u16) {
    // Bubble colours
    let bg       = Color::Rgb(28, 26, 52);
    let border   = Color::Rgb(110, 90, 200);
    let label_fg = Color::Rgb(160, 140, 255);
    let text_fg  = Color::Rgb(235, 232, 255);
    let body_style = Style::default().fg(text_fg).bg(bg);
    let edge_style = Style::default().fg(border).bg(bg);

    // 2 chars left margin, 1 right margin
    let inner_w = (term_width as usize).saturating_sub(3).max(10);
    let label = match stamp(state, message) {
        Some(t) => format!("du · {t}"),
        None => "du".to_string(),
    };
    // "╭─ " + label + " " + "╮"
    let dash_total = inner_w.saturating_sub(4 + label.width() + 1);
    items.push(ListItem::new(Line::from(vec![
        Span::raw("  "),
        Span::styled("╭─ ".to_string(), edge_style),
        Span::styled(label, Style::default().fg(label_fg).bg(bg).add_modifier(Modifier::BOLD)),
        Span::styled(format!(" {}╮", "─".repeat(dash_total)), edge_style),
    ])));

    let wrap_width = inner_w.saturating_sub(2).max(10);
    let raw_lines: Vec<&str> = if message.text.is_empty() { vec![""] } else { message.text.lines().collect() };
    for line in raw_lines.iter().flat_map(|line| wrap_text(line, wrap_width)) {
        items.push(ListItem::new(Line::from(vec![
            Span::raw("  "),
            Span::styled("│ ", edge_style),
            Span::styled(line, body_style),
        ])));
    }

    let bot_dashes = "─".repeat(inner_w.saturating_sub(2));
    items.push(ListItem::new(Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("╰{bot_dashes}╯"), edge_style),
    ])));
    items.push(ListItem::new(Line::raw("")));
}

fn push_bot_message(items: &mut Vec<ListItem<'static>>, state: &AppState, message: &Message, term_width: u16) {
    // "  backster " = 11 cols; continuation lines indent to match
    let wrap_width = (term_width as usize).saturating_sub(11).max(20);
    let label_fg = park_accent(state.chat.park().style);
    let text_fg  = Color::Rgb(210, 230, 255);

    let mut first = true;
    for src_line in message.text.lines() {
        for w in wrap_text(src_line, wrap_width) {
            if first {
                first = false;
                items.push(ListItem::new(Line::from(vec![
                    Span::raw("  "),
                    Span::styled("backster", Style::default().fg(label_fg).add_modifier(Modifier::BOLD)),
                    Span::raw(" "),
                    Span::styled(w, Style::default().fg(text_fg)),
                ])));
            } else {
                items.push(ListItem::new(Line::from(vec![
                    Span::raw("           "),
                    Span::styled(w, Style::default().fg(text_fg)),
                ])));
            }
        }
    }

    let latest_answer = state.chat.snapshot().conversation.log.last_answer() == Some(message.ordinal);
    let mut footer: Vec<Span<'static>> = vec![Span::raw("           ")];
    if let Some(t) = stamp(state, message) {
        footer.push(Span::styled(t, Style::default().fg(Color::Rgb(70, 70, 90))));
        footer.push(Span::raw("  "));
    }
    let labels = state.chat.snapshot().citations.set().labels();
    if latest_answer && !labels.is_empty() {
        footer.push(Span::styled(
            format!("källor: {} · Ctrl+O", labels.join(", ")),
            Style::default().fg(Color::Rgb(110, 100, 60)),
        ));
    }
    if footer.len() > 1 {
        items.push(ListItem::new(Line::from(footer)));
    }
    items.push(ListItem::new(Line::raw("")));
}

fn stamp(state: &AppState, message: &Message) -> Option<String> {
    state
        .show_timestamps
        .then(|| message.sent_at.with_timezone(&Local).format("%H:%M").to_string())
}

pub fn draw_history(f: &mut Frame, state: &AppState, area: Rect) {
    let all_items = build_items(state, area.width);
    let total = all_items.len();
    let visible = area.height as usize;

    let skip = if total > visible {
        (total - visible).saturating_sub(state.scroll)
    } else {
        0
    };

    let sliced: Vec<ListItem<'static>> = all_items.into_iter().skip(skip).collect();
    let list = List::new(sliced)
        .block(Block::default().style(Style::default().bg(Color::Rgb(8, 8, 14))));
    f.render_widget(list, area);
}

// ── Utilities ──────────────────────────────────────────────────────────────────

/// Greedy word wrap by display width. Words wider than the line are split.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return vec![String::new()];
    }
    let max_width = max_width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;

    for word in text.split_whitespace() {
        let word_width = word.width();
        if word_width > max_width {
            if current_width > 0 {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            for ch in word.chars() {
                let w = ch.width().unwrap_or(0);
                if current_width + w > max_width {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                current.push(ch);
                current_width += w;
            }
        } else if current_width == 0 {
            current.push_str(word);
            current_width = word_width;
        } else if current_width + 1 + word_width <= max_width {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_width = word_width;
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
