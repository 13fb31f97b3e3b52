/// Overlay/popup draw functions: employment picker, citation browser.
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use super::AppState;
use super::render::park_accent;
use crate::conversation::EmploymentType;

// ── Employment picker ──────────────────────────────────────────────────────────

/// Two options plus top border and hint line.
pub const EMPLOYMENT_PICKER_HEIGHT: u16 = EmploymentType::ALL.len() as u16 + 2;

pub fn draw_employment_picker(f: &mut Frame, state: &AppState, area: Rect) {
    let accent = park_accent(state.chat.park().style);
    let sel = state.picker_selected;

    let mut items: Vec<ListItem<'static>> = EmploymentType::ALL
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let (marker, style) = if i == sel {
                ("  ▸ ", Style::default().fg(Color::Black).bg(accent).add_modifier(Modifier::BOLD))
            } else {
                ("    ", Style::default().fg(Color::White))
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(accent)),
                Span::styled(format!(" {} ", kind.label()), style),
            ]))
        })
        .collect();
    items.push(ListItem::new(Line::from(Span::styled(
        "    ↑↓ välj · Enter bekräfta · Esc avsluta",
        Style::default().fg(Color::Rgb(70, 70, 90)),
    ))));

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(accent))
        .style(Style::default().bg(Color::Rgb(8, 8, 14)));

    f.render_widget(List::new(items).block(block), area);
}

// ── Citation browser ───────────────────────────────────────────────────────────

pub fn draw_citation_browser(f: &mut Frame, state: &AppState, area: Rect) {
    let set = state.chat.snapshot().citations.set();
    let Some((label, body)) = set.current() else {
        return;
    };

    // 2-char inset from the history pane edges
    let overlay_area = Rect {
        x: area.x + 2,
        y: area.y + 1,
        width: area.width.saturating_sub(4),
        height: area.height.saturating_sub(2),
    };
    if overlay_area.width < 10 || overlay_area.height < 4 {
        return;
    }

    f.render_widget(Clear, overlay_area);

    let accent = park_accent(state.chat.park().style);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {}/{}  {label} ", set.cursor() + 1, set.len()),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Span::styled(
            " ←/→ bläddra · j/k scrolla · Esc stäng ",
            Style::default().fg(Color::DarkGray),
        ))
        .border_style(Style::default().fg(accent))
        .style(Style::default().bg(Color::Rgb(8, 8, 14)));

    let inner = block.inner(overlay_area);
    f.render_widget(block, overlay_area);

    // Markup is never rendered as-is: show its text projection only.
    let lines: Vec<Line> = body
        .to_plain_text()
        .lines()
        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Rgb(210, 230, 255)))))
        .collect();

    let total_lines = lines.len();
    let visible_height = inner.height as usize;
    // Clamp scroll so we don't scroll past the end
    let scroll = state
        .citation_scroll
        .min(total_lines.saturating_sub(visible_height));

    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll as u16, 0))
            .style(Style::default().bg(Color::Rgb(8, 8, 14))),
        inner,
    );
}
