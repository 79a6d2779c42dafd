use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap};
use ratatui::Frame;

use crate::action::Focus;
use crate::app::App;
use crate::composer::{Composer, ComposerTab, PreviewState};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let composer = &app.composer;
    let focused = app.focus == Focus::Composer;

    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(
            format!(" {} ", composer.avatar_label()),
            Style::default().fg(Color::Yellow),
        ));

    frame.render_widget(Clear, area);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [tabs_area, body_area, footer_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(inner);

    let selected = match composer.tab() {
        ComposerTab::Write => 0,
        ComposerTab::Preview => 1,
    };
    let tabs = Tabs::new(vec!["Write", "Preview"])
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, tabs_area);

    let body = match composer.tab() {
        ComposerTab::Write => write_text(composer, focused),
        ComposerTab::Preview => preview_text(composer.preview()),
    };
    frame.render_widget(
        Paragraph::new(body).wrap(Wrap { trim: false }),
        body_area,
    );

    frame.render_widget(Paragraph::new(footer(app)), footer_area);
}

fn write_text(composer: &Composer, focused: bool) -> Text<'static> {
    if composer.text().is_empty() {
        let mut spans = Vec::new();
        if focused && composer.input_enabled() {
            spans.push(cursor_span(" "));
        }
        spans.push(Span::styled(
            composer.placeholder(),
            Style::default().fg(Color::DarkGray),
        ));
        return Text::from(Line::from(spans));
    }

    let show_cursor = focused && composer.input_enabled();
    let (before, after) = composer.text().split_at(composer.cursor());
    let mut lines: Vec<Line> = Vec::new();
    let mut current: Vec<Span> = Vec::new();

    push_segment(&mut lines, &mut current, before);
    if show_cursor {
        match after.chars().next() {
            Some('\n') | None => current.push(cursor_span(" ")),
            Some(c) => current.push(cursor_span(&c.to_string())),
        }
        let rest = match after.chars().next() {
            Some('\n') | None => after,
            Some(c) => &after[c.len_utf8()..],
        };
        push_segment(&mut lines, &mut current, rest);
    } else {
        push_segment(&mut lines, &mut current, after);
    }
    lines.push(Line::from(current));
    Text::from(lines)
}

/// Append `text` to the line being built, starting new lines at each newline.
fn push_segment(lines: &mut Vec<Line<'static>>, current: &mut Vec<Span<'static>>, text: &str) {
    let mut parts = text.split('\n');
    if let Some(first) = parts.next() {
        if !first.is_empty() {
            current.push(Span::raw(first.to_string()));
        }
    }
    for part in parts {
        lines.push(Line::from(std::mem::take(current)));
        if !part.is_empty() {
            current.push(Span::raw(part.to_string()));
        }
    }
}

fn cursor_span(text: &str) -> Span<'static> {
    Span::styled(
        text.to_string(),
        Style::default().add_modifier(Modifier::REVERSED),
    )
}

fn preview_text(preview: &PreviewState) -> Text<'static> {
    match preview {
        PreviewState::Rendered { lines, links } => {
            let mut text = lines.clone();
            text.extend(links.iter().enumerate().map(|(i, link)| {
                Line::from(Span::styled(
                    format!("[{}] {}", i + 1, link),
                    Style::default().fg(Color::DarkGray),
                ))
            }));
            Text::from(text)
        }
        other => Text::from(Span::styled(
            other.placeholder().unwrap_or_default(),
            Style::default().fg(Color::DarkGray),
        )),
    }
}

fn footer(app: &App) -> Line<'static> {
    let composer = &app.composer;
    if !app.signed_in() {
        return Line::from(Span::styled(
            "Sign in to comment: run natter --login",
            Style::default().fg(Color::Yellow),
        ));
    }
    if composer.is_submitting() {
        return Line::from(Span::styled(
            "Posting...",
            Style::default().fg(Color::Yellow),
        ));
    }
    let style = if composer.can_submit() {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Line::from(vec![
        Span::styled("Ctrl+S: Comment", style),
        Span::styled("  Ctrl+P: Write/Preview", Style::default().fg(Color::Gray)),
    ])
}
