mod composer;
mod popup;
mod timeline;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::action::Focus;
use crate::app::App;
use crate::types::ReactionKind;

/// Height of the comment form, borders included
const COMPOSER_HEIGHT: u16 = 10;

pub fn render(frame: &mut Frame, app: &App) {
    let composer_height = if app.composer_visible() {
        COMPOSER_HEIGHT
    } else {
        0
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(composer_height),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    timeline::render(frame, app, chunks[1]);
    if app.composer_visible() {
        composer::render(frame, app, chunks[2]);
    }
    render_status_bar(frame, app, chunks[3]);

    if let Some(selected) = app.reaction_menu {
        let items: Vec<String> = ReactionKind::ALL.iter().map(|k| k.to_string()).collect();
        popup::render_select(frame, "React", &items, selected);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!("{}/{}#{}", app.owner, app.repo, app.number);

    let mut spans = vec![Span::styled(
        title,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    if app.loaded {
        spans.push(Span::raw(" · "));
        spans.push(Span::raw(app.timeline.count_label()));
    }
    if app.timeline.locked() {
        spans.push(Span::styled(
            "  [locked]",
            Style::default().fg(Color::Red),
        ));
    }
    if let Some(user) = app.timeline.user() {
        spans.push(Span::styled(
            format!("  @{}", user.login),
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = if let Some(error) = &app.error {
        Line::from(vec![Span::styled(
            format!("Error: {}", error),
            Style::default().fg(Color::Red),
        )])
    } else if let Some(notice) = &app.notice {
        Line::from(vec![Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow),
        )])
    } else if app.loading {
        Line::from(vec![Span::styled(
            "Loading...",
            Style::default().fg(Color::Yellow),
        )])
    } else if app.composer.is_submitting() {
        Line::from(vec![Span::styled(
            "Posting comment...",
            Style::default().fg(Color::Yellow),
        )])
    } else {
        let help = match (app.focus, app.signed_in()) {
            (Focus::Composer, true) => {
                "Ctrl+S: comment | Ctrl+P: write/preview | Esc: back | Ctrl+C: quit"
            }
            (Focus::Composer, false) => "Ctrl+L: sign in | Esc: back | Ctrl+C: quit",
            (Focus::Timeline, true) => {
                "j/k/g/G: nav | Enter: expand/load | o: open | r: react | c: comment | q: quit"
            }
            (Focus::Timeline, false) => {
                "j/k/g/G: nav | Enter: expand/load | o: open | L: sign in | q: quit"
            }
        };
        Line::from(vec![Span::styled(help, Style::default().fg(Color::Gray))])
    };

    let status_bar = Paragraph::new(status).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status_bar, area);
}
