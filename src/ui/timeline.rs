use chrono::{DateTime, Utc};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::action::Focus;
use crate::app::App;
use crate::timeline::{time_ago, CommentView, Entry, PageLoader};
use crate::types::ReactionKind;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let border_style = if app.focus == Focus::Timeline {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(" Comments ");

    if app.timeline.is_empty() && app.timeline.loader().is_none() {
        let message = if app.loaded {
            "No comments yet"
        } else {
            "Loading comments..."
        };
        let empty = Paragraph::new(message)
            .block(block)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let entries = app.timeline.entries();
    let now = Utc::now();
    let mut lines: Vec<Line> = Vec::new();
    let mut selected_span = (0, 0);
    for (i, entry) in entries.iter().enumerate() {
        let is_selected = i == app.selected;
        let start = lines.len();
        let block_lines = match entry {
            Entry::Comment(index) => match app.timeline.comments().get(*index) {
                Some(view) => comment_lines(view, app, now),
                None => continue,
            },
            Entry::Loader => match app.timeline.loader() {
                Some(loader) => loader_lines(loader),
                None => continue,
            },
        };
        lines.extend(block_lines.into_iter().map(|line| gutter(line, is_selected)));
        if is_selected {
            selected_span = (start, lines.len());
        }
    }

    let inner_height = area.height.saturating_sub(2) as usize;
    let offset = scroll_offset(selected_span, inner_height);
    let visible: Vec<Line> = lines.into_iter().skip(offset).take(inner_height).collect();

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(Text::from(visible)).block(block), area);
}

/// First visible line that keeps the selected block on screen, favouring its top.
fn scroll_offset((start, end): (usize, usize), height: usize) -> usize {
    end.saturating_sub(height).min(start)
}

fn gutter(line: Line<'static>, selected: bool) -> Line<'static> {
    let marker = if selected {
        Span::styled("▌ ", Style::default().fg(Color::Yellow))
    } else {
        Span::raw("  ")
    };
    let style = line.style;
    let mut spans = Vec::with_capacity(line.spans.len() + 1);
    spans.push(marker);
    spans.extend(line.spans);
    Line::from(spans).style(style)
}

fn comment_lines(view: &CommentView, app: &App, now: DateTime<Utc>) -> Vec<Line<'static>> {
    let comment = &view.comment;
    let login_style = if view.is_current_user {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    };

    let mut header = vec![
        Span::styled(format!("@{}", comment.user.login), login_style),
        Span::styled(" commented ", Style::default().fg(Color::Gray)),
        Span::styled(
            time_ago(now, comment.created_at),
            Style::default().fg(Color::Gray),
        ),
    ];
    if comment.updated_at > comment.created_at {
        header.push(Span::styled(" · edited", Style::default().fg(Color::DarkGray)));
    }
    let badge = comment.author_association.label();
    if !badge.is_empty() {
        header.push(Span::raw(" "));
        header.push(Span::styled(
            format!("[{}]", badge),
            Style::default().fg(Color::Magenta),
        ));
    }

    let mut lines = vec![Line::from(header)];
    lines.extend(view.body.lines.iter().map(|line| indent(line.clone())));

    if view.body.has_hidden_reply {
        let hint = if view.replies_expanded {
            "  (Enter: hide quoted reply)"
        } else {
            "  ··· (Enter: show quoted reply)"
        };
        lines.push(Line::from(Span::styled(
            hint,
            Style::default().fg(Color::DarkGray),
        )));
    }

    for (i, link) in view.body.links.iter().enumerate() {
        lines.push(Line::from(Span::styled(
            format!("  [{}] {}", i + 1, link),
            Style::default().fg(Color::DarkGray),
        )));
    }

    if let Some(footer) = reactions_line(view, app) {
        lines.push(footer);
    }
    lines.push(Line::default());
    lines
}

fn reactions_line(view: &CommentView, app: &App) -> Option<Line<'static>> {
    let reactions = &view.comment.reactions;
    let mut spans = vec![Span::raw("  ")];
    for kind in ReactionKind::ALL {
        let count = reactions.count(kind);
        if count > 0 {
            spans.push(Span::raw(format!("{} {}  ", kind.emoji(), count)));
        }
    }
    let total = reactions.sum();
    if total > 0 {
        spans.push(Span::styled(
            format!("({} total)  ", total),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if !app.timeline.locked() && !app.signed_in() {
        spans.push(Span::styled(
            "sign in to react (L)",
            Style::default().fg(Color::DarkGray),
        ));
    }

    (spans.len() > 1).then(|| Line::from(spans))
}

fn loader_lines(loader: &PageLoader) -> Vec<Line<'static>> {
    let status_style = if loader.busy {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Cyan)
    };
    vec![
        Line::from(vec![
            Span::styled("── ", Style::default().fg(Color::DarkGray)),
            Span::styled(loader.label(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(" · ", Style::default().fg(Color::DarkGray)),
            Span::styled(loader.status(), status_style),
            Span::styled(" ──", Style::default().fg(Color::DarkGray)),
        ]),
        Line::default(),
    ]
}

fn indent(line: Line<'static>) -> Line<'static> {
    let style = line.style;
    let mut spans = Vec::with_capacity(line.spans.len() + 1);
    spans.push(Span::raw("  "));
    spans.extend(line.spans);
    Line::from(spans).style(style)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_block_stays_visible() {
        // fits from the top
        assert_eq!(scroll_offset((0, 5), 20), 0);
        assert_eq!(scroll_offset((10, 15), 20), 0);
        // bottom-aligned once it runs past the view
        assert_eq!(scroll_offset((30, 35), 20), 15);
        // taller than the view: show its top
        assert_eq!(scroll_offset((30, 80), 20), 30);
    }

    #[test]
    fn loader_row_shows_count_and_status() {
        let mut loader = PageLoader {
            after_id: 30,
            hidden_items: 60,
            busy: false,
        };
        let text = loader_lines(&loader)[0].to_string();
        assert!(text.contains("60 hidden items"));
        assert!(text.contains("Load more..."));

        loader.busy = true;
        assert!(loader_lines(&loader)[0].to_string().contains("Loading..."));
    }

    #[test]
    fn gutter_marks_selection() {
        let line = Line::from("body");
        assert_eq!(gutter(line.clone(), true).to_string(), "▌ body");
        assert_eq!(gutter(line, false).to_string(), "  body");
    }
}
