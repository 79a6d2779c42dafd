use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};
use ratatui::Frame;

/// Render a centered selectable list over whatever is on screen
pub fn render_select(frame: &mut Frame, title: &str, items: &[String], selected: usize) {
    let height = (items.len() + 2).min(12) as u16; // +2 for borders
    let area = centered_rect(30, height, frame.area());
    frame.render_widget(Clear, area);

    let list_items: Vec<ListItem> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let (prefix, style) = if i == selected {
                (
                    "> ",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                ("  ", Style::default())
            };
            ListItem::new(Line::from(Span::styled(format!("{prefix}{item}"), style)))
        })
        .collect();

    let list = List::new(list_items).block(
        Block::default().borders(Borders::ALL).title(Span::styled(
            format!(" {} ", title),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
    );

    let mut state = ListState::default();
    state.select(Some(selected));
    frame.render_stateful_widget(list, area, &mut state);
}

/// A `width` x `height` rect centered in `outer`, shrunk to fit
fn centered_rect(width: u16, height: u16, outer: Rect) -> Rect {
    let popup_width = width.min(outer.width);
    let popup_height = height.min(outer.height);

    let [_, middle, _] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((outer.height - popup_height) / 2),
            Constraint::Length(popup_height),
            Constraint::Min(0),
        ])
        .areas(outer);

    let [_, center, _] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((outer.width - popup_width) / 2),
            Constraint::Length(popup_width),
            Constraint::Min(0),
        ])
        .areas(middle);

    center
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popup_is_centered_and_clamped() {
        let outer = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect(30, 10, outer), Rect::new(35, 15, 30, 10));

        let tiny = Rect::new(0, 0, 20, 4);
        assert_eq!(centered_rect(30, 10, tiny), Rect::new(0, 0, 20, 4));
    }
}
