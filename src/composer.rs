use ratatui::text::Line;

use crate::markup;
use crate::schedule::ScheduledTask;
use crate::types::User;

pub const NOTHING_TO_PREVIEW: &str = "Nothing to preview";
pub const LOADING_PREVIEW: &str = "Loading preview...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComposerTab {
    #[default]
    Write,
    Preview,
}

#[derive(Debug, Default)]
pub enum PreviewState {
    #[default]
    Empty,
    Loading,
    Rendered {
        lines: Vec<Line<'static>>,
        links: Vec<String>,
    },
}

impl PreviewState {
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            PreviewState::Empty => Some(NOTHING_TO_PREVIEW),
            PreviewState::Loading => Some(LOADING_PREVIEW),
            PreviewState::Rendered { .. } => None,
        }
    }
}

/// A preview render the caller should schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    pub generation: u64,
    pub text: String,
}

/// State of the new-comment form: text buffer, write/preview tabs and the
/// submit-in-flight guard.
#[derive(Debug, Default)]
pub struct Composer {
    user: Option<User>,
    text: String,
    cursor: usize,
    tab: ComposerTab,
    preview: PreviewState,
    pending_preview: Option<ScheduledTask>,
    preview_generation: u64,
    submitting: bool,
}

impl Composer {
    pub fn new(user: Option<User>) -> Self {
        Self {
            user,
            ..Self::default()
        }
    }

    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn tab(&self) -> ComposerTab {
        self.tab
    }

    pub fn preview(&self) -> &PreviewState {
        &self.preview
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn avatar_label(&self) -> String {
        match &self.user {
            Some(user) => format!("@{}", user.login),
            None => "@anonymous".to_string(),
        }
    }

    pub fn placeholder(&self) -> &'static str {
        if self.user.is_some() {
            "Leave a comment"
        } else {
            "Sign in to comment"
        }
    }

    /// Text input is only accepted from a signed-in user with no submit in flight.
    pub fn input_enabled(&self) -> bool {
        self.user.is_some() && !self.submitting && self.tab == ComposerTab::Write
    }

    pub fn can_submit(&self) -> bool {
        self.user.is_some() && !self.submitting && !self.text.trim().is_empty()
    }

    pub fn insert_char(&mut self, c: char) {
        if !self.input_enabled() {
            return;
        }
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if !self.input_enabled() || self.cursor == 0 {
            return;
        }
        let prev = self.text[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        self.text.replace_range(prev..self.cursor, "");
        self.cursor = prev;
    }

    pub fn move_left(&mut self) {
        if let Some((idx, _)) = self.text[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(c) = self.text[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Switch tabs. Selecting the preview tab with text returns the render to schedule.
    pub fn select_tab(&mut self, tab: ComposerTab) -> Option<PreviewRequest> {
        if self.tab == tab {
            return None;
        }
        self.tab = tab;

        match tab {
            ComposerTab::Preview => {
                let text = self.text.trim();
                if text.is_empty() {
                    self.preview = PreviewState::Empty;
                    return None;
                }
                self.preview = PreviewState::Loading;
                self.preview_generation += 1;
                Some(PreviewRequest {
                    generation: self.preview_generation,
                    text: text.to_string(),
                })
            }
            ComposerTab::Write => {
                self.cancel_preview();
                None
            }
        }
    }

    /// Hold on to the scheduled render so leaving the tab can cancel it.
    pub fn set_pending_preview(&mut self, task: ScheduledTask) {
        self.pending_preview = Some(task);
    }

    fn cancel_preview(&mut self) {
        if let Some(task) = self.pending_preview.take() {
            task.cancel();
        }
        // results of the cancelled request are stale from here on
        self.preview_generation += 1;
    }

    /// Apply a rendered preview. Results for stale requests are dropped.
    pub fn preview_rendered(&mut self, generation: u64, html: &str) -> bool {
        if generation != self.preview_generation || self.tab != ComposerTab::Preview {
            return false;
        }
        let rendered = markup::render(html, true);
        self.preview = PreviewState::Rendered {
            lines: rendered.lines,
            links: rendered.links,
        };
        self.pending_preview = None;
        true
    }

    /// Start a submit. Returns the body to post, or None when a submit is
    /// already in flight or there is nothing to send.
    pub fn begin_submit(&mut self) -> Option<String> {
        if !self.can_submit() {
            return None;
        }
        self.submitting = true;
        Some(self.text.clone())
    }

    /// Finish a submit, successful or not. The text is only dropped once it was posted.
    pub fn finish_submit(&mut self, posted: bool) {
        self.submitting = false;
        if posted {
            self.clear();
        }
        self.select_tab(ComposerTab::Write);
        self.preview = PreviewState::Empty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            login: "me".to_string(),
            avatar_url: String::new(),
            html_url: String::new(),
        }
    }

    fn composer_with(text: &str) -> Composer {
        let mut composer = Composer::new(Some(user()));
        for c in text.chars() {
            composer.insert_char(c);
        }
        composer
    }

    #[test]
    fn anonymous_cannot_type_or_submit() {
        let mut composer = Composer::new(None);
        composer.insert_char('a');
        assert_eq!(composer.text(), "");
        assert_eq!(composer.avatar_label(), "@anonymous");
        assert_eq!(composer.placeholder(), "Sign in to comment");
        assert!(composer.begin_submit().is_none());
    }

    #[test]
    fn editing_handles_multibyte() {
        let mut composer = composer_with("héllo");
        composer.backspace();
        assert_eq!(composer.text(), "héll");
        composer.move_left();
        composer.move_left();
        composer.backspace();
        assert_eq!(composer.text(), "hll");
        composer.move_right();
        composer.insert_char('!');
        assert_eq!(composer.text(), "hl!l");
    }

    #[test]
    fn preview_with_blank_text_needs_no_render() {
        let mut composer = composer_with("   ");
        assert_eq!(composer.select_tab(ComposerTab::Preview), None);
        assert_eq!(composer.preview().placeholder(), Some(NOTHING_TO_PREVIEW));
    }

    #[test]
    fn preview_with_text_requests_trimmed_render() {
        let mut composer = composer_with("  **hi** ");
        let request = composer.select_tab(ComposerTab::Preview).unwrap();
        assert_eq!(request.text, "**hi**");
        assert_eq!(composer.preview().placeholder(), Some(LOADING_PREVIEW));
        assert!(!composer.input_enabled());

        // reselecting the same tab does nothing
        assert_eq!(composer.select_tab(ComposerTab::Preview), None);

        assert!(composer.preview_rendered(request.generation, "<p><strong>hi</strong></p>"));
        assert_eq!(composer.preview().placeholder(), None);
    }

    #[test]
    fn stale_preview_is_ignored() {
        let mut composer = composer_with("text");
        let first = composer.select_tab(ComposerTab::Preview).unwrap();
        composer.select_tab(ComposerTab::Write);
        let second = composer.select_tab(ComposerTab::Preview).unwrap();
        assert_ne!(first.generation, second.generation);

        assert!(!composer.preview_rendered(first.generation, "<p>old</p>"));
        assert!(composer.preview_rendered(second.generation, "<p>new</p>"));
    }

    #[test]
    fn submit_is_not_reentrant() {
        let mut composer = composer_with("hello");
        assert_eq!(composer.begin_submit().as_deref(), Some("hello"));
        assert!(composer.is_submitting());
        assert!(composer.begin_submit().is_none());

        // typing is blocked while in flight
        composer.insert_char('x');
        assert_eq!(composer.text(), "hello");
    }

    #[test]
    fn successful_submit_clears_and_returns_to_write() {
        let mut composer = composer_with("hello");
        composer.select_tab(ComposerTab::Preview);
        composer.begin_submit();
        composer.finish_submit(true);

        assert!(!composer.is_submitting());
        assert_eq!(composer.text(), "");
        assert_eq!(composer.cursor(), 0);
        assert_eq!(composer.tab(), ComposerTab::Write);
        assert_eq!(composer.preview().placeholder(), Some(NOTHING_TO_PREVIEW));
    }

    #[test]
    fn failed_submit_keeps_text() {
        let mut composer = composer_with("hello");
        composer.begin_submit();
        composer.finish_submit(false);

        assert!(!composer.is_submitting());
        assert_eq!(composer.text(), "hello");
        assert!(composer.can_submit());
    }
}
