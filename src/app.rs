use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::action::{Action, Focus};
use crate::composer::{Composer, ComposerTab};
use crate::config::ThreadConfig;
use crate::event::Event;
use crate::forge::Forge;
use crate::pagination::HiddenPages;
use crate::schedule::ScheduledTask;
use crate::thread::{self, InitialLoad};
use crate::timeline::{Entry, Timeline};
use crate::types::{IssueComment, ReactionKind};

/// Shown when an anonymous user asks to sign in.
pub const SIGN_IN_HINT: &str = "Not signed in: quit and run `natter --login`, then reopen this thread";

pub struct App {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub timeline: Timeline,
    pub composer: Composer,
    pub focus: Focus,
    /// Index into `timeline.entries()`
    pub selected: usize,
    /// Open reaction picker, holding the highlighted reaction
    pub reaction_menu: Option<usize>,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
    /// Informational status line, cleared like `error`
    pub notice: Option<String>,
    pub should_quit: bool,
    hidden: Option<HiddenPages>,
    config: ThreadConfig,
    forge: Arc<dyn Forge>,
    action_tx: mpsc::UnboundedSender<Action>,
}

impl App {
    pub fn new(
        forge: Arc<dyn Forge>,
        owner: String,
        repo: String,
        number: u64,
        config: ThreadConfig,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        Self {
            owner,
            repo,
            number,
            timeline: Timeline::new(None, None),
            composer: Composer::new(None),
            focus: Focus::default(),
            selected: 0,
            reaction_menu: None,
            loading: false,
            loaded: false,
            error: None,
            notice: None,
            should_quit: false,
            hidden: None,
            config,
            forge,
            action_tx,
        }
    }

    /// Page users return to after signing in.
    pub fn current_url(&self) -> String {
        self.timeline
            .issue_url()
            .map(str::to_string)
            .unwrap_or_else(|| self.forge.issue_web_url(self.number))
    }

    pub fn signed_in(&self) -> bool {
        self.timeline.user().is_some()
    }

    /// Composer is hidden on locked issues.
    pub fn composer_visible(&self) -> bool {
        self.loaded && !self.timeline.locked()
    }

    pub fn can_react(&self) -> bool {
        self.signed_in() && !self.timeline.locked()
    }

    pub fn selected_entry(&self) -> Option<Entry> {
        self.timeline.entries().get(self.selected).copied()
    }

    pub fn handle_event(&self, event: Event) -> Action {
        match event {
            Event::Init => Action::LoadThread,
            Event::Key(key) => self.handle_key(key),
            Event::Paste(text) if self.focus == Focus::Composer => Action::Paste(text),
            _ => Action::None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Action {
        if self.reaction_menu.is_some() {
            return match key.code {
                KeyCode::Char('j') | KeyCode::Down => Action::PopupDown,
                KeyCode::Char('k') | KeyCode::Up => Action::PopupUp,
                KeyCode::Enter => Action::PopupSelect,
                KeyCode::Esc | KeyCode::Char('q') => Action::PopupClose,
                _ => Action::None,
            };
        }

        match self.focus {
            Focus::Timeline => self.handle_timeline_key(key),
            Focus::Composer => self.handle_composer_key(key),
        }
    }

    fn handle_timeline_key(&self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('j') | KeyCode::Down => Action::SelectNext,
            KeyCode::Char('k') | KeyCode::Up => Action::SelectPrev,
            KeyCode::Char('g') | KeyCode::Home => Action::GoToTop,
            KeyCode::Char('G') | KeyCode::End => Action::GoToBottom,
            KeyCode::Enter | KeyCode::Char(' ') => match self.selected_entry() {
                Some(Entry::Loader) => Action::LoadMore,
                _ => Action::Activate,
            },
            KeyCode::Char('o') => Action::OpenInBrowser,
            KeyCode::Char('+') | KeyCode::Char('r') => Action::OpenReactionMenu,
            KeyCode::Char('L') => Action::SignIn,
            KeyCode::Tab | KeyCode::Char('c') | KeyCode::Char('i') => {
                if self.composer_visible() {
                    Action::SetFocus(Focus::Composer)
                } else {
                    Action::None
                }
            }
            _ => Action::None,
        }
    }

    fn handle_composer_key(&self, key: KeyEvent) -> Action {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc | KeyCode::Tab => Action::SetFocus(Focus::Timeline),
            KeyCode::Enter if ctrl => Action::Submit,
            KeyCode::Char('s') if ctrl => Action::Submit,
            KeyCode::Char('p') if ctrl => Action::SelectTab(match self.composer.tab() {
                ComposerTab::Write => ComposerTab::Preview,
                ComposerTab::Preview => ComposerTab::Write,
            }),
            KeyCode::Char('l') if ctrl && !self.signed_in() => Action::SignIn,
            KeyCode::Enter => Action::Input('\n'),
            KeyCode::Backspace => Action::Backspace,
            KeyCode::Left => Action::CursorLeft,
            KeyCode::Right => Action::CursorRight,
            KeyCode::Char(c) if !ctrl => Action::Input(c),
            _ => Action::None,
        }
    }

    pub fn update(&mut self, action: Action) {
        if !matches!(action, Action::Quit | Action::None) {
            self.error = None;
            self.notice = None;
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
            }

            // Loading
            Action::LoadThread => {
                self.loading = true;
                self.spawn_load_thread();
            }
            Action::ThreadLoaded(load) => {
                self.loading = false;
                self.apply_initial_load(*load);
            }
            Action::LoadMore => self.load_more(),
            Action::HiddenPageLoaded { page, result } => self.apply_hidden_page(page, result),

            // Timeline navigation
            Action::SelectNext => {
                let len = self.timeline.entries().len();
                if len > 0 && self.selected < len - 1 {
                    self.selected += 1;
                }
            }
            Action::SelectPrev => {
                self.selected = self.selected.saturating_sub(1);
            }
            Action::GoToTop => self.selected = 0,
            Action::GoToBottom => {
                self.selected = self.timeline.entries().len().saturating_sub(1);
            }
            Action::Activate => match self.selected_entry() {
                Some(Entry::Loader) => self.load_more(),
                Some(Entry::Comment(index)) => {
                    if let Some(view) = self.timeline.comment_mut(index) {
                        view.toggle_replies();
                    }
                }
                None => {}
            },
            Action::OpenInBrowser => {
                let url = match self.selected_entry() {
                    Some(Entry::Comment(index)) => self
                        .timeline
                        .comments()
                        .get(index)
                        .map(|view| view.comment.html_url.clone()),
                    _ => Some(self.current_url()),
                };
                if let Some(url) = url.filter(|u| !u.is_empty()) {
                    self.open_url(&url);
                }
            }
            Action::SignIn => {
                if self.signed_in() {
                    return;
                }
                // a browser session cannot hand a token back to this process
                self.notice = Some(SIGN_IN_HINT.to_string());
            }

            // Composer
            Action::SetFocus(focus) => {
                self.focus = match focus {
                    Focus::Composer if !self.composer_visible() => Focus::Timeline,
                    other => other,
                };
            }
            Action::Input(c) => self.composer.insert_char(c),
            Action::Paste(text) => {
                for c in text.replace("\r\n", "\n").chars() {
                    self.composer.insert_char(c);
                }
            }
            Action::Backspace => self.composer.backspace(),
            Action::CursorLeft => self.composer.move_left(),
            Action::CursorRight => self.composer.move_right(),
            Action::SelectTab(tab) => {
                if let Some(request) = self.composer.select_tab(tab) {
                    self.schedule_preview(request.generation, request.text);
                }
            }
            Action::PreviewRendered { generation, html } => {
                if !self.composer.preview_rendered(generation, &html) {
                    debug!(generation, "dropping stale preview");
                }
            }
            Action::Submit => self.submit(),
            Action::CommentPosted(result) => {
                let posted = match result {
                    Ok(comment) => {
                        info!(id = comment.id, "comment posted");
                        self.timeline.insert_comment(*comment, true);
                        self.clamp_selection();
                        true
                    }
                    Err(e) => {
                        warn!("posting comment failed: {}", e);
                        false
                    }
                };
                self.composer.finish_submit(posted);
            }

            // Reactions
            Action::OpenReactionMenu => {
                if self.can_react() && matches!(self.selected_entry(), Some(Entry::Comment(_))) {
                    self.reaction_menu = Some(0);
                }
            }
            Action::PopupUp => {
                if let Some(selected) = &mut self.reaction_menu {
                    *selected = selected.saturating_sub(1);
                }
            }
            Action::PopupDown => {
                if let Some(selected) = &mut self.reaction_menu {
                    if *selected < ReactionKind::ALL.len() - 1 {
                        *selected += 1;
                    }
                }
            }
            Action::PopupClose => self.reaction_menu = None,
            Action::PopupSelect => {
                let Some(choice) = self.reaction_menu.take() else {
                    return;
                };
                if let (Some(Entry::Comment(index)), Some(kind)) =
                    (self.selected_entry(), ReactionKind::ALL.get(choice))
                {
                    if let Some(view) = self.timeline.comments().get(index) {
                        self.spawn_add_reaction(view.id(), *kind);
                    }
                }
            }
            Action::ReactionAdded { comment_id, kind } => {
                debug!(comment_id, reaction = kind.as_api_str(), "reaction added");
                self.spawn_refresh_comment(comment_id);
            }
            Action::CommentRefreshed(comment) => {
                self.timeline.insert_comment(*comment, false);
            }

            Action::Error(msg) => {
                self.loading = false;
                self.error = Some(msg);
            }
            Action::None => {}
        }
    }

    fn apply_initial_load(&mut self, load: InitialLoad) {
        let anchor = load.loader_anchor();
        self.timeline = Timeline::new(None, load.issue);
        self.timeline.set_user(load.user.clone());
        self.composer.set_user(load.user);

        for page in load.pages {
            for comment in page {
                self.timeline.insert_comment(comment, false);
            }
        }

        self.hidden = load.hidden;
        if let Some(hidden) = &self.hidden {
            self.timeline
                .insert_page_loader(anchor, hidden.hidden_items());
        }

        self.loaded = true;
        self.selected = 0;
        info!(
            comments = self.timeline.len(),
            hidden_pages = self.hidden.map_or(0, |h| h.remaining()),
            "thread loaded"
        );
    }

    fn load_more(&mut self) {
        let Some(page) = self.hidden.and_then(|h| h.peek()) else {
            return;
        };
        // one hidden page at a time
        if !self.timeline.set_loader_busy() {
            return;
        }

        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let number = self.number;
        tokio::spawn(async move {
            let result = forge
                .load_comments_page(number, page)
                .await
                .map_err(|e| e.to_string());
            tx.send(Action::HiddenPageLoaded { page, result }).ok();
        });
    }

    fn apply_hidden_page(&mut self, page: u32, result: Result<Vec<IssueComment>, String>) {
        let comments = match result {
            Ok(comments) => comments,
            Err(e) => {
                warn!(page, "failed to load hidden page: {}", e);
                self.timeline.set_loader_idle();
                return;
            }
        };

        // an empty page keeps the loader where it was
        let previous_anchor = self.timeline.loader().map_or(0, |loader| loader.after_id);
        self.timeline.remove_page_loader();
        let after_id = comments.last().map_or(previous_anchor, |c| c.id);
        for comment in comments {
            self.timeline.insert_comment(comment, false);
        }

        if let Some(hidden) = &mut self.hidden {
            hidden.advance();
            if !hidden.is_empty() {
                self.timeline
                    .insert_page_loader(after_id, hidden.hidden_items());
            }
        }
        if self.hidden.is_some_and(|h| h.is_empty()) {
            self.hidden = None;
        }
        self.clamp_selection();
    }

    fn schedule_preview(&mut self, generation: u64, text: String) {
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let task = ScheduledTask::spawn(self.config.preview_debounce(), async move {
            match forge.render_markdown(&text).await {
                Ok(html) => {
                    tx.send(Action::PreviewRendered { generation, html }).ok();
                }
                // the preview stays in its loading state
                Err(e) => warn!("preview render failed: {}", e),
            }
        });
        self.composer.set_pending_preview(task);
    }

    fn submit(&mut self) {
        if self.timeline.locked() {
            return;
        }
        let Some(body) = self.composer.begin_submit() else {
            return;
        };

        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let number = self.number;
        tokio::spawn(async move {
            let result = forge
                .post_comment(number, &body)
                .await
                .map(Box::new)
                .map_err(|e| e.to_string());
            tx.send(Action::CommentPosted(result)).ok();
        });
    }

    fn spawn_load_thread(&self) {
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let number = self.number;
        let page_size = self.config.page_size;
        tokio::spawn(async move {
            let load = thread::load_initial(forge.as_ref(), number, page_size).await;
            tx.send(Action::ThreadLoaded(Box::new(load))).ok();
        });
    }

    fn spawn_add_reaction(&self, comment_id: u64, kind: ReactionKind) {
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        tokio::spawn(async move {
            match forge.add_reaction(comment_id, kind).await {
                Ok(()) => {
                    tx.send(Action::ReactionAdded { comment_id, kind }).ok();
                }
                Err(e) => {
                    tx.send(Action::from(e)).ok();
                }
            }
        });
    }

    fn spawn_refresh_comment(&self, comment_id: u64) {
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        tokio::spawn(async move {
            match forge.load_comment(comment_id).await {
                Ok(comment) => {
                    tx.send(Action::CommentRefreshed(Box::new(comment))).ok();
                }
                Err(e) => warn!(comment_id, "failed to refresh comment: {}", e),
            }
        });
    }

    fn open_url(&mut self, url: &str) {
        if let Err(e) = open::that(url) {
            self.error = Some(format!("Could not open browser: {}", e));
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.timeline.entries().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}
