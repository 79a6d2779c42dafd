use chrono::{DateTime, Utc};

use crate::markup::{self, RenderedMarkup};
use crate::types::{Issue, IssueComment, User};

/// A rendered comment in the timeline.
#[derive(Debug)]
pub struct CommentView {
    pub comment: IssueComment,
    pub body: RenderedMarkup,
    pub is_current_user: bool,
    pub replies_expanded: bool,
}

impl CommentView {
    pub fn new(comment: IssueComment, current_user: Option<&str>) -> Self {
        let body = markup::render(&comment.body_html, false);
        let mut view = Self {
            comment,
            body,
            is_current_user: false,
            replies_expanded: false,
        };
        view.set_current_user(current_user);
        view
    }

    pub fn id(&self) -> u64 {
        self.comment.id
    }

    pub fn set_current_user(&mut self, login: Option<&str>) {
        self.is_current_user = login.is_some_and(|l| l == self.comment.user.login);
    }

    /// Expand or collapse a quoted email reply. No-op for bodies without one.
    pub fn toggle_replies(&mut self) {
        if !self.body.has_hidden_reply {
            return;
        }
        self.replies_expanded = !self.replies_expanded;
        self.body = markup::render(&self.comment.body_html, self.replies_expanded);
    }
}

/// Placeholder standing in for the hidden pages of the thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLoader {
    /// The loader sits right after the first comment with an id >= this one.
    /// Zero puts it ahead of every comment.
    pub after_id: u64,
    pub hidden_items: u32,
    pub busy: bool,
}

impl PageLoader {
    pub fn label(&self) -> String {
        format!("{} hidden items", self.hidden_items)
    }

    pub fn status(&self) -> &'static str {
        if self.busy {
            "Loading..."
        } else {
            "Load more..."
        }
    }
}

/// One row of the timeline as it is laid out on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Comment(usize),
    Loader,
}

/// Ordered comment views of one issue, plus the header count and the page loader.
///
/// Comments are kept sorted by id with no duplicate ids, regardless of the
/// order in which pages arrive.
#[derive(Debug, Default)]
pub struct Timeline {
    comments: Vec<CommentView>,
    issue: Option<Issue>,
    user: Option<User>,
    count: u32,
    loader: Option<PageLoader>,
}

impl Timeline {
    pub fn new(user: Option<User>, issue: Option<Issue>) -> Self {
        let mut timeline = Self {
            user,
            ..Self::default()
        };
        timeline.set_issue(issue);
        timeline
    }

    pub fn comments(&self) -> &[CommentView] {
        &self.comments
    }

    pub fn comment_mut(&mut self, index: usize) -> Option<&mut CommentView> {
        self.comments.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn locked(&self) -> bool {
        self.issue.as_ref().is_some_and(|issue| issue.locked)
    }

    pub fn loader(&self) -> Option<&PageLoader> {
        self.loader.as_ref()
    }

    /// Header text, e.g. "1 Comment" or "12 Comments".
    pub fn count_label(&self) -> String {
        format!(
            "{} Comment{}",
            self.count,
            if self.count == 1 { "" } else { "s" }
        )
    }

    /// Link behind the header count, if the issue is known.
    pub fn issue_url(&self) -> Option<&str> {
        self.issue.as_ref().map(|issue| issue.html_url.as_str())
    }

    pub fn set_issue(&mut self, issue: Option<Issue>) {
        if let Some(issue) = &issue {
            self.count = issue.comments;
        }
        self.issue = issue;
    }

    pub fn set_user(&mut self, user: Option<User>) {
        let login = user.as_ref().map(|u| u.login.clone());
        for view in &mut self.comments {
            view.set_current_user(login.as_deref());
        }
        self.user = user;
    }

    /// Insert `comment` at its sorted position, replacing any view with the same id.
    pub fn insert_comment(&mut self, comment: IssueComment, increment_count: bool) {
        let view = CommentView::new(comment, self.user.as_ref().map(|u| u.login.as_str()));
        let id = view.id();

        match self.comments.iter().position(|existing| existing.id() >= id) {
            None => self.comments.push(view),
            Some(index) if self.comments[index].id() == id => self.comments[index] = view,
            Some(index) => self.comments.insert(index, view),
        }

        if increment_count {
            self.count += 1;
        }
    }

    /// Place the loader after the comment that ends the preceding loaded page.
    pub fn insert_page_loader(&mut self, after_id: u64, hidden_items: u32) {
        self.loader = Some(PageLoader {
            after_id,
            hidden_items,
            busy: false,
        });
    }

    /// Mark the loader busy. Returns false when it is absent or already busy.
    pub fn set_loader_busy(&mut self) -> bool {
        match &mut self.loader {
            Some(loader) if !loader.busy => {
                loader.busy = true;
                true
            }
            _ => false,
        }
    }

    pub fn set_loader_idle(&mut self) {
        if let Some(loader) = &mut self.loader {
            loader.busy = false;
        }
    }

    pub fn remove_page_loader(&mut self) {
        self.loader = None;
    }

    /// Rows in display order: comments with the loader spliced in after its anchor.
    pub fn entries(&self) -> Vec<Entry> {
        let mut entries = Vec::with_capacity(self.comments.len() + 1);
        if self.loader.as_ref().is_some_and(|loader| loader.after_id == 0) {
            entries.push(Entry::Loader);
            entries.extend((0..self.comments.len()).map(Entry::Comment));
            return entries;
        }
        let anchor = self.loader.as_ref().and_then(|loader| {
            self.comments
                .iter()
                .position(|view| view.id() >= loader.after_id)
        });
        for index in 0..self.comments.len() {
            entries.push(Entry::Comment(index));
            if anchor == Some(index) {
                entries.push(Entry::Loader);
            }
        }
        if self.loader.is_some() && anchor.is_none() {
            entries.push(Entry::Loader);
        }
        entries
    }

    #[cfg(test)]
    pub fn ids(&self) -> Vec<u64> {
        self.comments.iter().map(CommentView::id).collect()
    }
}

/// Relative time of `then` as seen from `now`, e.g. "3 days ago".
pub fn time_ago(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    let (value, unit) = match seconds {
        s if s < 45 => return "just now".to_string(),
        s if s < 90 => return "a minute ago".to_string(),
        s if s < 45 * 60 => ((s + 30) / 60, "minute"),
        s if s < 90 * 60 => return "an hour ago".to_string(),
        s if s < 22 * 3600 => ((s + 1800) / 3600, "hour"),
        s if s < 36 * 3600 => return "a day ago".to_string(),
        s if s < 26 * 86_400 => ((s + 43_200) / 86_400, "day"),
        s if s < 45 * 86_400 => return "a month ago".to_string(),
        s if s < 320 * 86_400 => ((s + 15 * 86_400) / (30 * 86_400), "month"),
        s if s < 548 * 86_400 => return "a year ago".to_string(),
        s => ((s + 182 * 86_400) / (365 * 86_400), "year"),
    };
    format!("{} {}s ago", value, unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn comment(id: u64, login: &str, body: &str) -> IssueComment {
        IssueComment {
            id,
            user: User {
                login: login.to_string(),
                avatar_url: String::new(),
                html_url: format!("https://github.com/{}", login),
            },
            body_html: body.to_string(),
            html_url: format!("https://github.com/o/r/issues/1#issuecomment-{}", id),
            author_association: Default::default(),
            reactions: Default::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn issue(comments: u32, locked: bool) -> Issue {
        Issue {
            number: 1,
            comments,
            locked,
            html_url: "https://github.com/o/r/issues/1".to_string(),
        }
    }

    #[test]
    fn out_of_order_inserts_are_sorted() {
        let mut timeline = Timeline::new(None, Some(issue(3, false)));
        for id in [5, 1, 3] {
            timeline.insert_comment(comment(id, "a", "<p>x</p>"), false);
        }
        assert_eq!(timeline.ids(), vec![1, 3, 5]);
        assert_eq!(timeline.count_label(), "3 Comments");
    }

    #[test]
    fn equal_id_replaces_in_place() {
        let mut timeline = Timeline::new(None, Some(issue(3, false)));
        for id in [1, 3, 5] {
            timeline.insert_comment(comment(id, "a", "<p>old</p>"), false);
        }
        timeline.insert_comment(comment(3, "a", "<p>new</p>"), false);

        assert_eq!(timeline.ids(), vec![1, 3, 5]);
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.comments()[1].body.plain_text(), "new");
    }

    #[test]
    fn overlapping_pages_do_not_duplicate() {
        let mut timeline = Timeline::new(None, None);
        for id in [10, 11, 12] {
            timeline.insert_comment(comment(id, "a", ""), false);
        }
        for id in [12, 13, 14] {
            timeline.insert_comment(comment(id, "a", ""), false);
        }
        for id in [1, 2] {
            timeline.insert_comment(comment(id, "a", ""), false);
        }
        assert_eq!(timeline.ids(), vec![1, 2, 10, 11, 12, 13, 14]);
    }

    #[test]
    fn increment_updates_count_label() {
        let mut timeline = Timeline::new(None, Some(issue(0, false)));
        assert_eq!(timeline.count_label(), "0 Comments");
        timeline.insert_comment(comment(9, "a", ""), true);
        assert_eq!(timeline.count_label(), "1 Comment");
        timeline.insert_comment(comment(10, "a", ""), true);
        assert_eq!(timeline.count_label(), "2 Comments");
    }

    #[test]
    fn unknown_issue_has_no_link() {
        let timeline = Timeline::new(None, None);
        assert_eq!(timeline.issue_url(), None);
        assert!(!timeline.locked());
        assert_eq!(timeline.count_label(), "0 Comments");
    }

    #[test]
    fn current_user_is_marked() {
        let me = User {
            login: "me".to_string(),
            avatar_url: String::new(),
            html_url: String::new(),
        };
        let mut timeline = Timeline::new(Some(me), None);
        timeline.insert_comment(comment(1, "me", ""), false);
        timeline.insert_comment(comment(2, "you", ""), false);
        assert!(timeline.comments()[0].is_current_user);
        assert!(!timeline.comments()[1].is_current_user);

        timeline.set_user(None);
        assert!(!timeline.comments()[0].is_current_user);
    }

    #[test]
    fn loader_sits_after_its_anchor() {
        let mut timeline = Timeline::new(None, None);
        for id in [1, 2, 3, 90, 91] {
            timeline.insert_comment(comment(id, "a", ""), false);
        }
        timeline.insert_page_loader(3, 60);
        assert_eq!(
            timeline.entries(),
            vec![
                Entry::Comment(0),
                Entry::Comment(1),
                Entry::Comment(2),
                Entry::Loader,
                Entry::Comment(3),
                Entry::Comment(4),
            ]
        );
        assert_eq!(timeline.loader().map(PageLoader::label).as_deref(), Some("60 hidden items"));
    }

    #[test]
    fn zero_anchor_puts_loader_first() {
        let mut timeline = Timeline::new(None, None);
        for id in [90, 91] {
            timeline.insert_comment(comment(id, "a", ""), false);
        }
        timeline.insert_page_loader(0, 60);
        assert_eq!(
            timeline.entries(),
            vec![Entry::Loader, Entry::Comment(0), Entry::Comment(1)]
        );
    }

    #[test]
    fn loader_busy_is_exclusive() {
        let mut timeline = Timeline::new(None, None);
        timeline.insert_comment(comment(1, "a", ""), false);
        assert!(!timeline.set_loader_busy());

        timeline.insert_page_loader(1, 30);
        assert!(timeline.set_loader_busy());
        assert!(!timeline.set_loader_busy());
        assert_eq!(timeline.loader().map(PageLoader::status), Some("Loading..."));

        timeline.set_loader_idle();
        assert!(timeline.set_loader_busy());

        timeline.remove_page_loader();
        assert!(timeline.loader().is_none());
        assert_eq!(timeline.entries(), vec![Entry::Comment(0)]);
    }

    #[test]
    fn toggle_replies_only_with_hidden_reply() {
        let mut plain = CommentView::new(comment(1, "a", "<p>hi</p>"), None);
        plain.toggle_replies();
        assert!(!plain.replies_expanded);

        let html = r#"<p>hi</p><div class="email-hidden-reply"><p>quoted</p></div>"#;
        let mut view = CommentView::new(comment(2, "a", html), None);
        assert!(!view.body.plain_text().contains("quoted"));
        view.toggle_replies();
        assert!(view.replies_expanded);
        assert!(view.body.plain_text().contains("quoted"));
    }

    #[test]
    fn time_ago_buckets() {
        let now = Utc::now();
        assert_eq!(time_ago(now, now), "just now");
        assert_eq!(time_ago(now, now - Duration::seconds(60)), "a minute ago");
        assert_eq!(time_ago(now, now - Duration::minutes(5)), "5 minutes ago");
        assert_eq!(time_ago(now, now - Duration::hours(3)), "3 hours ago");
        assert_eq!(time_ago(now, now - Duration::days(3)), "3 days ago");
        assert_eq!(time_ago(now, now - Duration::days(400)), "a year ago");
        assert_eq!(time_ago(now, now - Duration::days(800)), "2 years ago");
        assert_eq!(time_ago(now, now + Duration::minutes(5)), "just now");
    }
}
