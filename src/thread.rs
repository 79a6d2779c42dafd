use futures::future::join_all;
use tracing::{debug, warn};

use crate::forge::Forge;
use crate::pagination::{HiddenPages, PagePlan};
use crate::types::{Issue, IssueComment, User};

/// Everything fetched before the thread is first drawn.
#[derive(Debug)]
pub struct InitialLoad {
    pub issue: Option<Issue>,
    pub user: Option<User>,
    /// Eagerly loaded pages, first page first.
    pub pages: Vec<Vec<IssueComment>>,
    pub hidden: Option<HiddenPages>,
}

impl InitialLoad {
    /// Id of the last comment on page 1, where the hidden-page loader goes.
    /// Zero (loader first) when page 1 came back empty.
    pub fn loader_anchor(&self) -> u64 {
        self.pages
            .first()
            .and_then(|page| page.last())
            .map_or(0, |comment| comment.id)
    }
}

/// Fetch the issue and viewer in parallel, then every eager page in parallel.
///
/// Failures degrade instead of aborting: a missing issue renders an empty
/// thread, a missing user means anonymous, a failed page is left out.
pub async fn load_initial(forge: &dyn Forge, number: u64, page_size: u32) -> InitialLoad {
    let (issue, user) = tokio::join!(forge.load_issue(number), forge.load_user());

    let issue = issue
        .map_err(|e| warn!(issue = number, "failed to load issue: {}", e))
        .ok();
    let user = user
        .map_err(|e| debug!("no signed-in user: {}", e))
        .ok();

    let Some(total) = issue.as_ref().map(|i| i.comments).filter(|n| *n > 0) else {
        return InitialLoad {
            issue,
            user,
            pages: Vec::new(),
            hidden: None,
        };
    };

    let plan = PagePlan::new(total, page_size);
    debug!(
        total,
        pages = plan.page_count,
        eager = ?plan.eager,
        hidden = plan.hidden.remaining(),
        "planned comment pages"
    );

    let loads = plan
        .eager
        .iter()
        .map(|page| forge.load_comments_page(number, *page));
    let pages = join_all(loads)
        .await
        .into_iter()
        .zip(&plan.eager)
        .map(|(result, page)| {
            result.unwrap_or_else(|e| {
                warn!(page, "failed to load comments page: {}", e);
                Vec::new()
            })
        })
        .collect();

    InitialLoad {
        issue,
        user,
        pages,
        hidden: Some(plan.hidden).filter(|h| !h.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::MockForge;

    #[tokio::test]
    async fn two_pages_load_both_and_hide_nothing() {
        let forge = MockForge::with_comments(55, 30);
        let load = load_initial(&forge, 1, 30).await;
        assert_eq!(forge.pages_requested(), vec![1, 2]);
        assert_eq!(load.pages.len(), 2);
        assert_eq!(load.pages[1].len(), 25);
        assert!(load.hidden.is_none());
        assert!(load.user.is_none());
    }

    #[tokio::test]
    async fn interior_pages_are_hidden() {
        let forge = MockForge::with_comments(95, 30).signed_in();
        let load = load_initial(&forge, 1, 30).await;
        assert_eq!(forge.pages_requested(), vec![1, 4]);
        assert_eq!(load.loader_anchor(), 30);
        let hidden = load.hidden.unwrap();
        assert_eq!(hidden.peek(), Some(2));
        assert_eq!(hidden.remaining(), 2);
        assert_eq!(load.user.unwrap().login, "me");
    }

    #[tokio::test]
    async fn empty_issue_fetches_no_pages() {
        let forge = MockForge::with_comments(0, 30);
        let load = load_initial(&forge, 1, 30).await;
        assert!(forge.pages_requested().is_empty());
        assert!(load.pages.is_empty());
        assert_eq!(load.loader_anchor(), 0);
    }

    #[tokio::test]
    async fn missing_issue_degrades() {
        let forge = MockForge::default();
        let load = load_initial(&forge, 1, 30).await;
        assert!(load.issue.is_none());
        assert!(forge.pages_requested().is_empty());
    }

    #[tokio::test]
    async fn failed_pages_are_left_out() {
        let mut forge = MockForge::with_comments(40, 30);
        forge.fail_pages = vec![1, 2];
        let load = load_initial(&forge, 1, 30).await;
        assert_eq!(load.pages.len(), 2);
        assert!(load.pages.iter().all(Vec::is_empty));
    }
}
