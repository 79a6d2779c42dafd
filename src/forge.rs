use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Issue, IssueComment, ReactionKind, User};

/// The issue/comment API a thread is rendered from. Bound to one repository.
#[async_trait]
pub trait Forge: Send + Sync + std::fmt::Debug {
    fn issue_web_url(&self, number: u64) -> String;

    async fn load_issue(&self, number: u64) -> Result<Issue>;
    /// One page (1-based) of an issue's comments, oldest first.
    async fn load_comments_page(&self, number: u64, page: u32) -> Result<Vec<IssueComment>>;
    async fn load_comment(&self, comment_id: u64) -> Result<IssueComment>;
    /// The authenticated user. Fails when anonymous.
    async fn load_user(&self) -> Result<User>;
    async fn post_comment(&self, number: u64, markdown: &str) -> Result<IssueComment>;
    /// Render markdown to HTML in the repository's context.
    async fn render_markdown(&self, markdown: &str) -> Result<String>;
    async fn add_reaction(&self, comment_id: u64, kind: ReactionKind) -> Result<()>;
}
