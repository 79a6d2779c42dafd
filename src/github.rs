use async_trait::async_trait;
use octocrab::Octocrab;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::AuthContext;
use crate::error::{NatterError, Result};
use crate::forge::Forge;
use crate::types::{Issue, IssueComment, ReactionKind, User};

const API_BASE: &str = "https://api.github.com";
/// Comment payloads with the server-rendered `body_html` field.
const HTML_MEDIA_TYPE: &str = "application/vnd.github.html+json";

pub struct GitHub {
    client: Octocrab,
    http: reqwest::Client,
    auth: AuthContext,
    owner: String,
    repo: String,
    page_size: u32,
}

impl std::fmt::Debug for GitHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHub")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}

impl From<octocrab::Error> for NatterError {
    fn from(err: octocrab::Error) -> Self {
        NatterError::Api(err.to_string())
    }
}

impl GitHub {
    pub fn new(auth: AuthContext, owner: &str, repo: &str, page_size: u32) -> Result<Self> {
        let mut builder = Octocrab::builder();
        if let Some(token) = auth.token() {
            builder = builder.personal_token(token.to_string());
        }
        let client = builder
            .build()
            .map_err(|e| NatterError::Auth(e.to_string()))?;

        Ok(Self {
            client,
            http: reqwest::Client::new(),
            auth,
            owner: owner.to_string(),
            repo: repo.to_string(),
            page_size,
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}{}", API_BASE, self.owner, self.repo, path)
    }

    fn request(&self, method: Method, url: &str, accept: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header("Accept", accept)
            .header("User-Agent", "natter");
        match self.auth.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(NatterError::Api(format!("{} failed ({}): {}", what, status, text)));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Forge for GitHub {
    fn issue_web_url(&self, number: u64) -> String {
        format!("https://github.com/{}/{}/issues/{}", self.owner, self.repo, number)
    }

    async fn load_issue(&self, number: u64) -> Result<Issue> {
        let route = format!("/repos/{}/{}/issues/{}", self.owner, self.repo, number);
        let issue: Issue = self.client.get(&route, None::<&()>).await?;
        Ok(issue)
    }

    async fn load_comments_page(&self, number: u64, page: u32) -> Result<Vec<IssueComment>> {
        debug!(issue = number, page, "loading comments page");
        let url = self.repo_url(&format!("/issues/{}/comments", number));
        let builder = self
            .request(Method::GET, &url, HTML_MEDIA_TYPE)
            .query(&[("per_page", self.page_size), ("page", page)]);
        self.send_json(builder, "Loading comments").await
    }

    async fn load_comment(&self, comment_id: u64) -> Result<IssueComment> {
        let url = self.repo_url(&format!("/issues/comments/{}", comment_id));
        let builder = self.request(Method::GET, &url, HTML_MEDIA_TYPE);
        self.send_json(builder, "Loading comment").await
    }

    async fn load_user(&self) -> Result<User> {
        if self.auth.is_anonymous() {
            return Err(NatterError::Auth("not signed in".to_string()));
        }
        let user: User = self.client.get("/user", None::<&()>).await?;
        Ok(user)
    }

    async fn post_comment(&self, number: u64, markdown: &str) -> Result<IssueComment> {
        let url = self.repo_url(&format!("/issues/{}/comments", number));
        let builder = self
            .request(Method::POST, &url, HTML_MEDIA_TYPE)
            .json(&serde_json::json!({ "body": markdown }));
        self.send_json(builder, "Comment").await
    }

    async fn render_markdown(&self, markdown: &str) -> Result<String> {
        let url = format!("{}/markdown", API_BASE);
        let payload = serde_json::json!({
            "text": markdown,
            "mode": "gfm",
            "context": format!("{}/{}", self.owner, self.repo),
        });
        let response = self
            .request(Method::POST, &url, "application/vnd.github+json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NatterError::Api(format!(
                "Markdown render failed: {}",
                response.status()
            )));
        }
        Ok(response.text().await?)
    }

    async fn add_reaction(&self, comment_id: u64, kind: ReactionKind) -> Result<()> {
        let url = self.repo_url(&format!("/issues/comments/{}/reactions", comment_id));
        let response = self
            .request(Method::POST, &url, "application/vnd.github+json")
            .json(&serde_json::json!({ "content": kind.as_api_str() }))
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(NatterError::Api(format!("Reaction failed: {}", text)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn urls_are_scoped_to_repo() {
        let github = GitHub::new(AuthContext::anonymous(), "octo", "hello", 30).unwrap();
        assert_eq!(
            github.repo_url("/issues/3/comments"),
            "https://api.github.com/repos/octo/hello/issues/3/comments"
        );
        assert_eq!(
            github.issue_web_url(3),
            "https://github.com/octo/hello/issues/3"
        );
    }

    #[tokio::test]
    async fn anonymous_has_no_user() {
        let github = GitHub::new(AuthContext::anonymous(), "octo", "hello", 30).unwrap();
        assert!(matches!(
            github.load_user().await,
            Err(NatterError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn request_carries_bearer_token() {
        let github = GitHub::new(AuthContext::with_token("t0k"), "octo", "hello", 30).unwrap();
        let request = github
            .request(Method::GET, "https://api.github.com/x", HTML_MEDIA_TYPE)
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get("Authorization").unwrap(),
            "Bearer t0k"
        );
        assert_eq!(request.headers().get("Accept").unwrap(), HTML_MEDIA_TYPE);
    }
}
