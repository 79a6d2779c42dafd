use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{NatterError, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 30;
pub const DEFAULT_PREVIEW_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token_env: Option<String>,
    pub token_command: Option<String>,
    /// Base URL of a session-to-token exchange service. Off unless configured.
    pub token_service: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_env: Some("GITHUB_TOKEN".to_string()),
            token_command: Some("gh auth token".to_string()),
            token_service: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThreadConfig {
    pub page_size: u32,
    pub preview_debounce_ms: u64,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            preview_debounce_ms: DEFAULT_PREVIEW_DEBOUNCE_MS,
        }
    }
}

impl ThreadConfig {
    pub fn preview_debounce(&self) -> Duration {
        Duration::from_millis(self.preview_debounce_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub thread: ThreadConfig,
}

pub fn config_dir() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("natter"))
}

fn config_path() -> Option<PathBuf> {
    Some(config_dir()?.join("config.toml"))
}

impl Config {
    /// Load the user config, falling back to defaults when it is missing or broken.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Config::default();
        };

        let Ok(content) = std::fs::read_to_string(&path) else {
            return Config::default();
        };

        match Self::parse(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring config: {}", e);
                Config::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| NatterError::Config(e.to_string()))?;
        if config.thread.page_size == 0 || config.thread.page_size > 100 {
            return Err(NatterError::Config(format!(
                "page_size must be between 1 and 100, got {}",
                config.thread.page_size
            )));
        }
        Ok(config)
    }
}

/// Split `owner/repo` into its parts.
pub fn parse_repo(slug: &str) -> Result<(String, String)> {
    let slug = slug.trim().trim_end_matches(".git");
    match slug.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(NatterError::Config(format!(
            "expected <owner>/<repo>, got '{}'",
            slug
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[auth]
token_env = "MY_TOKEN"
token_service = "https://comments.example.com"

[thread]
page_size = 50
preview_debounce_ms = 250
"#;
        let config = Config::parse(toml_str).unwrap();
        assert_eq!(config.auth.token_env.as_deref(), Some("MY_TOKEN"));
        assert_eq!(
            config.auth.token_service.as_deref(),
            Some("https://comments.example.com")
        );
        // unset keys inside a present table keep their defaults
        assert_eq!(config.auth.token_command.as_deref(), Some("gh auth token"));
        assert_eq!(config.thread.page_size, 50);
        assert_eq!(config.thread.preview_debounce(), Duration::from_millis(250));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.thread.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(
            config.thread.preview_debounce_ms,
            DEFAULT_PREVIEW_DEBOUNCE_MS
        );
        assert!(config.auth.token_service.is_none());
    }

    #[test]
    fn rejects_out_of_range_page_size() {
        assert!(Config::parse("[thread]\npage_size = 0").is_err());
        assert!(Config::parse("[thread]\npage_size = 101").is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            Config::parse("[thread\npage_size = 1"),
            Err(NatterError::Config(_))
        ));
    }

    #[test]
    fn parse_repo_slug() {
        assert_eq!(
            parse_repo("rust-lang/rust").unwrap(),
            ("rust-lang".to_string(), "rust".to_string())
        );
        assert_eq!(
            parse_repo("owner/repo.git").unwrap(),
            ("owner".to_string(), "repo".to_string())
        );
        assert!(parse_repo("no-slash").is_err());
        assert!(parse_repo("/repo").is_err());
        assert!(parse_repo("a/b/c").is_err());
    }
}
