use std::io::Write;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{config_dir, AuthConfig};
use crate::error::{NatterError, Result};

/// Credentials for talking to the API. Anonymous when `token` is None.
///
/// Built once at startup and handed to the API client; nothing else holds a token.
#[derive(Clone, Default)]
pub struct AuthContext {
    token: Option<String>,
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.token.is_none()
    }
}

/// Run a CLI command and capture stdout as a token
fn try_cli_token(command: &str) -> Option<String> {
    let output = std::process::Command::new("sh")
        .args(["-c", command])
        .output()
        .ok()?;

    if output.status.success() {
        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !token.is_empty() {
            return Some(token);
        }
    }
    None
}

/// Stored token path: ~/.config/natter/token
fn token_path() -> Option<std::path::PathBuf> {
    Some(config_dir()?.join("token"))
}

fn load_stored_token() -> Option<String> {
    let path = token_path()?;
    let token = std::fs::read_to_string(path).ok()?;
    let token = token.trim().to_string();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn save_token(token: &str) -> std::io::Result<()> {
    if let Some(path) = token_path() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, token)?;
    }
    Ok(())
}

/// Exchange the session held by the token service for an access token.
/// The service answers with a JSON string, or `null` when there is no session.
pub async fn exchange_session(client: &reqwest::Client, token_service: &str) -> Result<Option<String>> {
    let url = format!("{}/token", token_service.trim_end_matches('/'));
    let response = client
        .post(&url)
        .header("Accept", "application/json")
        .header("User-Agent", "natter")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(NatterError::Auth(format!(
            "token service returned {}",
            response.status()
        )));
    }

    let token: Option<String> = response.json().await?;
    Ok(token.filter(|t| !t.is_empty()))
}

/// Resolve credentials, trying in order:
/// 1. Env var from config
/// 2. Stored token from ~/.config/natter/token
/// 3. CLI command from config
/// 4. Token service session exchange
///
/// Every failure falls through to the next source; the end result may be anonymous.
pub async fn resolve(config: &AuthConfig) -> AuthContext {
    if let Some(env_var) = &config.token_env {
        if let Ok(token) = std::env::var(env_var) {
            if !token.is_empty() {
                debug!(env_var = %env_var, "using token from environment");
                return AuthContext::with_token(token);
            }
        }
    }

    if let Some(token) = load_stored_token() {
        debug!("using stored token");
        return AuthContext::with_token(token);
    }

    if let Some(cmd) = &config.token_command {
        if let Some(token) = try_cli_token(cmd) {
            debug!(command = %cmd, "using token from command");
            return AuthContext::with_token(token);
        }
    }

    if let Some(service) = &config.token_service {
        let client = reqwest::Client::new();
        match exchange_session(&client, service).await {
            Ok(Some(token)) => {
                debug!("using token from token service");
                return AuthContext::with_token(token);
            }
            Ok(None) => debug!("token service has no session"),
            Err(e) => warn!("token exchange failed: {}", e),
        }
    }

    info!("no credentials found, continuing anonymously");
    AuthContext::anonymous()
}

/// Interactive GitHub OAuth device flow; stores the token on success.
/// Requires a registered OAuth App client_id (not secret)
pub async fn device_login() -> Result<String> {
    let token = device_flow_auth(GITHUB_CLIENT_ID).await?;
    if let Err(e) = save_token(&token) {
        eprintln!("Warning: could not save token: {}", e);
    }
    Ok(token)
}

async fn device_flow_auth(client_id: &str) -> Result<String> {
    let client = reqwest::Client::new();

    let resp = client
        .post("https://github.com/login/device/code")
        .header("Accept", "application/json")
        .form(&[("client_id", client_id), ("scope", "public_repo")])
        .send()
        .await?;

    let body: serde_json::Value = resp.json().await?;

    let field = |name: &str| -> Result<String> {
        body[name]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| NatterError::Auth(format!("No {} in response", name)))
    };
    let device_code = field("device_code")?;
    let user_code = field("user_code")?;
    let verification_uri = field("verification_uri")?;
    let interval = body["interval"].as_u64().unwrap_or(5);

    println!();
    println!("  To let natter comment as you on GitHub:");
    println!("  1. Open: {}", verification_uri);
    println!("  2. Enter code: {}", user_code);
    println!();
    print!("  Waiting for authorization...");
    std::io::stdout().flush().ok();

    loop {
        tokio::time::sleep(Duration::from_secs(interval)).await;

        let resp = client
            .post("https://github.com/login/oauth/access_token")
            .header("Accept", "application/json")
            .form(&[
                ("client_id", client_id),
                ("device_code", device_code.as_str()),
                ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
            ])
            .send()
            .await?;

        let body: serde_json::Value = resp.json().await?;

        if let Some(token) = body["access_token"].as_str() {
            println!(" done!");
            return Ok(token.to_string());
        }

        match body["error"].as_str() {
            Some("authorization_pending") => {
                print!(".");
                std::io::stdout().flush().ok();
            }
            Some("slow_down") => {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Some("expired_token") => {
                println!();
                return Err(NatterError::Auth(
                    "Device code expired. Please try again.".to_string(),
                ));
            }
            Some("access_denied") => {
                println!();
                return Err(NatterError::Auth("Authorization denied by user.".to_string()));
            }
            Some(err) => {
                println!();
                return Err(NatterError::Auth(format!("OAuth error: {}", err)));
            }
            None => {}
        }
    }
}

// Public client id of the OAuth App used for the device flow.
const GITHUB_CLIENT_ID: &str = "Ov23liYMRxFDN38Slfzr";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_does_not_leak_token() {
        let auth = AuthContext::with_token("secret-value");
        let printed = format!("{:?}", auth);
        assert!(!printed.contains("secret-value"));
        assert!(printed.contains("authenticated: true"));
        assert!(AuthContext::anonymous().is_anonymous());
    }

    #[test]
    fn cli_token_trims_output() {
        assert_eq!(try_cli_token("echo '  abc  '"), Some("abc".to_string()));
        assert_eq!(try_cli_token("true"), None);
        assert_eq!(try_cli_token("exit 1"), None);
    }
}
