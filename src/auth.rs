use crate::api::{ApiClient, ApiError};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Access token persisted on disk after `login`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub username: Option<String>,

    /// Base URL the token was issued by.
    pub base_url: String,

    /// Seconds since UNIX epoch.
    pub obtained_at: u64,
}

impl AccessToken {
    /// A cached token is only reused against the backend that issued it.
    pub fn issued_by(&self, base_url: &str) -> bool {
        self.base_url.trim_end_matches('/') == base_url.trim_end_matches('/')
    }
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    username: Option<String>,
}

pub async fn login(api: &ApiClient, username: &str, password: &str) -> anyhow::Result<AccessToken> {
    let resp = api
        .post::<TokenResponse, _>("/base/access_token", &Credentials { username, password })
        .await;

    let tok = match resp.and_then(|r| r.into_data()) {
        Ok(tok) => tok,
        Err(ApiError::Envelope { code, msg }) => {
            return Err(anyhow!("login rejected ({code}): {msg}"));
        }
        Err(e) => return Err(anyhow!(e).context("failed to request access token")),
    };

    Ok(AccessToken {
        access_token: tok.access_token,
        username: tok.username.or_else(|| Some(username.to_string())),
        base_url: api.base_url().to_string(),
        obtained_at: now_secs(),
    })
}

/// Where `login` caches the access token.
pub fn token_path() -> anyhow::Result<PathBuf> {
    crate::config::user_file("access_token.json", "XDG_STATE_HOME", &[".local", "state"], |k| {
        std::env::var(k).ok()
    })
}

pub fn load_token(path: impl AsRef<Path>) -> anyhow::Result<Option<AccessToken>> {
    let path = path.as_ref();
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(anyhow!(e)).with_context(|| format!("failed to read token: {}", path.display())),
    };
    let tok: AccessToken = serde_json::from_slice(&bytes).context("failed to parse token JSON")?;
    Ok(Some(tok))
}

pub fn save_token_atomic(path: impl AsRef<Path>, tok: &AccessToken) -> anyhow::Result<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create token directory: {}", dir.display()))?;

    let tmp = tmp_path(path);
    let bytes = serde_json::to_vec_pretty(tok).context("failed to serialize token")?;
    std::fs::write(&tmp, bytes).with_context(|| format!("failed to write temp token: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move token into place: {}", path.display()))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "token.json".to_string());
    p.set_file_name(format!("{file}.tmp"));
    p
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}
