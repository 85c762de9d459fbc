use crate::chat::DEFAULT_PUSH_THRESHOLD;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9999/api/v1";

pub const ENV_BASE_API: &str = "AGNO_BASE_API";
pub const ENV_TOKEN: &str = "AGNO_TOKEN";
/// Overrides where every file of this tool lives.
pub const ENV_HOME: &str = "AGNO_CHAT_HOME";

const APP_DIR: &str = "agno-chat";
const CONFIG_FILE: &str = "config.toml";

/// Where a per-user file of this tool lives.
///
/// `$AGNO_CHAT_HOME/<file>` when set, else `<xdg_var>/agno-chat/<file>`, else
/// `$HOME/<home_fallback>/agno-chat/<file>`. Nothing is created on disk.
pub(crate) fn user_file(
    file: &str,
    xdg_var: &str,
    home_fallback: &[&str],
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<PathBuf> {
    let set = |k: &str| env(k).filter(|v| !v.is_empty());

    if let Some(home) = set(ENV_HOME) {
        return Ok(PathBuf::from(home).join(file));
    }
    let base = match set(xdg_var) {
        Some(xdg) => PathBuf::from(xdg),
        None => {
            let home = set("HOME").context("HOME is not set")?;
            home_fallback.iter().fold(PathBuf::from(home), |p, seg| p.join(seg))
        }
    };
    Ok(base.join(APP_DIR).join(file))
}

/// The TOML config file read at startup.
pub fn config_path() -> anyhow::Result<PathBuf> {
    user_file(CONFIG_FILE, "XDG_CONFIG_HOME", &[".config"], |k| std::env::var(k).ok())
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// API base URL including the version path (optional)
    pub base_url: Option<String>,

    /// Longest message (in characters) still sent over the GET event stream.
    pub push_threshold: Option<usize>,

    /// Static access token; takes precedence over a cached login.
    pub token: Option<String>,
}

impl Config {
    /// Load config if the file exists, otherwise return Ok(None).
    pub fn load_optional(path: impl AsRef<Path>) -> anyhow::Result<Option<Self>> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("failed to read config: {}", path.display()))
            }
        };

        let s = String::from_utf8(bytes).context("config is not valid UTF-8")?;
        let cfg: Config = toml::from_str(&s)
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;
        Ok(Some(cfg))
    }
}

/// Effective settings after applying flags, environment and config file, in
/// that order of precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub push_threshold: usize,
    pub token: Option<String>,
}

impl Settings {
    pub fn resolve(
        cfg: Option<&Config>,
        base_url_flag: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let base_url = base_url_flag
            .or_else(|| env(ENV_BASE_API))
            .or_else(|| cfg.and_then(|c| c.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let push_threshold = cfg
            .and_then(|c| c.push_threshold)
            .unwrap_or(DEFAULT_PUSH_THRESHOLD);

        let token = env(ENV_TOKEN)
            .or_else(|| cfg.and_then(|c| c.token.clone()))
            .filter(|t| !t.trim().is_empty());

        Self {
            base_url,
            push_threshold,
            token,
        }
    }

    pub fn from_env(cfg: Option<&Config>, base_url_flag: Option<String>) -> Self {
        Self::resolve(cfg, base_url_flag, |k| std::env::var(k).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_without_config() {
        let s = Settings::resolve(None, None, no_env);
        assert_eq!(s.base_url, DEFAULT_BASE_URL);
        assert_eq!(s.push_threshold, DEFAULT_PUSH_THRESHOLD);
        assert_eq!(s.token, None);
    }

    #[test]
    fn flag_beats_env_beats_file() {
        let cfg: Config = toml::from_str(
            r#"
            base_url = "http://file/api/v1"
            push_threshold = 40
            token = "from-file"
            "#,
        )
        .unwrap();
        let env = |k: &str| match k {
            ENV_BASE_API => Some("http://env/api/v1".to_string()),
            _ => None,
        };

        let s = Settings::resolve(Some(&cfg), None, env);
        assert_eq!(s.base_url, "http://env/api/v1");
        assert_eq!(s.push_threshold, 40);
        assert_eq!(s.token.as_deref(), Some("from-file"));

        let s = Settings::resolve(Some(&cfg), Some("http://flag/api/v1".into()), env);
        assert_eq!(s.base_url, "http://flag/api/v1");
    }

    #[test]
    fn blank_token_is_ignored() {
        let env = |k: &str| (k == ENV_TOKEN).then(|| "  ".to_string());
        assert_eq!(Settings::resolve(None, None, env).token, None);
    }

    #[test]
    fn user_file_prefers_override_then_xdg_then_home() {
        let all = |k: &str| match k {
            ENV_HOME => Some("/opt/agno".to_string()),
            "XDG_CONFIG_HOME" => Some("/xdg".to_string()),
            "HOME" => Some("/home/ops".to_string()),
            _ => None,
        };
        let path = user_file(CONFIG_FILE, "XDG_CONFIG_HOME", &[".config"], all).unwrap();
        assert_eq!(path, PathBuf::from("/opt/agno/config.toml"));

        let no_override = |k: &str| if k == ENV_HOME { None } else { all(k) };
        let path = user_file(CONFIG_FILE, "XDG_CONFIG_HOME", &[".config"], no_override).unwrap();
        assert_eq!(path, PathBuf::from("/xdg/agno-chat/config.toml"));

        let home_only = |k: &str| (k == "HOME").then(|| "/home/ops".to_string());
        let path = user_file("t.json", "XDG_STATE_HOME", &[".local", "state"], home_only).unwrap();
        assert_eq!(path, PathBuf::from("/home/ops/.local/state/agno-chat/t.json"));
    }

    #[test]
    fn user_file_needs_some_base() {
        let empty_home = |k: &str| (k == "HOME").then(String::new);
        assert!(user_file(CONFIG_FILE, "XDG_CONFIG_HOME", &[".config"], empty_home).is_err());
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_optional(dir.path().join("config.toml")).unwrap().is_none());
    }
}
