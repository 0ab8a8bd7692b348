use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// Directory for persistent state (SQLite database).
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
    /// Base URL of the external issue tracker. If not set, tracker sync is
    /// disabled and issue-tracker review notifications degrade to disabled
    /// links.
    pub tracker_base_url: Option<String>,
    /// Bearer token for the issue tracker. Required when the base URL is
    /// set.
    pub tracker_auth_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let state_dir = env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let tracker_base_url = env::var("TRACKER_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let tracker_auth_token = env::var("TRACKER_AUTH_TOKEN")
            .ok()
            .filter(|s| !s.trim().is_empty());

        if tracker_base_url.is_some() && tracker_auth_token.is_none() {
            anyhow::bail!("TRACKER_AUTH_TOKEN is required when TRACKER_BASE_URL is set");
        }

        Ok(Config {
            port,
            state_dir,
            tracker_base_url,
            tracker_auth_token,
        })
    }
}
