//! Google sessions persisted on disk, one file per OAuth client.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use google_calendar::AccessToken;

use crate::auth::Session;

/// ~/.config/calbridge/providers/google
pub fn base_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Could not determine config directory")?
        .join("calbridge")
        .join("providers")
        .join("google"))
}

impl From<&AccessToken> for Session {
    fn from(tokens: &AccessToken) -> Self {
        let expires_at = if tokens.expires_in > 0 {
            Some(Utc::now() + Duration::seconds(tokens.expires_in))
        } else {
            None
        };

        Session {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at,
        }
    }
}

pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SessionStore { dir: dir.into() }
    }

    /// Store under the platform config directory.
    pub fn in_config_dir() -> Result<Self> {
        Ok(Self::new(base_dir()?.join("session")))
    }

    fn path(&self, client_id: &str) -> PathBuf {
        let client_slug = client_id.replace(['/', '\\', ':'], "_");
        self.dir.join(format!("{}.toml", client_slug))
    }

    /// The stored session, `None` if the client never signed in.
    pub fn load(&self, client_id: &str) -> Result<Option<Session>> {
        let path = self.path(client_id);

        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read Google OAuth session from {}",
                path.display()
            )
        })?;

        let session: Session = toml::from_str(&contents).with_context(|| {
            format!(
                "Failed to parse Google OAuth session from {}",
                path.display()
            )
        })?;

        Ok(Some(session))
    }

    pub fn save(&self, client_id: &str, session: &Session) -> Result<()> {
        let contents = toml::to_string_pretty(session).context("Failed to serialize session")?;
        let path = self.path(client_id);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write session to {}", path.display()))?;

        // Owner-only: the file holds OAuth tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }

        Ok(())
    }
}
