//! Persisted authentication session.
//!
//! One JSON slot on disk, shared by every run. It is created by the first
//! [`SessionStore::ensure`] and lives until it is deleted externally (or, with
//! expiry checking on, until a cookie expires).

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::Session;
use crate::scrapers::{LoginCredentials, PageFetcher};

pub struct SessionStore {
    path: PathBuf,
    check_expiry: bool,
    /// Serializes `ensure` so concurrent callers authenticate once.
    lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            check_expiry: false,
            lock: Mutex::new(()),
        }
    }

    /// Treat a session with an expired cookie as absent.
    pub fn with_expiry_check(mut self, check_expiry: bool) -> Self {
        self.check_expiry = check_expiry;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted session. `Ok(None)` when no slot exists.
    pub async fn load(&self) -> Result<Option<Session>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session = serde_json::from_str(&contents)?;
        Ok(Some(session))
    }

    /// The persisted session if it is usable without logging in again.
    pub async fn current(&self) -> Result<Option<Session>> {
        match self.load().await? {
            Some(session) if self.check_expiry && session.is_expired(Utc::now()) => {
                info!("Session in {} has expired", self.path.display());
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Return the persisted session, authenticating through `fetcher` first
    /// if there is none (or it expired and expiry checking is on).
    ///
    /// Nothing is written when authentication fails.
    pub async fn ensure<F: PageFetcher + ?Sized>(
        &self,
        fetcher: &mut F,
        credentials: &LoginCredentials,
    ) -> Result<Session> {
        let _guard = self.lock.lock().await;

        if let Some(session) = self.current().await? {
            debug!("Reusing session from {}", self.path.display());
            return Ok(session);
        }

        info!("Logging in as {}", credentials.email);
        let cookies = fetcher
            .authenticate(credentials)
            .await
            .map_err(|e| PipelineError::AuthenticationFailed(format!("{:#}", e)))?;

        let session = Session::new(cookies);
        self.save(&session).await?;
        info!(
            "Saved {} cookies to {}",
            session.cookies.len(),
            self.path.display()
        );
        Ok(session)
    }

    /// Write the session atomically: a sibling temp file renamed over the slot.
    async fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(session)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
