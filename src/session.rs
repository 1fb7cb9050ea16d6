//! Time-limited record of the last successful progress lookup.
//!
//! This only lets a page re-display a recent lookup. It is not signed, nothing validates it
//! server-side, and it must never gate access to anything.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::formats::Session;

pub const EXPIRED_MESSAGE: &str = "Session expired. Please search again to refresh.";

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn new_session(last_name: &str, dob: &str, now_ms: i64, ttl: Duration) -> Session {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    Session {
        last_name: last_name.to_owned(),
        dob: dob.to_owned(),
        created_at: now_ms,
        expires_at: now_ms.saturating_add(ttl_ms),
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stored payload as written, or `None` when nothing is stored.
    async fn load_raw(&self) -> anyhow::Result<Option<String>>;
    async fn save(&self, session: &Session) -> anyhow::Result<()>;
    async fn clear(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct LocalFsSessionStore {
    path: PathBuf,
}

impl LocalFsSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for LocalFsSessionStore {
    async fn load_raw(&self) -> anyhow::Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("read session: {}", self.path.display()))
            }
        }
    }

    async fn save(&self, session: &Session) -> anyhow::Result<()> {
        write_json_atomic(&self.path, session)
            .await
            .context("write session")
    }

    async fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("remove session: {}", self.path.display()))
            }
        }
    }
}

/// In-process store for the site server and tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    raw: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    fn slot(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.raw
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load_raw(&self) -> anyhow::Result<Option<String>> {
        Ok(self.slot()?.clone())
    }

    async fn save(&self, session: &Session) -> anyhow::Result<()> {
        let raw = serde_json::to_string(session).context("serialize session")?;
        *self.slot()? = Some(raw);
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}

async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create session dir: {}", parent.display()))?;
    }

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}

/// Returns the stored session if it is still live.
///
/// Expired or unreadable payloads are removed and treated as absent.
pub async fn restore(store: &dyn SessionStore, now_ms: i64) -> anyhow::Result<Option<Session>> {
    let Some(raw) = store.load_raw().await? else {
        return Ok(None);
    };

    match serde_json::from_str::<Session>(&raw) {
        Ok(session) if session.expires_at > 0 && now_ms <= session.expires_at => Ok(Some(session)),
        Ok(session) => {
            tracing::debug!(expires_at = session.expires_at, "discarding expired session");
            store.clear().await?;
            Ok(None)
        }
        Err(err) => {
            tracing::debug!(?err, "discarding malformed session");
            store.clear().await?;
            Ok(None)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Remaining(String),
    Expired,
}

/// "Session will reset in M:SS", never below zero.
pub fn countdown_text(remaining_ms: i64) -> String {
    let total_secs = remaining_ms.max(0) / 1000;
    format!(
        "Session will reset in {}:{:02}",
        total_secs / 60,
        total_secs % 60
    )
}

pub fn tick(expires_at: i64, now_ms: i64) -> Tick {
    let remaining = expires_at - now_ms;
    if remaining <= 0 {
        Tick::Expired
    } else {
        Tick::Remaining(countdown_text(remaining))
    }
}

/// One-second countdown toward a session's expiry.
///
/// On expiry the store is cleared and the last published tick becomes `Tick::Expired`.
/// Dropping the timer cancels it.
#[derive(Debug)]
pub struct SessionTimer {
    ticks: watch::Receiver<Tick>,
    task: JoinHandle<()>,
}

impl SessionTimer {
    pub fn start(expires_at: i64, store: Arc<dyn SessionStore>) -> Self {
        let (tx, ticks) = watch::channel(tick(expires_at, now_ms()));
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                match tick(expires_at, now_ms()) {
                    Tick::Remaining(text) => {
                        tx.send_replace(Tick::Remaining(text));
                    }
                    Tick::Expired => {
                        if let Err(err) = store.clear().await {
                            tracing::warn!(?err, "failed to clear expired session");
                        }
                        tracing::info!("session expired");
                        tx.send_replace(Tick::Expired);
                        break;
                    }
                }
            }
        });

        Self { ticks, task }
    }

    pub fn ticks(&self) -> watch::Receiver<Tick> {
        self.ticks.clone()
    }

    pub fn current(&self) -> Tick {
        self.ticks.borrow().clone()
    }

    /// Resolves once the countdown reaches zero; returns `false` if it was cancelled first.
    pub async fn expired(&self) -> bool {
        let mut ticks = self.ticks.clone();
        ticks.wait_for(|t| *t == Tick::Expired).await.is_ok()
    }

    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
