//! Session Manager: token lifecycle, scheduled rotation and the fail-closed gate.
//!
//! The session holds one token pair at a time. Two deadlines drive rotation:
//! when the access deadline passes the access token is refreshed, when the
//! refresh deadline passes a full credential login is performed. Every issued
//! token pushes its deadline forward by the configured lifetime.
//!
//! A failed scheduled rotation marks the session degraded. While degraded,
//! authenticated requests are rejected locally; the next successful rotation
//! restores it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard, Notify, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use super::gateway::{AuthError, AuthGateway};
use crate::domain::{Credentials, TokenLifetimes, TokenPair};

// Upper bound for any single wait; longer lifetimes are clamped to it.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay.min(FAR_FUTURE)).unwrap_or(now)
}

/// Observable state of a [`SessionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No token pair has been issued yet.
    Uninitialized,
    /// A token pair is held and the last rotation succeeded.
    Active,
    /// The last scheduled rotation failed; authenticated requests are rejected.
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Timer {
    AccessToken,
    RefreshToken,
}

struct SessionState {
    tokens: Option<Arc<TokenPair>>,
    access_deadline: Instant,
    refresh_deadline: Instant,
    auth_failed: bool,
}

struct SessionInner {
    gateway: Arc<dyn AuthGateway>,
    credentials: Credentials,
    lifetimes: TokenLifetimes,
    retry_interval: Option<Duration>,
    state: RwLock<SessionState>,
    // Serializes login/refresh so a refresh token is never spent twice.
    rotation: Mutex<()>,
    rearm: Notify,
}

#[derive(Clone)]
/// Owner of the client's token pair.
///
/// Cloning is cheap; clones share the same session.
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    /// Create an empty (uninitialized) session. Nothing is sent until [`login`](Self::login).
    ///
    /// `retry_interval` is how long to wait after a failed scheduled rotation before
    /// trying again; `None` waits one full lifetime of the timer that failed.
    pub fn new(
        gateway: Arc<dyn AuthGateway>,
        credentials: Credentials,
        lifetimes: TokenLifetimes,
        retry_interval: Option<Duration>,
    ) -> Self {
        let now = Instant::now();
        Self {
            inner: Arc::new(SessionInner {
                gateway,
                credentials,
                lifetimes,
                retry_interval,
                state: RwLock::new(SessionState {
                    tokens: None,
                    access_deadline: deadline_after(now, lifetimes.access()),
                    refresh_deadline: deadline_after(now, lifetimes.refresh()),
                    auth_failed: false,
                }),
                rotation: Mutex::new(()),
                rearm: Notify::new(),
            }),
        }
    }

    /// Log in with the stored credentials and replace both tokens.
    ///
    /// Re-arms both timers. On failure the stored tokens are left untouched.
    pub async fn login(&self) -> Result<Arc<TokenPair>, AuthError> {
        let rotation = self.inner.rotation.lock().await;
        self.login_locked(&rotation).await
    }

    /// Exchange the current refresh token for a new pair.
    ///
    /// Re-arms the access timer, and the refresh timer as well when the refresh
    /// token was rotated. On failure the stored tokens are left untouched.
    pub async fn refresh(&self) -> Result<Arc<TokenPair>, AuthError> {
        let rotation = self.inner.rotation.lock().await;
        self.refresh_locked(&rotation).await
    }

    /// `false` once a scheduled rotation has failed (or before the first login).
    pub async fn is_usable(&self) -> bool {
        let state = self.inner.state.read().await;
        !state.auth_failed && state.tokens.is_some()
    }

    /// Whether the session holds tokens and whether the last rotation succeeded.
    pub async fn status(&self) -> SessionStatus {
        let state = self.inner.state.read().await;
        match (&state.tokens, state.auth_failed) {
            (None, _) => SessionStatus::Uninitialized,
            (Some(_), true) => SessionStatus::Degraded,
            (Some(_), false) => SessionStatus::Active,
        }
    }

    /// The access token currently held, without any freshness check.
    pub async fn access_token(&self) -> Option<String> {
        let state = self.inner.state.read().await;
        state.tokens.as_ref().map(|tokens| tokens.access().to_owned())
    }

    /// Snapshot of the current token pair.
    pub async fn tokens(&self) -> Option<Arc<TokenPair>> {
        self.inner.state.read().await.tokens.clone()
    }

    /// Access token to attach to an authenticated request, or `None` when the
    /// session must not be used.
    pub(crate) async fn authorization(&self) -> Option<String> {
        let state = self.inner.state.read().await;
        if state.auth_failed {
            return None;
        }
        state.tokens.as_ref().map(|tokens| tokens.access().to_owned())
    }

    async fn login_locked(
        &self,
        _rotation: &MutexGuard<'_, ()>,
    ) -> Result<Arc<TokenPair>, AuthError> {
        let tokens = Arc::new(self.inner.gateway.login(&self.inner.credentials).await?);

        let now = Instant::now();
        {
            let mut state = self.inner.state.write().await;
            state.tokens = Some(Arc::clone(&tokens));
            state.access_deadline = deadline_after(now, self.inner.lifetimes.access());
            state.refresh_deadline = deadline_after(now, self.inner.lifetimes.refresh());
            state.auth_failed = false;
        }
        self.inner.rearm.notify_one();

        tracing::info!("Logged in to SIL Comms");
        Ok(tokens)
    }

    async fn refresh_locked(
        &self,
        _rotation: &MutexGuard<'_, ()>,
    ) -> Result<Arc<TokenPair>, AuthError> {
        let current = self.tokens().await.ok_or(AuthError::NotLoggedIn)?;
        let tokens = Arc::new(self.inner.gateway.refresh(current.refresh()).await?);
        let rotated = tokens.refresh() != current.refresh();

        let now = Instant::now();
        {
            let mut state = self.inner.state.write().await;
            state.tokens = Some(Arc::clone(&tokens));
            state.access_deadline = deadline_after(now, self.inner.lifetimes.access());
            if rotated {
                state.refresh_deadline = deadline_after(now, self.inner.lifetimes.refresh());
            }
            state.auth_failed = false;
        }
        self.inner.rearm.notify_one();

        tracing::info!(rotated, "Refreshed SIL Comms access token");
        Ok(tokens)
    }

    /// Run one scheduled rotation. Failures degrade the session and push the
    /// failed timer out by the retry interval.
    pub(crate) async fn run_timer(&self, timer: Timer) {
        let rotation = self.inner.rotation.lock().await;
        let result = match timer {
            Timer::AccessToken => self.refresh_locked(&rotation).await,
            Timer::RefreshToken => self.login_locked(&rotation).await,
        };

        let Err(err) = result else {
            return;
        };
        tracing::error!(error = %err, ?timer, "Scheduled token rotation failed");

        let retry = self.inner.retry_interval.unwrap_or(match timer {
            Timer::AccessToken => self.inner.lifetimes.access(),
            Timer::RefreshToken => self.inner.lifetimes.refresh(),
        });
        let mut state = self.inner.state.write().await;
        if !state.auth_failed {
            tracing::warn!("Session degraded; authenticated requests will be rejected");
        }
        state.auth_failed = true;
        let next = deadline_after(Instant::now(), retry);
        match timer {
            Timer::AccessToken => state.access_deadline = next,
            Timer::RefreshToken => state.refresh_deadline = next,
        }
    }

    async fn deadlines(&self) -> (Instant, Instant) {
        let state = self.inner.state.read().await;
        (state.access_deadline, state.refresh_deadline)
    }

    /// Start the background rotation loop on the current tokio runtime.
    pub fn spawn_scheduler(&self) -> Scheduler {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.clone().run_scheduler(shutdown_rx));
        Scheduler {
            shutdown: shutdown_tx,
            task: Mutex::new(Some(task)),
        }
    }

    async fn run_scheduler(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Token scheduler started");

        while !*shutdown.borrow() {
            let (access_at, refresh_at) = self.deadlines().await;
            let timer = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                () = self.inner.rearm.notified() => continue,
                () = sleep_until(refresh_at) => Timer::RefreshToken,
                () = sleep_until(access_at) => Timer::AccessToken,
            };

            // An in-flight rotation is abandoned on shutdown.
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                () = self.run_timer(timer) => {}
            }
        }

        tracing::info!("Token scheduler stopped");
    }
}

/// Handle to the background rotation loop.
///
/// The loop stops when [`Scheduler::shutdown`] is awaited or the handle is dropped.
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Signal the loop to stop and wait for it to finish. Idempotent.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let Some(task) = self.task.lock().await.take() else {
            return;
        };
        if let Err(err) = task.await {
            tracing::warn!(error = %err, "Token scheduler task ended abnormally");
        }
    }

    /// `false` once shutdown has been requested.
    pub fn is_running(&self) -> bool {
        !*self.shutdown.borrow()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
