//! Browsing-context capability used by the crawler.
//!
//! A [`BrowserHandle`] opens independent contexts (tabs); each
//! [`PageSession`] is owned by exactly one unit of work at a time.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

use crate::error::SessionError;

/// One browsing context.
#[async_trait]
pub trait PageSession: Send {
    /// Load `url` and return the rendered markup.
    ///
    /// Fails with [`SessionError::NavigationTimeout`] when the page does not
    /// load within `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<String, SessionError>;

    /// Wait until `selector` matches in the rendered page.
    ///
    /// Returns `false` when `timeout` elapses first.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> bool;

    /// Current rendered markup.
    async fn markup(&mut self) -> Result<String, SessionError>;

    /// Evaluate a script in the page, discarding its result.
    async fn run_script(&mut self, script: &str) -> Result<(), SessionError>;

    /// Click the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<(), SessionError>;

    /// Close this context.
    async fn close(self) -> Result<(), SessionError>
    where
        Self: Sized;
}

/// Opens browsing contexts.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    type Session: PageSession + 'static;

    async fn open_context(&self) -> Result<Self::Session, SessionError>;
}

/// Script that scrolls the first match of `selector` into view.
pub fn scroll_into_view_script(selector: &str) -> String {
    let literal = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(() => {{ const el = document.querySelector({}); if (el) {{ el.scrollIntoView(); }} }})()",
        literal
    )
}

/// Try to reveal optional content behind a UI control.
///
/// Waits for `button`, scrolls it into view, clicks it and waits for
/// `revealed`. Any failure along the way returns `false`; callers re-read
/// the markup either way.
pub async fn attempt_reveal<S: PageSession + ?Sized>(
    session: &mut S,
    button: &str,
    revealed: &str,
    timeout: Duration,
) -> bool {
    if !session.wait_for(button, timeout).await {
        debug!("Control {} not present", button);
        return false;
    }
    if let Err(e) = session.run_script(&scroll_into_view_script(button)).await {
        debug!("Could not scroll {} into view: {}", button, e);
    }
    if let Err(e) = session.click(button).await {
        debug!("Could not click {}: {}", button, e);
        return false;
    }
    session.wait_for(revealed, timeout).await
}

/// Fixed set of sessions shared by the workers of one batch.
pub struct SessionPool<S> {
    idle: Mutex<Vec<S>>,
    permits: Semaphore,
}

/// A session on loan from a [`SessionPool`]. Hand it back with [`SessionPool::checkin`].
pub struct Lease<'a, S> {
    pub session: S,
    _permit: SemaphorePermit<'a>,
}

impl<S> SessionPool<S> {
    pub fn new(sessions: Vec<S>) -> Self {
        let permits = Semaphore::new(sessions.len());
        Self {
            idle: Mutex::new(sessions),
            permits,
        }
    }

    /// Wait for a free session.
    pub async fn checkout(&self) -> Option<Lease<'_, S>> {
        let permit = self.permits.acquire().await.ok()?;
        let session = self.lock_idle().pop()?;
        Some(Lease {
            session,
            _permit: permit,
        })
    }

    pub fn checkin(&self, lease: Lease<'_, S>) {
        let Lease { session, _permit } = lease;
        self.lock_idle().push(session);
        drop(_permit);
    }

    /// Take back every idle session, for closing.
    pub fn into_sessions(self) -> Vec<S> {
        self.idle.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_idle(&self) -> std::sync::MutexGuard<'_, Vec<S>> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
