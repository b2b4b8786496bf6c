use std::{
    ops::Deref,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{
    error::{BrowserError, PipelineError},
    services::{BrowserBackend, BrowserSession},
};

type IdleSessions<S> = Arc<Mutex<Vec<S>>>;

/// A bounded set of browser sessions handed out one lease at a time.
///
/// The semaphore is the admission gate: a caller holds a permit for as long
/// as it holds a session, so at most `capacity` sessions exist and no session
/// is ever shared between two leases. Sessions are created lazily and reused.
pub struct SessionPool<B: BrowserBackend> {
    backend: B,
    gate: Arc<Semaphore>,
    idle: IdleSessions<B::Session>,
    capacity: usize,
}

impl<B: BrowserBackend> SessionPool<B> {
    pub fn new(backend: B, capacity: usize) -> Result<Self, PipelineError> {
        if capacity == 0 {
            return Err(PipelineError::EmptySessionPool);
        }

        Ok(SessionPool {
            backend,
            gate: Arc::new(Semaphore::new(capacity)),
            idle: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of sessions currently leased out.
    pub fn leased(&self) -> usize {
        self.capacity - self.gate.available_permits()
    }

    /// Waits for a free slot, then reuses an idle session or opens a new one.
    pub async fn acquire(&self) -> Result<SessionLease<B::Session>, PipelineError> {
        let permit = self.gate.clone().acquire_owned().await.map_err(|_| {
            PipelineError::SessionUnavailable(BrowserError::Backend(
                "session pool is shut down".to_string(),
            ))
        })?;

        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let session = match reused {
            Some(session) => session,
            None => self
                .backend
                .open_session()
                .await
                .map_err(PipelineError::SessionUnavailable)?,
        };

        Ok(SessionLease {
            session: Some(session),
            discarded: AtomicBool::new(false),
            idle: self.idle.clone(),
            gate: self.gate.clone(),
            _permit: permit,
        })
    }

    /// Returns a session to the pool. Dropping the lease does the same.
    pub fn release(&self, lease: SessionLease<B::Session>) {
        drop(lease);
    }

    /// Stops admitting callers and quits every idle session.
    pub async fn shutdown(&self) {
        self.gate.close();

        let sessions: Vec<B::Session> = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        log::info!("Shutting down {} browser sessions", sessions.len());
        for session in sessions {
            if let Err(e) = session.quit().await {
                log::warn!("Failed to quit browser session: {}", e);
            }
        }
    }
}

/// Exclusive use of one session. Goes back to the pool on drop unless it
/// was discarded, in which case it is quit and its slot opens a new session.
pub struct SessionLease<S: BrowserSession> {
    session: Option<S>,
    discarded: AtomicBool,
    idle: IdleSessions<S>,
    gate: Arc<Semaphore>,
    _permit: OwnedSemaphorePermit,
}

impl<S: BrowserSession> SessionLease<S> {
    /// Marks the session as left in an unknown state (stray tab, dead driver).
    pub fn discard(&self) {
        self.discarded.store(true, Ordering::Release);
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded.load(Ordering::Acquire)
    }
}

impl<S: BrowserSession> Deref for SessionLease<S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.session
            .as_ref()
            .unwrap_or_else(|| unreachable!("session is only taken on drop"))
    }
}

impl<S: BrowserSession> Drop for SessionLease<S> {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        if self.is_discarded() || self.gate.is_closed() {
            // Nobody will reuse or quit this session
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = session.quit().await {
                        log::warn!("Failed to quit retired browser session: {}", e);
                    }
                });
            }
            return;
        }

        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(session);
    }
}
