use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::PipelineError;

/// Round-robin over the configured API keys.
///
/// The cursor only moves through `next`, one step per call, wrapping at the
/// pool size. Blank keys are dropped when the pool is built.
#[derive(Debug)]
pub struct ApiKeyPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl ApiKeyPool {
    pub fn new<I, S>(keys: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys
            .into_iter()
            .map(Into::into)
            .filter(|key: &String| Self::is_usable(key))
            .collect();

        if keys.is_empty() {
            return Err(PipelineError::KeyPoolEmpty);
        }

        Ok(ApiKeyPool {
            keys,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Whether `key` would be kept by [`ApiKeyPool::new`].
    pub fn is_usable(key: &str) -> bool {
        !key.trim().is_empty()
    }

    /// How many of `keys` a pool built from them would hold.
    pub fn usable_count<S: AsRef<str>>(keys: &[S]) -> usize {
        keys.iter().filter(|key| Self::is_usable(key.as_ref())).count()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn next(&self) -> &str {
        let len = self.keys.len();
        let turn = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                Some((cursor + 1) % len)
            })
            .unwrap_or_else(|cursor| cursor);

        &self.keys[turn]
    }
}
