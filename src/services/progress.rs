use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
}

/// Counts finished organization tasks and publishes each new count.
pub struct ProgressTracker {
    total: usize,
    completed: AtomicUsize,
    board: Arc<watch::Sender<ProgressSnapshot>>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        let (board, _) = watch::channel(ProgressSnapshot::default());
        Self::publishing_to(Arc::new(board), total)
    }

    /// Resets `board` to `0/total` and publishes to it from now on.
    pub fn publishing_to(board: Arc<watch::Sender<ProgressSnapshot>>, total: usize) -> Self {
        board.send_replace(ProgressSnapshot {
            completed: 0,
            total,
        });

        ProgressTracker {
            total,
            completed: AtomicUsize::new(0),
            board,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.board.subscribe()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed: self.completed.load(Ordering::Acquire),
            total: self.total,
        }
    }

    pub fn complete_one(&self) -> ProgressSnapshot {
        let completed = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        let snapshot = ProgressSnapshot {
            completed,
            total: self.total,
        };

        // Only the highest count is published, so observers never go backwards
        self.board.send_if_modified(|current| {
            if snapshot.completed > current.completed {
                *current = snapshot;
                true
            } else {
                false
            }
        });
        log::info!("Completed {}/{} organizations", completed, self.total);

        snapshot
    }
}
