use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::Mutex;

// ─── Per-Key Serial Queue ───

/// Serializes async operations per key while keeping different keys
/// fully concurrent.
///
/// Built on `tokio::sync::Mutex`, whose lock acquisition is FIFO-fair,
/// so operations queued for the same key run in submission order. Used
/// for explicit workspace commands so two rapid moves of the same tab
/// cannot interleave their read-modify-write cycles.
#[derive(Debug, Default)]
pub struct SerialQueue<K: Hash + Eq> {
    lanes: StdMutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Hash + Eq + Clone> SerialQueue<K> {
    pub fn new() -> Self {
        Self {
            lanes: StdMutex::new(HashMap::new()),
        }
    }

    fn lane(&self, key: &K) -> Arc<Mutex<()>> {
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        // A lane referenced only by this map has no running or queued
        // user left and can go.
        lanes.retain(|_, lane| Arc::strong_count(lane) > 1);
        lanes.entry(key.clone()).or_default().clone()
    }

    /// Number of lanes currently tracked. Idle lanes are swept on the
    /// next submission.
    pub fn lane_count(&self) -> usize {
        self.lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run `op` once all previously submitted operations for `key`
    /// have completed.
    pub async fn run<F, T>(&self, key: &K, op: F) -> T
    where
        F: Future<Output = T>,
    {
        let lane = self.lane(key);
        let _guard = lane.lock().await;
        op.await
    }
}

// ─── Tests ───

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn same_key_runs_in_submission_order() {
        let queue = Arc::new(SerialQueue::new());
        let log = Arc::new(StdMutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..4u64 {
            let queue = queue.clone();
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .run(&1u64, async move {
                        // Earlier submissions sleep longer; FIFO ordering
                        // must still hold.
                        tokio::time::sleep(Duration::from_millis(40 - i * 10)).await;
                        log.lock().unwrap().push(i);
                    })
                    .await;
            }));
            // Yield so each spawn reaches the lane lock before the next.
            tokio::task::yield_now().await;
        }
        tokio::time::advance(Duration::from_millis(500)).await;
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn idle_lanes_are_swept() {
        let queue = SerialQueue::new();
        queue.run(&1u64, async {}).await;
        queue.run(&2u64, async {}).await;

        // Lane 1 sat idle by the second submission and got dropped.
        assert_eq!(queue.lane_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn different_keys_do_not_block_each_other() {
        let queue = Arc::new(SerialQueue::new());
        let done = Arc::new(AtomicUsize::new(0));

        let slow = {
            let (queue, done) = (queue.clone(), done.clone());
            tokio::spawn(async move {
                queue
                    .run(&1u64, async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    })
                    .await;
                done.fetch_add(1, Ordering::SeqCst);
            })
        };
        let fast = {
            let (queue, done) = (queue.clone(), done.clone());
            tokio::spawn(async move {
                queue.run(&2u64, async {}).await;
                done.fetch_add(1, Ordering::SeqCst);
            })
        };

        tokio::time::advance(Duration::from_millis(10)).await;
        fast.await.unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(120)).await;
        slow.await.unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }
}
