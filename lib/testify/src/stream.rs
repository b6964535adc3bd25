use std::time::Duration;

use futures::{Stream, StreamExt};

// Generous, CI machines can be slow.
const COLLECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Takes the next `n` items, panics if they do not arrive in time.
pub async fn collect_n<S>(rx: S, n: usize) -> Vec<S::Item>
where
    S: Stream + Unpin,
{
    tokio::time::timeout(COLLECT_TIMEOUT, rx.take(n).collect())
        .await
        .unwrap_or_else(|_| panic!("Timed out while waiting for {n} items"))
}

pub async fn collect_one<S>(mut rx: S) -> S::Item
where
    S: Stream + Unpin,
{
    tokio::time::timeout(COLLECT_TIMEOUT, rx.next())
        .await
        .expect("Timed out while waiting for an item")
        .expect("stream ended")
}

/// Asserts nothing arrives on `rx` within `wait`.
pub async fn assert_quiet<S>(rx: &mut S, wait: Duration)
where
    S: Stream + Unpin,
    S::Item: std::fmt::Debug,
{
    if let Ok(item) = tokio::time::timeout(wait, rx.next()).await {
        panic!("unexpected item {item:?}");
    }
}
