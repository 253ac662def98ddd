//! Keyed live feeds of full snapshots.
//!
//! Each key (a user id) gets its own broadcast channel. Subscribers receive
//! the state at subscription time, then every snapshot published after it.
//! A subscriber that falls behind jumps to the newest snapshot instead of
//! replaying the ones it missed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

/// A family of per-key snapshot channels.
pub struct Feed<T> {
    name: &'static str,
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<T>>>>,
    capacity: usize,
}

impl<T: Clone + Send + 'static> Feed<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Register interest in `key`.
    ///
    /// Call this before reading the initial snapshot so no publish in
    /// between is lost.
    #[allow(clippy::significant_drop_tightening)]
    pub async fn subscribe(&self, key: &str) -> broadcast::Receiver<T> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        tx.subscribe()
    }

    /// Whether anyone is currently listening on `key`.
    pub async fn has_subscribers(&self, key: &str) -> bool {
        self.channels
            .read()
            .await
            .get(key)
            .is_some_and(|tx| tx.receiver_count() > 0)
    }

    /// Remove the channel for `key` if nobody is listening on it.
    ///
    /// Returns whether a channel was removed.
    pub async fn prune(&self, key: &str) -> bool {
        let mut channels = self.channels.write().await;
        let abandoned = channels.get(key).is_some_and(|tx| tx.receiver_count() == 0);
        if abandoned {
            channels.remove(key);
            drop(channels);
            debug!(feed = self.name, key, "Dropped feed with no subscribers");
        }
        abandoned
    }

    /// Send a snapshot to every subscriber of `key`.
    ///
    /// Returns the number of receivers reached. A channel with no receivers
    /// left is removed.
    pub async fn publish(&self, key: &str, snapshot: T) -> usize {
        let mut channels = self.channels.write().await;
        let Some(tx) = channels.get(key) else {
            return 0;
        };
        if let Ok(reached) = tx.send(snapshot) {
            return reached;
        }
        channels.remove(key);
        drop(channels);
        debug!(feed = self.name, key, "Dropped feed with no subscribers");
        0
    }

    /// Number of keys with a live channel.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

/// One consumer's view of a feed: the initial snapshot, then updates.
pub struct Subscription<T> {
    initial: Option<T>,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    pub const fn new(initial: T, rx: broadcast::Receiver<T>) -> Self {
        Self {
            initial: Some(initial),
            rx,
        }
    }

    /// The next snapshot, or `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<T> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => return Some(self.newest(snapshot)),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Feed subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Skip past any snapshots already queued behind `snapshot`.
    fn newest(&mut self, mut snapshot: T) -> T {
        loop {
            match self.rx.try_recv() {
                Ok(next) => snapshot = next,
                Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return snapshot,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initial_snapshot_comes_first() {
        let feed = Feed::<u32>::new("test", 4);
        let rx = feed.subscribe("u1").await;
        let mut sub = Subscription::new(0, rx);

        assert_eq!(feed.publish("u1", 1).await, 1);
        assert_eq!(sub.next().await, Some(0));
        assert_eq!(sub.next().await, Some(1));
    }

    #[tokio::test]
    async fn slow_subscriber_skips_to_newest() {
        let feed = Feed::<u32>::new("test", 2);
        let rx = feed.subscribe("u1").await;
        let mut sub = Subscription::new(0, rx);
        assert_eq!(sub.next().await, Some(0));

        for n in 1..=5 {
            feed.publish("u1", n).await;
        }
        assert_eq!(sub.next().await, Some(5));
    }

    #[tokio::test]
    async fn keys_are_isolated() {
        let feed = Feed::<u32>::new("test", 4);
        let rx = feed.subscribe("u1").await;
        let mut sub = Subscription::new(0, rx);
        sub.next().await;

        assert_eq!(feed.publish("u2", 9).await, 0);
        feed.publish("u1", 1).await;
        assert_eq!(sub.next().await, Some(1));
    }

    #[tokio::test]
    async fn abandoned_channels_are_dropped_on_publish() {
        let feed = Feed::<u32>::new("test", 4);
        let rx = feed.subscribe("u1").await;
        assert!(feed.has_subscribers("u1").await);
        drop(rx);

        assert!(!feed.has_subscribers("u1").await);
        assert_eq!(feed.channel_count().await, 1);
        assert_eq!(feed.publish("u1", 1).await, 0);
        assert_eq!(feed.channel_count().await, 0);
    }

    #[tokio::test]
    async fn prune_keeps_live_channels() {
        let feed = Feed::<u32>::new("test", 4);
        let live = feed.subscribe("u1").await;
        let gone = feed.subscribe("u2").await;
        drop(gone);

        assert!(!feed.prune("u1").await);
        assert!(feed.prune("u2").await);
        assert!(!feed.prune("u3").await);
        assert_eq!(feed.channel_count().await, 1);
        drop(live);
    }
}
