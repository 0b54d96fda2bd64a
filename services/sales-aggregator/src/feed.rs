//! Event feed handle
//!
//! The feed is an explicit value created by `channel()`: a cloneable
//! `FeedPublisher` for whatever transport produces messages, and a single
//! `FeedHandle` owned by the session that consumes them in order.
//!
//! The handle tracks which channels are attached. Messages on a detached
//! channel are discarded on receipt. `close` detaches everything and shuts
//! the queue; from then on `recv` yields `None` and publishers get
//! `FeedError::Closed`.

use std::collections::BTreeSet;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::events::{FeedChannel, FeedMessage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("feed is closed")]
    Closed,
}

/// Create a connected publisher/handle pair with every channel attached.
pub fn channel() -> (FeedPublisher, FeedHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        FeedPublisher { tx },
        FeedHandle {
            rx,
            attached: FeedChannel::all().iter().copied().collect(),
            discarded: 0,
        },
    )
}

/// Producer side of the feed.
#[derive(Debug, Clone)]
pub struct FeedPublisher {
    tx: mpsc::UnboundedSender<FeedMessage>,
}

impl FeedPublisher {
    /// Enqueue a message. Never blocks; fails only once the feed is closed.
    pub fn publish(&self, message: FeedMessage) -> Result<(), FeedError> {
        self.tx.send(message).map_err(|_| FeedError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the feed, owned by exactly one session.
#[derive(Debug)]
pub struct FeedHandle {
    rx: mpsc::UnboundedReceiver<FeedMessage>,
    attached: BTreeSet<FeedChannel>,
    discarded: u64,
}

impl FeedHandle {
    /// Next message on an attached channel, in arrival order.
    ///
    /// Returns `None` once the feed is closed and drained, or when every
    /// publisher has been dropped. Cancel safe.
    pub async fn recv(&mut self) -> Option<FeedMessage> {
        loop {
            let message = self.rx.recv().await?;
            let channel = message.channel();
            if self.attached.contains(&channel) {
                return Some(message);
            }
            self.discarded += 1;
            debug!(channel = channel.as_str(), "Discarding message on detached channel");
        }
    }

    /// Next already-queued message on an attached channel, without waiting.
    pub fn try_recv(&mut self) -> Option<FeedMessage> {
        while let Ok(message) = self.rx.try_recv() {
            let channel = message.channel();
            if self.attached.contains(&channel) {
                return Some(message);
            }
            self.discarded += 1;
        }
        None
    }

    /// Stop delivering one channel. Returns whether it was attached.
    pub fn detach(&mut self, channel: FeedChannel) -> bool {
        let removed = self.attached.remove(&channel);
        if removed {
            info!(channel = channel.as_str(), "Feed channel detached");
        }
        removed
    }

    /// Detach every channel and close the queue.
    ///
    /// Anything still buffered is dropped. Idempotent.
    pub fn close(&mut self) {
        for channel in FeedChannel::all() {
            self.detach(*channel);
        }
        self.rx.close();

        let mut dropped = 0u64;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        self.discarded += dropped;

        info!(dropped, "Feed closed");
    }

    /// Whether no channel remains attached.
    pub fn is_closed(&self) -> bool {
        self.attached.is_empty()
    }

    pub fn is_attached(&self, channel: FeedChannel) -> bool {
        self.attached.contains(&channel)
    }

    /// Currently attached channels.
    pub fn attached(&self) -> impl Iterator<Item = FeedChannel> + '_ {
        self.attached.iter().copied()
    }

    /// Messages dropped because their channel was detached or the feed closed.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}
