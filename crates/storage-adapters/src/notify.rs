//! # In-process notification hub
//!
//! Live push channels keyed by user. Each user's bucket sits behind its own
//! DashMap shard lock, so subscribe/unsubscribe/publish for one user are
//! serialized while different users proceed independently.
//!
//! Channels are bounded. A slow reader whose buffer is full misses events;
//! a reader that went away is pruned on the next publish.

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use domains::{LiveEvent, NotificationHub, Subscription, SubscriptionHandle, UserId};

struct Channel {
    id: Uuid,
    sender: mpsc::Sender<LiveEvent>,
}

pub struct InMemoryNotificationHub {
    channels: DashMap<UserId, Vec<Channel>>,
    capacity: usize,
}

impl InMemoryNotificationHub {
    /// `capacity` is the per-channel buffer; it is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    fn drop_bucket_if_empty(&self, user_id: UserId) {
        self.channels.remove_if(&user_id, |_, bucket| bucket.is_empty());
    }
}

impl NotificationHub for InMemoryNotificationHub {
    fn subscribe(&self, user_id: UserId) -> Subscription {
        let (sender, events) = mpsc::channel(self.capacity);
        let handle = SubscriptionHandle { user_id, id: Uuid::new_v4() };

        self.channels
            .entry(user_id)
            .or_default()
            .push(Channel { id: handle.id, sender });

        debug!(user_id, subscription = %handle.id, "live channel opened");
        Subscription { handle, events }
    }

    fn publish(&self, user_id: UserId, event: &LiveEvent) -> usize {
        let mut delivered = 0;
        let now_empty = {
            let Some(mut bucket) = self.channels.get_mut(&user_id) else {
                return 0;
            };
            bucket.retain(|channel| match channel.sender.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(user_id, subscription = %channel.id, "live channel full, event dropped");
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(user_id, subscription = %channel.id, "pruning closed live channel");
                    false
                }
            });
            bucket.is_empty()
        };

        if now_empty {
            self.drop_bucket_if_empty(user_id);
        }
        delivered
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let now_empty = match self.channels.get_mut(&handle.user_id) {
            Some(mut bucket) => {
                bucket.retain(|channel| channel.id != handle.id);
                bucket.is_empty()
            }
            None => return,
        };

        if now_empty {
            self.drop_bucket_if_empty(handle.user_id);
        }
        debug!(user_id = handle.user_id, subscription = %handle.id, "live channel closed");
    }

    fn open_channels(&self, user_id: UserId) -> usize {
        self.channels.get(&user_id).map_or(0, |bucket| bucket.len())
    }
}
