//! Bounded in-memory event queue backing `get_latest_events`.

use std::{collections::VecDeque, sync::Mutex, time::Duration};

use {async_trait::async_trait, serde_json::Value, tokio::sync::Notify};

use crate::sink::EventTransport;

pub const DEFAULT_CAPACITY: usize = 20;

pub struct EventBuffer {
    events: Mutex<VecDeque<Value>>,
    capacity: usize,
    notify: Notify,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take up to `limit` of the oldest buffered events (`0` = all).
    ///
    /// When the buffer is empty and `timeout_secs > 0`, waits up to that long
    /// for the first event to arrive.
    pub async fn take(&self, limit: usize, timeout_secs: u64) -> Vec<Value> {
        if timeout_secs > 0 {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_empty() {
                let _ = tokio::time::timeout(Duration::from_secs(timeout_secs), notified).await;
            }
        }

        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let n = if limit == 0 {
            events.len()
        } else {
            limit.min(events.len())
        };
        events.drain(..n).collect()
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl EventTransport for EventBuffer {
    async fn push(&self, frame: &Value) {
        {
            let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
            while events.len() >= self.capacity {
                events.pop_front();
            }
            events.push_back(frame.clone());
        }
        self.notify.notify_waiters();
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json, std::sync::Arc};

    #[tokio::test]
    async fn drops_oldest_beyond_capacity() {
        let buf = EventBuffer::new(2);
        for i in 0..3 {
            buf.push(&json!({ "n": i })).await;
        }
        let events = buf.take(0, 0).await;
        assert_eq!(events, vec![json!({"n": 1}), json!({"n": 2})]);
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn take_respects_limit() {
        let buf = EventBuffer::new(10);
        for i in 0..4 {
            buf.push(&json!(i)).await;
        }
        assert_eq!(buf.take(3, 0).await, vec![json!(0), json!(1), json!(2)]);
        assert_eq!(buf.len(), 1);
    }

    #[tokio::test]
    async fn take_waits_for_first_event() {
        let buf = Arc::new(EventBuffer::new(10));
        let producer = Arc::clone(&buf);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            producer.push(&json!("late")).await;
        });
        let events = buf.take(0, 5).await;
        assert_eq!(events, vec![json!("late")]);
    }

    #[tokio::test]
    async fn take_without_timeout_returns_immediately() {
        let buf = EventBuffer::default();
        assert!(buf.take(0, 0).await.is_empty());
    }
}
