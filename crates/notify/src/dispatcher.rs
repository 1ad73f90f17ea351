//! Routes notifications to the digest or alert channel.
//!
//! Each channel holds any number of notifiers. Individual notifier
//! failures don't block the others on the same channel.

use std::collections::HashMap;
use std::fmt;

use crate::traits::{DispatchResult, Notification, Notifier, NotifyError};

/// Logical destination of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Team-wide daily digest.
    Digest,
    /// Operator alerts about failed rotation updates.
    Alert,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Digest => f.write_str("digest"),
            Channel::Alert => f.write_str("alert"),
        }
    }
}

/// Dispatches notifications to the notifiers configured per channel.
#[derive(Default)]
pub struct Dispatcher {
    channels: HashMap<Channel, Vec<Box<dyn Notifier>>>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Replace all notifiers of `channel`.
    pub fn set_channel(&mut self, channel: Channel, notifiers: Vec<Box<dyn Notifier>>) {
        self.channels.insert(channel, notifiers);
    }

    pub fn add(&mut self, channel: Channel, notifier: Box<dyn Notifier>) {
        self.channels.entry(channel).or_default().push(notifier);
    }

    pub fn is_configured(&self, channel: Channel) -> bool {
        self.channels.get(&channel).is_some_and(|n| !n.is_empty())
    }

    /// Deliver `notification` to every notifier of `channel`.
    ///
    /// Returns one result per notifier; an unconfigured channel yields none.
    pub async fn dispatch(&self, channel: Channel, notification: &Notification) -> Vec<DispatchResult> {
        let notifiers = match self.channels.get(&channel) {
            Some(n) if !n.is_empty() => n,
            _ => {
                tracing::debug!(%channel, "no notifiers configured");
                return Vec::new();
            }
        };

        let mut results = Vec::with_capacity(notifiers.len());

        for notifier in notifiers {
            let start = std::time::Instant::now();
            let result = notifier.send(notification).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::info!(
                        %channel,
                        notifier = notifier.channel_name(),
                        duration_ms,
                        "notification delivered"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        %channel,
                        notifier = notifier.channel_name(),
                        error = %e,
                        duration_ms,
                        "notification delivery failed"
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DispatchResult {
                channel: notifier.channel_name().to_string(),
                success,
                error,
                duration_ms,
            });
        }

        results
    }

    /// Send a test message through the first notifier of `channel`.
    pub async fn test_notify(&self, channel: Channel) -> Result<(), NotifyError> {
        let notifier = self
            .channels
            .get(&channel)
            .and_then(|n| n.first())
            .ok_or_else(|| NotifyError::Config(format!("no notifiers for channel '{channel}'")))?;
        notifier.test().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MockNotifier {
        name: String,
        send_count: Arc<AtomicUsize>,
        should_fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err(NotifyError::Config("mock failure".to_string()))
            } else {
                Ok(())
            }
        }
        fn channel_name(&self) -> &str {
            &self.name
        }
    }

    fn mock(name: &str, count: &Arc<AtomicUsize>, should_fail: bool) -> Box<dyn Notifier> {
        Box::new(MockNotifier {
            name: name.to_string(),
            send_count: count.clone(),
            should_fail,
        })
    }

    #[tokio::test]
    async fn routes_by_channel() {
        let digest = Arc::new(AtomicUsize::new(0));
        let alert = Arc::new(AtomicUsize::new(0));

        let mut dispatcher = Dispatcher::empty();
        dispatcher.add(Channel::Digest, mock("team", &digest, false));
        dispatcher.add(Channel::Alert, mock("personal", &alert, false));

        let results = dispatcher
            .dispatch(Channel::Alert, &Notification::text("Failed to update task assignment: x"))
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].channel, "personal");
        assert_eq!(alert.load(Ordering::SeqCst), 1);
        assert_eq!(digest.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn partial_failure_doesnt_block() {
        let count = Arc::new(AtomicUsize::new(0));
        let failing = Arc::new(AtomicUsize::new(0));

        let mut dispatcher = Dispatcher::empty();
        dispatcher.set_channel(
            Channel::Digest,
            vec![mock("fail", &failing, true), mock("ok", &count, false)],
        );

        let results = dispatcher.dispatch(Channel::Digest, &Notification::text("digest")).await;
        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert!(results[1].success);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unconfigured_channel_returns_empty() {
        let dispatcher = Dispatcher::empty();
        assert!(!dispatcher.is_configured(Channel::Digest));
        let results = dispatcher.dispatch(Channel::Digest, &Notification::text("x")).await;
        assert!(results.is_empty());
        assert!(dispatcher.test_notify(Channel::Alert).await.is_err());
    }

    #[tokio::test]
    async fn set_channel_replaces_notifiers() {
        let old = Arc::new(AtomicUsize::new(0));
        let new = Arc::new(AtomicUsize::new(0));

        let mut dispatcher = Dispatcher::empty();
        dispatcher.add(Channel::Digest, mock("old", &old, false));
        dispatcher.set_channel(Channel::Digest, vec![mock("new", &new, false)]);
        dispatcher.dispatch(Channel::Digest, &Notification::text("x")).await;

        assert_eq!(old.load(Ordering::SeqCst), 0);
        assert_eq!(new.load(Ordering::SeqCst), 1);
    }
}
