//! Failure reports from the rotation engine, routed to the alert channel.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use rotator_core::{Result, RotatorError};
use rotator_notify::{Channel, Dispatcher, Notification};
use rotator_rotation::FailureSink;

/// [`FailureSink`] that posts to every notifier on [`Channel::Alert`].
pub struct DispatchAlerts {
    dispatcher: Arc<RwLock<Dispatcher>>,
}

impl DispatchAlerts {
    pub fn new(dispatcher: Arc<RwLock<Dispatcher>>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait::async_trait]
impl FailureSink for DispatchAlerts {
    async fn notify(&self, message: &str) -> Result<()> {
        let dispatcher = self.dispatcher.read().await;
        if !dispatcher.is_configured(Channel::Alert) {
            warn!(alert = %message, "no alert channel configured, failure report dropped");
            return Ok(());
        }

        let results = dispatcher
            .dispatch(Channel::Alert, &Notification::text(message))
            .await;
        if results.iter().any(|r| r.success) {
            return Ok(());
        }

        let reasons: Vec<String> = results.into_iter().filter_map(|r| r.error).collect();
        Err(RotatorError::Notify(reasons.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rotator_notify::{Notifier, NotifyError};

    struct Counting {
        sent: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for Counting {
        async fn send(&self, n: &Notification) -> std::result::Result<(), NotifyError> {
            assert!(n.body.starts_with("Failed to update"));
            self.sent.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotifyError::Config("down".into()))
            } else {
                Ok(())
            }
        }

        fn channel_name(&self) -> &str {
            "counting"
        }
    }

    fn sink_with(fail: bool, sent: &Arc<AtomicUsize>) -> DispatchAlerts {
        let mut dispatcher = Dispatcher::empty();
        dispatcher.add(
            Channel::Alert,
            Box::new(Counting {
                sent: sent.clone(),
                fail,
            }),
        );
        DispatchAlerts::new(Arc::new(RwLock::new(dispatcher)))
    }

    #[tokio::test]
    async fn delivers_to_alert_channel() {
        let sent = Arc::new(AtomicUsize::new(0));
        let sink = sink_with(false, &sent);
        sink.notify("Failed to update task assignment: boom").await.unwrap();
        assert_eq!(sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_notifiers_failing_is_reported() {
        let sent = Arc::new(AtomicUsize::new(0));
        let sink = sink_with(true, &sent);
        let err = sink.notify("Failed to update task assignment: boom").await.unwrap_err();
        assert!(matches!(err, RotatorError::Notify(_)));
    }

    #[tokio::test]
    async fn missing_alert_channel_is_not_an_error() {
        let sink = DispatchAlerts::new(Arc::new(RwLock::new(Dispatcher::empty())));
        assert!(sink.notify("Failed to update task assignment: boom").await.is_ok());
    }
}
