//! Slack notifications for duty digests and rotation failures.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - `SlackWebhookNotifier` posting incoming-webhook payloads
//! - Minijinja rendering of the daily digest
//! - Dispatcher that routes notifications to the digest or alert channel

pub mod dispatcher;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use dispatcher::{Channel, Dispatcher};
pub use templating::{DigestContext, DigestItem, DigestRenderer, LookaheadHolder, DEFAULT_DIGEST_TEMPLATE};
pub use traits::{DispatchResult, Notification, Notifier, NotifyError};
pub use webhook::SlackWebhookNotifier;
