//! Slack incoming-webhook notifier.
//!
//! Posts `{"text": ...}` JSON to the configured webhook URL. When a
//! notification carries a subject it is rendered as a bold first line.

use serde::Serialize;

use crate::traits::{Notification, Notifier, NotifyError};

#[derive(Debug, Serialize)]
struct SlackPayload<'a> {
    text: &'a str,
}

/// Delivers notifications to one Slack incoming webhook.
///
/// Environment variable references (`${VAR_NAME}`) in the URL are
/// resolved at construction time.
#[derive(Debug)]
pub struct SlackWebhookNotifier {
    /// Target URL (env vars already resolved).
    url: String,
    /// Name reported in dispatch results and logs.
    name: String,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl SlackWebhookNotifier {
    /// Create a notifier for `url`.
    ///
    /// Missing env vars or an empty URL produce [`NotifyError::Config`].
    pub fn new(url: &str) -> Result<Self, NotifyError> {
        Self::named(url, "slack")
    }

    pub fn named(url: &str, name: &str) -> Result<Self, NotifyError> {
        let resolved = resolve_env_vars(url.trim())?;
        if resolved.is_empty() {
            return Err(NotifyError::Config("webhook URL is empty".to_string()));
        }
        if !resolved.starts_with("http://") && !resolved.starts_with("https://") {
            return Err(NotifyError::Config(format!(
                "webhook URL must be http(s): {resolved}"
            )));
        }

        Ok(Self {
            url: resolved,
            name: name.to_string(),
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Message text for a notification: bold subject line, then body.
pub fn message_text(notification: &Notification) -> String {
    if notification.subject.is_empty() {
        notification.body.clone()
    } else {
        format!("*{}*\n{}", notification.subject, notification.body)
    }
}

#[async_trait::async_trait]
impl Notifier for SlackWebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let text = message_text(notification);

        let response = self
            .client
            .post(&self.url)
            .json(&SlackPayload { text: &text })
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                channel = %self.name,
                %status,
                body = %body,
                "webhook returned non-2xx status"
            );
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(channel = %self.name, %status, "slack message delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        &self.name
    }
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
///
/// Returns an error if a referenced variable is not set.
fn resolve_env_vars(input: &str) -> Result<String, NotifyError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(NotifyError::Config(format!(
                    "unclosed env var reference in: {input}"
                )));
            }
            let value = std::env::var(&var_name)
                .map_err(|_| NotifyError::Config(format!("env var not found: {var_name}")))?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
