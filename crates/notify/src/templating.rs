//! Minijinja rendering of the daily duty digest.
//!
//! The default template produces one line per duty, followed by the
//! look-ahead lines for duties that announce upcoming holders:
//!
//! ```text
//! Standup: <@U01>
//! Word of the day: <@U02>
//! Word of the day (+1): <@U03>
//! ```

use serde::Serialize;

use crate::traits::NotifyError;

/// Template used when no override is configured.
pub const DEFAULT_DIGEST_TEMPLATE: &str = "\
{% for item in items %}
{{ item.duty }}: {{ item.notify_id | mention }}
{% for ahead in item.lookahead %}
{{ item.duty }} (+{{ ahead.offset }}): {{ ahead.notify_id | mention }}
{% endfor %}
{% endfor %}
";

/// A future holder announced in the digest.
#[derive(Debug, Clone, Serialize)]
pub struct LookaheadHolder {
    /// How many rotations ahead of the current holder.
    pub offset: usize,
    pub handle: String,
    pub notify_id: String,
}

/// One duty line of the digest.
#[derive(Debug, Clone, Serialize)]
pub struct DigestItem {
    pub duty: String,
    pub handle: String,
    pub notify_id: String,
    pub start_date: String,
    pub end_date: String,
    pub lookahead: Vec<LookaheadHolder>,
}

/// Everything a digest template can see.
#[derive(Debug, Clone, Serialize)]
pub struct DigestContext {
    /// The date the digest is for, `YYYY-MM-DD`.
    pub today: String,
    pub items: Vec<DigestItem>,
}

/// Renders the digest with a fixed template.
///
/// The template is validated on construction so a broken override fails
/// at startup and not at 10:00.
#[derive(Debug, Clone)]
pub struct DigestRenderer {
    template: String,
}

impl DigestRenderer {
    pub fn new(template: Option<String>) -> Result<Self, NotifyError> {
        let template = template.unwrap_or_else(|| DEFAULT_DIGEST_TEMPLATE.to_string());
        let renderer = Self { template };
        renderer.validate()?;
        Ok(renderer)
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.set_trim_blocks(true);
        env.add_filter("mention", mention_filter);
        env
    }

    fn validate(&self) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(&self.template)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }

    /// Render the digest. Trailing whitespace is removed.
    pub fn render(&self, ctx: &DigestContext) -> Result<String, NotifyError> {
        let env = Self::build_env();
        let rendered = env
            .render_str(&self.template, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(rendered.trim_end().to_string())
    }
}

/// Slack user mention, `<@ID>`.
fn mention_filter(value: String) -> String {
    format!("<@{value}>")
}
