use crate::config::FeedSource;
use crate::feed::FeedItem;
use chrono::SecondsFormat;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;

/// Provider limit on embeds per message (Discord).
pub const MAX_EMBEDS_PER_MESSAGE: usize = 10;

/// Timeout for one dispatch call, separate from the run budget.
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// How a dispatch attempt ended.
///
/// Only [`DispatchOutcome::Sent`] justifies advancing the watermark; a skip
/// or failure leaves the same items eligible on the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The webhook accepted the message.
    Sent,
    /// Nothing was sent: no items, or no webhook URL configured.
    Skipped,
    /// Transport failure or non-success response, already logged.
    Failed,
}

#[derive(Debug, Serialize)]
struct WebhookMessage {
    content: String,
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<EmbedAuthor>,
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
    text: String,
}

#[derive(Debug, Serialize)]
struct EmbedAuthor {
    name: String,
}

/// Sends per-feed notification batches to a Discord-style webhook.
pub struct Dispatcher {
    client: reqwest::Client,
    webhook_url: Option<SecretString>,
    default_color: u32,
}

impl Dispatcher {
    /// `webhook_url = None` turns every send into a logged no-op rather
    /// than an error; the deployment simply has no sink configured yet.
    pub fn new(
        client: reqwest::Client,
        webhook_url: Option<SecretString>,
        default_color: u32,
    ) -> Self {
        Self {
            client,
            webhook_url,
            default_color,
        }
    }

    /// Dispatch one message for `items`, newest first, all from `source`.
    ///
    /// At most [`MAX_EMBEDS_PER_MESSAGE`] embeds go on the wire; the caller
    /// is expected to size batches accordingly, the clamp here is a
    /// provider-limit backstop. Transport errors and non-2xx responses are
    /// logged and reported as [`DispatchOutcome::Failed`], never raised.
    pub async fn send(&self, source: &FeedSource, items: &[FeedItem]) -> DispatchOutcome {
        if items.is_empty() {
            return DispatchOutcome::Skipped;
        }

        let Some(webhook_url) = &self.webhook_url else {
            tracing::warn!(
                source = %source.name,
                items = items.len(),
                "Webhook URL not configured, skipping dispatch"
            );
            return DispatchOutcome::Skipped;
        };

        if items.len() > MAX_EMBEDS_PER_MESSAGE {
            tracing::warn!(
                source = %source.name,
                items = items.len(),
                cap = MAX_EMBEDS_PER_MESSAGE,
                "Batch exceeds embed cap, truncating message"
            );
        }

        let color = source.color.unwrap_or(self.default_color);
        let message = WebhookMessage {
            content: format!(
                "\u{1f514} {} new post(s) from **{}**",
                items.len(),
                source.name
            ),
            embeds: items
                .iter()
                .take(MAX_EMBEDS_PER_MESSAGE)
                .map(|item| render_embed(item, color))
                .collect(),
        };

        let request = self
            .client
            .post(webhook_url.expose_secret())
            .json(&message)
            .send();

        let response = match tokio::time::timeout(DISPATCH_TIMEOUT, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(source = %source.name, error = %e, "Webhook dispatch failed");
                return DispatchOutcome::Failed;
            }
            Err(_) => {
                tracing::error!(source = %source.name, "Webhook dispatch timed out");
                return DispatchOutcome::Failed;
            }
        };

        if !response.status().is_success() {
            tracing::error!(
                source = %source.name,
                status = response.status().as_u16(),
                "Webhook returned non-success status"
            );
            return DispatchOutcome::Failed;
        }

        tracing::info!(
            source = %source.name,
            embeds = items.len().min(MAX_EMBEDS_PER_MESSAGE),
            "Notification sent"
        );
        DispatchOutcome::Sent
    }
}

fn render_embed(item: &FeedItem, color: u32) -> Embed {
    Embed {
        title: Some(item.title.clone()),
        description: Some(format!(
            "{}\n\n[Read more]({})",
            item.description, item.link
        )),
        url: Some(item.link.clone()),
        color: Some(color),
        timestamp: Some(item.published.to_rfc3339_opts(SecondsFormat::Secs, true)),
        footer: Some(EmbedFooter {
            text: format!("Source: {}", item.source),
        }),
        author: Some(EmbedAuthor {
            name: item.author.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_source() -> FeedSource {
        FeedSource {
            name: "Example".to_string(),
            url: "https://example.com/feed.xml".to_string(),
            color: Some(15258703),
        }
    }

    fn test_item(n: u32) -> FeedItem {
        FeedItem {
            title: format!("Post {}", n),
            description: "A description".to_string(),
            link: format!("https://example.com/{}", n),
            published: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, n).unwrap(),
            author: "Alice".to_string(),
            source: "Example".to_string(),
        }
    }

    async fn webhook_server(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    fn dispatcher_for(server: &MockServer) -> Dispatcher {
        Dispatcher::new(
            reqwest::Client::new(),
            Some(SecretString::from(format!("{}/hook", server.uri()))),
            5814783,
        )
    }

    async fn sent_body(server: &MockServer) -> serde_json::Value {
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        serde_json::from_slice(&requests[0].body).unwrap()
    }

    #[tokio::test]
    async fn test_send_success_payload_shape() {
        let server = webhook_server(204).await;
        let dispatcher = dispatcher_for(&server);

        let items = vec![test_item(1)];
        let outcome = dispatcher.send(&test_source(), &items).await;
        assert_eq!(outcome, DispatchOutcome::Sent);

        let body = sent_body(&server).await;
        assert_eq!(
            body["content"],
            "\u{1f514} 1 new post(s) from **Example**"
        );
        let embed = &body["embeds"][0];
        assert_eq!(embed["title"], "Post 1");
        assert_eq!(
            embed["description"],
            "A description\n\n[Read more](https://example.com/1)"
        );
        assert_eq!(embed["url"], "https://example.com/1");
        assert_eq!(embed["color"], 15258703);
        assert_eq!(embed["timestamp"], "2025-06-01T00:00:01Z");
        assert_eq!(embed["footer"]["text"], "Source: Example");
        assert_eq!(embed["author"]["name"], "Alice");
    }

    #[tokio::test]
    async fn test_send_caps_embeds_at_ten() {
        let server = webhook_server(204).await;
        let dispatcher = dispatcher_for(&server);

        let items: Vec<FeedItem> = (1..=12).map(test_item).collect();
        let outcome = dispatcher.send(&test_source(), &items).await;
        assert_eq!(outcome, DispatchOutcome::Sent);

        let body = sent_body(&server).await;
        assert_eq!(body["embeds"].as_array().unwrap().len(), 10);
        assert_eq!(body["content"], "\u{1f514} 12 new post(s) from **Example**");
    }

    #[tokio::test]
    async fn test_send_uses_default_color_when_unconfigured() {
        let server = webhook_server(204).await;
        let dispatcher = dispatcher_for(&server);

        let mut source = test_source();
        source.color = None;
        dispatcher.send(&source, &[test_item(1)]).await;

        let body = sent_body(&server).await;
        assert_eq!(body["embeds"][0]["color"], 5814783);
    }

    #[tokio::test]
    async fn test_send_non_success_status_is_failure() {
        let server = webhook_server(500).await;
        let dispatcher = dispatcher_for(&server);

        let outcome = dispatcher.send(&test_source(), &[test_item(1)]).await;
        assert_eq!(outcome, DispatchOutcome::Failed);
    }

    #[tokio::test]
    async fn test_send_without_webhook_url_is_noop_skip() {
        let dispatcher = Dispatcher::new(reqwest::Client::new(), None, 5814783);
        let outcome = dispatcher.send(&test_source(), &[test_item(1)]).await;
        assert_eq!(outcome, DispatchOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_send_empty_batch_is_skip_without_request() {
        let server = webhook_server(204).await;
        let dispatcher = dispatcher_for(&server);

        let outcome = dispatcher.send(&test_source(), &[]).await;
        assert_eq!(outcome, DispatchOutcome::Skipped);
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
