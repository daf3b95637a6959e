use crate::util::truncate_chars;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Character budget for a synopsis, ellipsis included. Enforced locally as
/// a safety net even when the model overshoots its instructions.
pub const SYNOPSIS_LIMIT: usize = 300;

const SUMMARIZE_TIMEOUT: Duration = Duration::from_secs(20);
const OPENAI_BASE_URL: &str = "https://api.openai.com";
const MODEL: &str = "gpt-4-turbo";

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Request timed out after 20s")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response contained no completion text")]
    EmptyCompletion,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Best-effort description rewriter.
///
/// `Disabled` is the identity function; `OpenAi` asks a chat model for a
/// bounded synopsis. Either way [`Summarizer::rewrite`] always returns a
/// usable string: a summarizer error or timeout degrades to the original
/// sanitized text, never to a pipeline failure.
pub enum Summarizer {
    OpenAi(OpenAiSummarizer),
    Disabled,
}

impl Summarizer {
    /// Build from config: enabled only when requested *and* a key exists.
    pub fn from_config(
        client: reqwest::Client,
        enabled: bool,
        api_key: Option<SecretString>,
    ) -> Self {
        match (enabled, api_key) {
            (true, Some(key)) => Summarizer::OpenAi(OpenAiSummarizer::new(client, key)),
            (true, None) => {
                tracing::warn!("Summarization enabled but no OpenAI API key, using original text");
                Summarizer::Disabled
            }
            _ => Summarizer::Disabled,
        }
    }

    /// Rewrite `text` into a synopsis of at most [`SYNOPSIS_LIMIT`]
    /// characters, or return it unchanged when disabled, empty, or failing.
    pub async fn rewrite(&self, text: &str) -> String {
        let Summarizer::OpenAi(summarizer) = self else {
            return text.to_string();
        };
        if text.is_empty() {
            return String::new();
        }

        match summarizer.summarize(text).await {
            Ok(synopsis) => truncate_chars(&synopsis, SYNOPSIS_LIMIT).into_owned(),
            Err(e) => {
                tracing::warn!(error = %e, "Summarization failed, using original text");
                text.to_string()
            }
        }
    }
}

/// OpenAI chat-completions client for synopsis generation.
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl OpenAiSummarizer {
    pub fn new(client: reqwest::Client, api_key: SecretString) -> Self {
        Self {
            client,
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL. Used by tests to point at a mock server.
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let prompt = format!(
            "Your task is to perform the following actions:\n\
             1 - Summarize the text delimited by triple backticks in a concise way max {} characters.\n\
             2 - Ensure the summary maintains all key information.\n\
             3 - Keep the tone professional and informative.\n\n\
             Use the following format:\n\
             Summary: <your concise summary>\n\n\
             Text: ```{}```",
            SYNOPSIS_LIMIT, text
        );

        let body = json!({
            "model": MODEL,
            "temperature": 0.3,
            "messages": [{"role": "user", "content": prompt}],
        });

        let request = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send();

        let response = tokio::time::timeout(SUMMARIZE_TIMEOUT, request)
            .await
            .map_err(|_| SummarizeError::Timeout)?
            .map_err(SummarizeError::Network)?;

        if !response.status().is_success() {
            return Err(SummarizeError::HttpStatus(response.status().as_u16()));
        }

        let parsed: ChatResponse = response.json().await.map_err(SummarizeError::Network)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(SummarizeError::EmptyCompletion)?;

        Ok(extract_summary(&content))
    }
}

/// Pull the synopsis out of the requested "Summary: ..." format, tolerating
/// models that skip the prefix entirely.
fn extract_summary(content: &str) -> String {
    match content.split_once("Summary:") {
        Some((_, rest)) => rest.trim().to_string(),
        None => content.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(content: &str) -> serde_json::Value {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    async fn summarizer_against(server: &MockServer) -> Summarizer {
        Summarizer::OpenAi(
            OpenAiSummarizer::new(reqwest::Client::new(), SecretString::from("sk-test"))
                .with_base_url(&server.uri()),
        )
    }

    #[tokio::test]
    async fn test_rewrite_extracts_summary_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("Summary: A concise synopsis.")),
            )
            .mount(&server)
            .await;

        let summarizer = summarizer_against(&server).await;
        assert_eq!(
            summarizer.rewrite("original long text").await,
            "A concise synopsis."
        );
    }

    #[tokio::test]
    async fn test_rewrite_without_prefix_uses_whole_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                "  Just the synopsis text.  ",
            )))
            .mount(&server)
            .await;

        let summarizer = summarizer_against(&server).await;
        assert_eq!(
            summarizer.rewrite("original").await,
            "Just the synopsis text."
        );
    }

    #[tokio::test]
    async fn test_rewrite_caps_overshooting_model() {
        let server = MockServer::start().await;
        let long = "x".repeat(400);
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body(&format!("Summary: {}", long))),
            )
            .mount(&server)
            .await;

        let summarizer = summarizer_against(&server).await;
        let result = summarizer.rewrite("original").await;
        assert_eq!(result.chars().count(), SYNOPSIS_LIMIT);
        assert!(result.ends_with("..."));
    }

    #[tokio::test]
    async fn test_rewrite_degrades_to_original_on_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let summarizer = summarizer_against(&server).await;
        assert_eq!(summarizer.rewrite("original text").await, "original text");
    }

    #[tokio::test]
    async fn test_rewrite_degrades_to_original_on_empty_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("")))
            .mount(&server)
            .await;

        let summarizer = summarizer_against(&server).await;
        assert_eq!(summarizer.rewrite("original text").await, "original text");
    }

    #[tokio::test]
    async fn test_disabled_summarizer_is_identity() {
        let summarizer = Summarizer::Disabled;
        assert_eq!(summarizer.rewrite("unchanged").await, "unchanged");
        assert_eq!(summarizer.rewrite("").await, "");
    }

    #[test]
    fn test_from_config_requires_both_flag_and_key() {
        let client = reqwest::Client::new();
        assert!(matches!(
            Summarizer::from_config(client.clone(), false, Some(SecretString::from("k"))),
            Summarizer::Disabled
        ));
        assert!(matches!(
            Summarizer::from_config(client.clone(), true, None),
            Summarizer::Disabled
        ));
        assert!(matches!(
            Summarizer::from_config(client, true, Some(SecretString::from("k"))),
            Summarizer::OpenAi(_)
        ));
    }
}
