//! Summarization over the Hugging Face inference "summarization" task
//! protocol, as served by the hosted Inference API or a self-hosted model
//! server.

use std::time::Duration;

use async_trait::async_trait;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::batch::batches;
use crate::error::{ErrorKind, Result};
use crate::{SUMMARY_SEPARATOR, Summarizer};

pub const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_MODEL: &str = "pszemraj/long-t5-tglobal-base-16384-booksci-summary-v1";
pub const DEFAULT_TOKEN_BATCH_LENGTH: usize = 3072;

/// Connection settings for an [`HttpSummarizer`].
#[derive(Debug, Clone)]
pub struct HttpSummarizerConfig {
    /// Base URL; requests go to `{endpoint}/{model}`.
    pub endpoint: String,
    pub model: String,
    pub token_batch_length: usize,
    pub timeout: Duration,
    /// Sent as a bearer token when set.
    pub token: Option<String>,
}
impl Default for HttpSummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            token_batch_length: DEFAULT_TOKEN_BATCH_LENGTH,
            timeout: Duration::from_secs(600),
            token: None,
        }
    }
}

/// Generation parameters tuned for long-form book summarization.
#[derive(Debug, Clone, Serialize)]
struct Parameters {
    min_length: u32,
    max_length: u32,
    no_repeat_ngram_size: u32,
    encoder_no_repeat_ngram_size: u32,
    repetition_penalty: f32,
    num_beams: u32,
    early_stopping: bool,
}
impl Default for Parameters {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 2048,
            no_repeat_ngram_size: 3,
            encoder_no_repeat_ngram_size: 4,
            repetition_penalty: 2.5,
            num_beams: 4,
            early_stopping: true,
        }
    }
}

#[derive(Serialize)]
struct Options {
    wait_for_model: bool,
}

#[derive(Serialize)]
struct SummarizationRequest<'a> {
    inputs: &'a str,
    parameters: &'a Parameters,
    options: Options,
}

#[derive(Deserialize)]
struct SummarizationResponse {
    summary_text: String,
}

pub struct HttpSummarizer {
    client: reqwest::Client,
    url: String,
    config: HttpSummarizerConfig,
    parameters: Parameters,
}
impl HttpSummarizer {
    pub fn new(config: HttpSummarizerConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidConfig("model must not be empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .or_raise(|| ErrorKind::InvalidConfig("could not build HTTP client".to_string()))?;
        let url = format!("{}/{}", config.endpoint.trim_end_matches('/'), config.model.trim_matches('/'));
        Ok(Self { client, url, config, parameters: Parameters::default() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    #[instrument(skip(self, batch), fields(words = batch.split(' ').count()))]
    async fn summarize_batch(&self, index: usize, batch: &str) -> Result<String> {
        let body = SummarizationRequest {
            inputs: batch,
            parameters: &self.parameters,
            options: Options { wait_for_model: true },
        };
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|err| {
            exn::Exn::from(if err.is_timeout() {
                ErrorKind::Timeout(self.config.timeout.as_secs())
            } else if err.is_connect() {
                ErrorKind::Connection(self.url.clone())
            } else {
                ErrorKind::Connection(err.to_string())
            })
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            exn::bail!(ErrorKind::Status { status: status.as_u16(), body });
        }
        let bytes = response.bytes().await.or_raise(|| ErrorKind::Connection(self.url.clone()))?;
        let parsed: Vec<SummarizationResponse> = serde_json::from_slice(&bytes)
            .or_raise(|| ErrorKind::MalformedResponse(String::from_utf8_lossy(&bytes).into_owned()))?;
        let summary = parsed
            .into_iter()
            .map(|response| response.summary_text.trim().to_string())
            .find(|summary| !summary.is_empty())
            .ok_or_else(|| exn::Exn::from(ErrorKind::EmptySummary(index)))?;
        tracing::debug!(bytes = summary.len(), "Batch summarized");
        Ok(summary)
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(model = %self.config.model, bytes = text.len(), batches))]
    async fn summarize(&self, text: &str) -> Result<String> {
        let batches = batches(text, self.config.token_batch_length);
        tracing::Span::current().record("batches", batches.len());
        if batches.is_empty() {
            tracing::warn!("Nothing to summarize; text is empty");
            return Ok(String::new());
        }
        let mut summaries = Vec::with_capacity(batches.len());
        // Sequential on purpose: a self-hosted model serves one request at a time.
        for (index, batch) in batches.iter().enumerate() {
            summaries.push(self.summarize_batch(index, batch).await?);
        }
        tracing::info!(batches = summaries.len(), "Summarized text");
        Ok(summaries.join(SUMMARY_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode, Uri, header};
    use tokio::net::TcpListener;

    #[derive(Debug, Clone)]
    struct Recorded {
        path: String,
        authorization: Option<String>,
        body: serde_json::Value,
    }

    #[derive(Default)]
    struct Inference {
        responses: Mutex<VecDeque<(u16, String)>>,
        requests: Mutex<Vec<Recorded>>,
    }
    impl Inference {
        fn requests(&self) -> Vec<Recorded> {
            self.requests.lock().unwrap().clone()
        }
    }

    /// Answers every request with the next canned response and records it.
    async fn record(
        State(inference): State<Arc<Inference>>,
        uri: Uri,
        headers: HeaderMap,
        body: String,
    ) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
        inference.requests.lock().unwrap().push(Recorded {
            path: uri.path().to_string(),
            authorization: headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_string),
            body: serde_json::from_str(&body).unwrap_or(serde_json::Value::Null),
        });
        let (status, body) = inference
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((500, r#"{"error": "no response left"}"#.to_string()));
        (StatusCode::from_u16(status).unwrap(), [(header::CONTENT_TYPE, "application/json")], body)
    }

    async fn serve(responses: Vec<(u16, String)>) -> (String, Arc<Inference>) {
        let inference =
            Arc::new(Inference { responses: Mutex::new(responses.into()), requests: Mutex::default() });
        let router = Router::new().fallback(record).with_state(inference.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (url, inference)
    }

    fn summarizer(endpoint: &str, token_batch_length: usize, token: Option<&str>) -> HttpSummarizer {
        HttpSummarizer::new(HttpSummarizerConfig {
            endpoint: endpoint.to_string(),
            model: "org/model".to_string(),
            token_batch_length,
            timeout: Duration::from_secs(5),
            token: token.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn test_url() {
        assert_eq!(
            summarizer("https://api-inference.huggingface.co/models/", 10, None).url(),
            "https://api-inference.huggingface.co/models/org/model"
        );
        let err = HttpSummarizer::new(HttpSummarizerConfig { model: " ".into(), ..Default::default() }).err().unwrap();
        assert!(matches!(&*err, ErrorKind::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_batches_summarized_in_order() {
        let (url, server) = serve(vec![
            (200, r#"[{"summary_text": "First half."}]"#.to_string()),
            (200, r#"[{"summary_text": " Second half. "}]"#.to_string()),
        ])
        .await;
        let summarizer = summarizer(&url, 4, Some("secret"));
        let summary = summarizer.summarize("one two three four five").await.unwrap();
        assert_eq!(summary, "First half.\n\nSecond half.");

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, "/org/model");
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer secret"));
        assert_eq!(requests[0].body["inputs"], "one two three");
        assert_eq!(requests[0].body["parameters"]["num_beams"], 4);
        assert_eq!(requests[1].body["inputs"], "four five");
    }

    #[tokio::test]
    async fn test_error_status_is_fatal() {
        let (url, server) = serve(vec![(503, r#"{"error": "Model is currently loading"}"#.to_string())]).await;
        let err = summarizer(&url, 3072, None).summarize("some text").await.unwrap_err();
        match &*err {
            ErrorKind::Status { status, body } => {
                assert_eq!(*status, 503);
                assert!(body.contains("loading"));
            },
            other => panic!("unexpected error: {other}"),
        }
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].authorization, None);
    }

    #[tokio::test]
    async fn test_failure_in_later_batch_aborts() {
        let (url, server) = serve(vec![
            (200, r#"[{"summary_text": "ok"}]"#.to_string()),
            (200, r#"{"unexpected": true}"#.to_string()),
            (200, r#"[{"summary_text": "never asked"}]"#.to_string()),
        ])
        .await;
        let err = summarizer(&url, 1, None).summarize("a b c").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::MalformedResponse(_)));
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_summary_list() {
        let (url, _server) = serve(vec![(200, "[]".to_string())]).await;
        let err = summarizer(&url, 3072, None).summarize("text").await.unwrap_err();
        assert_eq!(*err, ErrorKind::EmptySummary(0));
    }

    #[tokio::test]
    async fn test_empty_text_makes_no_requests() {
        // No listener at all: any request would fail to connect.
        let summarizer = summarizer("http://127.0.0.1:9", 3072, None);
        assert_eq!(summarizer.summarize("  \n ").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let err = summarizer(&url, 3072, None).summarize("text").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Connection(_)));
        assert!(err.is_retryable());
    }
}
