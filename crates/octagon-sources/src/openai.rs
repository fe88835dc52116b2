//! OpenAI-compatible chat-completion client.
//!
//! Non-streaming calls go through the bounded retry in [`crate::retry`].
//! Streaming calls retry only until the response headers arrive; the body is
//! decoded from server-sent events into text chunks.

use futures::{StreamExt as _, stream::BoxStream};
use octagon_core::{
  SourceError,
  source::{ChatMessage, ChatModel, ReplyFormat, TextStream},
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
  LlmConfig, RetryPolicy,
  http::{build_client, check_status, transport},
  retry::with_retry,
};

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  model:           &'a str,
  messages:        &'a [ChatMessage],
  temperature:     f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  stream:          bool,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")]
  kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  #[serde(default)]
  content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
  #[serde(default)]
  choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
  #[serde(default)]
  delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
  #[serde(default)]
  content: Option<String>,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Chat-completion client. Cheap to clone.
#[derive(Clone)]
pub struct OpenAiClient {
  http:    Client,
  config:  LlmConfig,
  api_key: String,
  retry:   RetryPolicy,
}

impl std::fmt::Debug for OpenAiClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OpenAiClient")
      .field("base_url", &self.config.base_url)
      .field("model", &self.config.model)
      .finish_non_exhaustive()
  }
}

impl OpenAiClient {
  /// Fails with [`SourceError::NotConfigured`] when no API key is set.
  pub fn new(config: LlmConfig) -> Result<Self, SourceError> {
    let api_key = config
      .api_key
      .clone()
      .filter(|k| !k.trim().is_empty())
      .ok_or(SourceError::NotConfigured("language model API key"))?;
    let http = build_client(config.timeout_secs, concat!("octagon/", env!("CARGO_PKG_VERSION")))?;
    let retry = config.retry_policy();
    Ok(Self { http, config, api_key, retry })
  }

  fn url(&self) -> String {
    format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
  }

  fn request<'a>(&'a self, messages: &'a [ChatMessage], format: ReplyFormat, stream: bool) -> ChatRequest<'a> {
    ChatRequest {
      model: &self.config.model,
      messages,
      temperature: self.config.temperature,
      response_format: match format {
        ReplyFormat::Json => Some(ResponseFormat { kind: "json_object" }),
        ReplyFormat::Text => None,
      },
      stream,
    }
  }
}

impl ChatModel for OpenAiClient {
  async fn complete(
    &self,
    messages: &[ChatMessage],
    format: ReplyFormat,
  ) -> Result<String, SourceError> {
    let body = self.request(messages, format, false);
    let body = &body;

    let reply: ChatResponse = with_retry(self.retry, move || async move {
      let resp = self
        .http
        .post(self.url())
        .bearer_auth(&self.api_key)
        .json(body)
        .send()
        .await
        .map_err(transport)?;
      check_status(resp)
        .await?
        .json()
        .await
        .map_err(|e| SourceError::Parse(format!("chat completion body: {e}")))
    })
    .await?;

    reply
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .map(|text| text.trim().to_owned())
      .ok_or_else(|| SourceError::Parse("chat completion had no content".into()))
  }

  async fn stream(&self, messages: &[ChatMessage]) -> Result<TextStream, SourceError> {
    let body = self.request(messages, ReplyFormat::Text, true);
    let body = &body;

    let resp = with_retry(self.retry, move || async move {
      let resp = self
        .http
        .post(self.url())
        .bearer_auth(&self.api_key)
        .json(body)
        .send()
        .await
        .map_err(transport)?;
      check_status(resp).await
    })
    .await?;

    let bytes = resp
      .bytes_stream()
      .map(|chunk| chunk.map(|b| b.to_vec()).map_err(transport))
      .boxed();
    Ok(sse_text_stream(bytes))
  }
}

// ─── Server-sent events ──────────────────────────────────────────────────────

/// Accumulates raw bytes and yields complete lines.
#[derive(Default)]
struct LineBuffer {
  buf: Vec<u8>,
}

impl LineBuffer {
  fn push(&mut self, chunk: &[u8]) { self.buf.extend_from_slice(chunk); }

  fn next_line(&mut self) -> Option<String> {
    let end = self.buf.iter().position(|b| *b == b'\n')?;
    let line: Vec<u8> = self.buf.drain(..=end).collect();
    Some(String::from_utf8_lossy(&line).trim_end_matches(['\r', '\n']).to_owned())
  }
}

#[derive(Debug, PartialEq)]
enum SseLine {
  Delta(String),
  Done,
  Skip,
}

fn parse_sse_line(line: &str) -> Result<SseLine, SourceError> {
  let Some(data) = line.strip_prefix("data:") else {
    return Ok(SseLine::Skip);
  };
  let data = data.trim();
  if data == "[DONE]" {
    return Ok(SseLine::Done);
  }
  if data.is_empty() {
    return Ok(SseLine::Skip);
  }
  let chunk: StreamChunk = serde_json::from_str(data)
    .map_err(|e| SourceError::Parse(format!("stream chunk: {e}")))?;
  let text: String = chunk.choices.into_iter().filter_map(|c| c.delta.content).collect();
  Ok(if text.is_empty() { SseLine::Skip } else { SseLine::Delta(text) })
}

struct SseState {
  bytes: BoxStream<'static, Result<Vec<u8>, SourceError>>,
  lines: LineBuffer,
  done:  bool,
}

/// Decode a chat-completion SSE body into content deltas. Ends at `[DONE]`,
/// at end of body, or after the first error.
fn sse_text_stream(bytes: BoxStream<'static, Result<Vec<u8>, SourceError>>) -> TextStream {
  let state = SseState { bytes, lines: LineBuffer::default(), done: false };
  futures::stream::unfold(state, |mut st| async move {
    loop {
      if st.done {
        return None;
      }
      while let Some(line) = st.lines.next_line() {
        match parse_sse_line(&line) {
          Ok(SseLine::Delta(text)) => return Some((Ok(text), st)),
          Ok(SseLine::Done) => return None,
          Ok(SseLine::Skip) => {}
          Err(e) => {
            st.done = true;
            return Some((Err(e), st));
          }
        }
      }
      match st.bytes.next().await {
        Some(Ok(chunk)) => st.lines.push(&chunk),
        Some(Err(e)) => {
          st.done = true;
          return Some((Err(e), st));
        }
        None => return None,
      }
    }
  })
  .boxed()
}

#[cfg(test)]
mod tests {
  use futures::TryStreamExt as _;

  use super::*;

  fn body(chunks: &[&str]) -> BoxStream<'static, Result<Vec<u8>, SourceError>> {
    let owned: Vec<Result<Vec<u8>, SourceError>> =
      chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect();
    futures::stream::iter(owned).boxed()
  }

  #[test]
  fn missing_key_is_not_configured() {
    let err = OpenAiClient::new(LlmConfig::default()).unwrap_err();
    assert!(matches!(err, SourceError::NotConfigured(_)));
  }

  #[test]
  fn json_format_sets_response_format() {
    let client = OpenAiClient::new(LlmConfig {
      api_key: Some("sk-test".into()),
      ..LlmConfig::default()
    })
    .unwrap();
    let messages = [ChatMessage::user("hi")];

    let json = serde_json::to_value(client.request(&messages, ReplyFormat::Json, false)).unwrap();
    assert_eq!(json["response_format"]["type"], "json_object");
    assert!(json.get("stream").is_none());
    assert_eq!(json["messages"][0]["role"], "user");

    let text = serde_json::to_value(client.request(&messages, ReplyFormat::Text, true)).unwrap();
    assert!(text.get("response_format").is_none());
    assert_eq!(text["stream"], true);
  }

  #[test]
  fn sse_lines() {
    assert_eq!(parse_sse_line(": keep-alive").unwrap(), SseLine::Skip);
    assert_eq!(parse_sse_line("data: [DONE]").unwrap(), SseLine::Done);
    assert_eq!(
      parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap(),
      SseLine::Skip
    );
    assert_eq!(
      parse_sse_line(r#"data: {"choices":[{"delta":{"content":"Jones"}}]}"#).unwrap(),
      SseLine::Delta("Jones".into())
    );
    assert!(parse_sse_line("data: {not json").is_err());
  }

  #[tokio::test]
  async fn decodes_deltas_split_across_chunks() {
    let stream = sse_text_stream(body(&[
      "data: {\"choices\":[{\"delta\":{\"content\":\"Jon",
      "es by \"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"decision\"}}]}\r\n",
      "\ndata: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n",
    ]));
    let chunks: Vec<String> = stream.try_collect().await.unwrap();
    assert_eq!(chunks, vec!["Jones by ", "decision"]);
  }

  #[tokio::test]
  async fn stream_stops_after_an_error() {
    let failing: Vec<Result<Vec<u8>, SourceError>> = vec![
      Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n".to_vec()),
      Err(SourceError::Http("reset".into())),
      Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n".to_vec()),
    ];
    let items: Vec<_> = sse_text_stream(futures::stream::iter(failing).boxed()).collect().await;
    assert_eq!(items.len(), 2);
    assert!(items[1].is_err());
  }
}
