//! Shared `reqwest` plumbing.

use std::time::Duration;

use octagon_core::SourceError;
use reqwest::{Client, RequestBuilder, Response};

/// Longest upstream error body kept in a [`SourceError::Status`].
const MAX_ERROR_BODY: usize = 512;

pub fn build_client(timeout_secs: u64, user_agent: &str) -> Result<Client, SourceError> {
  Client::builder()
    .timeout(Duration::from_secs(timeout_secs))
    .user_agent(user_agent)
    .build()
    .map_err(|e| SourceError::Http(format!("failed to build HTTP client: {e}")))
}

pub fn transport(e: reqwest::Error) -> SourceError { SourceError::Http(e.to_string()) }

/// Turn a non-2xx response into [`SourceError::Status`].
pub async fn check_status(resp: Response) -> Result<Response, SourceError> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let mut body = resp.text().await.unwrap_or_default();
  if body.len() > MAX_ERROR_BODY {
    let cut = (0..=MAX_ERROR_BODY).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
    body.truncate(cut);
  }
  Err(SourceError::Status { status: status.as_u16(), body })
}

/// Send `req` and return the body as text.
pub async fn send_text(req: RequestBuilder) -> Result<String, SourceError> {
  let resp = req.send().await.map_err(transport)?;
  check_status(resp).await?.text().await.map_err(transport)
}
