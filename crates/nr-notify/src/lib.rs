//! Pushover delivery for night reports.
//!
//! Pushover caps a message at 1024 characters, so longer reports are sent as
//! several consecutive messages sharing one title.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// Maximum characters Pushover accepts in one message body.
pub const MAX_MESSAGE_CHARS: usize = 1024;

/// Pushover client errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The application token or user key was unusable.
    #[error("invalid credentials: {reason}")]
    InvalidCredentials { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Pushover rejected the message.
    #[error("Pushover error: {message}")]
    Api { message: String },
}

/// Pushover API client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    token: String,
    user: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("token", &"[REDACTED]")
            .field("user", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for the given application token and user key.
    ///
    /// # Errors
    ///
    /// Returns an error if either credential is empty or whitespace-only, or
    /// if the HTTP client fails to build.
    pub fn new(token: impl Into<String>, user: impl Into<String>) -> Result<Self, NotifyError> {
        let token = token.into();
        let user = user.into();

        if token.trim().is_empty() {
            return Err(NotifyError::InvalidCredentials {
                reason: "application token cannot be empty",
            });
        }
        if user.trim().is_empty() {
            return Err(NotifyError::InvalidCredentials {
                reason: "user key cannot be empty",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(NotifyError::ClientBuild)?;

        Ok(Self { http, token, user })
    }

    /// Sends `message` under `title`, split into as many messages as needed.
    ///
    /// Chunks are sent in order; the first rejected chunk aborts the rest.
    pub async fn send(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let chunks = chunk_message(message, MAX_MESSAGE_CHARS);
        let total = chunks.len();
        for (index, chunk) in chunks.into_iter().enumerate() {
            tracing::debug!(
                part = index + 1,
                total,
                chars = chunk.chars().count(),
                "sending to Pushover"
            );
            self.send_one(title, chunk).await?;
        }
        Ok(())
    }

    async fn send_one(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let form = MessageForm {
            token: &self.token,
            user: &self.user,
            title,
            message,
        };

        let response = self.http.post(PUSHOVER_API_URL).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(&body).unwrap_or_else(|| NotifyError::Api {
                message: format!("status {status}: {body}"),
            }));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct MessageForm<'a> {
    token: &'a str,
    user: &'a str,
    title: &'a str,
    message: &'a str,
}

/// Splits `message` into pieces of at most `limit` characters.
///
/// Splits land on character boundaries, never inside a UTF-8 sequence. An
/// empty message yields a single empty piece so that something is still sent.
pub fn chunk_message(message: &str, limit: usize) -> Vec<&str> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = message;
    while !rest.is_empty() {
        let split = rest
            .char_indices()
            .nth(limit)
            .map_or(rest.len(), |(index, _)| index);
        let (head, tail) = rest.split_at(split);
        chunks.push(head);
        rest = tail;
    }
    if chunks.is_empty() {
        chunks.push(message);
    }
    chunks
}

fn parse_api_error(body: &str) -> Option<NotifyError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        #[serde(default)]
        errors: Vec<String>,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .filter(|payload| !payload.errors.is_empty())
        .map(|payload| NotifyError::Api {
            message: payload.errors.join("; "),
        })
}
