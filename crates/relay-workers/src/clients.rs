use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use relay_config::ConfigSnapshot;
use relay_queue::ChatId;

use crate::error::{CompletionError, SendError};

/// Per-attempt cap on a single blocking HTTP call. `ureq` has no
/// progress-callback abort hook, so the way a worker observes a cleared
/// `running` flag promptly is by never blocking longer than this in one
/// call — the flag is re-checked between the call and any retry (spec §4.2
/// / §5 "network calls ... the process-wide running flag is polled ... to
/// abort promptly").
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One blocking completion request per message, performed on the calling
/// worker's thread (spec §4.2).
pub trait CompletionClient: Send {
    fn complete(&self, system_prompt: Option<&str>, user_text: &str) -> Result<String, CompletionError>;
}

/// Outbound messaging-platform operations a worker needs (spec §4.2).
pub trait PlatformClient: Send {
    fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), SendError>;
    fn send_typing(&self, chat_id: ChatId) -> Result<(), SendError>;
}

const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Outcome of a retried call: either the transport's own error, or an abort
/// because `running` was cleared while we were waiting to retry.
enum RetryError {
    Cancelled,
    Transport(ureq::Error),
}

/// Retries `attempt` at most once: on a transient transport error or a
/// remote 5xx/429, honoring `Retry-After` up to 60 seconds on 429 (spec §7
/// "Transient I/O failures"). Narrowed from the teacher's N-retry
/// exponential backoff to a single retry.
///
/// `attempt` itself is bounded by each client's `REQUEST_TIMEOUT`, so the
/// only place left to observe a cleared `running` flag promptly is between
/// attempts and during the `Retry-After` wait — both are checked here
/// (spec §4.2 / §5 "the process-wide running flag is polled ... to abort
/// promptly").
fn send_with_retry(
    running: &AtomicBool,
    mut attempt: impl FnMut() -> Result<ureq::Response, ureq::Error>,
) -> Result<ureq::Response, RetryError> {
    if !running.load(Ordering::Relaxed) {
        return Err(RetryError::Cancelled);
    }
    match attempt() {
        Ok(resp) => Ok(resp),
        Err(err) if is_retryable(&err) => {
            if let Some(wait) = retry_after(&err) {
                if !sleep_interruptibly(wait, running) {
                    return Err(RetryError::Cancelled);
                }
            }
            if !running.load(Ordering::Relaxed) {
                return Err(RetryError::Cancelled);
            }
            attempt().map_err(RetryError::Transport)
        }
        Err(err) => Err(RetryError::Transport(err)),
    }
}

/// Sleeps `duration` in short slices, bailing out early if `running` clears.
/// Returns whether `running` was still set when the sleep finished.
fn sleep_interruptibly(duration: Duration, running: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_millis(100);
    let mut remaining = duration;
    while remaining > Duration::ZERO {
        if !running.load(Ordering::Relaxed) {
            return false;
        }
        let slice = remaining.min(SLICE);
        thread::sleep(slice);
        remaining -= slice;
    }
    running.load(Ordering::Relaxed)
}

fn is_retryable(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::Status(code, _) => *code >= 500 || *code == 429,
        ureq::Error::Transport(_) => true,
    }
}

fn retry_after(err: &ureq::Error) -> Option<Duration> {
    let ureq::Error::Status(429, response) = err else {
        return None;
    };
    let seconds: u64 = response.header("Retry-After")?.parse().ok()?;
    Some(Duration::from_secs(seconds).min(MAX_RETRY_AFTER))
}

/// Default `CompletionClient`, backed by a blocking `ureq` agent (spec §4.2,
/// §9.8).
pub struct UreqCompletionClient {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    max_tokens: u32,
    running: Arc<AtomicBool>,
}

impl UreqCompletionClient {
    /// `running` is the same shared shutdown flag the worker pool polls
    /// between pop/sleep/send; threading it in here lets an in-flight
    /// request abort promptly instead of only being noticed after it
    /// returns.
    #[must_use]
    pub fn new(config: &ConfigSnapshot, running: Arc<AtomicBool>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
            endpoint: config.completion_endpoint.clone(),
            model: config.completion_model.clone(),
            max_tokens: config.completion_max_tokens,
            running,
        }
    }
}

impl CompletionClient for UreqCompletionClient {
    fn complete(&self, system_prompt: Option<&str>, user_text: &str) -> Result<String, CompletionError> {
        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": user_text}));

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": messages,
        });

        let response = send_with_retry(&self.running, || self.agent.post(&self.endpoint).send_json(body.clone()))
            .map_err(to_completion_error)?;

        let parsed: serde_json::Value = response
            .into_json()
            .map_err(|e| CompletionError::Transport(e.to_string()))?;
        parsed
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(ToOwned::to_owned)
            .ok_or_else(|| CompletionError::Transport("missing completion text in response".into()))
    }
}

fn to_completion_error(err: RetryError) -> CompletionError {
    match err {
        RetryError::Cancelled => CompletionError::Cancelled,
        RetryError::Transport(ureq::Error::Status(code, _)) => CompletionError::RemoteStatus(code),
        RetryError::Transport(ureq::Error::Transport(t)) => CompletionError::Transport(t.to_string()),
    }
}

/// Default `PlatformClient`, backed by a blocking `ureq` agent (spec §4.2,
/// §9.8).
pub struct UreqPlatformClient {
    agent: ureq::Agent,
    api_base: String,
    running: Arc<AtomicBool>,
}

impl UreqPlatformClient {
    /// `running` is the same shared shutdown flag the worker pool polls
    /// between pop/sleep/send; threading it in here lets an in-flight
    /// request abort promptly instead of only being noticed after it
    /// returns.
    #[must_use]
    pub fn new(api_base: impl Into<String>, running: Arc<AtomicBool>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
            api_base: api_base.into(),
            running,
        }
    }

    fn call(&self, method: &str, body: serde_json::Value) -> Result<(), SendError> {
        let url = format!("{}/{method}", self.api_base);
        send_with_retry(&self.running, || self.agent.post(&url).send_json(body.clone()))
            .map(|_| ())
            .map_err(to_send_error)
    }
}

impl PlatformClient for UreqPlatformClient {
    fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), SendError> {
        self.call("sendMessage", serde_json::json!({"chat_id": chat_id, "text": text}))
    }

    fn send_typing(&self, chat_id: ChatId) -> Result<(), SendError> {
        self.call(
            "sendChatAction",
            serde_json::json!({"chat_id": chat_id, "action": "typing"}),
        )
    }
}

fn to_send_error(err: RetryError) -> SendError {
    match err {
        RetryError::Cancelled => SendError::Cancelled,
        RetryError::Transport(ureq::Error::Status(code, _)) => SendError::RemoteStatus(code),
        RetryError::Transport(ureq::Error::Transport(t)) => SendError::Transport(t.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubCompletionClient(&'static str);
    impl CompletionClient for StubCompletionClient {
        fn complete(&self, _system_prompt: Option<&str>, _user_text: &str) -> Result<String, CompletionError> {
            Ok(self.0.to_owned())
        }
    }

    #[test]
    fn stub_completion_client_satisfies_the_trait() {
        let client = StubCompletionClient("hi there");
        assert_eq!(client.complete(None, "hello").unwrap(), "hi there");
    }
}
