//! Test Utilities
//!
//! Scripted backend clients for exercising the engine and scheduler without
//! any network. Compiled only for tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::{BackendClient, BackendError, BackendResponse};
use crate::task::TaskDescriptor;

/// Shared record of which backends were invoked, in order
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one invocation
    pub fn record(&self, name: &str) {
        self.calls.lock().push(name.to_string());
    }

    /// All invocations so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

/// Backend client that replays a scripted sequence of results
///
/// Each invocation consumes the next scripted step; the final step repeats
/// forever, so `[err, ok]` models a backend that fails once then recovers
/// and a single `ok` models a reliable backend.
pub struct ScriptedClient {
    name: String,
    log: CallLog,
    script: Mutex<VecDeque<Result<BackendResponse, BackendError>>>,
}

impl ScriptedClient {
    /// Create a client with an empty script
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            script: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a successful step
    pub fn ok(self, response: BackendResponse) -> Self {
        self.script.lock().push_back(Ok(response));
        self
    }

    /// Append a failing step
    pub fn err(self, error: BackendError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }
}

#[async_trait]
impl BackendClient for ScriptedClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        _prompt: &str,
        _task: &TaskDescriptor,
    ) -> Result<BackendResponse, BackendError> {
        self.log.record(&self.name);

        let mut script = self.script.lock();
        match script.len() {
            0 => Err(BackendError::Internal(format!(
                "script exhausted for {}",
                self.name
            ))),
            1 => script.front().cloned().unwrap_or_else(|| {
                Err(BackendError::Internal("empty script front".to_string()))
            }),
            _ => script.pop_front().unwrap_or_else(|| {
                Err(BackendError::Internal("empty script front".to_string()))
            }),
        }
    }
}

/// Backend client that sleeps before answering, for timeout tests
pub struct DelayedClient {
    name: String,
    delay: Duration,
    response: BackendResponse,
}

impl DelayedClient {
    /// Create a client that waits `delay` before returning `response`
    pub fn new(name: &str, delay: Duration, response: BackendResponse) -> Self {
        Self {
            name: name.to_string(),
            delay,
            response,
        }
    }
}

#[async_trait]
impl BackendClient for DelayedClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        _prompt: &str,
        _task: &TaskDescriptor,
    ) -> Result<BackendResponse, BackendError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.response.clone())
    }
}
