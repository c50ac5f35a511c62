//! Fake model backend for tests.
//!
//! Returns scripted output without starting a process. Honors the deadline the
//! same way the real backend does: if the scripted delay exceeds it, the call
//! fails with `ModelError::Timeout` and the output is never returned.

use super::{ModelBackend, ModelError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the fake does when invoked.
#[derive(Debug, Clone)]
pub enum FakeBehavior {
    /// Return this text as process output
    Output(String),
    /// Fail with this error
    Fail(ModelError),
}

/// Scripted stand-in for a model process.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    behavior: FakeBehavior,
    delay: Duration,
    available: bool,
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl FakeBackend {
    /// Backend that answers with `output`.
    pub fn output(output: &str) -> Self {
        Self::with_behavior(FakeBehavior::Output(output.to_string()))
    }

    /// Backend that fails with `error`.
    pub fn failing(error: ModelError) -> Self {
        Self::with_behavior(FakeBehavior::Fail(error))
    }

    pub fn with_behavior(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            available: true,
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Simulated process run time.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Number of invocations so far, shared between clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, shared between clones.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelBackend for FakeBackend {
    async fn invoke(&self, prompt: &str, deadline: Duration) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if self.delay > deadline {
            tokio::time::sleep(deadline).await;
            return Err(ModelError::Timeout(deadline));
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.behavior {
            FakeBehavior::Output(text) => Ok(text.clone()),
            FakeBehavior::Fail(error) => Err(error.clone()),
        }
    }

    async fn check_availability(&self) -> bool {
        self.available
    }
}
