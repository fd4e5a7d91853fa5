//! Scripted collaborators for pipeline tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use blank_core::{DEFAULT_EPOCH_SECS, GenerationRequest};
use blank_store::Store;

use super::{Pipeline, PipelineSettings};
use crate::llm::{GenerationError, TextGenerator};
use crate::oracle::{BalanceOracle, OracleError};

pub(crate) const AUTHOR: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
pub(crate) const OTHER_AUTHOR: &str = "Gh9ZwEmdLJ8DscKNTkTqPbNwLNNBjvSo2VJn3DYwUpeB";

/// Noon of cycle 1 under the default epoch.
pub(crate) const CYCLE_ONE_NOON: i64 = DEFAULT_EPOCH_SECS + 12 * 3600;

/// Replies from a queue, then a fallback (or failure once the queue is empty
/// and there is no fallback). Records every request.
pub(crate) struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    fallback: Option<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub(crate) fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Some(text.to_string()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn script(replies: Vec<Result<String, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Self::script(Vec::new())
    }

    /// Never answers within any sane timeout.
    pub(crate) fn hanging() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Some("too late".to_string()),
            delay: Some(Duration::from_secs(30)),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => reply,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| GenerationError::Network("script exhausted".to_string())),
        }
    }
}

pub(crate) struct FixedOracle(pub f64);

#[async_trait]
impl BalanceOracle for FixedOracle {
    async fn balance_of(&self, _account: &str) -> Result<f64, OracleError> {
        Ok(self.0)
    }
}

pub(crate) struct FailingOracle;

#[async_trait]
impl BalanceOracle for FailingOracle {
    async fn balance_of(&self, _account: &str) -> Result<f64, OracleError> {
        Err(OracleError::Network("connection refused".to_string()))
    }
}

pub(crate) struct HangingOracle;

#[async_trait]
impl BalanceOracle for HangingOracle {
    async fn balance_of(&self, _account: &str) -> Result<f64, OracleError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(1_000_000.0)
    }
}

pub(crate) struct Harness {
    pub pipeline: Pipeline,
    pub generator: Arc<ScriptedGenerator>,
    clock: Arc<AtomicI64>,
}

impl Harness {
    pub(crate) fn advance_secs(&self, secs: i64) {
        self.clock.fetch_add(secs, Ordering::SeqCst);
    }

    pub(crate) fn advance_days(&self, days: i64) {
        self.advance_secs(days * 86_400);
    }
}

/// In-memory store, short timeouts, clock pinned to [`CYCLE_ONE_NOON`].
pub(crate) fn harness(generator: Arc<ScriptedGenerator>, oracle: Arc<dyn BalanceOracle>) -> Harness {
    let clock = Arc::new(AtomicI64::new(CYCLE_ONE_NOON));
    let source = clock.clone();
    let text_generator: Arc<dyn TextGenerator> = generator.clone();
    let pipeline = Pipeline::new(Store::open_in_memory().unwrap(), text_generator, oracle)
        .with_settings(PipelineSettings {
            generator_timeout: Duration::from_millis(200),
            oracle_timeout: Duration::from_millis(200),
        })
        .with_time_source(move || source.load(Ordering::SeqCst));
    Harness {
        pipeline,
        generator,
        clock,
    }
}

pub(crate) fn default_harness() -> Harness {
    harness(
        ScriptedGenerator::replying("generated"),
        Arc::new(FixedOracle(0.0)),
    )
}
