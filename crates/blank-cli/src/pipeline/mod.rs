//! The pipeline: every operation the transports expose, over one shared store.
//!
//! The store lock is taken per step and never held across a generator,
//! oracle or poster call.

mod admission;
mod context;
mod drafts;
mod moderation;
mod synthesis;
mod waking;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use blank_core::time::{now_unix_secs, unix_to_iso8601};
use blank_core::{CycleClock, Error, GenerationRequest, Persona, PolicyTable, Result};
use blank_store::Store;

use crate::llm::TextGenerator;
use crate::oracle::BalanceOracle;
use crate::poster::{LocalPoster, SocialPoster};

pub use context::CycleInfo;
pub use drafts::{DraftRequest, PostedDraft};
pub use moderation::EntryPage;

type TimeSource = Arc<dyn Fn() -> i64 + Send + Sync>;

#[derive(Clone, Copy, Debug)]
pub struct PipelineSettings {
    pub generator_timeout: Duration,
    pub oracle_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            generator_timeout: Duration::from_secs(60),
            oracle_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    store: Arc<Mutex<Store>>,
    clock: CycleClock,
    policies: Arc<PolicyTable>,
    persona: Arc<Persona>,
    generator: Arc<dyn TextGenerator>,
    oracle: Arc<dyn BalanceOracle>,
    poster: Arc<dyn SocialPoster>,
    settings: PipelineSettings,
    now: TimeSource,
}

impl Pipeline {
    pub fn new(
        store: Store,
        generator: Arc<dyn TextGenerator>,
        oracle: Arc<dyn BalanceOracle>,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            clock: CycleClock::default(),
            policies: Arc::new(PolicyTable::default()),
            persona: Arc::new(Persona::default()),
            generator,
            oracle,
            poster: Arc::new(LocalPoster),
            settings: PipelineSettings::default(),
            now: Arc::new(now_unix_secs),
        }
    }

    pub fn with_clock(mut self, clock: CycleClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policies(mut self, policies: PolicyTable) -> Self {
        self.policies = Arc::new(policies);
        self
    }

    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = Arc::new(persona);
        self
    }

    pub fn with_poster(mut self, poster: Arc<dyn SocialPoster>) -> Self {
        self.poster = poster;
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the wall clock (Unix seconds).
    pub fn with_time_source(mut self, now: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.now = Arc::new(now);
        self
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    fn now_secs(&self) -> i64 {
        (self.now)()
    }

    fn now_iso(&self) -> String {
        unix_to_iso8601(self.now_secs())
    }

    pub fn current_cycle(&self) -> u32 {
        self.clock.cycle_at(self.now_secs())
    }

    /// An explicit cycle, or the current one.
    fn resolve_cycle(&self, cycle: Option<u32>) -> Result<u32> {
        match cycle {
            Some(0) => Err(Error::InvalidInput("cycle numbers start at 1".to_string())),
            Some(c) => Ok(c),
            None => Ok(self.current_cycle()),
        }
    }

    /// One bounded generator call. No retries.
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let timeout = self.settings.generator_timeout;
        match tokio::time::timeout(timeout, self.generator.generate(request)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "generation failed");
                Err(e.into())
            }
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "generation timed out");
                Err(Error::GenerationFailed(format!(
                    "no response within {}s",
                    timeout.as_secs()
                )))
            }
        }
    }

    /// Fold the WAL back into the database file. Called once on the way out.
    pub async fn shutdown(&self) {
        let store = self.store.lock().await;
        if let Err(e) = store.checkpoint_truncate() {
            tracing::warn!("WAL checkpoint failed: {e}");
            return;
        }
        tracing::info!("WAL checkpoint complete");
    }
}
