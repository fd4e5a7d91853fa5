use serde::Serialize;

use blank_core::prompt::CHAT_MAX_TOKENS;
use blank_core::time::unix_to_iso8601;
use blank_core::{
    Context, Error, GenerationRequest, InboundMessage, JournalEntry, Result,
    sanitize_conversation,
};
use blank_store::JournalQuery;

use super::Pipeline;

const MAX_JOURNAL_PAGE: usize = 100;

/// Where the clock stands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CycleInfo {
    pub cycle_number: u32,
    pub started_at: String,
    pub next_cycle_at: String,
    pub epoch: String,
}

impl Pipeline {
    /// Core memories, the cycle's synthesis and its approved entries.
    pub async fn get_context(&self, cycle: Option<u32>) -> Result<Context> {
        let cycle = self.resolve_cycle(cycle)?;
        let store = self.store.lock().await;
        Ok(Context::assemble(
            cycle,
            store.core_memories()?,
            store.get_synthesis(cycle)?,
            store.approved_for_cycle(cycle)?,
        ))
    }

    /// The context rendered as the agent's system prompt.
    pub async fn render_context_prompt(&self, cycle: Option<u32>) -> Result<String> {
        let context = self.get_context(cycle).await?;
        Ok(self.persona.terminal_prompt(&context).render())
    }

    /// Answer a conversation in character, grounded in the current cycle.
    pub async fn chat(&self, messages: Vec<InboundMessage>) -> Result<String> {
        let messages = sanitize_conversation(messages)?;
        let system = self.render_context_prompt(None).await?;
        let request = GenerationRequest {
            system,
            messages,
            max_tokens: CHAT_MAX_TOKENS,
        };

        let reply = self.generate(&request).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(Error::GenerationFailed(
                "generator returned an empty reply".to_string(),
            ));
        }
        Ok(reply.to_string())
    }

    /// Approved entries newest first, without author ids.
    pub async fn list_journal(&self, query: JournalQuery) -> Result<Vec<JournalEntry>> {
        if query.cycle_number == Some(0) {
            return Err(Error::InvalidInput("cycle numbers start at 1".to_string()));
        }
        let query = JournalQuery {
            limit: query.limit.clamp(1, MAX_JOURNAL_PAGE),
            ..query
        };
        let entries = self.store.lock().await.list_journal(&query)?;
        Ok(entries.into_iter().map(JournalEntry::from).collect())
    }

    pub fn cycle_info(&self) -> CycleInfo {
        let cycle_number = self.current_cycle();
        CycleInfo {
            cycle_number,
            started_at: unix_to_iso8601(self.clock.cycle_start(cycle_number)),
            next_cycle_at: unix_to_iso8601(self.clock.cycle_start(cycle_number + 1)),
            epoch: unix_to_iso8601(self.clock.epoch_secs()),
        }
    }
}
