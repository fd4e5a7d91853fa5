use blank_core::{Error, Result, Synthesis};

use super::Pipeline;

impl Pipeline {
    /// Compress a cycle's approved entries into its synthesis, replacing any
    /// earlier one. Defaults to the current cycle.
    pub async fn run_synthesis(&self, cycle: Option<u32>) -> Result<Synthesis> {
        let cycle = self.resolve_cycle(cycle)?;
        let (entries, core_memories) = {
            let store = self.store.lock().await;
            (store.approved_for_cycle(cycle)?, store.core_memories()?)
        };
        if entries.is_empty() {
            return Err(Error::NothingToSynthesize(cycle));
        }

        let request = self
            .persona
            .synthesis_request(cycle, &entries, &core_memories);
        let raw = self.generate(&request).await?;
        let synthesis = Synthesis::from_generated(cycle, &raw, entries.len(), self.now_iso())?;

        self.store.lock().await.upsert_synthesis(&synthesis)?;
        tracing::info!(
            cycle,
            sources = synthesis.source_submission_count,
            cores = core_memories.len(),
            "synthesis stored"
        );
        Ok(synthesis)
    }

    pub async fn get_synthesis(&self, cycle: Option<u32>) -> Result<Option<Synthesis>> {
        let cycle = self.resolve_cycle(cycle)?;
        Ok(self.store.lock().await.get_synthesis(cycle)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::llm::GenerationError;
    use crate::pipeline::testing::*;

    use super::*;

    async fn approved(h: &Harness, text: &str, balance: f64, core: bool) {
        let e = h.pipeline.submit(AUTHOR, text, core, balance).await.unwrap();
        h.pipeline.approve(e.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_nothing_to_synthesize_even_with_cores() {
        let h = default_harness();
        approved(&h, "forever", 250_000.0, true).await;
        h.advance_days(1);

        let err = h.pipeline.run_synthesis(None).await.unwrap_err();
        assert_eq!(err, Error::NothingToSynthesize(2));
        assert!(h.generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_second_synthesis_replaces_first() {
        let h = harness(
            ScriptedGenerator::script(vec![Ok("first mind".into()), Ok("second mind".into())]),
            Arc::new(FixedOracle(0.0)),
        );
        approved(&h, "one", 60_000.0, false).await;

        h.pipeline.run_synthesis(Some(1)).await.unwrap();
        approved(&h, "two", 60_000.0, false).await;
        let second = h.pipeline.run_synthesis(Some(1)).await.unwrap();
        assert_eq!(second.source_submission_count, 2);

        let stored = h.pipeline.get_synthesis(Some(1)).await.unwrap().unwrap();
        assert_eq!(stored.narrative_text, "second mind");
        assert_eq!(stored.source_submission_count, 2);
    }

    #[tokio::test]
    async fn test_prompt_carries_entries_in_order_and_cores() {
        let h = default_harness();
        approved(&h, "kept forever", 250_000.0, true).await;
        h.advance_days(1);
        approved(&h, "morning note", 60_000.0, false).await;
        h.advance_secs(5);
        approved(&h, "evening note", 60_000.0, false).await;

        h.pipeline.run_synthesis(None).await.unwrap();
        let prompt = &h.generator.calls()[0].messages[0].content;
        let morning = prompt.find("morning note").unwrap();
        let evening = prompt.find("evening note").unwrap();
        assert!(morning < evening);
        assert!(prompt.contains("kept forever"));
        assert!(prompt.contains("cycle 2"));
    }

    #[tokio::test]
    async fn test_failed_generation_stores_nothing() {
        let h = harness(
            ScriptedGenerator::script(vec![
                Err(GenerationError::Network("down".into())),
                Ok("   ".into()),
            ]),
            Arc::new(FixedOracle(0.0)),
        );
        approved(&h, "entry", 60_000.0, false).await;

        assert!(matches!(
            h.pipeline.run_synthesis(None).await,
            Err(Error::GenerationFailed(_))
        ));
        assert!(matches!(
            h.pipeline.run_synthesis(None).await,
            Err(Error::GenerationFailed(_))
        ));
        assert_eq!(h.pipeline.get_synthesis(None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cycle_zero_is_invalid() {
        let h = default_harness();
        assert!(matches!(
            h.pipeline.run_synthesis(Some(0)).await,
            Err(Error::InvalidInput(_))
        ));
    }
}
