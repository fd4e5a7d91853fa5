use blank_core::prompt::WAKING_RECENT_ENTRIES;
use blank_core::{Result, WakingDraft, WakingEntry, parse_waking_draft};

use super::Pipeline;

const MAX_WAKING_PAGE: usize = 100;

impl Pipeline {
    /// Draft the two posts announcing a new cycle, from the latest approved
    /// entries of any cycle. Nothing is stored.
    pub async fn waking_draft(&self) -> Result<WakingDraft> {
        let cycle = self.current_cycle();
        let recent = self
            .store
            .lock()
            .await
            .recent_approved(WAKING_RECENT_ENTRIES)?;
        let raw = self
            .generate(&self.persona.waking_request(cycle, &recent))
            .await?;
        parse_waking_draft(&raw)
    }

    /// Publish and record a waking announcement for the current cycle.
    pub async fn post_waking(&self, first_post: &str, second_post: Option<&str>) -> Result<WakingEntry> {
        let entry = WakingEntry::new(self.current_cycle(), first_post, second_post, self.now_iso())?;

        self.poster.publish(&entry.first_post).await;
        if let Some(second) = &entry.second_post {
            self.poster.publish(second).await;
        }

        self.store.lock().await.insert_waking(&entry)?;
        tracing::info!(cycle = entry.cycle_number, id = %entry.id, "waking entry posted");
        Ok(entry)
    }

    pub async fn list_waking(&self, limit: usize) -> Result<Vec<WakingEntry>> {
        let limit = limit.clamp(1, MAX_WAKING_PAGE);
        Ok(self.store.lock().await.list_waking(limit)?)
    }
}
