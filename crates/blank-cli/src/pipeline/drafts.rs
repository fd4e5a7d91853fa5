use futures_util::future::try_join_all;
use serde::Serialize;
use uuid::Uuid;

use blank_core::draft::{self, clamp_count, clean_generated};
use blank_core::{Draft, DraftAction, DraftKind, DraftStatus, Error, Result, journal_summary};
use blank_store::UpdateOutcome;

use super::Pipeline;

/// Parameters for a batch of post drafts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DraftRequest {
    pub kind: DraftKind,
    pub count: usize,
    pub decision: Option<String>,
    pub result: Option<String>,
    /// Replaces the summary of the cycle's journal.
    pub context: Option<String>,
}

impl DraftRequest {
    pub fn new(kind: DraftKind, count: usize) -> Self {
        Self {
            kind,
            count,
            decision: None,
            result: None,
            context: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PostedDraft {
    pub draft: Draft,
    /// Public URL when a social account is connected.
    pub url: Option<String>,
}

fn not_found(id: Uuid) -> Error {
    Error::NotFound(format!("draft {id}"))
}

fn settle(id: Uuid, action: DraftAction, outcome: UpdateOutcome<DraftStatus>) -> Result<()> {
    match outcome {
        UpdateOutcome::Applied => Ok(()),
        UpdateOutcome::Missing => Err(not_found(id)),
        UpdateOutcome::Blocked(current) => Err(Error::InvalidTransition {
            action: action.name(),
            from: current.to_string(),
        }),
    }
}

impl Pipeline {
    /// Generate 1-5 variants concurrently; all of them are stored or none.
    pub async fn generate_drafts(&self, request: DraftRequest) -> Result<Vec<Draft>> {
        let cycle = self.current_cycle();
        let journal_context = match request.context.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => journal_summary(&self.store.lock().await.approved_for_cycle(cycle)?),
        };
        let prompt = self.persona.draft_request(
            request.kind,
            cycle,
            &journal_context,
            request.decision.as_deref(),
            request.result.as_deref(),
        );

        let count = clamp_count(request.count);
        let outputs = try_join_all((0..count).map(|_| self.generate(&prompt))).await?;

        let created_at = self.now_iso();
        let drafts = outputs
            .iter()
            .map(|raw| {
                let text = clean_generated(raw);
                if text.is_empty() {
                    return Err(Error::GenerationFailed(
                        "generator returned an empty draft".to_string(),
                    ));
                }
                Ok(Draft::new(text, request.kind, cycle, created_at.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        self.store.lock().await.insert_drafts(&drafts)?;
        tracing::info!(kind = request.kind.as_str(), count, cycle, "drafts generated");
        Ok(drafts)
    }

    pub async fn list_drafts(&self, status: DraftStatus) -> Result<Vec<Draft>> {
        Ok(self.store.lock().await.list_drafts(status)?)
    }

    async fn fetch_draft(&self, id: Uuid) -> Result<Draft> {
        self.store
            .lock()
            .await
            .get_draft(id)?
            .ok_or_else(|| not_found(id))
    }

    pub async fn approve_draft(&self, id: Uuid) -> Result<Draft> {
        self.move_draft(id, DraftAction::Approve, None).await
    }

    pub async fn delete_draft(&self, id: Uuid) -> Result<Draft> {
        self.move_draft(id, DraftAction::Delete, None).await
    }

    async fn move_draft(
        &self,
        id: Uuid,
        action: DraftAction,
        posted_at: Option<String>,
    ) -> Result<Draft> {
        let store = self.store.lock().await;
        let current = store.get_draft(id)?.ok_or_else(|| not_found(id))?;
        let to = draft::transition(current.status, action)?;
        let outcome = store.set_draft_status(id, action.allowed_from(), to, posted_at.as_deref())?;
        settle(id, action, outcome)?;

        tracing::info!(%id, status = to.as_str(), "draft updated");
        Ok(Draft {
            status: to,
            posted_at: posted_at.or(current.posted_at),
            ..current
        })
    }

    pub async fn edit_draft(&self, id: Uuid, text: &str) -> Result<Draft> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("draft text is required".to_string()));
        }
        let store = self.store.lock().await;
        let current = store.get_draft(id)?.ok_or_else(|| not_found(id))?;
        draft::transition(current.status, DraftAction::Edit)?;
        let outcome = store.set_draft_text(id, DraftAction::Edit.allowed_from(), text)?;
        settle(id, DraftAction::Edit, outcome)?;

        Ok(Draft {
            text: text.to_string(),
            ..current
        })
    }

    /// Publish an approved draft and mark it posted.
    pub async fn post_draft(&self, id: Uuid) -> Result<PostedDraft> {
        let current = self.fetch_draft(id).await?;
        draft::transition(current.status, DraftAction::Post)?;

        let url = self.poster.publish(&current.text).await;
        let draft = self
            .move_draft(id, DraftAction::Post, Some(self.now_iso()))
            .await?;
        Ok(PostedDraft { draft, url })
    }
}
