use serde::Serialize;
use uuid::Uuid;

use blank_core::moderation::{self, Verdict};
use blank_core::{Entry, EntryStatus, Error, Result};
use blank_store::UpdateOutcome;

use super::Pipeline;

pub const PENDING_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;

/// One page of the moderation queue. Pass `next_cursor` back to continue.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntryPage {
    pub entries: Vec<Entry>,
    pub next_cursor: Option<Uuid>,
}

fn not_found(id: Uuid) -> Error {
    Error::NotFound(format!("entry {id}"))
}

fn settle(id: Uuid, action: &'static str, outcome: UpdateOutcome<EntryStatus>) -> Result<()> {
    match outcome {
        UpdateOutcome::Applied => Ok(()),
        UpdateOutcome::Missing => Err(not_found(id)),
        UpdateOutcome::Blocked(current) => Err(Error::InvalidTransition {
            action,
            from: current.to_string(),
        }),
    }
}

impl Pipeline {
    /// Pending entries, newest first.
    pub async fn list_pending(&self, cursor: Option<Uuid>, limit: Option<usize>) -> Result<EntryPage> {
        let limit = limit.unwrap_or(PENDING_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let mut entries =
            self.store
                .lock()
                .await
                .list_by_status(EntryStatus::Pending, cursor, limit + 1)?;

        let next_cursor = if entries.len() > limit {
            entries.truncate(limit);
            entries.last().map(|e| e.id)
        } else {
            None
        };
        Ok(EntryPage {
            entries,
            next_cursor,
        })
    }

    pub async fn approve(&self, id: Uuid) -> Result<Entry> {
        self.moderate(id, Verdict::Approve).await
    }

    pub async fn reject(&self, id: Uuid) -> Result<Entry> {
        self.moderate(id, Verdict::Reject).await
    }

    async fn moderate(&self, id: Uuid, verdict: Verdict) -> Result<Entry> {
        let store = self.store.lock().await;
        let entry = store.get_entry(id)?.ok_or_else(|| not_found(id))?;
        let to = moderation::apply(entry.status, verdict)?;
        settle(id, verdict.action(), store.set_entry_status(id, to)?)?;

        tracing::info!(%id, status = %to, "entry moderated");
        Ok(Entry { status: to, ..entry })
    }

    /// Set the annotation of an approved entry. Without `text` one is
    /// generated; a failed generation changes nothing.
    pub async fn annotate(&self, id: Uuid, text: Option<&str>) -> Result<Entry> {
        let entry = {
            let store = self.store.lock().await;
            store.get_entry(id)?.ok_or_else(|| not_found(id))?
        };
        moderation::ensure_annotatable(entry.status)?;

        let annotation = match text {
            Some(t) if t.trim().is_empty() => {
                return Err(Error::InvalidInput("annotation text is empty".to_string()));
            }
            Some(t) => t.trim().to_string(),
            None => {
                let raw = self
                    .generate(&self.persona.annotation_request(&entry))
                    .await?;
                let raw = raw.trim();
                if raw.is_empty() {
                    return Err(Error::GenerationFailed(
                        "generator returned an empty annotation".to_string(),
                    ));
                }
                raw.to_string()
            }
        };

        let outcome = self.store.lock().await.set_annotation(id, &annotation)?;
        settle(id, "annotate", outcome)?;

        tracing::info!(%id, generated = text.is_none(), "entry annotated");
        Ok(Entry {
            annotation: Some(annotation),
            ..entry
        })
    }
}
