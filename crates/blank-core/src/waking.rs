use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A generated pair of waking posts, not yet published.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WakingDraft {
    pub first_post: String,
    pub second_post: Option<String>,
}

#[derive(Deserialize)]
struct GeneratedPair {
    tweet1: Option<String>,
    #[serde(default)]
    tweet2: Option<String>,
}

/// Parse generator output of the form `{"tweet1": "...", "tweet2": "..." | null}`,
/// tolerating a surrounding markdown code fence.
pub fn parse_waking_draft(raw: &str) -> Result<WakingDraft> {
    let body = raw.replace("```json", "").replace("```", "");
    let pair: GeneratedPair = serde_json::from_str(body.trim())
        .map_err(|e| Error::GenerationFailed(format!("waking draft is not valid JSON: {e}")))?;

    let first_post = pair
        .tweet1
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::GenerationFailed("waking draft has no first post".to_string()))?;
    let second_post = pair
        .tweet2
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    Ok(WakingDraft {
        first_post,
        second_post,
    })
}

/// A published waking announcement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakingEntry {
    pub id: Uuid,
    pub cycle_number: u32,
    pub first_post: String,
    pub second_post: Option<String>,
    pub posted_at: String,
}

impl WakingEntry {
    pub fn new(
        cycle_number: u32,
        first_post: &str,
        second_post: Option<&str>,
        posted_at: String,
    ) -> Result<Self> {
        let first_post = first_post.trim();
        if first_post.is_empty() {
            return Err(Error::InvalidInput("first post is required".to_string()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            cycle_number,
            first_post: first_post.to_string(),
            second_post: second_post
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            posted_at,
        })
    }
}
