use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The narrative compressed from one cycle's approved entries.
///
/// At most one exists per cycle; regenerating replaces it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub cycle_number: u32,
    pub narrative_text: String,
    pub source_submission_count: u32,
    pub generated_at: String,
}

impl Synthesis {
    /// Accept generator output as a narrative. Blank output is a failed
    /// generation, not an empty synthesis.
    pub fn from_generated(
        cycle_number: u32,
        raw: &str,
        source_submission_count: usize,
        generated_at: String,
    ) -> Result<Self> {
        let narrative_text = raw.trim();
        if narrative_text.is_empty() {
            return Err(Error::GenerationFailed(
                "generator returned an empty synthesis".to_string(),
            ));
        }
        Ok(Self {
            cycle_number,
            narrative_text: narrative_text.to_string(),
            source_submission_count: u32::try_from(source_submission_count).unwrap_or(u32::MAX),
            generated_at,
        })
    }
}
