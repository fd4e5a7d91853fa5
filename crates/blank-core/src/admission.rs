//! Admission rules for new journal entries.
//!
//! Everything here is decided from the request and the measured balance
//! alone. The per-cycle cap is carried on the admitted [`NewEntry`] and
//! enforced by the store in the same statement that inserts the row.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::entry::NewEntry;
use crate::error::{Error, Result};
use crate::tier::{PolicyTable, Tier};

/// Account ids are base58-style: 32-64 ASCII alphanumerics.
static AUTHOR_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{32,64}$").unwrap());

#[derive(Clone, Debug)]
pub struct SubmissionRequest<'a> {
    pub author_id: &'a str,
    pub text: &'a str,
    pub requested_core_memory: bool,
    pub measured_balance: f64,
}

pub fn is_valid_author_id(author_id: &str) -> bool {
    AUTHOR_ID.is_match(author_id)
}

/// Validate a submission against the policy table and build the row to insert.
///
/// Checks run in a fixed order: input shape, tier, length, core-memory
/// eligibility. The first failure wins.
pub fn admit(
    req: &SubmissionRequest<'_>,
    policies: &PolicyTable,
    cycle_number: u32,
    created_at: String,
) -> Result<NewEntry> {
    if !is_valid_author_id(req.author_id) {
        return Err(Error::InvalidInput(
            "author id must be 32-64 alphanumeric characters".to_string(),
        ));
    }
    let text = req.text.trim();
    if text.is_empty() {
        return Err(Error::InvalidInput("entry text is required".to_string()));
    }

    let tier = policies.resolve(req.measured_balance);
    if tier == Tier::Zero {
        return Err(Error::InsufficientTier {
            balance: req.measured_balance,
            required: policies.write_threshold(),
        });
    }

    let policy = policies.policy(tier);
    let len = text.chars().count();
    if len > policy.max_chars {
        return Err(Error::TextTooLong {
            tier,
            max: policy.max_chars,
            len,
        });
    }

    if req.requested_core_memory && !policy.core_memory_eligible {
        return Err(Error::CoreMemoryNotEligible { tier });
    }

    Ok(NewEntry {
        id: Uuid::new_v4(),
        author_id: req.author_id.to_string(),
        text: text.to_string(),
        tier,
        measured_balance: req.measured_balance,
        is_core_memory: req.requested_core_memory && policy.core_memory_eligible,
        cycle_number,
        created_at,
        cycle_cap: policy.max_entries_per_cycle,
    })
}

/// The error reported when the store refuses an insert because the author's
/// cap for the cycle is already met.
pub fn rate_limit_exceeded(entry: &NewEntry) -> Error {
    Error::RateLimitExceeded {
        tier: entry.tier,
        cap: entry.cycle_cap.unwrap_or(0),
        cycle: entry.cycle_number,
    }
}
