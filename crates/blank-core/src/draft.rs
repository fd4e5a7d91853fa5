//! Outbound post drafts and their review lifecycle.
//!
//! ```text
//! draft --approve--> approved --post--> posted
//!   |                   |
//!   +------delete-------+--> deleted
//! ```
//!
//! `edit` rewrites text in `draft` or `approved` without changing status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

pub const MAX_DRAFTS_PER_BATCH: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftKind {
    Morning,
    MiddayDecision,
    EveningResult,
    FinalThought,
}

impl DraftKind {
    pub const ALL: [DraftKind; 4] = [
        DraftKind::Morning,
        DraftKind::MiddayDecision,
        DraftKind::EveningResult,
        DraftKind::FinalThought,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DraftKind::Morning => "morning",
            DraftKind::MiddayDecision => "midday_decision",
            DraftKind::EveningResult => "evening_result",
            DraftKind::FinalThought => "final_thought",
        }
    }
}

impl fmt::Display for DraftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DraftKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DraftKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "draft kind must be one of: morning, midday_decision, evening_result, final_thought (got '{s}')"
                ))
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Draft,
    Approved,
    Posted,
    Deleted,
}

impl DraftStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DraftStatus::Draft => "draft",
            DraftStatus::Approved => "approved",
            DraftStatus::Posted => "posted",
            DraftStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DraftStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(DraftStatus::Draft),
            "approved" => Ok(DraftStatus::Approved),
            "posted" => Ok(DraftStatus::Posted),
            "deleted" => Ok(DraftStatus::Deleted),
            other => Err(Error::InvalidInput(format!(
                "unknown draft status '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: Uuid,
    pub text: String,
    pub kind: DraftKind,
    pub cycle_number: u32,
    pub status: DraftStatus,
    pub created_at: String,
    pub posted_at: Option<String>,
}

impl Draft {
    pub fn new(text: String, kind: DraftKind, cycle_number: u32, created_at: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            kind,
            cycle_number,
            status: DraftStatus::Draft,
            created_at,
            posted_at: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DraftAction {
    Approve,
    Edit,
    Post,
    Delete,
}

impl DraftAction {
    pub fn name(self) -> &'static str {
        match self {
            DraftAction::Approve => "approve",
            DraftAction::Edit => "edit",
            DraftAction::Post => "post",
            DraftAction::Delete => "delete",
        }
    }

    /// Statuses this action may start from.
    pub fn allowed_from(self) -> &'static [DraftStatus] {
        match self {
            DraftAction::Approve => &[DraftStatus::Draft],
            DraftAction::Post => &[DraftStatus::Approved],
            DraftAction::Edit | DraftAction::Delete => &[DraftStatus::Draft, DraftStatus::Approved],
        }
    }
}

/// Status after `action` on a draft currently in `from`.
pub fn transition(from: DraftStatus, action: DraftAction) -> Result<DraftStatus> {
    if !action.allowed_from().contains(&from) {
        return Err(Error::InvalidTransition {
            action: action.name(),
            from: from.to_string(),
        });
    }
    Ok(match action {
        DraftAction::Approve => DraftStatus::Approved,
        DraftAction::Edit => from,
        DraftAction::Post => DraftStatus::Posted,
        DraftAction::Delete => DraftStatus::Deleted,
    })
}

/// Number of variants to generate: 1 through [`MAX_DRAFTS_PER_BATCH`].
pub fn clamp_count(requested: usize) -> usize {
    requested.clamp(1, MAX_DRAFTS_PER_BATCH)
}

/// Trim generator output and strip one layer of surrounding quotes.
pub fn clean_generated(raw: &str) -> String {
    let text = raw.trim();
    let text = text
        .strip_prefix(['"', '\'', '\u{201c}'])
        .unwrap_or(text);
    let text = text
        .strip_suffix(['"', '\'', '\u{201d}'])
        .unwrap_or(text);
    text.trim().to_string()
}
