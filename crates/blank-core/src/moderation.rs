//! Moderation state machine over entry status.
//!
//! ```text
//! pending --approve--> approved
//! pending --reject---> rejected
//! ```
//!
//! Both outcomes are terminal. Annotation is orthogonal to status and is only
//! allowed on approved entries.

use serde::{Deserialize, Serialize};

use crate::entry::EntryStatus;
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approve,
    Reject,
}

impl Verdict {
    pub fn action(self) -> &'static str {
        match self {
            Verdict::Approve => "approve",
            Verdict::Reject => "reject",
        }
    }

    pub fn target(self) -> EntryStatus {
        match self {
            Verdict::Approve => EntryStatus::Approved,
            Verdict::Reject => EntryStatus::Rejected,
        }
    }
}

/// Status after applying `verdict` to an entry currently in `from`.
pub fn apply(from: EntryStatus, verdict: Verdict) -> Result<EntryStatus> {
    match from {
        EntryStatus::Pending => Ok(verdict.target()),
        other => Err(Error::InvalidTransition {
            action: verdict.action(),
            from: other.to_string(),
        }),
    }
}

pub fn ensure_annotatable(status: EntryStatus) -> Result<()> {
    if status == EntryStatus::Approved {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            action: "annotate",
            from: status.to_string(),
        })
    }
}
