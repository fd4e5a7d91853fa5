use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tier::Tier;

/// Moderation status of a journal entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Approved,
    Rejected,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Approved => "approved",
            EntryStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EntryStatus::Pending),
            "approved" => Ok(EntryStatus::Approved),
            "rejected" => Ok(EntryStatus::Rejected),
            other => Err(format!("unknown entry status '{other}'")),
        }
    }
}

/// A journal entry as persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub author_id: String,
    pub text: String,
    pub tier: Tier,
    pub measured_balance: f64,
    pub is_core_memory: bool,
    pub status: EntryStatus,
    pub cycle_number: u32,
    pub created_at: String,
    pub annotation: Option<String>,
}

/// An admitted entry ready to persist. Built only by [`crate::admission::admit`].
#[derive(Clone, Debug, PartialEq)]
pub struct NewEntry {
    pub id: Uuid,
    pub author_id: String,
    pub text: String,
    pub tier: Tier,
    pub measured_balance: f64,
    pub is_core_memory: bool,
    pub cycle_number: u32,
    pub created_at: String,
    /// Entries allowed per author per cycle at this tier; `None` is unlimited.
    pub cycle_cap: Option<u32>,
}

impl NewEntry {
    /// The row as it reads back right after insertion.
    pub fn into_entry(self) -> Entry {
        Entry {
            id: self.id,
            author_id: self.author_id,
            text: self.text,
            tier: self.tier,
            measured_balance: self.measured_balance,
            is_core_memory: self.is_core_memory,
            status: EntryStatus::Pending,
            cycle_number: self.cycle_number,
            created_at: self.created_at,
            annotation: None,
        }
    }
}

/// Public view of an approved entry. Never carries the author id.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub text: String,
    pub tier: Tier,
    pub is_core_memory: bool,
    pub annotation: Option<String>,
    pub cycle_number: u32,
    pub created_at: String,
}

impl From<Entry> for JournalEntry {
    fn from(e: Entry) -> Self {
        Self {
            id: e.id,
            text: e.text,
            tier: e.tier,
            is_core_memory: e.is_core_memory,
            annotation: e.annotation,
            cycle_number: e.cycle_number,
            created_at: e.created_at,
        }
    }
}
