//! The per-cycle context handed to downstream consumers.
//!
//! A `Context` is derived on every read and never stored. It carries an
//! explicit [`CycleStatus`] so consumers can say the cycle is empty instead
//! of inventing content.

use serde::Serialize;

use crate::entry::{Entry, JournalEntry};
use crate::synthesis::Synthesis;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// No synthesis and no approved entries for the cycle.
    Empty,
    Formed,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Context {
    pub cycle_number: u32,
    pub status: CycleStatus,
    pub core_memories: Vec<JournalEntry>,
    pub synthesis: Option<Synthesis>,
    pub cycle_entries: Vec<JournalEntry>,
}

impl Context {
    /// Compose a context. `cycle_entries` must already be in chronological
    /// order; core memories alone never make a cycle formed.
    pub fn assemble(
        cycle_number: u32,
        core_memories: Vec<Entry>,
        synthesis: Option<Synthesis>,
        cycle_entries: Vec<Entry>,
    ) -> Self {
        let status = if synthesis.is_none() && cycle_entries.is_empty() {
            CycleStatus::Empty
        } else {
            CycleStatus::Formed
        };
        Self {
            cycle_number,
            status,
            core_memories: core_memories.into_iter().map(JournalEntry::from).collect(),
            synthesis,
            cycle_entries: cycle_entries.into_iter().map(JournalEntry::from).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status == CycleStatus::Empty
    }
}
