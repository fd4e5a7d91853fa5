//! Daily memory formation: the rules that turn crowd-written journal entries
//! into a bounded, per-cycle mind for a generative agent.
//!
//! Time is cut into numbered cycles. A holder's measured balance picks a tier,
//! the tier decides how much they may write, moderators promote entries into
//! memory, and each cycle's approved entries are compressed into one synthesis
//! that is served back as context together with the permanent core memories.
//!
//! Zero I/O: persistence, the text generator and the balance oracle live in
//! other crates.

pub mod admission;
pub mod context;
pub mod conversation;
pub mod cycle;
pub mod draft;
pub mod entry;
pub mod error;
pub mod moderation;
pub mod prompt;
pub mod synthesis;
pub mod tier;
pub mod time;
pub mod waking;

pub use admission::{SubmissionRequest, admit, is_valid_author_id, rate_limit_exceeded};
pub use context::{Context, CycleStatus};
pub use conversation::{ChatMessage, GenerationRequest, InboundMessage, Role, sanitize_conversation};
pub use cycle::{CycleClock, DEFAULT_EPOCH_SECS, cycle_number};
pub use draft::{Draft, DraftAction, DraftKind, DraftStatus};
pub use entry::{Entry, EntryStatus, JournalEntry, NewEntry};
pub use error::{Error, Result};
pub use moderation::Verdict;
pub use prompt::{Persona, PromptTemplate, Slot, journal_summary};
pub use synthesis::Synthesis;
pub use tier::{PolicyTable, Tier, TierPolicy};
pub use waking::{WakingDraft, WakingEntry, parse_waking_draft};
