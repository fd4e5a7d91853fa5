pub mod drafts;
pub mod entries;
pub mod error;
pub mod schema;
pub mod store;
pub mod synthesis;
pub mod waking;

pub use entries::{InsertOutcome, JournalQuery};
pub use error::{Result, StoreError};
pub use store::{Store, UpdateOutcome};
