mod entry;
mod user;

pub use entry::{Entry, EntryPayload, NewEntry};
pub use user::{UserSummary, LAST_ENTRY_SEPARATOR};
