mod entries;
mod users;

pub use entries::{EntryPage, EntryService, ENTRY_COUNT_KEY};
pub use users::UserService;
