use serde::{Deserialize, Serialize};

pub const LAST_ENTRY_SEPARATOR: &str = " | ";

/// Per-user aggregate computed at query time, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub total_entries: u64,
    pub last_entry: Option<String>,
}
