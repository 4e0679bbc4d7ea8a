use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row, Transaction};
use tokio_rusqlite::Connection;

use crate::error::{is_unique_violation, Result};
use crate::models::{Entry, NewEntry, UserSummary, LAST_ENTRY_SEPARATOR};

use super::schema::SCHEMA;

const ENTRY_SELECT: &str = r#"SELECT e.id, e.user_id, u.name, e.subject, e.message, e.created_date
                              FROM entries e
                              JOIN users u ON e.user_id = u.id"#;

/// One row for a bulk entry insert.
#[derive(Debug, Clone)]
pub struct SeedEntry {
    pub user_id: i64,
    pub subject: String,
    pub message: String,
}

#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // User operations

    #[cfg(test)]
    pub async fn find_user_id(&self, name: &str) -> Result<Option<i64>> {
        let name = name.to_string();
        let id = self
            .conn
            .call(move |conn| Ok(find_user_id(conn, &name)?))
            .await?;
        Ok(id)
    }

    #[cfg(test)]
    pub async fn count_users(&self) -> Result<u64> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Removes a user; their entries go with it through the foreign key cascade.
    #[cfg(test)]
    pub async fn delete_user(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .call(move |conn| {
                let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
                Ok(rows > 0)
            })
            .await?;
        Ok(deleted)
    }

    /// Total entries and the newest entry text for every user, in a single statement.
    pub async fn user_summaries(&self) -> Result<Vec<UserSummary>> {
        let summaries = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT u.name,
                              (SELECT COUNT(*) FROM entries e WHERE e.user_id = u.id) AS total_entries,
                              (SELECT e.subject || ?1 || e.message
                                 FROM entries e
                                WHERE e.user_id = u.id
                                ORDER BY e.created_date DESC, e.id DESC
                                LIMIT 1) AS last_entry
                       FROM users u
                       ORDER BY u.id"#,
                )?;
                let summaries = stmt
                    .query_map(params![LAST_ENTRY_SEPARATOR], summary_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(summaries)
            })
            .await?;
        Ok(summaries)
    }

    // Entry operations

    /// Resolves or creates the owner and inserts the entry in one transaction.
    pub async fn create_entry(&self, entry: NewEntry) -> Result<Entry> {
        let (created, new_user) = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let (user_id, new_user) = get_or_create_user(&tx, &entry.name)?;
                tx.execute(
                    "INSERT INTO entries (user_id, subject, message) VALUES (?1, ?2, ?3)",
                    params![user_id, entry.subject, entry.message],
                )?;
                let entry_id = tx.last_insert_rowid();
                let created = tx.query_row(
                    &format!("{} WHERE e.id = ?1", ENTRY_SELECT),
                    params![entry_id],
                    entry_from_row,
                )?;
                tx.commit()?;
                Ok((created, new_user))
            })
            .await?;

        if new_user {
            tracing::info!("Created user {:?} (id {})", created.user, created.user_id);
        }
        tracing::info!("Created entry {} for {:?}", created.id, created.user);
        Ok(created)
    }

    pub async fn count_entries(&self) -> Result<u64> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Newest first; ties on the timestamp fall back to the higher id.
    pub async fn list_entries(&self, limit: u64, offset: u64) -> Result<Vec<Entry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let entries = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} ORDER BY e.created_date DESC, e.id DESC LIMIT ?1 OFFSET ?2",
                    ENTRY_SELECT
                ))?;
                let entries = stmt
                    .query_map(params![limit, offset], entry_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await?;
        Ok(entries)
    }

    #[cfg(test)]
    pub async fn delete_entry(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .call(move |conn| {
                let rows = conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
                Ok(rows > 0)
            })
            .await?;
        Ok(deleted)
    }

    // Bulk loading

    /// Inserts users that do not exist yet, returning how many were added.
    pub async fn bulk_insert_users(&self, names: Vec<String>) -> Result<usize> {
        let inserted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut inserted = 0;
                {
                    let mut stmt = tx.prepare("INSERT OR IGNORE INTO users (name) VALUES (?1)")?;
                    for name in &names {
                        inserted += stmt.execute(params![name])?;
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;
        Ok(inserted)
    }

    pub async fn all_user_ids(&self) -> Result<Vec<i64>> {
        let ids = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id FROM users ORDER BY id")?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<i64>, _>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }

    pub async fn bulk_insert_entries(&self, entries: Vec<SeedEntry>) -> Result<usize> {
        let inserted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut inserted = 0;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO entries (user_id, subject, message) VALUES (?1, ?2, ?3)",
                    )?;
                    for entry in &entries {
                        inserted += stmt.execute(params![entry.user_id, entry.subject, entry.message])?;
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;
        Ok(inserted)
    }
}

/// Looks the name up first; a concurrent insert of the same name that wins the
/// UNIQUE race is picked up by the second lookup.
fn get_or_create_user(tx: &Transaction<'_>, name: &str) -> rusqlite::Result<(i64, bool)> {
    if let Some(id) = find_user_id(tx, name)? {
        return Ok((id, false));
    }

    match tx.execute("INSERT INTO users (name) VALUES (?1)", params![name]) {
        Ok(_) => Ok((tx.last_insert_rowid(), true)),
        Err(e) if is_unique_violation(&e) => {
            tracing::warn!("Concurrent creation of user {:?}, retrying lookup", name);
            find_user_id(tx, name)?.map(|id| (id, false)).ok_or(e)
        }
        Err(e) => Err(e),
    }
}

fn find_user_id(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row("SELECT id FROM users WHERE name = ?1", params![name], |row| row.get(0))
        .optional()
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // RFC3339 with milliseconds (e.g., "2026-01-11T12:34:56.789Z")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Plain SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    None
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    Ok(parse_datetime(&row.get::<_, String>(idx)?).unwrap_or_else(Utc::now))
}

fn entry_from_row(row: &Row) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        user: row.get(2)?,
        subject: row.get(3)?,
        message: row.get(4)?,
        created_date: timestamp_column(row, 5)?,
    })
}

fn summary_from_row(row: &Row) -> rusqlite::Result<UserSummary> {
    Ok(UserSummary {
        username: row.get(0)?,
        total_entries: row.get::<_, i64>(1)?.max(0) as u64,
        last_entry: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::EntryPayload;
    use crate::test_util::temp_repository;

    fn new_entry(name: &str, subject: &str, message: &str) -> NewEntry {
        EntryPayload::new(name, subject, message).validate().unwrap()
    }

    #[tokio::test]
    async fn create_entry_creates_user_once() {
        let (repo, _dir) = temp_repository().await;

        let first = repo.create_entry(new_entry("Jane Smith", "One", "First")).await.unwrap();
        let second = repo.create_entry(new_entry("Jane Smith", "Two", "Second")).await.unwrap();

        assert_eq!(first.user, "Jane Smith");
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(repo.count_users().await.unwrap(), 1);
        assert_eq!(repo.count_entries().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn user_names_match_exactly() {
        let (repo, _dir) = temp_repository().await;

        repo.create_entry(new_entry("Test User 🎉", "Hi", "Hello")).await.unwrap();
        repo.create_entry(new_entry("test user 🎉", "Hi", "Hello")).await.unwrap();

        assert_eq!(repo.count_users().await.unwrap(), 2);
        let first = repo.find_user_id("Test User 🎉").await.unwrap();
        let second = repo.find_user_id("test user 🎉").await.unwrap();
        assert!(first.is_some() && second.is_some());
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn duplicate_user_insert_is_a_conflict() {
        let (repo, _dir) = temp_repository().await;
        repo.create_entry(new_entry("Taken", "s", "m")).await.unwrap();

        let result = repo
            .conn
            .call(|conn| {
                conn.execute("INSERT INTO users (name) VALUES ('Taken')", [])?;
                Ok(())
            })
            .await
            .map_err(AppError::from);

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_entries_is_newest_first() {
        let (repo, _dir) = temp_repository().await;
        for subject in ["First", "Second", "Third"] {
            repo.create_entry(new_entry("Test User", subject, "msg")).await.unwrap();
        }

        let entries = repo.list_entries(10, 0).await.unwrap();
        let subjects: Vec<&str> = entries.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, ["Third", "Second", "First"]);

        let tail = repo.list_entries(2, 2).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].subject, "First");
    }

    #[tokio::test]
    async fn summaries_count_and_pick_latest_entry() {
        let (repo, _dir) = temp_repository().await;
        for i in 1..=3 {
            repo.create_entry(new_entry("Active User", &format!("Entry {}", i), &format!("Message {}", i)))
                .await
                .unwrap();
        }
        repo.create_entry(new_entry("Inactive User", "Single Entry", "Single Message"))
            .await
            .unwrap();

        let summaries = repo.user_summaries().await.unwrap();
        assert_eq!(
            summaries,
            vec![
                UserSummary {
                    username: "Active User".into(),
                    total_entries: 3,
                    last_entry: Some("Entry 3 | Message 3".into()),
                },
                UserSummary {
                    username: "Inactive User".into(),
                    total_entries: 1,
                    last_entry: Some("Single Entry | Single Message".into()),
                },
            ]
        );
    }

    #[tokio::test]
    async fn summary_of_user_without_entries_has_no_last_entry() {
        let (repo, _dir) = temp_repository().await;
        repo.bulk_insert_users(vec!["User Without Entries".into()]).await.unwrap();

        let summaries = repo.user_summaries().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].total_entries, 0);
        assert_eq!(summaries[0].last_entry, None);
    }

    #[tokio::test]
    async fn latest_entry_follows_timestamp_not_insert_order() {
        let (repo, _dir) = temp_repository().await;
        let newer = repo.create_entry(new_entry("Test User", "Newer", "by clock")).await.unwrap();
        let older = repo.create_entry(new_entry("Test User", "Older", "by clock")).await.unwrap();

        repo.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE entries SET created_date = ?1 WHERE id = ?2",
                    params!["2030-01-01T00:00:00.000Z", newer.id],
                )?;
                conn.execute(
                    "UPDATE entries SET created_date = ?1 WHERE id = ?2",
                    params!["2020-01-01T00:00:00.000Z", older.id],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let summaries = repo.user_summaries().await.unwrap();
        assert_eq!(summaries[0].last_entry.as_deref(), Some("Newer | by clock"));

        let listed = repo.list_entries(10, 0).await.unwrap();
        assert_eq!(listed[0].subject, "Newer");
    }

    #[tokio::test]
    async fn timestamp_ties_prefer_highest_id() {
        let (repo, _dir) = temp_repository().await;
        repo.create_entry(new_entry("Test User", "A", "a")).await.unwrap();
        repo.create_entry(new_entry("Test User", "B", "b")).await.unwrap();

        repo.conn
            .call(|conn| {
                conn.execute("UPDATE entries SET created_date = '2025-05-05T05:05:05.000Z'", [])?;
                Ok(())
            })
            .await
            .unwrap();

        let summaries = repo.user_summaries().await.unwrap();
        assert_eq!(summaries[0].last_entry.as_deref(), Some("B | b"));
    }

    #[tokio::test]
    async fn deleting_user_cascades_to_entries() {
        let (repo, _dir) = temp_repository().await;
        let entry = repo.create_entry(new_entry("Leaving", "Bye", "So long")).await.unwrap();
        repo.create_entry(new_entry("Staying", "Hi", "Still here")).await.unwrap();

        assert!(repo.delete_user(entry.user_id).await.unwrap());
        assert_eq!(repo.count_entries().await.unwrap(), 1);
        assert!(repo.find_user_id("Leaving").await.unwrap().is_none());
        assert!(!repo.delete_entry(entry.id).await.unwrap());
    }

    #[tokio::test]
    async fn entry_for_missing_user_is_rejected() {
        let (repo, _dir) = temp_repository().await;
        let inserted = repo
            .bulk_insert_entries(vec![SeedEntry {
                user_id: 999,
                subject: "Orphan".into(),
                message: "No owner".into(),
            }])
            .await;

        assert!(matches!(inserted, Err(AppError::Database(_))));
        assert_eq!(repo.count_entries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn bulk_insert_skips_existing_users() {
        let (repo, _dir) = temp_repository().await;
        repo.create_entry(new_entry("Existing", "s", "m")).await.unwrap();

        let inserted = repo
            .bulk_insert_users(vec!["Existing".into(), "Fresh".into()])
            .await
            .unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(repo.all_user_ids().await.unwrap().len(), 2);
    }
}
