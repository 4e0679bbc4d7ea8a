use std::collections::HashSet;

use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::faker::name::en::Name;
use fake::Fake;
use rand::seq::SliceRandom;

use crate::db::{Repository, SeedEntry};
use crate::error::{AppError, Result};

/// Counts for one seeding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOptions {
    pub users: usize,
    pub entries: usize,
    pub batch: usize,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            users: 1000,
            entries: 10_000,
            batch: 1000,
        }
    }
}

impl SeedOptions {
    /// Positional `[USERS] [ENTRIES] [BATCH]` after `--seed`.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let defaults = Self::default();
        let parse = |idx: usize, default: usize| -> Result<usize> {
            match args.get(idx) {
                None => Ok(default),
                Some(raw) => raw.parse::<usize>().map_err(|_| {
                    AppError::from(anyhow::anyhow!("expected a number, got {:?}", raw))
                }),
            }
        };

        let options = Self {
            users: parse(0, defaults.users)?,
            entries: parse(1, defaults.entries)?,
            batch: parse(2, defaults.batch)?,
        };
        if options.batch == 0 {
            return Err(AppError::Config("batch size must be at least 1".to_string()));
        }
        Ok(options)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub entries: usize,
}

/// Fills the database with generated users and entries in batched transactions.
pub async fn generate(repository: &Repository, options: SeedOptions) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    tracing::info!("Creating {} users...", options.users);
    let names = unique_names(options.users);
    for chunk in names.chunks(options.batch) {
        report.users += repository.bulk_insert_users(chunk.to_vec()).await?;
    }

    let user_ids = repository.all_user_ids().await?;
    if user_ids.is_empty() {
        tracing::warn!("No users available, skipping entries");
        return Ok(report);
    }

    tracing::info!("Creating {} entries...", options.entries);
    let mut remaining = options.entries;
    while remaining > 0 {
        let size = remaining.min(options.batch);
        let batch = random_entries(&user_ids, size);
        report.entries += repository.bulk_insert_entries(batch).await?;
        remaining -= size;
    }

    tracing::info!("Seeded {} users and {} entries", report.users, report.entries);
    Ok(report)
}

fn unique_names(count: usize) -> Vec<String> {
    let mut seen = HashSet::with_capacity(count);
    let mut names = Vec::with_capacity(count);

    while names.len() < count {
        let base: String = Name().fake();

        let mut name = base.clone();
        let mut suffix = 2;
        while seen.contains(&name) {
            name = format!("{} {}", base, suffix);
            suffix += 1;
        }
        seen.insert(name.clone());
        names.push(name);
    }
    names
}

fn random_entries(user_ids: &[i64], count: usize) -> Vec<SeedEntry> {
    let mut rng = rand::thread_rng();
    (0..count)
        .filter_map(|_| {
            let user_id = *user_ids.choose(&mut rng)?;
            Some(SeedEntry {
                user_id,
                subject: Sentence(6..7).fake(),
                message: Paragraph(5..6).fake(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::temp_repository;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn options_from_args() {
        assert_eq!(SeedOptions::from_args(&[]).unwrap(), SeedOptions::default());

        let options = SeedOptions::from_args(&args(&["5", "20"])).unwrap();
        assert_eq!(options.users, 5);
        assert_eq!(options.entries, 20);
        assert_eq!(options.batch, 1000);

        assert!(SeedOptions::from_args(&args(&["many"])).is_err());
        assert!(SeedOptions::from_args(&args(&["1", "1", "0"])).is_err());
    }

    #[test]
    fn generated_names_are_unique() {
        let names = unique_names(2000);
        let distinct: HashSet<&String> = names.iter().collect();
        assert_eq!(distinct.len(), 2000);
    }

    #[test]
    fn generated_subjects_fit_the_column() {
        for entry in random_entries(&[1, 2, 3], 200) {
            assert!(entry.subject.chars().count() <= 255);
            assert!(entry.subject.ends_with('.'));
            assert_eq!(entry.subject.split_whitespace().count(), 6);
            assert!(!entry.message.trim().is_empty());
            assert!([1, 2, 3].contains(&entry.user_id));
        }
    }

    #[tokio::test]
    async fn seeds_in_batches() {
        let (repo, _dir) = temp_repository().await;
        let options = SeedOptions {
            users: 7,
            entries: 25,
            batch: 4,
        };

        let report = generate(&repo, options).await.unwrap();

        assert_eq!(report, SeedReport { users: 7, entries: 25 });
        assert_eq!(repo.count_users().await.unwrap(), 7);
        assert_eq!(repo.count_entries().await.unwrap(), 25);
        let total: u64 = repo
            .user_summaries()
            .await
            .unwrap()
            .iter()
            .map(|s| s.total_entries)
            .sum();
        assert_eq!(total, 25);
    }
}
