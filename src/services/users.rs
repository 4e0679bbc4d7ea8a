use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::cache::Cache;
use crate::db::Repository;
use crate::error::Result;
use crate::models::UserSummary;

#[derive(Debug, Clone, Serialize)]
pub struct UserListing {
    pub users: Vec<UserSummary>,
}

/// Per-user summaries. The rendered listing is cached whole, per request key,
/// so a response may be up to `listing_ttl` old.
#[derive(Clone)]
pub struct UserService {
    repository: Repository,
    cache: Arc<dyn Cache>,
    listing_ttl: Duration,
}

impl UserService {
    pub fn new(repository: Repository, cache: Arc<dyn Cache>, listing_ttl: Duration) -> Self {
        Self {
            repository,
            cache,
            listing_ttl,
        }
    }

    pub async fn summaries(&self) -> Result<UserListing> {
        let users = self.repository.user_summaries().await?;
        tracing::debug!("Aggregated summaries for {} users", users.len());
        Ok(UserListing { users })
    }

    /// Returns the JSON body for `request_key`, rendering and caching it on a miss.
    pub async fn rendered_listing(&self, request_key: &str) -> Result<String> {
        if let Some(body) = self.cache.get(request_key).await? {
            tracing::debug!("User listing cache hit for {}", request_key);
            return Ok(body);
        }

        let body = serde_json::to_string(&self.summaries().await?)?;
        self.cache
            .set(request_key, body.clone(), self.listing_ttl)
            .await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::models::EntryPayload;
    use crate::test_util::temp_repository;

    const KEY: &str = "GET:/api/v1/users?";

    #[tokio::test]
    async fn summaries_reflect_entries() {
        let (repo, _dir) = temp_repository().await;
        for (subject, message) in [("First Subject", "First Message"), ("Latest Subject", "Latest Message")] {
            repo.create_entry(EntryPayload::new("Test User", subject, message).validate().unwrap())
                .await
                .unwrap();
        }
        let service = UserService::new(repo, Arc::new(InMemoryCache::new()), Duration::from_secs(30));

        let listing = service.summaries().await.unwrap();
        assert_eq!(listing.users.len(), 1);
        assert_eq!(listing.users[0].total_entries, 2);
        assert_eq!(
            listing.users[0].last_entry.as_deref(),
            Some("Latest Subject | Latest Message")
        );
    }

    #[tokio::test]
    async fn rendered_listing_is_cached_until_expiry() {
        let (repo, _dir) = temp_repository().await;
        let service = UserService::new(
            repo.clone(),
            Arc::new(InMemoryCache::new()),
            Duration::from_millis(500),
        );

        let empty = service.rendered_listing(KEY).await.unwrap();
        assert_eq!(empty, r#"{"users":[]}"#);

        repo.create_entry(EntryPayload::new("John Doe", "Hi", "Hello").validate().unwrap())
            .await
            .unwrap();
        assert_eq!(service.rendered_listing(KEY).await.unwrap(), empty);

        // A different request key is a separate cache entry.
        let other = service.rendered_listing("GET:/api/v1/users?x=1").await.unwrap();
        assert!(other.contains("John Doe"));

        tokio::time::sleep(Duration::from_millis(700)).await;
        let fresh: serde_json::Value =
            serde_json::from_str(&service.rendered_listing(KEY).await.unwrap()).unwrap();
        assert_eq!(fresh["users"][0]["username"], "John Doe");
        assert_eq!(fresh["users"][0]["last_entry"], "Hi | Hello");
    }
}
