//! JSON API over the entry and user services.

mod entries;
mod error;
mod users;

use std::sync::Arc;

use axum::http::Uri;
use axum::routing::get;
use axum::Router;
use url::Url;

use crate::cache::Cache;
use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::services::{EntryService, UserService};

pub struct AppState {
    pub entries: EntryService,
    pub users: UserService,
    public_url: Url,
}

impl AppState {
    pub fn new(config: &Config, repository: Repository, cache: Arc<dyn Cache>) -> Result<Self> {
        let public_url = Url::parse(&config.public_url)
            .map_err(|e| AppError::Config(format!("invalid public_url: {}", e)))?;

        Ok(Self {
            entries: EntryService::new(
                repository.clone(),
                cache.clone(),
                config.page_size,
                config.entry_count_ttl(),
            ),
            users: UserService::new(repository, cache, config.user_list_ttl()),
            public_url,
        })
    }

    /// Absolute URL of the current request, used for pagination links.
    fn request_url(&self, uri: &Uri) -> Url {
        let mut url = self.public_url.clone();
        url.set_path(uri.path());
        url.set_query(uri.query());
        url
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/entries",
            get(entries::list_entries).post(entries::create_entry),
        )
        .route(
            "/api/v1/entries/",
            get(entries::list_entries).post(entries::create_entry),
        )
        .route("/api/v1/users", get(users::list_users))
        .route("/api/v1/users/", get(users::list_users))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
