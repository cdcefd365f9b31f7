use std::future::Future;

use anyhow::Context;
use thiserror::Error;
use tracing::{debug, warn};

use crate::user::UserRecord;

pub const DEFAULT_USERS_URL: &str = "https://jsonplaceholder.typicode.com/users";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed requesting {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed decoding user list from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Remote collection of user records, fetched whole.
pub trait UserSource {
    fn fetch_users(&self) -> impl Future<Output = Result<Vec<UserRecord>, FetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpUserSource {
    client: reqwest::Client,
    url: String,
}

impl HttpUserSource {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed building HTTP client for user directory")?;
        Ok(Self { client, url: url.trim().to_string() })
    }
}

impl UserSource for HttpUserSource {
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn fetch_users(&self) -> Result<Vec<UserRecord>, FetchError> {
        let response = self
            .client
            .get(self.url.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| FetchError::Transport { url: self.url.clone(), source })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "user directory returned non-success status");
            return Err(FetchError::Status { url: self.url.clone(), status: status.as_u16() });
        }

        let users = response
            .json::<Vec<UserRecord>>()
            .await
            .map_err(|source| FetchError::Decode { url: self.url.clone(), source })?;
        debug!(count = users.len(), "fetched users");
        Ok(users)
    }
}
