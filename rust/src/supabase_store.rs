use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::env;
use std::time::Duration;

use crate::error::StoreError;
use crate::idea_store::{stored_idea_from_value, IdeaRecord, IdeaStore, StoredIdea};

const IDEAS_TABLE: &str = "ideas";

/// Idea store backed by a hosted `ideas` table behind a PostgREST endpoint.
/// Reads use the read-scoped key, inserts the write-scoped key.
pub struct SupabaseIdeaStore {
    client: Client,
    base_url: String,
    read_key: String,
    write_key: String,
    timeout: Duration,
}

impl SupabaseIdeaStore {
    pub fn new(
        base_url: impl Into<String>,
        read_key: impl Into<String>,
        write_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            read_key: read_key.into(),
            write_key: write_key.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn from_env(timeout_secs: u64) -> Result<Self> {
        let url = required_env("SUPABASE_URL")?;
        let read_key = required_env("SUPABASE_ANON_KEY")?;
        let write_key = required_env("SUPABASE_SERVICE_ROLE_KEY")?;
        Ok(Self::new(url, read_key, write_key, timeout_secs))
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, IDEAS_TABLE)
    }
}

#[async_trait]
impl IdeaStore for SupabaseIdeaStore {
    async fn append(&self, record: &IdeaRecord) -> Result<(), StoreError> {
        let mut row = StoredIdea::from(record);
        row.id = None;

        let resp = self
            .client
            .post(self.table_url())
            .header("apikey", &self.write_key)
            .bearer_auth(&self.write_key)
            .header("Prefer", "return=minimal")
            .timeout(self.timeout)
            .json(&[row])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Remote { status, body });
        }
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<IdeaRecord>, StoreError> {
        let resp = self
            .client
            .get(self.table_url())
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .header("apikey", &self.read_key)
            .bearer_auth(&self.read_key)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(StoreError::Remote { status, body: text });
        }

        parse_rows(&text)
    }
}

fn parse_rows(raw: &str) -> Result<Vec<IdeaRecord>, StoreError> {
    let rows: Vec<Value> = serde_json::from_str(raw)?;
    Ok(rows
        .into_iter()
        .filter_map(stored_idea_from_value)
        .map(IdeaRecord::from)
        .collect())
}

fn required_env(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{name} env var is not set"))
}
