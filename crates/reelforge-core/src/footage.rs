use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::task::JoinSet;

use crate::cache::{FootageCache, cache_key};
use crate::error::{ReelforgeError, Result};
use crate::types::{FootageAsset, Segment};

/// Pexels videos API.
const PEXELS_BASE_URL: &str = "https://api.pexels.com";
pub const PEXELS_KEY_ENV: &str = "PEXELS_API_KEY";

/// Generic, topic-agnostic search phrases. Segments consume these in
/// rotation instead of deriving keywords from the script, which keeps the
/// footage visually consistent across a video.
pub const GENERIC_QUERIES: [&str; 7] = [
    "technology abstract",
    "data visualization",
    "coding screen",
    "futuristic city",
    "neon lights",
    "server room",
    "circuit board close up",
];

#[derive(Debug, Clone, Deserialize)]
pub struct FootageFile {
    #[serde(alias = "link")]
    pub url: String,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct FootageHit {
    pub id: String,
    pub files: Vec<FootageFile>,
}

/// Seam over the stock-footage service so the selector and cache can be
/// exercised without the network.
#[async_trait]
pub trait FootageProvider: Send + Sync {
    async fn search(&self, query: &str, count: u32, orientation: &str) -> Result<Vec<FootageHit>>;
    async fn download(&self, url: &str, dest: &std::path::Path) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct PexelsSearchResponse {
    #[serde(default)]
    videos: Vec<PexelsVideo>,
}

#[derive(Debug, Deserialize)]
struct PexelsVideo {
    id: u64,
    #[serde(default)]
    video_files: Vec<FootageFile>,
}

pub struct PexelsClient {
    api_key: Option<String>,
    client: reqwest::Client,
}

impl PexelsClient {
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var(PEXELS_KEY_ENV).ok())
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl FootageProvider for PexelsClient {
    async fn search(&self, query: &str, count: u32, orientation: &str) -> Result<Vec<FootageHit>> {
        let Some(key) = &self.api_key else {
            // No key configured: behave as "nothing found" rather than fail.
            return Ok(Vec::new());
        };

        let response = self
            .client
            .get(format!("{PEXELS_BASE_URL}/videos/search"))
            .header("Authorization", key)
            .query(&[
                ("query", query),
                ("per_page", &count.to_string()),
                ("orientation", orientation),
                ("size", "medium"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ReelforgeError::FootageUnavailable {
                query: query.to_string(),
                reason: format!("provider returned {}", response.status()),
            });
        }

        let parsed: PexelsSearchResponse = response.json().await?;
        Ok(parsed
            .videos
            .into_iter()
            .map(|v| FootageHit {
                id: v.id.to_string(),
                files: v.video_files,
            })
            .collect())
    }

    async fn download(&self, url: &str, dest: &std::path::Path) -> Result<()> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }
}

/// Prefer a full-HD file, fall back to any HD file, else skip the hit.
pub fn best_file(hit: &FootageHit) -> Option<&FootageFile> {
    let is_hd = |f: &&FootageFile| f.quality.as_deref() == Some("hd");
    hit.files
        .iter()
        .filter(is_hd)
        .find(|f| f.width >= 1920)
        .or_else(|| hit.files.iter().find(is_hd))
}

/// Assign one rotation query per segment, cycling when exhausted.
pub fn assign_queries(segments: &[Segment]) -> Vec<String> {
    segments
        .iter()
        .enumerate()
        .map(|(i, _)| GENERIC_QUERIES[i % GENERIC_QUERIES.len()].to_string())
        .collect()
}

/// Fetch one asset per query, concurrently, resolving through the cache.
///
/// Every failure mode (no key, no results, HTTP error, download error) maps
/// to `None` for that slot; footage problems never abort a build.
pub async fn fetch_assets(
    provider: Arc<dyn FootageProvider>,
    cache: Arc<FootageCache>,
    queries: &[String],
) -> Vec<Option<FootageAsset>> {
    let mut tasks = JoinSet::new();
    for (slot, query) in queries.iter().cloned().enumerate() {
        let provider = Arc::clone(&provider);
        let cache = Arc::clone(&cache);
        tasks.spawn(async move { (slot, fetch_one(provider, cache, query).await) });
    }

    let mut assets: Vec<Option<FootageAsset>> = vec![None; queries.len()];
    while let Some(joined) = tasks.join_next().await {
        if let Ok((slot, asset)) = joined {
            assets[slot] = asset;
        }
    }
    assets
}

async fn fetch_one(
    provider: Arc<dyn FootageProvider>,
    cache: Arc<FootageCache>,
    query: String,
) -> Option<FootageAsset> {
    let hits = match provider.search(&query, 1, "portrait").await {
        Ok(hits) => hits,
        Err(err) => {
            tracing::debug!(%query, %err, "footage search failed, using fallback background");
            return None;
        }
    };
    let hit = hits.first()?;
    let file = best_file(hit)?;

    let key = cache_key(&file.url);
    if let Some(path) = cache.lookup(&key).await {
        return Some(FootageAsset {
            local_path: path,
            source_query: query,
            cache_key: key,
        });
    }

    let dest = cache.entry_path(&hit.id, &key);
    if let Err(err) = provider.download(&file.url, &dest).await {
        tracing::debug!(%query, %err, "footage download failed, using fallback background");
        return None;
    }
    if let Err(err) = cache.insert(&key, &dest).await {
        tracing::debug!(%err, "failed to persist cache index entry");
    }

    Some(FootageAsset {
        local_path: dest,
        source_query: query,
        cache_key: key,
    })
}
