//! Offline asset cache
//!
//! A named generation of static assets kept in front of an asset source.
//! Installing pre-fetches the configured assets, fetching is cache-first,
//! and activating evicts every generation with a different name.

use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use payme_config::CacheConfig;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq)]
pub struct AssetResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl AssetResponse {
    pub fn ok(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: content_type.to_string(),
            body,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: b"Not Found".to_vec(),
        }
    }

    /// Only successful responses are stored; every source is same-origin
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }
}

#[async_trait]
pub trait AssetSource: Send + Sync {
    /// A missing asset is a 404 response, not an error
    async fn fetch(&self, path: &str) -> CoreResult<AssetResponse>;
}

pub type AssetSourceRef = Arc<dyn AssetSource>;

/// Assets read from a local directory
pub struct DirAssetSource {
    root: PathBuf,
}

impl DirAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl AssetSource for DirAssetSource {
    async fn fetch(&self, path: &str) -> CoreResult<AssetResponse> {
        let Some(relative) = safe_relative(path) else {
            return Ok(AssetResponse::not_found());
        };
        let full = self.root.join(&relative);
        match tokio::fs::read(&full).await {
            Ok(body) => Ok(AssetResponse::ok(content_type_for(path), body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AssetResponse::not_found()),
            Err(e) => Err(CoreError::AssetIo {
                path: full.display().to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// `path` as a relative path that cannot leave the asset root
fn safe_relative(path: &str) -> Option<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    if relative.as_os_str().is_empty() {
        return None;
    }
    if relative.components().all(|c| matches!(c, Component::Normal(_))) {
        Some(relative.to_path_buf())
    } else {
        None
    }
}

pub fn content_type_for(path: &str) -> &'static str {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") | Some("webmanifest") => "application/manifest+json",
        Some("html") => "text/html; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

fn cache_key(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

/// Every cache generation, keyed by cache name
#[derive(Clone, Default)]
pub struct CacheStorage {
    generations: Arc<RwLock<HashMap<String, HashMap<String, AssetResponse>>>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation names, sorted
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.generations.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn get(&self, name: &str, path: &str) -> Option<AssetResponse> {
        self.generations
            .read()
            .await
            .get(name)
            .and_then(|entries| entries.get(&cache_key(path)))
            .cloned()
    }

    pub async fn put(&self, name: &str, path: &str, response: AssetResponse) {
        self.generations
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .insert(cache_key(path), response);
    }

    pub async fn delete(&self, name: &str) -> bool {
        self.generations.write().await.remove(name).is_some()
    }

    pub async fn len(&self, name: &str) -> usize {
        self.generations.read().await.get(name).map_or(0, HashMap::len)
    }
}

pub struct AssetCache {
    name: String,
    assets: Vec<String>,
    storage: CacheStorage,
}

impl AssetCache {
    pub fn new(name: impl Into<String>, assets: Vec<String>, storage: CacheStorage) -> Self {
        Self {
            name: name.into(),
            assets,
            storage,
        }
    }

    pub fn from_config(config: &CacheConfig, storage: CacheStorage) -> Self {
        Self::new(config.name.clone(), config.assets.clone(), storage)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// Pre-cache every configured asset.
    ///
    /// All assets are fetched before anything is stored, so a failing asset
    /// leaves the generation untouched.
    pub async fn install(&self, source: &dyn AssetSource) -> CoreResult<usize> {
        let mut fetched = Vec::with_capacity(self.assets.len());
        for path in &self.assets {
            let response = source.fetch(path).await?;
            if response.status != 200 {
                return Err(CoreError::AssetNotFound { path: path.clone() });
            }
            fetched.push((path, response));
        }
        let count = fetched.len();
        for (path, response) in fetched {
            self.storage.put(&self.name, path, response).await;
        }
        log::info!("Installed {} assets into cache {}", count, self.name);
        Ok(count)
    }

    /// Cache-first lookup; misses go to `source`
    pub async fn fetch(&self, path: &str, source: &dyn AssetSource) -> CoreResult<AssetResponse> {
        if let Some(hit) = self.storage.get(&self.name, path).await {
            log::trace!("Cache hit {}", path);
            return Ok(hit);
        }
        let response = source.fetch(path).await?;
        if response.is_cacheable() {
            self.storage.put(&self.name, path, response.clone()).await;
        }
        Ok(response)
    }

    /// Delete every generation except the current one; returns the deleted names
    pub async fn activate(&self) -> Vec<String> {
        let mut deleted = Vec::new();
        for name in self.storage.names().await {
            if name != self.name && self.storage.delete(&name).await {
                log::info!("Deleting old cache {}", name);
                deleted.push(name);
            }
        }
        deleted
    }
}
