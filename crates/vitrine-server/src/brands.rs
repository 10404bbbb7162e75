//! Brand lookup against the logo.dev API plus dominant-color extraction.
//!
//! All upstream traffic goes through the [`LogoUpstream`] trait so handler and
//! simulation tests can swap in [`FakeLogoUpstream`] without network access.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;
use vitrine_api::BrandSearchResult;

use crate::config::ApiConfig;

/// Fallback when color extraction yields nothing usable.
pub const DEFAULT_BRAND_COLOR: &str = "#000000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrandError {
    /// Logo API keys are absent from the runtime config.
    NotConfigured,
    Upstream(String),
    /// The fetched resource did not carry an image content type.
    NotAnImage(String),
}

impl Display for BrandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BrandError::NotConfigured => write!(f, "logo API keys are not configured"),
            BrandError::Upstream(msg) => write!(f, "logo upstream error: {msg}"),
            BrandError::NotAnImage(ct) => write!(f, "not an image content type: {ct}"),
        }
    }
}

impl std::error::Error for BrandError {}

/// One search hit as the logo API reports it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamBrand {
    pub name: Option<String>,
    pub domain: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait LogoUpstream: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<UpstreamBrand>, BrandError>;
    async fn fetch_image(&self, url: &str) -> Result<FetchedImage, BrandError>;
}

pub struct HttpLogoUpstream {
    client: reqwest::Client,
    search_url: String,
    secret_key: Option<String>,
}

impl HttpLogoUpstream {
    #[must_use]
    pub fn from_config(api: &ApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(api.upstream_timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            search_url: api.logo_search_url.clone(),
            secret_key: api.logo_secret_key.clone(),
        }
    }
}

#[async_trait]
impl LogoUpstream for HttpLogoUpstream {
    async fn search(&self, query: &str) -> Result<Vec<UpstreamBrand>, BrandError> {
        let Some(secret) = self.secret_key.as_deref() else {
            return Err(BrandError::NotConfigured);
        };
        let response = self
            .client
            .get(&self.search_url)
            .query(&[("q", query)])
            .bearer_auth(secret)
            .send()
            .await
            .map_err(|e| BrandError::Upstream(e.to_string()))?;
        if !response.status().is_success() {
            return Err(BrandError::Upstream(format!(
                "search returned status {}",
                response.status()
            )));
        }
        response
            .json::<Vec<UpstreamBrand>>()
            .await
            .map_err(|e| BrandError::Upstream(format!("search body decode: {e}")))
    }

    async fn fetch_image(&self, url: &str) -> Result<FetchedImage, BrandError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BrandError::Upstream(e.to_string()))?;
        if !response.status().is_success() {
            return Err(BrandError::Upstream(format!(
                "image fetch returned status {}",
                response.status()
            )));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(BrandError::NotAnImage(content_type));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BrandError::Upstream(format!("image body read: {e}")))?;
        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// In-memory stand-in for the logo API, keyed by query and image URL.
#[derive(Default)]
pub struct FakeLogoUpstream {
    searches: Mutex<HashMap<String, Vec<UpstreamBrand>>>,
    images: Mutex<HashMap<String, FetchedImage>>,
}

impl FakeLogoUpstream {
    pub fn put_search(&self, query: &str, hits: Vec<UpstreamBrand>) {
        if let Ok(mut map) = self.searches.lock() {
            map.insert(query.to_string(), hits);
        }
    }

    pub fn put_image(&self, url: &str, bytes: Vec<u8>, content_type: &str) {
        if let Ok(mut map) = self.images.lock() {
            map.insert(
                url.to_string(),
                FetchedImage {
                    bytes,
                    content_type: content_type.to_string(),
                },
            );
        }
    }
}

#[async_trait]
impl LogoUpstream for FakeLogoUpstream {
    async fn search(&self, query: &str) -> Result<Vec<UpstreamBrand>, BrandError> {
        let map = self
            .searches
            .lock()
            .map_err(|_| BrandError::Upstream("fake search lock poisoned".to_string()))?;
        Ok(map.get(query).cloned().unwrap_or_default())
    }

    async fn fetch_image(&self, url: &str) -> Result<FetchedImage, BrandError> {
        let map = self
            .images
            .lock()
            .map_err(|_| BrandError::Upstream("fake image lock poisoned".to_string()))?;
        match map.get(url) {
            Some(image) if image.content_type.starts_with("image/") => Ok(image.clone()),
            Some(image) => Err(BrandError::NotAnImage(image.content_type.clone())),
            None => Err(BrandError::Upstream(format!("no fake image for {url}"))),
        }
    }
}

/// Composes search results: direct logo URL, dominant color, proxied URL.
pub struct BrandClient {
    upstream: std::sync::Arc<dyn LogoUpstream>,
    image_base_url: String,
    public_key: Option<String>,
    public_base_url: String,
}

impl BrandClient {
    #[must_use]
    pub fn new(upstream: std::sync::Arc<dyn LogoUpstream>, api: &ApiConfig) -> Self {
        Self {
            upstream,
            image_base_url: api.logo_image_base_url.trim_end_matches('/').to_string(),
            public_key: api.logo_public_key.clone(),
            public_base_url: api.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn configured(&self) -> bool {
        self.public_key.is_some()
    }

    fn direct_logo_url(&self, domain: &str) -> Option<String> {
        let key = self.public_key.as_deref()?;
        Some(format!("{}/{domain}?token={key}", self.image_base_url))
    }

    fn proxied_logo_url(&self, direct: &str) -> String {
        format!(
            "{}/api/proxy-image?url={}",
            self.public_base_url,
            urlencoding::encode(direct)
        )
    }

    /// Searches the upstream and enriches each hit that has a domain with a
    /// proxied logo URL and a dominant color sampled from the logo image.
    pub async fn search(&self, query: &str) -> Result<Vec<BrandSearchResult>, BrandError> {
        if !self.configured() {
            return Err(BrandError::NotConfigured);
        }
        let hits = self.upstream.search(query).await?;
        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(domain) = hit.domain.filter(|d| !d.trim().is_empty()) else {
                continue;
            };
            let Some(direct) = self.direct_logo_url(&domain) else {
                continue;
            };
            let primary_color = match self.upstream.fetch_image(&direct).await {
                Ok(image) => {
                    dominant_color_hex(&image.bytes).unwrap_or_else(|| DEFAULT_BRAND_COLOR.into())
                }
                Err(err) => {
                    tracing::debug!(domain = %domain, error = %err, "logo fetch failed, using fallback color");
                    DEFAULT_BRAND_COLOR.to_string()
                }
            };
            results.push(BrandSearchResult {
                name: hit.name.unwrap_or_else(|| domain.clone()),
                domain,
                logo_url: self.proxied_logo_url(&direct),
                primary_color,
            });
        }
        Ok(results)
    }

    pub async fn fetch_image(&self, url: &str) -> Result<FetchedImage, BrandError> {
        self.upstream.fetch_image(url).await
    }
}

/// Extracts the most common color bucket from encoded image bytes.
///
/// Pixels are quantized into 4-bit-per-channel buckets and the mean color of
/// the largest bucket wins. Returns `None` when the bytes do not decode.
#[must_use]
pub fn dominant_color_hex(bytes: &[u8]) -> Option<String> {
    let decoded = image::load_from_memory(bytes).ok()?;
    let rgb = decoded.to_rgb8();
    if rgb.pixels().len() == 0 {
        return None;
    }

    let mut buckets: HashMap<(u8, u8, u8), (u64, u64, u64, u64)> = HashMap::new();
    for pixel in rgb.pixels() {
        let [r, g, b] = pixel.0;
        let entry = buckets
            .entry((r >> 4, g >> 4, b >> 4))
            .or_insert((0, 0, 0, 0));
        entry.0 += 1;
        entry.1 += u64::from(r);
        entry.2 += u64::from(g);
        entry.3 += u64::from(b);
    }

    let (count, sr, sg, sb) = buckets.into_values().max_by_key(|e| e.0)?;
    if count == 0 {
        return None;
    }
    Some(format!(
        "#{:02X}{:02X}{:02X}",
        sr / count,
        sg / count,
        sb / count
    ))
}
