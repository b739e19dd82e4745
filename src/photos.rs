use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://picsum.photos";

/// Span of the randomizing token appended to each photo request. The image
/// source serves a different picture per token, which is what makes the
/// periodic refresh visibly rotate the gallery.
pub const RANDOM_SEED_SPAN: u32 = 1000;

/// Requested image dimensions, derived from the host viewport width at the
/// moment a fetch fires rather than cached at loop start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeTier {
    Small,
    Medium,
    Large,
}

impl SizeTier {
    pub fn for_viewport(width: u32) -> Self {
        if width < 640 {
            SizeTier::Small
        } else if width < 1024 {
            SizeTier::Medium
        } else {
            SizeTier::Large
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            SizeTier::Small => (600, 400),
            SizeTier::Medium => (900, 600),
            SizeTier::Large => (1200, 800),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoRequest {
    pub width: u32,
    pub height: u32,
    pub seed: u32,
}

impl PhotoRequest {
    pub fn for_tier(tier: SizeTier, seed: u32) -> Self {
        let (width, height) = tier.dimensions();
        Self {
            width,
            height,
            seed,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: Option<String>,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug)]
pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("photo client user agent required");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(Duration::from_secs(20))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    /// Issues one image request and hands back the fetched URL for the host
    /// to render. The image source has no batching API; callers fan out one
    /// call per gallery slot.
    pub fn fetch(&self, request: &PhotoRequest) -> Result<String> {
        let url = self.build_url(request)?;

        let response = self
            .http
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .send()
            .context("photos: fetch image")?;

        if !response.status().is_success() {
            return Err(anyhow!("photos: request failed: {}", response.status()));
        }

        Ok(url.into())
    }

    fn build_url(&self, request: &PhotoRequest) -> Result<Url> {
        let base = Url::parse(&self.base_url).context("photos: parse base url")?;
        let mut url = base
            .join(&format!("{}/{}", request.width, request.height))
            .context("photos: build image url")?;
        url.query_pairs_mut()
            .append_pair("random", &request.seed.to_string());
        Ok(url)
    }
}
