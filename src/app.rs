use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config;
use crate::data::{HttpPhotoService, HttpRosterService};
use crate::directory;
use crate::photos;
use crate::portal::{Options, Portal};

/// Loads configuration and builds a portal wired to the remote
/// collaborators. The host shell drives the returned portal: `reload` to
/// fetch, `poll` on its event loop, `snapshot`/`subscribe` to render.
pub fn open() -> Result<Portal> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    open_with(cfg)
}

pub fn open_with(cfg: config::Config) -> Result<Portal> {
    let roster_client = directory::Client::new(directory::ClientConfig {
        user_agent: cfg.directory.user_agent.clone(),
        base_url: Some(cfg.directory.base_url.clone()),
        result_count: Some(cfg.directory.result_count),
        http_client: None,
    })
    .context("init directory client")?;

    let photo_client = photos::Client::new(photos::ClientConfig {
        user_agent: cfg.directory.user_agent.clone(),
        base_url: Some(cfg.gallery.base_url.clone()),
        http_client: None,
    })
    .context("init photo client")?;

    Ok(Portal::new(Options {
        roster_service: Arc::new(HttpRosterService::new(Arc::new(roster_client))),
        photo_service: Arc::new(HttpPhotoService::new(Arc::new(photo_client))),
        config: cfg,
    }))
}
