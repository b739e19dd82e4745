use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::directory::{self, Entity, Role};
use crate::photos::{self, PhotoRequest};

pub trait RosterService: Send + Sync {
    fn fetch_roster(&self) -> Result<Vec<Entity>>;
}

pub trait PhotoService: Send + Sync {
    fn fetch_photo(&self, request: &PhotoRequest) -> Result<String>;
}

pub struct HttpRosterService {
    client: Arc<directory::Client>,
}

impl HttpRosterService {
    pub fn new(client: Arc<directory::Client>) -> Self {
        Self { client }
    }
}

impl RosterService for HttpRosterService {
    fn fetch_roster(&self) -> Result<Vec<Entity>> {
        self.client.fetch_roster().context("fetch roster")
    }
}

pub struct HttpPhotoService {
    client: Arc<photos::Client>,
}

impl HttpPhotoService {
    pub fn new(client: Arc<photos::Client>) -> Self {
        Self { client }
    }
}

impl PhotoService for HttpPhotoService {
    fn fetch_photo(&self, request: &PhotoRequest) -> Result<String> {
        self.client.fetch(request).context("fetch photo")
    }
}

/// In-memory roster for offline use and tests. Counts calls so tests can
/// assert that a reload issues exactly one fetch.
pub struct MockRosterService {
    entities: Vec<Entity>,
    error: Option<String>,
    calls: Mutex<usize>,
}

impl MockRosterService {
    pub fn with_entities(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            error: None,
            calls: Mutex::new(0),
        }
    }

    pub fn sized(count: usize) -> Self {
        Self::with_entities((0..count).map(sample_entity).collect())
    }

    pub fn failing(message: &str) -> Self {
        Self {
            entities: Vec::new(),
            error: Some(message.to_string()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl RosterService for MockRosterService {
    fn fetch_roster(&self) -> Result<Vec<Entity>> {
        *self.calls.lock() += 1;
        match &self.error {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(self.entities.clone()),
        }
    }
}

/// Photo service that answers immediately with a deterministic URL and
/// records every request it saw.
#[derive(Default)]
pub struct MockPhotoService {
    requests: Mutex<Vec<PhotoRequest>>,
    fail: bool,
}

impl MockPhotoService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn requests(&self) -> Vec<PhotoRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl PhotoService for MockPhotoService {
    fn fetch_photo(&self, request: &PhotoRequest) -> Result<String> {
        self.requests.lock().push(*request);
        if self.fail {
            return Err(anyhow!("mock photo service offline"));
        }
        Ok(format!(
            "mock://photo/{}x{}?random={}",
            request.width, request.height, request.seed
        ))
    }
}

pub fn sample_entity(index: usize) -> Entity {
    let role = Role::ALL[index % Role::ALL.len()];
    Entity {
        id: format!("entity-{index}"),
        name: format!("Person {index}"),
        role,
        address: format!("{index} Sample Street, Springfield, USA"),
        avatar_url: format!("https://example.com/portraits/{index}.jpg"),
        dob: "1990-01-01".to_string(),
        gender: "Female".to_string(),
        phone: format!("555-01{index:02}"),
        email: format!("person{index}@example.com"),
        locality: "Springfield, Illinois, USA".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_roster_counts_calls() {
        let service = MockRosterService::sized(3);
        assert_eq!(service.calls(), 0);
        let roster = service.fetch_roster().unwrap();
        assert_eq!(roster.len(), 3);
        assert_eq!(service.calls(), 1);
    }

    #[test]
    fn mock_roster_failure_surfaces_message() {
        let service = MockRosterService::failing("roster source down");
        let err = service.fetch_roster().unwrap_err();
        assert!(err.to_string().contains("roster source down"));
        assert_eq!(service.calls(), 1);
    }

    #[test]
    fn mock_photos_record_requests() {
        let service = MockPhotoService::new();
        let request = PhotoRequest {
            width: 600,
            height: 400,
            seed: 7,
        };
        let url = service.fetch_photo(&request).unwrap();
        assert_eq!(url, "mock://photo/600x400?random=7");
        assert_eq!(service.requests(), vec![request]);
    }

    #[test]
    fn sample_entities_have_unique_ids() {
        let a = sample_entity(0);
        let b = sample_entity(1);
        assert_ne!(a.id, b.id);
    }
}
