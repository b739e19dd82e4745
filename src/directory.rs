use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::DateTime;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://randomuser.me/api/";
pub const DEFAULT_RESULT_COUNT: usize = 1000;

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: Option<String>,
    pub result_count: Option<usize>,
    pub http_client: Option<HttpClient>,
}

/// Job titles assigned to directory entries. The roster source does not
/// carry a role, so each fetched record draws one at random from this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    AccountManager,
    SoftwareEngineer,
    ProductManager,
    SalesExecutive,
    SupportSpecialist,
    MarketingCoordinator,
    OperationsAnalyst,
    FieldTechnician,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::AccountManager,
        Role::SoftwareEngineer,
        Role::ProductManager,
        Role::SalesExecutive,
        Role::SupportSpecialist,
        Role::MarketingCoordinator,
        Role::OperationsAnalyst,
        Role::FieldTechnician,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::AccountManager => "Account Manager",
            Role::SoftwareEngineer => "Software Engineer",
            Role::ProductManager => "Product Manager",
            Role::SalesExecutive => "Sales Executive",
            Role::SupportSpecialist => "Support Specialist",
            Role::MarketingCoordinator => "Marketing Coordinator",
            Role::OperationsAnalyst => "Operations Analyst",
            Role::FieldTechnician => "Field Technician",
        }
    }
}

/// One roster record. All fields are immutable once fetched; `id` is unique
/// within a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub address: String,
    pub avatar_url: String,
    pub dob: String,
    pub gender: String,
    pub phone: String,
    pub email: String,
    pub locality: String,
}

#[derive(Debug)]
pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: String,
    result_count: usize,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("directory client user agent required");
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
            result_count: config.result_count.unwrap_or(DEFAULT_RESULT_COUNT),
        })
    }

    /// Fetches the whole roster in one request. Paging is purely client-side,
    /// so no pagination parameters are sent.
    pub fn fetch_roster(&self) -> Result<Vec<Entity>> {
        let mut url = Url::parse(&self.base_url).context("directory: parse base url")?;
        url.query_pairs_mut()
            .append_pair("results", &self.result_count.to_string());

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .context("directory: fetch roster")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("directory: request failed: {} - {}", status, body));
        }

        let envelope: Envelope = response.json().context("directory: decode roster")?;
        let mut rng = rand::thread_rng();
        Ok(envelope
            .results
            .into_iter()
            .map(|record| record.into_entity(&mut rng))
            .collect())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub results: Vec<Record>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub name: NameRecord,
    #[serde(default)]
    pub location: LocationRecord,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub login: LoginRecord,
    #[serde(default)]
    pub dob: DobRecord,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub picture: PictureRecord,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameRecord {
    #[serde(default)]
    pub first: String,
    #[serde(default)]
    pub last: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationRecord {
    #[serde(default)]
    pub street: StreetRecord,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreetRecord {
    #[serde(default)]
    pub number: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRecord {
    #[serde(default)]
    pub uuid: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DobRecord {
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PictureRecord {
    #[serde(default)]
    pub large: String,
}

impl Record {
    pub fn into_entity<R: Rng>(self, rng: &mut R) -> Entity {
        let role = Role::ALL.choose(rng).copied().unwrap_or_default();
        let address = format!(
            "{} {}, {}, {}",
            self.location.street.number,
            self.location.street.name,
            self.location.city,
            self.location.country
        );
        let locality = format!(
            "{}, {}, {}",
            self.location.city, self.location.state, self.location.country
        );

        Entity {
            id: self.login.uuid,
            name: format!("{} {}", self.name.first, self.name.last),
            role,
            address,
            avatar_url: self.picture.large,
            dob: date_only(&self.dob.date),
            gender: capitalize(&self.gender),
            phone: self.phone,
            email: self.email,
            locality,
        }
    }
}

/// Trims an ISO-8601 timestamp down to its `YYYY-MM-DD` date part. Records
/// with an unparseable timestamp keep the raw string instead of being
/// dropped from the roster.
fn date_only(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(parsed) => parsed.format("%Y-%m-%d").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
