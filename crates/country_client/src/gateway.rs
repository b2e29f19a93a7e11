//! Read-only queries against the REST Countries API.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::{Client, StatusCode};
use shared::{
    domain::{CountryCode, Region, SmallCountry},
    error::ErrorCode,
    protocol::{decode_country, decode_country_list, COUNTRY_FIELDS},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://restcountries.com/v3.1";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with {status}")]
    Status { url: String, status: StatusCode },
    #[error("unexpected payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl GatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::InvalidBaseUrl { .. } | GatewayError::Transport { .. } => {
                ErrorCode::Transport
            }
            GatewayError::Status { .. } => ErrorCode::Status,
            GatewayError::Decode { .. } => ErrorCode::Decode,
        }
    }
}

#[async_trait]
pub trait CountryGateway: Send + Sync {
    /// One request for every country in `region`.
    async fn countries_in_region(&self, region: Region) -> Result<Vec<SmallCountry>, GatewayError>;

    async fn country_by_alpha_code(&self, code: &CountryCode)
        -> Result<SmallCountry, GatewayError>;

    /// An empty region resolves to an empty list without touching the network.
    async fn countries_by_region(
        &self,
        region: Option<Region>,
    ) -> Result<Vec<SmallCountry>, GatewayError> {
        match region {
            Some(region) => self.countries_in_region(region).await,
            None => Ok(Vec::new()),
        }
    }

    /// Looks every code up concurrently. The result follows the order of
    /// `codes`; the first failure fails the whole lookup.
    async fn country_borders_by_codes(
        &self,
        codes: &[CountryCode],
    ) -> Result<Vec<SmallCountry>, GatewayError> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        try_join_all(codes.iter().map(|code| self.country_by_alpha_code(code))).await
    }
}

#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            user_agent: None,
        }
    }
}

pub struct RestCountriesGateway {
    http: Client,
    base_url: Url,
}

impl RestCountriesGateway {
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        Self::with_options(GatewayOptions {
            base_url: base_url.to_string(),
            ..GatewayOptions::default()
        })
    }

    pub fn with_options(options: GatewayOptions) -> Result<Self, GatewayError> {
        let base_url = parse_base_url(&options.base_url)?;

        let mut builder = Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = options.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let http = builder.build().map_err(|source| GatewayError::Transport {
            url: options.base_url.clone(),
            source,
        })?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot-be-a-base urls are rejected in parse_base_url
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.set_query(Some(&format!("fields={COUNTRY_FIELDS}")));
        url
    }

    async fn get_decoded<T>(
        &self,
        url: Url,
        decode: fn(&[u8]) -> Result<T, serde_json::Error>,
    ) -> Result<T, GatewayError> {
        debug!(%url, "requesting country data");
        let res = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| GatewayError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = res.bytes().await.map_err(|source| GatewayError::Transport {
            url: url.to_string(),
            source,
        })?;
        decode(&body).map_err(|source| GatewayError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl CountryGateway for RestCountriesGateway {
    async fn countries_in_region(&self, region: Region) -> Result<Vec<SmallCountry>, GatewayError> {
        let url = self.endpoint(&["region", region.as_path_segment()]);
        self.get_decoded(url, decode_country_list).await
    }

    async fn country_by_alpha_code(
        &self,
        code: &CountryCode,
    ) -> Result<SmallCountry, GatewayError> {
        let url = self.endpoint(&["alpha", code.as_str()]);
        self.get_decoded(url, decode_country).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, GatewayError> {
    let url = Url::parse(raw.trim()).map_err(|err| GatewayError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(GatewayError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: "url cannot carry path segments".to_string(),
        });
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
