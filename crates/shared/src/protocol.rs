//! Wire shapes served by the country-data API and their projection.

use serde::{Deserialize, Serialize};

use crate::domain::{CountryCode, SmallCountry};

/// Fields requested from the API; everything else in a record is ignored.
pub const COUNTRY_FIELDS: &str = "cca3,name,borders";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCountryName {
    pub common: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCountry {
    pub name: RawCountryName,
    pub cca3: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borders: Option<Vec<String>>,
}

impl From<RawCountry> for SmallCountry {
    fn from(raw: RawCountry) -> Self {
        Self {
            name: raw.name.common,
            cca3: CountryCode(raw.cca3),
            borders: raw
                .borders
                .unwrap_or_default()
                .into_iter()
                .map(CountryCode)
                .collect(),
        }
    }
}

pub fn decode_country_list(body: &[u8]) -> Result<Vec<SmallCountry>, serde_json::Error> {
    let raw: Vec<RawCountry> = serde_json::from_slice(body)?;
    Ok(raw.into_iter().map(SmallCountry::from).collect())
}

pub fn decode_country(body: &[u8]) -> Result<SmallCountry, serde_json::Error> {
    let raw: RawCountry = serde_json::from_slice(body)?;
    Ok(raw.into())
}
