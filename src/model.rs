//! Country document model.
//!
//! [`Country`] is what the mapper produces from upstream data; the store
//! wraps it in a [`StoredCountry`] carrying the generated id and timestamps.
//! Both serialize with camelCase field names, flattened into one object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A currency used by a country.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub name: String,
    pub symbol: String,
}

/// Flag image links.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Flags {
    #[serde(default)]
    pub png: String,
    #[serde(default)]
    pub svg: String,
}

/// Map links.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Maps {
    #[serde(default)]
    pub google_maps: String,
    #[serde(default)]
    pub open_street_maps: String,
}

/// Internal representation of a country.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub name: String,
    pub region: String,
    #[serde(default)]
    pub currencies: Vec<Currency>,
    #[serde(default)]
    pub capital: Vec<String>,
    #[serde(default)]
    pub continents: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    /// Latitude and longitude.
    #[serde(default)]
    pub location: Vec<f64>,
    #[serde(default)]
    pub flag: String,
    #[serde(default)]
    pub flags: Flags,
    #[serde(default)]
    pub maps: Maps,
    pub population: u64,
    pub area: f64,
    #[serde(default)]
    pub timezones: Vec<String>,
}

/// A country as persisted in the document store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCountry {
    pub id: String,
    #[serde(flatten)]
    pub country: Country,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredCountry {
    /// Wrap a freshly mapped country with a new UUIDv7 id and timestamps.
    pub fn new(country: Country) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            country,
            created_at: now,
            updated_at: now,
        }
    }
}

impl std::ops::Deref for StoredCountry {
    type Target = Country;

    fn deref(&self) -> &Country {
        &self.country
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_country_serializes_camel_case() {
        let country = Country {
            name: "Ghana".to_string(),
            region: "Africa".to_string(),
            maps: Maps {
                google_maps: "https://goo.gl/maps/x".to_string(),
                open_street_maps: "https://osm.org/x".to_string(),
            },
            population: 31_072_945,
            area: 238_533.0,
            ..Country::default()
        };

        let value = serde_json::to_value(&country).expect("Failed to serialize");
        assert_eq!(value["maps"]["googleMaps"], json!("https://goo.gl/maps/x"));
        assert_eq!(value["maps"]["openStreetMaps"], json!("https://osm.org/x"));
        assert_eq!(value["population"], json!(31_072_945));
    }

    #[test]
    fn test_stored_country_flattens_fields() {
        let stored = StoredCountry::new(Country {
            name: "Togo".to_string(),
            region: "Africa".to_string(),
            population: 8_278_737,
            area: 56_785.0,
            ..Country::default()
        });

        let value = serde_json::to_value(&stored).expect("Failed to serialize");
        assert_eq!(value["name"], json!("Togo"));
        assert!(value["id"].is_string());
        assert!(value["createdAt"].is_string());

        let back: StoredCountry = serde_json::from_value(value).expect("Failed to deserialize");
        assert_eq!(back, stored);
    }

    #[test]
    fn test_stored_country_derefs_to_country() {
        let stored = StoredCountry::new(Country {
            name: "Benin".to_string(),
            ..Country::default()
        });
        assert_eq!(stored.name, "Benin");
    }
}
