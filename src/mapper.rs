//! Upstream record mapping.
//!
//! Decodes REST Countries records into [`Country`] through typed serde
//! structs. Keyed upstream maps (`currencies`, `languages`) are flattened in
//! the order their keys appear in the payload.

use crate::error::{Error, Result};
use crate::model::{Country, Currency, Flags, Maps};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::marker::PhantomData;

#[derive(Deserialize)]
struct RawName {
    common: String,
}

#[derive(Deserialize, Default)]
struct RawCurrency {
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
}

#[derive(Deserialize)]
struct RawCountry {
    name: RawName,
    region: String,
    #[serde(default, deserialize_with = "ordered_entries")]
    currencies: Vec<(String, RawCurrency)>,
    #[serde(default, deserialize_with = "nullable")]
    capital: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    continents: Vec<String>,
    #[serde(default, deserialize_with = "ordered_entries")]
    languages: Vec<(String, String)>,
    #[serde(default, deserialize_with = "nullable")]
    latlng: Vec<f64>,
    #[serde(default, deserialize_with = "nullable")]
    flag: String,
    #[serde(default, deserialize_with = "nullable")]
    flags: Flags,
    #[serde(default, deserialize_with = "nullable")]
    maps: Maps,
    population: u64,
    area: f64,
    #[serde(default, deserialize_with = "nullable")]
    timezones: Vec<String>,
}

impl From<RawCountry> for Country {
    fn from(raw: RawCountry) -> Self {
        Country {
            name: raw.name.common,
            region: raw.region,
            currencies: raw
                .currencies
                .into_iter()
                .map(|(code, currency)| Currency {
                    code,
                    name: currency.name,
                    symbol: currency.symbol,
                })
                .collect(),
            capital: raw.capital,
            continents: raw.continents,
            languages: raw.languages.into_iter().map(|(_, name)| name).collect(),
            location: raw.latlng,
            flag: raw.flag,
            flags: raw.flags,
            maps: raw.maps,
            population: raw.population,
            area: raw.area,
            timezones: raw.timezones,
        }
    }
}

/// Treat an explicit `null` like an absent field.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a JSON object into `(key, value)` pairs in document order.
fn ordered_entries<'de, D, V>(deserializer: D) -> std::result::Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct EntriesVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object keyed by code, or null")
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E>(self) -> std::result::Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_some<D>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_map(self)
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, V>()? {
                entries.push((key, value));
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_option(EntriesVisitor(PhantomData))
}

/// Best-effort record label for error messages.
fn describe(raw: &serde_json::Value) -> String {
    raw.pointer("/name/common")
        .and_then(|name| name.as_str())
        .map(|name| format!("country '{}'", name))
        .unwrap_or_else(|| "country record".to_string())
}

/// Map one upstream record into a [`Country`].
///
/// # Errors
///
/// Returns `Error::Mapping` when `name.common`, `region`, `population` or
/// `area` is missing, or when a field has an unexpected JSON type.
pub fn map_one(raw: &serde_json::Value) -> Result<Country> {
    RawCountry::deserialize(raw)
        .map(Country::from)
        .map_err(|e| Error::Mapping(format!("{}: {}", describe(raw), e)))
}

/// Map the full upstream listing.
///
/// # Errors
///
/// Returns `Error::Mapping` if the payload is not a JSON array or any element
/// fails [`map_one`].
pub fn map_many(raw: &serde_json::Value) -> Result<Vec<Country>> {
    let records = raw.as_array().ok_or_else(|| {
        Error::Mapping(format!(
            "expected an array of country records, got {}",
            kind_of(raw)
        ))
    })?;

    records.iter().map(map_one).collect()
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
