//! Aggregation engine: region rollup, language rollup and superlatives.
//!
//! Pure functions over country slices. Rollups are keyed by `BTreeMap`, so
//! serialized keys always come out in ascending order whatever the input
//! order was.

use crate::model::Country;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-region totals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSummary {
    /// Member names in input order.
    pub countries: Vec<String>,
    pub total_population: u64,
    pub total_area: f64,
}

/// A country speaking a given language.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCountry {
    pub name: String,
    pub region: String,
}

/// Per-language totals.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageSummary {
    pub countries: Vec<LanguageCountry>,
    pub total_population: u64,
}

pub type Regions = BTreeMap<String, RegionSummary>;
pub type Languages = BTreeMap<String, LanguageSummary>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountryArea {
    pub country: String,
    pub area: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryPopulation {
    pub country: String,
    pub population: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageReach {
    pub language: String,
    pub total_speakers: u64,
    pub total_countries: usize,
}

/// Dataset-wide superlatives.
///
/// Every extremum is `None` (serialized as `null`) for an empty dataset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub countries: usize,
    pub largest_country_by_area: Option<CountryArea>,
    pub smallest_country_by_area: Option<CountryArea>,
    pub largest_country_by_population: Option<CountryPopulation>,
    pub smallest_country_by_population: Option<CountryPopulation>,
    pub most_spoken_language: Option<LanguageReach>,
    pub least_spoken_language: Option<LanguageReach>,
}

/// Group countries by region.
pub fn build_regions<'a>(countries: impl IntoIterator<Item = &'a Country>) -> Regions {
    let mut regions = Regions::new();
    for country in countries {
        let summary = regions.entry(country.region.clone()).or_default();
        summary.countries.push(country.name.clone());
        summary.total_population = summary.total_population.saturating_add(country.population);
        summary.total_area += country.area;
    }
    regions
}

/// Group countries by each language they list.
///
/// A country listing a language twice is counted twice.
pub fn build_languages<'a>(countries: impl IntoIterator<Item = &'a Country>) -> Languages {
    let mut languages = Languages::new();
    for country in countries {
        for language in &country.languages {
            let summary = languages.entry(language.clone()).or_default();
            summary.countries.push(LanguageCountry {
                name: country.name.clone(),
                region: country.region.clone(),
            });
            summary.total_population = summary.total_population.saturating_add(country.population);
        }
    }
    languages
}

/// Compute superlatives. Updates happen only on strict inequality, so the
/// first country (or language, in key order) seen wins a tie.
pub fn compute_statistics<'a>(
    countries: impl IntoIterator<Item = &'a Country>,
    languages: &Languages,
) -> Statistics {
    let mut stats = Statistics::default();

    for country in countries {
        stats.countries += 1;

        if stats
            .largest_country_by_area
            .as_ref()
            .map_or(true, |best| country.area > best.area)
        {
            stats.largest_country_by_area = Some(area_of(country));
        }
        if stats
            .smallest_country_by_area
            .as_ref()
            .map_or(true, |best| country.area < best.area)
        {
            stats.smallest_country_by_area = Some(area_of(country));
        }
        if stats
            .largest_country_by_population
            .as_ref()
            .map_or(true, |best| country.population > best.population)
        {
            stats.largest_country_by_population = Some(population_of(country));
        }
        if stats
            .smallest_country_by_population
            .as_ref()
            .map_or(true, |best| country.population < best.population)
        {
            stats.smallest_country_by_population = Some(population_of(country));
        }
    }

    for (language, summary) in languages {
        if stats
            .most_spoken_language
            .as_ref()
            .map_or(true, |best| summary.total_population > best.total_speakers)
        {
            stats.most_spoken_language = Some(reach_of(language, summary));
        }
        if stats
            .least_spoken_language
            .as_ref()
            .map_or(true, |best| summary.total_population < best.total_speakers)
        {
            stats.least_spoken_language = Some(reach_of(language, summary));
        }
    }

    stats
}

fn area_of(country: &Country) -> CountryArea {
    CountryArea {
        country: country.name.clone(),
        area: country.area,
    }
}

fn population_of(country: &Country) -> CountryPopulation {
    CountryPopulation {
        country: country.name.clone(),
        population: country.population,
    }
}

fn reach_of(language: &str, summary: &LanguageSummary) -> LanguageReach {
    LanguageReach {
        language: language.to_string(),
        total_speakers: summary.total_population,
        total_countries: summary.countries.len(),
    }
}
