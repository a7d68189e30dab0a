//! Location resolver adapter: canonicalizes free-text place names and
//! three-letter codes against the external IATA directory service.

use log::debug;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://www.iatacodes.org/api/v6";

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("airport directory request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// One airport entry from the directory. The wire payload carries more
/// fields; only the code matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct AirportMatch {
    pub code: String,
}

/// Autocomplete results, country-level matches separated from city-level
/// ones because resolution prefers the former.
#[derive(Debug, Clone, Default)]
pub struct AutocompleteMatches {
    pub by_country: Vec<AirportMatch>,
    pub by_city: Vec<AirportMatch>,
}

/// The external airport directory, seen through its interface boundary.
pub trait AirportDirectory {
    /// Whether the directory knows `code` as an exact airport code.
    fn exact_lookup(&self, code: &str) -> Result<bool, DirectoryError>;

    fn autocomplete(&self, query: &str) -> Result<AutocompleteMatches, DirectoryError>;
}

/// Resolves location text to an IATA code, or `None` when the directory has
/// no match. A trimmed 3-letter token already known to the directory is
/// returned upper-cased without an autocomplete call; empty text resolves
/// to `None` without any directory call. Codes are never fabricated.
pub fn resolve<D>(directory: &D, location: &str) -> Result<Option<String>, DirectoryError>
where
    D: AirportDirectory + ?Sized,
{
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.len() == 3
        && trimmed.chars().all(|c| c.is_ascii_alphabetic())
        && directory.exact_lookup(trimmed)?
    {
        return Ok(Some(trimmed.to_uppercase()));
    }

    let matches = directory.autocomplete(trimmed)?;
    let code = matches
        .by_country
        .first()
        .or_else(|| matches.by_city.first())
        .map(|m| m.code.clone());
    if code.is_none() {
        debug!("no airport match for {:?}", trimmed);
    }
    Ok(code)
}

/// Directory client for the iatacodes.org API.
pub struct IataCodesClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl IataCodesClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, DirectoryError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, DirectoryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[derive(Deserialize)]
struct ExactResponse {
    #[serde(default)]
    response: Vec<AirportMatch>,
}

#[derive(Deserialize, Default)]
struct AutocompletePayload {
    #[serde(default)]
    airports_by_countries: Vec<AirportMatch>,
    #[serde(default)]
    airports_by_cities: Vec<AirportMatch>,
}

#[derive(Deserialize)]
struct AutocompleteResponse {
    #[serde(default)]
    response: AutocompletePayload,
}

impl AirportDirectory for IataCodesClient {
    fn exact_lookup(&self, code: &str) -> Result<bool, DirectoryError> {
        let url = format!("{}/airports", self.base_url);
        let response: ExactResponse = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("code", code)])
            .send()?
            .error_for_status()?
            .json()?;
        Ok(!response.response.is_empty())
    }

    fn autocomplete(&self, query: &str) -> Result<AutocompleteMatches, DirectoryError> {
        let url = format!("{}/autocomplete", self.base_url);
        let response: AutocompleteResponse = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("query", query)])
            .send()?
            .error_for_status()?
            .json()?;
        Ok(AutocompleteMatches {
            by_country: response.response.airports_by_countries,
            by_city: response.response.airports_by_cities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::{HashMap, HashSet};

    struct FakeDirectory {
        codes: HashSet<String>,
        autocomplete: HashMap<String, AutocompleteMatches>,
        exact_calls: Cell<usize>,
        autocomplete_calls: Cell<usize>,
    }

    impl FakeDirectory {
        fn new() -> Self {
            Self {
                codes: HashSet::new(),
                autocomplete: HashMap::new(),
                exact_calls: Cell::new(0),
                autocomplete_calls: Cell::new(0),
            }
        }

        fn with_codes(codes: &[&str]) -> Self {
            let mut dir = Self::new();
            dir.codes = codes.iter().map(|c| c.to_uppercase()).collect();
            dir
        }
    }

    impl AirportDirectory for FakeDirectory {
        fn exact_lookup(&self, code: &str) -> Result<bool, DirectoryError> {
            self.exact_calls.set(self.exact_calls.get() + 1);
            Ok(self.codes.contains(&code.to_uppercase()))
        }

        fn autocomplete(&self, query: &str) -> Result<AutocompleteMatches, DirectoryError> {
            self.autocomplete_calls.set(self.autocomplete_calls.get() + 1);
            Ok(self.autocomplete.get(query).cloned().unwrap_or_default())
        }
    }

    fn matches(codes: &[&str]) -> Vec<AirportMatch> {
        codes
            .iter()
            .map(|c| AirportMatch {
                code: c.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_known_code_short_circuits_autocomplete() {
        let dir = FakeDirectory::with_codes(&["JFK"]);
        let resolved = resolve(&dir, "JFK").unwrap();
        assert_eq!(resolved.as_deref(), Some("JFK"));
        assert_eq!(dir.autocomplete_calls.get(), 0);
    }

    #[test]
    fn test_code_match_is_case_insensitive() {
        let dir = FakeDirectory::with_codes(&["JFK"]);
        // the preparation step mangles codes into title case
        let resolved = resolve(&dir, "Jfk").unwrap();
        assert_eq!(resolved.as_deref(), Some("JFK"));
        assert_eq!(dir.autocomplete_calls.get(), 0);
    }

    #[test]
    fn test_country_match_preferred_over_city() {
        let mut dir = FakeDirectory::new();
        dir.autocomplete.insert(
            "New York".to_string(),
            AutocompleteMatches {
                by_country: matches(&["JFK", "LGA"]),
                by_city: matches(&["EWR"]),
            },
        );
        let resolved = resolve(&dir, "New York").unwrap();
        assert_eq!(resolved.as_deref(), Some("JFK"));
    }

    #[test]
    fn test_city_match_when_no_country_match() {
        let mut dir = FakeDirectory::new();
        dir.autocomplete.insert(
            "Mombasa".to_string(),
            AutocompleteMatches {
                by_country: vec![],
                by_city: matches(&["MBA"]),
            },
        );
        assert_eq!(resolve(&dir, "Mombasa").unwrap().as_deref(), Some("MBA"));
    }

    #[test]
    fn test_no_match_is_none() {
        let dir = FakeDirectory::new();
        assert_eq!(resolve(&dir, "Atlantis").unwrap(), None);
        assert_eq!(dir.autocomplete_calls.get(), 1);
    }

    #[test]
    fn test_unknown_three_letter_word_falls_through() {
        let mut dir = FakeDirectory::with_codes(&["JFK"]);
        dir.autocomplete.insert(
            "Ely".to_string(),
            AutocompleteMatches {
                by_country: matches(&["LYX"]),
                by_city: vec![],
            },
        );
        assert_eq!(resolve(&dir, "Ely").unwrap().as_deref(), Some("LYX"));
        assert_eq!(dir.exact_calls.get(), 1);
    }

    #[test]
    fn test_empty_input_makes_no_directory_calls() {
        let dir = FakeDirectory::new();
        assert_eq!(resolve(&dir, "   ").unwrap(), None);
        assert_eq!(dir.exact_calls.get(), 0);
        assert_eq!(dir.autocomplete_calls.get(), 0);
    }
}
