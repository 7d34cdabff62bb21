//! Open-Meteo geocoding client
//!
//! Turns a city string such as `"suzhou, anhui"` or `"苏州，安徽"` into
//! coordinates. The provider may return several places with the same name, so
//! candidates go through a narrowing filter pipeline before one is picked.

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use super::GeocodeInfo;

/// Default host for the geocoding API
pub const DEFAULT_GEOCODING_BASE_URL: &str = "https://geocoding-api.open-meteo.com";

/// Maximum number of candidates requested from the provider
const CANDIDATE_COUNT: &str = "5";

/// Result language requested from the provider
const RESULT_LANGUAGE: &str = "zh";

/// Country code preferred during disambiguation
pub const TARGET_COUNTRY_CODE: &str = "CN";

/// Chinese city names and the transliteration the provider matches best
const CITY_ALIASES: &[(&str, &str)] = &[
    ("北京", "Beijing"),
    ("上海", "Shanghai"),
    ("广州", "Guangzhou"),
    ("深圳", "Shenzhen"),
    ("天津", "Tianjin"),
    ("重庆", "Chongqing"),
    ("杭州", "Hangzhou"),
    ("苏州", "Suzhou"),
    ("南京", "Nanjing"),
    ("成都", "Chengdu"),
    ("武汉", "Wuhan"),
    ("西安", "Xi'an"),
    ("长沙", "Changsha"),
    ("郑州", "Zhengzhou"),
    ("青岛", "Qingdao"),
    ("厦门", "Xiamen"),
    ("沈阳", "Shenyang"),
    ("哈尔滨", "Harbin"),
    ("昆明", "Kunming"),
    ("香港", "Hong Kong"),
];

/// Errors that can occur while resolving a city to coordinates
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed or returned a non-success status
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// The provider returned no candidates
    #[error("No geocoding results for '{0}'")]
    NoCandidates(String),

    /// The chosen candidate has no usable coordinates
    #[error("Geocoding result for '{0}' has no coordinates")]
    MissingCoordinates(String),
}

/// A city string split into its place name and optional region hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityQuery {
    pub name: String,
    pub admin_hint: Option<String>,
}

/// One place returned by the geocoding API
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeocodeCandidate {
    pub name: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub admin1: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
}

/// Geocoding API response structure
#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// Omitted by the API when nothing matched
    #[serde(default)]
    results: Option<Vec<GeocodeCandidate>>,
}

/// Split a raw city string on the first ASCII or full-width comma
pub fn parse_city_query(raw: &str) -> CityQuery {
    let mut parts = raw.splitn(2, [',', '，']);
    let name = parts.next().unwrap_or_default().trim().to_string();
    let admin_hint = parts
        .next()
        .map(str::trim)
        .filter(|hint| !hint.is_empty())
        .map(str::to_string);

    CityQuery { name, admin_hint }
}

/// Look up the transliterated name for a city, or return the input unchanged
pub fn translate_city_name(name: &str) -> &str {
    CITY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, translated)| *translated)
        .unwrap_or(name)
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Pick one candidate from the provider's ranked list
///
/// Each filter only applies when it leaves at least one candidate:
/// 1. country code equals [`TARGET_COUNTRY_CODE`]
/// 2. `admin1` equals the region hint, ignoring case
/// 3. `name` equals the target name, ignoring case; otherwise the first survivor
///
/// Provider order is kept throughout.
pub fn select_candidate<'a>(
    candidates: &'a [GeocodeCandidate],
    target_name: &str,
    admin_hint: Option<&str>,
) -> Option<&'a GeocodeCandidate> {
    let mut pool: Vec<&GeocodeCandidate> = candidates.iter().collect();

    let in_country: Vec<_> = pool
        .iter()
        .copied()
        .filter(|c| {
            c.country_code
                .as_deref()
                .is_some_and(|code| code.eq_ignore_ascii_case(TARGET_COUNTRY_CODE))
        })
        .collect();
    if !in_country.is_empty() {
        pool = in_country;
    }

    if let Some(hint) = admin_hint {
        let in_region: Vec<_> = pool
            .iter()
            .copied()
            .filter(|c| c.admin1.as_deref().is_some_and(|admin| eq_ignore_case(admin, hint)))
            .collect();
        if !in_region.is_empty() {
            pool = in_region;
        }
    }

    pool.iter()
        .copied()
        .find(|c| c.name.as_deref().is_some_and(|name| eq_ignore_case(name, target_name)))
        .or_else(|| pool.first().copied())
}

/// Client for the Open-Meteo geocoding API
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: Client,
    base_url: String,
    debug_raw: bool,
}

impl Default for GeocodeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GeocodeClient {
    /// Create a new GeocodeClient against the public API
    pub fn new() -> Self {
        Self::with_client(Client::new(), DEFAULT_GEOCODING_BASE_URL)
    }

    /// Create a new GeocodeClient with a custom HTTP client and host
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            debug_raw: false,
        }
    }

    /// Log raw response bodies at debug level
    pub fn with_debug_raw(mut self, debug_raw: bool) -> Self {
        self.debug_raw = debug_raw;
        self
    }

    /// Fetch up to five candidates for a place name, in provider order
    pub async fn search(&self, name: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
        let url = format!("{}/v1/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("name", name),
                ("count", CANDIDATE_COUNT),
                ("language", RESULT_LANGUAGE),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;

        if self.debug_raw {
            tracing::debug!(target: "cityweather::raw", name, body = %text, "geocoding response");
        }

        let parsed: SearchResponse = serde_json::from_str(&text)?;
        Ok(parsed.results.unwrap_or_default())
    }

    /// Resolve a city string to a single location
    ///
    /// A region hint passed explicitly takes precedence over one parsed from
    /// the query (`"suzhou, anhui"`).
    pub async fn resolve(
        &self,
        query: &str,
        admin_hint: Option<&str>,
    ) -> Result<GeocodeInfo, GeocodeError> {
        let parsed = parse_city_query(query);
        let target_name = translate_city_name(&parsed.name);
        let hint = admin_hint.or(parsed.admin_hint.as_deref());

        let candidates = self.search(target_name).await?;
        let chosen = select_candidate(&candidates, target_name, hint)
            .ok_or_else(|| GeocodeError::NoCandidates(target_name.to_string()))?;

        tracing::debug!(
            target_name,
            hint,
            candidates = candidates.len(),
            chosen = chosen.name.as_deref(),
            "geocode candidate selected"
        );

        let (Some(latitude), Some(longitude)) = (chosen.latitude, chosen.longitude) else {
            return Err(GeocodeError::MissingCoordinates(target_name.to_string()));
        };

        Ok(GeocodeInfo {
            name: chosen
                .name
                .clone()
                .unwrap_or_else(|| target_name.to_string()),
            country: chosen.country.clone(),
            admin1: chosen.admin1.clone(),
            latitude,
            longitude,
            timezone: chosen.timezone.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, country_code: Option<&str>, admin1: Option<&str>) -> GeocodeCandidate {
        GeocodeCandidate {
            name: Some(name.to_string()),
            country_code: country_code.map(str::to_string),
            admin1: admin1.map(str::to_string),
            latitude: Some(0.0),
            longitude: Some(0.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_city_query_ascii_comma() {
        let query = parse_city_query("Suzhou, Anhui");
        assert_eq!(query.name, "Suzhou");
        assert_eq!(query.admin_hint.as_deref(), Some("Anhui"));
    }

    #[test]
    fn test_parse_city_query_full_width_comma() {
        let query = parse_city_query("苏州，安徽");
        assert_eq!(query.name, "苏州");
        assert_eq!(query.admin_hint.as_deref(), Some("安徽"));
    }

    #[test]
    fn test_parse_city_query_without_hint() {
        let query = parse_city_query("  beijing ");
        assert_eq!(query.name, "beijing");
        assert!(query.admin_hint.is_none());

        // A trailing comma is not a hint
        let query = parse_city_query("beijing,  ");
        assert_eq!(query.name, "beijing");
        assert!(query.admin_hint.is_none());
    }

    #[test]
    fn test_translate_city_name() {
        assert_eq!(translate_city_name("北京"), "Beijing");
        assert_eq!(translate_city_name("苏州"), "Suzhou");
        assert_eq!(translate_city_name("paris"), "paris");
    }

    #[test]
    fn test_select_prefers_target_country() {
        let candidates = vec![
            candidate("Beijing", Some("US"), None),
            candidate("Beijing", Some("CN"), Some("Beijing")),
        ];

        let chosen = select_candidate(&candidates, "Beijing", None).expect("Should pick one");
        assert_eq!(chosen.country_code.as_deref(), Some("CN"));
    }

    #[test]
    fn test_select_prefers_admin_hint_over_provider_order() {
        let candidates = vec![
            candidate("Suzhou", None, Some("Jiangsu")),
            candidate("Suzhou", None, Some("Anhui")),
        ];

        let chosen = select_candidate(&candidates, "Suzhou", Some("anhui")).expect("Should pick one");
        assert_eq!(chosen.admin1.as_deref(), Some("Anhui"));
    }

    #[test]
    fn test_select_ignores_filters_that_remove_everything() {
        let candidates = vec![
            candidate("Springfield", Some("US"), Some("Illinois")),
            candidate("Springfield", Some("US"), Some("Missouri")),
        ];

        // No CN candidates and no matching region: provider order wins
        let chosen = select_candidate(&candidates, "Springfield", Some("Ohio")).expect("Should pick one");
        assert_eq!(chosen.admin1.as_deref(), Some("Illinois"));
    }

    #[test]
    fn test_select_prefers_exact_name_within_survivors() {
        let candidates = vec![
            candidate("Beijing Shi", Some("CN"), None),
            candidate("beijing", Some("CN"), None),
            candidate("Beijing", Some("US"), None),
        ];

        let chosen = select_candidate(&candidates, "Beijing", None).expect("Should pick one");
        assert_eq!(chosen.name.as_deref(), Some("beijing"));
        assert_eq!(chosen.country_code.as_deref(), Some("CN"));
    }

    #[test]
    fn test_select_falls_back_to_first_survivor() {
        let candidates = vec![
            candidate("Pudong", Some("CN"), None),
            candidate("Minhang", Some("CN"), None),
        ];

        let chosen = select_candidate(&candidates, "Shanghai", None).expect("Should pick one");
        assert_eq!(chosen.name.as_deref(), Some("Pudong"));
    }

    #[test]
    fn test_select_empty_candidates() {
        assert!(select_candidate(&[], "Beijing", None).is_none());
    }

    #[test]
    fn test_parse_response_without_results() {
        let parsed: SearchResponse =
            serde_json::from_str(r#"{"generationtime_ms": 0.5}"#).expect("Failed to parse");
        assert!(parsed.results.is_none());
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = GeocodeClient::with_client(Client::new(), "http://localhost:1234/");
        assert_eq!(client.base_url, "http://localhost:1234");
    }
}
