//! Canonicalization of raw city input

/// City name used when the caller supplies nothing usable
pub const UNKNOWN_CITY: &str = "unknown";

/// Trim and lowercase a raw city name
///
/// Empty or whitespace-only input is replaced with [`UNKNOWN_CITY`].
pub fn normalize_city(raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    let city = if trimmed.is_empty() {
        UNKNOWN_CITY
    } else {
        trimmed
    };
    city.to_lowercase()
}
