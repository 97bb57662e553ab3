use crate::utils::constants::{
    BOGUS_NAME_MARKERS, LOWEST_DRY_LAND_ELEVATION_M, MAX_LATITUDE, MAX_LONGITUDE,
    UNKNOWN_STATION_NAMES,
};

/// Keep an elevation only if it is at or above the lowest point on dry land
/// (the Dead Sea shore, -418 m).
pub fn clean_elevation(elevation: Option<f64>) -> Option<f64> {
    elevation.filter(|e| e.is_finite() && *e >= LOWEST_DRY_LAND_ELEVATION_M)
}

/// Keep a latitude strictly inside (-90, 90)
pub fn clean_latitude(latitude: Option<f64>) -> Option<f64> {
    latitude.filter(|l| *l > -MAX_LATITUDE && *l < MAX_LATITUDE)
}

/// Keep a longitude strictly inside (-180, 180)
pub fn clean_longitude(longitude: Option<f64>) -> Option<f64> {
    longitude.filter(|l| *l > -MAX_LONGITUDE && *l < MAX_LONGITUDE)
}

/// Drop names that upstream uses as placeholders for an unknown station
pub fn clean_station_name(name: Option<String>) -> Option<String> {
    let name = name?;
    let trimmed = name.trim();

    if trimmed.is_empty() || UNKNOWN_STATION_NAMES.contains(&trimmed) {
        return None;
    }

    let upper = trimmed.to_uppercase();
    if BOGUS_NAME_MARKERS.iter().any(|marker| upper.contains(marker)) {
        return None;
    }

    Some(trimmed.to_string())
}

/// Parse an optional decimal coordinate or elevation. Upstream writes
/// explicit signs ("+51.500") and leaves missing values blank.
pub fn parse_optional_decimal(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}
