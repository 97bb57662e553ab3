use crate::error::{Result, SyncError};
use crate::models::{DailyObservation, StationId, StationRegistry, WeatherEvents};
use crate::utils::constants::{
    DATE_CODE_WIDTH, OP_TOKEN_COUNT, QUALITY_MARKER, SENTINEL_PATTERN, USAF_WIDTH,
    WBAN_WIDTH, WEATHER_CODE_WIDTH,
};
use chrono::NaiveDate;
use flate2::read::GzDecoder;
use memmap2::Mmap;
use rayon::prelude::*;
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn sentinel_regex() -> &'static Regex {
    static SENTINEL: OnceLock<Regex> = OnceLock::new();
    SENTINEL.get_or_init(|| Regex::new(SENTINEL_PATTERN).expect("sentinel pattern compiles"))
}

/// True for upstream's repeated-9s "not observed" markers (`99.99`, `9999.9`, ...).
pub fn is_missing_value(token: &str) -> bool {
    sentinel_regex().is_match(token)
}

/// Turns raw GSOD `.op` station-year files into canonical daily rows.
pub struct OpReader {
    skip_header: bool,
    use_mmap: bool,
}

impl OpReader {
    pub fn new() -> Self {
        Self {
            skip_header: true,
            use_mmap: false,
        }
    }

    pub fn with_skip_header(skip_header: bool) -> Self {
        Self {
            skip_header,
            use_mmap: false,
        }
    }

    pub fn with_mmap(use_mmap: bool) -> Self {
        Self {
            skip_header: true,
            use_mmap,
        }
    }

    /// Read a local `.op` or `.op.gz` file
    pub fn read_path(&self, path: &Path, registry: &StationRegistry) -> Result<Vec<DailyObservation>> {
        if self.use_mmap {
            let file = File::open(path)?;
            // Safety: the file is opened read-only and not modified while mapped
            let mmap = unsafe { Mmap::map(&file)? };
            self.parse_bytes(&mmap, registry)
        } else {
            let raw = std::fs::read(path)?;
            self.parse_bytes(&raw, registry)
        }
    }

    /// Parse a whole station-year payload, gzip-compressed or plain.
    ///
    /// Rows come back ordered by date. A payload holding two rows for one
    /// date, or rows for more than one station, is rejected.
    pub fn parse_bytes(&self, raw: &[u8], registry: &StationRegistry) -> Result<Vec<DailyObservation>> {
        let text = decode_payload(raw)?;
        let parsed = self.parse_numbered(&text, registry)?;
        Ok(parsed.into_iter().map(|(_, obs)| obs).collect())
    }

    /// [`parse_bytes`](Self::parse_bytes) for the upstream file of one
    /// station-year: every row must belong to `station` and fall in `year`.
    pub fn parse_station_year(
        &self,
        raw: &[u8],
        registry: &StationRegistry,
        station: &StationId,
        year: i32,
    ) -> Result<Vec<DailyObservation>> {
        let text = decode_payload(raw)?;
        let parsed = self.parse_numbered(&text, registry)?;

        if let Some((line_no, obs)) = parsed.iter().find(|(_, o)| &o.station != station) {
            return Err(SyncError::malformed(
                *line_no,
                "station",
                format!("expected {} but found {}", station, obs.station),
            ));
        }
        if let Some((line_no, obs)) = parsed.iter().find(|(_, o)| o.year() != year) {
            return Err(SyncError::malformed(
                *line_no,
                "date",
                format!("{} is outside {}", obs.iso_date(), year),
            ));
        }

        Ok(parsed.into_iter().map(|(_, obs)| obs).collect())
    }

    /// Observations with their 1-based line numbers, ordered by date
    fn parse_numbered(
        &self,
        text: &str,
        registry: &StationRegistry,
    ) -> Result<Vec<(usize, DailyObservation)>> {
        // The header is the first non-blank line
        let lines: Vec<(usize, &str)> = text
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line))
            .filter(|(_, line)| !line.trim().is_empty())
            .skip(usize::from(self.skip_header))
            .collect();

        let mut parsed = lines
            .par_iter()
            .map(|(line_no, line)| {
                self.parse_line(line, *line_no, registry)
                    .map(|obs| (*line_no, obs))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some((_, first)) = parsed.first() {
            let station = first.station.clone();
            if let Some((line_no, other)) = parsed.iter().find(|(_, o)| o.station != station) {
                return Err(SyncError::malformed(
                    *line_no,
                    "station",
                    format!("expected {} but found {}", station, other.station),
                ));
            }
        }

        parsed.sort_by_key(|(line_no, obs)| (obs.date, *line_no));
        for pair in parsed.windows(2) {
            if pair[0].1.date == pair[1].1.date {
                return Err(SyncError::malformed(
                    pair[1].0,
                    "date",
                    format!("duplicate observation for {}", pair[1].1.iso_date()),
                ));
            }
        }

        Ok(parsed)
    }

    /// Parse a single whitespace-delimited observation line
    pub fn parse_line(
        &self,
        line: &str,
        line_no: usize,
        registry: &StationRegistry,
    ) -> Result<DailyObservation> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != OP_TOKEN_COUNT {
            return Err(SyncError::malformed(
                line_no,
                "record",
                format!("expected {} tokens, found {}", OP_TOKEN_COUNT, tokens.len()),
            ));
        }

        let station = parse_identity(tokens[0], tokens[1], line_no)?;
        let date = parse_date_code(tokens[2], line_no)?;

        let (max_temp, max_temp_quality_flag) = flagged_temperature(tokens[17], line_no, "max_temp")?;
        let (min_temp, min_temp_quality_flag) = flagged_temperature(tokens[18], line_no, "min_temp")?;
        let (precipitation, precipitation_flag) = precipitation(tokens[19], line_no)?;

        if tokens[21].len() != WEATHER_CODE_WIDTH {
            return Err(SyncError::malformed(
                line_no,
                "frshtt",
                format!("expected {} characters, found '{}'", WEATHER_CODE_WIDTH, tokens[21]),
            ));
        }
        let events = WeatherEvents::from_code(tokens[21]).map_err(|position| {
            SyncError::malformed(
                line_no,
                "frshtt",
                format!("position {} of '{}' is not 0 or 1", position, tokens[21]),
            )
        })?;

        let metadata = registry.get(&station);

        Ok(DailyObservation {
            elevation: metadata.and_then(|m| m.elevation),
            station_name: metadata.and_then(|m| m.name.clone()),
            country: metadata.and_then(|m| m.country.clone()),
            latitude: metadata.and_then(|m| m.latitude),
            longitude: metadata.and_then(|m| m.longitude),
            station,
            date,
            mean_temp: measurement(tokens[3], line_no, "mean_temp")?,
            mean_temp_count: count(tokens[4], line_no, "mean_temp_count")?,
            mean_dewpoint: measurement(tokens[5], line_no, "mean_dewpoint")?,
            mean_dewpoint_count: count(tokens[6], line_no, "mean_dewpoint_count")?,
            mean_sea_level_pressure: measurement(tokens[7], line_no, "mean_sea_level_pressure")?,
            mean_sea_level_pressure_count: count(tokens[8], line_no, "mean_sea_level_pressure_count")?,
            mean_station_pressure: measurement(tokens[9], line_no, "mean_station_pressure")?,
            mean_station_pressure_count: count(tokens[10], line_no, "mean_station_pressure_count")?,
            mean_visibility: measurement(tokens[11], line_no, "mean_visibility")?,
            mean_visibility_count: count(tokens[12], line_no, "mean_visibility_count")?,
            mean_windspeed: measurement(tokens[13], line_no, "mean_windspeed")?,
            mean_windspeed_count: count(tokens[14], line_no, "mean_windspeed_count")?,
            max_windspeed: measurement(tokens[15], line_no, "max_windspeed")?,
            max_gust: measurement(tokens[16], line_no, "max_gust")?,
            max_temp,
            max_temp_quality_flag,
            min_temp,
            min_temp_quality_flag,
            precipitation,
            precipitation_flag,
            snow_depth: measurement(tokens[20], line_no, "snow_depth")?,
            events,
        })
    }
}

impl Default for OpReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Decompress gzip payloads (detected by magic bytes) and decode as text
pub fn decode_payload(raw: &[u8]) -> Result<String> {
    let bytes = if raw.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::with_capacity(raw.len() * 4);
        GzDecoder::new(raw)
            .read_to_end(&mut decoded)
            .map_err(|e| SyncError::InvalidFormat(format!("Corrupt gzip payload: {}", e)))?;
        decoded
    } else {
        raw.to_vec()
    };

    String::from_utf8(bytes)
        .map_err(|e| SyncError::InvalidFormat(format!("Payload is not valid UTF-8: {}", e)))
}

// Identity fields are never sentinel-mapped: 99999 is a real WBAN.
fn parse_identity(usaf: &str, wban: &str, line_no: usize) -> Result<StationId> {
    if usaf.len() != USAF_WIDTH {
        return Err(SyncError::malformed(
            line_no,
            "usaf",
            format!("expected {} characters, found '{}'", USAF_WIDTH, usaf),
        ));
    }
    if wban.len() != WBAN_WIDTH {
        return Err(SyncError::malformed(
            line_no,
            "wban",
            format!("expected {} characters, found '{}'", WBAN_WIDTH, wban),
        ));
    }
    Ok(StationId::new(usaf, wban))
}

fn parse_date_code(code: &str, line_no: usize) -> Result<NaiveDate> {
    if code.len() != DATE_CODE_WIDTH || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SyncError::malformed(
            line_no,
            "date",
            format!("expected {} digits, found '{}'", DATE_CODE_WIDTH, code),
        ));
    }

    // All-digit ASCII, so the slices and integer parses cannot fail
    let year: i32 = code[..4].parse().unwrap_or_default();
    let month: u32 = code[4..6].parse().unwrap_or_default();
    let day: u32 = code[6..].parse().unwrap_or_default();

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        SyncError::malformed(line_no, "date", format!("'{}' is not a calendar date", code))
    })
}

fn measurement(token: &str, line_no: usize, field: &'static str) -> Result<Option<f64>> {
    if is_missing_value(token) {
        return Ok(None);
    }

    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(SyncError::malformed(
            line_no,
            field,
            format!("not a number: '{}'", token),
        )),
    }
}

fn count(token: &str, line_no: usize, field: &'static str) -> Result<u32> {
    token.parse::<u32>().map_err(|_| {
        SyncError::malformed(line_no, field, format!("not a count: '{}'", token))
    })
}

/// Max/min temperatures carry a trailing `*` when derived from hourly data
fn flagged_temperature(token: &str, line_no: usize, field: &'static str) -> Result<(Option<f64>, bool)> {
    match token.strip_suffix(QUALITY_MARKER) {
        Some(value) => Ok((measurement(value, line_no, field)?, true)),
        None => Ok((measurement(token, line_no, field)?, false)),
    }
}

/// Precipitation ends in a source flag letter (A-I); the missing marker
/// `99.99` is written without one.
fn precipitation(token: &str, line_no: usize) -> Result<(Option<f64>, Option<char>)> {
    match token.chars().last() {
        Some(flag) if flag.is_ascii_alphabetic() => {
            let value = &token[..token.len() - flag.len_utf8()];
            Ok((measurement(value, line_no, "precipitation")?, Some(flag)))
        }
        _ => Ok((measurement(token, line_no, "precipitation")?, None)),
    }
}
