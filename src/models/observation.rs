use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::StationId;

/// The six weather events encoded positionally in the upstream FRSHTT code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherEvents {
    pub fog: bool,
    pub rain_or_drizzle: bool,
    pub snow_or_ice: bool,
    pub hail: bool,
    pub thunder: bool,
    pub tornado: bool,
}

impl WeatherEvents {
    /// Unpack a 6-character code of '0'/'1'. Returns the offending position
    /// when a character is neither.
    pub fn from_code(code: &str) -> std::result::Result<Self, usize> {
        let bytes = code.as_bytes();
        let mut flags = [false; 6];
        for (position, flag) in flags.iter_mut().enumerate() {
            *flag = match bytes.get(position) {
                Some(b'1') => true,
                Some(b'0') => false,
                _ => return Err(position),
            };
        }

        Ok(Self {
            fog: flags[0],
            rain_or_drizzle: flags[1],
            snow_or_ice: flags[2],
            hail: flags[3],
            thunder: flags[4],
            tornado: flags[5],
        })
    }
}

/// One station-day observation in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyObservation {
    pub station: StationId,
    pub date: NaiveDate,

    // Joined from the station registry
    pub elevation: Option<f64>,
    pub station_name: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub mean_temp: Option<f64>,
    pub mean_temp_count: u32,
    pub mean_dewpoint: Option<f64>,
    pub mean_dewpoint_count: u32,
    pub mean_sea_level_pressure: Option<f64>,
    pub mean_sea_level_pressure_count: u32,
    pub mean_station_pressure: Option<f64>,
    pub mean_station_pressure_count: u32,
    pub mean_visibility: Option<f64>,
    pub mean_visibility_count: u32,
    pub mean_windspeed: Option<f64>,
    pub mean_windspeed_count: u32,
    pub max_windspeed: Option<f64>,
    pub max_gust: Option<f64>,

    pub max_temp: Option<f64>,
    pub max_temp_quality_flag: bool,
    pub min_temp: Option<f64>,
    pub min_temp_quality_flag: bool,

    pub precipitation: Option<f64>,
    pub precipitation_flag: Option<char>,
    pub snow_depth: Option<f64>,

    pub events: WeatherEvents,
}

impl DailyObservation {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn day(&self) -> u32 {
        self.date.day()
    }

    /// Hyphen-joined `YYYY-MM-DD`
    pub fn iso_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Number of non-null primary measurements, the unit the inventory counts.
    pub fn primary_observation_count(&self) -> u32 {
        [
            self.mean_temp,
            self.mean_dewpoint,
            self.mean_sea_level_pressure,
            self.mean_station_pressure,
            self.mean_visibility,
            self.mean_windspeed,
            self.precipitation,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_code_unpacking() {
        let events = WeatherEvents::from_code("010000").unwrap();
        assert!(!events.fog);
        assert!(events.rain_or_drizzle);
        assert!(!events.snow_or_ice);
        assert!(!events.hail);
        assert!(!events.thunder);
        assert!(!events.tornado);

        let all = WeatherEvents::from_code("111111").unwrap();
        assert!(all.fog && all.tornado && all.hail);
    }

    #[test]
    fn test_weather_code_rejects_bad_characters() {
        assert_eq!(WeatherEvents::from_code("0100x0"), Err(4));
        assert_eq!(WeatherEvents::from_code("010"), Err(3));
    }
}
