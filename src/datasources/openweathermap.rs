use crate::config::OpenWeatherMapConfig;
use crate::error::{CropwiseError, Result};
use crate::models::WeatherReading;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

const API_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Aggregation window matching the decision tree thresholds (4-day totals/averages).
pub const READING_WINDOW_HOURS: i64 = 96;

pub struct OpenWeatherMapClient {
    client: reqwest::Client,
    config: OpenWeatherMapConfig,
}

// OpenWeatherMap API response structures
#[derive(Debug, Deserialize)]
struct OwmForecastResponse {
    list: Vec<OwmForecastItem>,
}

#[derive(Debug, Deserialize)]
struct OwmForecastItem {
    dt: i64,
    main: OwmMain,
    #[serde(default)]
    rain: Option<OwmPrecipitation>,
    #[serde(default)]
    snow: Option<OwmPrecipitation>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmPrecipitation {
    #[serde(rename = "3h", default)]
    three_hour: f64,
}

/// One 3-hour forecast step, metric units.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub temp_c: f64,
    pub humidity_percent: f64,
    pub precipitation_mm: f64,
}

impl OpenWeatherMapClient {
    pub fn new(config: OpenWeatherMapConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Fetch the 5-day/3-hour forecast.
    pub async fn fetch_forecast(&self) -> Result<Vec<ForecastPoint>> {
        let url = format!(
            "{}/forecast?lat={}&lon={}&appid={}&units=metric",
            API_BASE_URL, self.config.latitude, self.config.longitude, self.config.api_key
        );

        let response =
            self.client.get(&url).send().await.map_err(|e| {
                CropwiseError::DataSourceUnavailable(format!("OpenWeatherMap: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CropwiseError::DataSourceUnavailable(format!(
                "OpenWeatherMap returned {}: {}",
                status, body
            )));
        }

        let owm_response: OwmForecastResponse = response.json().await.map_err(|e| {
            CropwiseError::DataSourceUnavailable(format!(
                "Failed to parse OpenWeatherMap response: {}",
                e
            ))
        })?;

        Ok(owm_response.list.iter().map(convert_forecast_item).collect())
    }

    /// Weather reading aggregated over the next four days of forecast.
    pub async fn fetch_reading(&self) -> Result<WeatherReading> {
        let points = self.fetch_forecast().await?;
        let reading = summarize(&points, Utc::now(), READING_WINDOW_HOURS);
        tracing::debug!(?reading, points = points.len(), "Forecast reading");
        Ok(reading)
    }

    /// Test connection to OpenWeatherMap API
    pub async fn test_connection(&self) -> Result<bool> {
        let url = format!(
            "{}/weather?lat={}&lon={}&appid={}&units=metric",
            API_BASE_URL, self.config.latitude, self.config.longitude, self.config.api_key
        );

        let response =
            self.client.get(&url).send().await.map_err(|e| {
                CropwiseError::DataSourceUnavailable(format!("OpenWeatherMap: {}", e))
            })?;

        Ok(response.status().is_success())
    }
}

fn convert_forecast_item(item: &OwmForecastItem) -> ForecastPoint {
    let timestamp = DateTime::from_timestamp(item.dt, 0).unwrap_or_else(Utc::now);

    // Combine rain and snow precipitation
    let rain_mm = item.rain.as_ref().map(|r| r.three_hour).unwrap_or(0.0);
    let snow_mm = item.snow.as_ref().map(|s| s.three_hour).unwrap_or(0.0);

    ForecastPoint {
        timestamp,
        temp_c: item.main.temp,
        humidity_percent: item.main.humidity,
        precipitation_mm: rain_mm + snow_mm,
    }
}

/// Total precipitation and mean temperature/humidity over `[now, now + hours]`.
///
/// P/PET is left unset; the forecast carries no evapotranspiration estimate.
pub fn summarize(points: &[ForecastPoint], now: DateTime<Utc>, hours: i64) -> WeatherReading {
    let cutoff = now + Duration::hours(hours);
    let window: Vec<&ForecastPoint> = points
        .iter()
        .filter(|p| p.timestamp >= now && p.timestamp <= cutoff)
        .collect();

    if window.is_empty() {
        return WeatherReading::default();
    }

    let n = window.len() as f64;
    WeatherReading {
        precipitation: Some(window.iter().map(|p| p.precipitation_mm).sum()),
        humidity: Some(window.iter().map(|p| p.humidity_percent).sum::<f64>() / n),
        temperature: Some(window.iter().map(|p| p.temp_c).sum::<f64>() / n),
        p_pet: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(now: DateTime<Utc>, hours_ahead: i64, temp_c: f64, precip: f64) -> ForecastPoint {
        ForecastPoint {
            timestamp: now + Duration::hours(hours_ahead),
            temp_c,
            humidity_percent: 70.0,
            precipitation_mm: precip,
        }
    }

    #[test]
    fn summarize_aggregates_window() {
        let now = Utc::now();
        let points = vec![
            point(now, 3, 20.0, 1.5),
            point(now, 48, 24.0, 0.0),
            point(now, 96, 22.0, 2.5),
            point(now, 99, 40.0, 50.0), // outside the window
        ];
        let reading = summarize(&points, now, READING_WINDOW_HOURS);
        assert_eq!(reading.precipitation, Some(4.0));
        assert_eq!(reading.temperature, Some(22.0));
        assert_eq!(reading.humidity, Some(70.0));
        assert_eq!(reading.p_pet, None);
    }

    #[test]
    fn summarize_empty_window_is_unset() {
        let now = Utc::now();
        let points = vec![point(now, -6, 20.0, 1.0)];
        assert!(summarize(&points, now, READING_WINDOW_HOURS).is_empty());
    }

    #[test]
    fn forecast_item_combines_rain_and_snow() {
        let json = r#"{
            "dt": 1700000000,
            "main": { "temp": 3.5, "humidity": 91 },
            "rain": { "3h": 0.4 },
            "snow": { "3h": 1.1 }
        }"#;
        let item: OwmForecastItem = serde_json::from_str(json).unwrap();
        let point = convert_forecast_item(&item);
        assert!((point.precipitation_mm - 1.5).abs() < 1e-9);
        assert_eq!(point.temp_c, 3.5);
        assert_eq!(point.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn client_creation() {
        let client = OpenWeatherMapClient::new(OpenWeatherMapConfig {
            api_key: "test_key".to_string(),
            latitude: -1.2921,
            longitude: 36.8219,
            enabled: true,
        });
        assert!(client.config.enabled);
    }
}
