//! Current conditions and a short forecast from OpenWeatherMap.

use crate::error::SourceError;
use crate::source::{AuxiliarySource, DataSourceKind, SourceQuery};
use crate::text::number;
use async_trait::async_trait;
use chrono::DateTime;
use krishi_core::{Language, LanguageTable};
use reqwest::Client;
use rootcause::Report;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// OpenWeatherMap API root.
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Number of forecast entries requested.
pub const FORECAST_ENTRIES: u32 = 5;

/// Current conditions at a place, metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    /// "City, CC".
    pub location: String,
    pub temperature_c: i64,
    pub humidity_pct: u8,
    pub description: String,
    pub wind_speed_ms: f64,
    pub pressure_hpa: u32,
    pub visibility_km: f64,
    /// Rain over the last hour, when reported.
    pub rainfall_mm: Option<f64>,
    #[serde(default)]
    pub forecast: Vec<ForecastEntry>,
}

/// One forecast slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastEntry {
    /// `YYYY-MM-DD HH:MM` in UTC.
    pub time: String,
    pub temp_min_c: i64,
    pub temp_max_c: i64,
    pub description: String,
    pub humidity_pct: u8,
    pub rainfall_mm: f64,
}

// OpenWeatherMap wire types.

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    name: String,
    sys: Sys,
    main: Main,
    #[serde(default)]
    weather: Vec<Condition>,
    wind: Wind,
    #[serde(default)]
    visibility: Option<f64>,
    rain: Option<Rain>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastItem>,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt: i64,
    main: Main,
    #[serde(default)]
    weather: Vec<Condition>,
    rain: Option<Rain>,
}

#[derive(Debug, Deserialize)]
struct Sys {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    #[serde(default)]
    temp_min: f64,
    #[serde(default)]
    temp_max: f64,
    humidity: u8,
    #[serde(default)]
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Rain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

fn first_description(conditions: &[Condition]) -> String {
    conditions
        .first()
        .map(|c| c.description.clone())
        .unwrap_or_default()
}

impl From<CurrentResponse> for WeatherReport {
    fn from(raw: CurrentResponse) -> Self {
        let location = if raw.sys.country.is_empty() {
            raw.name
        } else {
            format!("{}, {}", raw.name, raw.sys.country)
        };
        Self {
            location,
            temperature_c: raw.main.temp.round() as i64,
            humidity_pct: raw.main.humidity,
            description: first_description(&raw.weather),
            wind_speed_ms: raw.wind.speed,
            pressure_hpa: raw.main.pressure,
            visibility_km: raw.visibility.unwrap_or(10_000.0) / 1000.0,
            rainfall_mm: raw.rain.and_then(|r| r.one_hour),
            forecast: Vec::new(),
        }
    }
}

impl From<ForecastItem> for ForecastEntry {
    fn from(item: ForecastItem) -> Self {
        let time = DateTime::from_timestamp(item.dt, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        Self {
            time,
            temp_min_c: item.main.temp_min.round() as i64,
            temp_max_c: item.main.temp_max.round() as i64,
            description: first_description(&item.weather),
            humidity_pct: item.main.humidity,
            rainfall_mm: item.rain.and_then(|r| r.three_hours).unwrap_or(0.0),
        }
    }
}

struct WeatherLabels {
    current: &'static str,
    location: &'static str,
    temperature: &'static str,
    humidity: &'static str,
    conditions: &'static str,
    wind: &'static str,
    pressure: &'static str,
    visibility: &'static str,
    rainfall: &'static str,
    forecast: &'static str,
}

static LABELS: LanguageTable<WeatherLabels> = LanguageTable::complete(
    WeatherLabels {
        current: "Current Weather",
        location: "Location",
        temperature: "Temperature",
        humidity: "Humidity",
        conditions: "Conditions",
        wind: "Wind Speed",
        pressure: "Pressure",
        visibility: "Visibility",
        rainfall: "Rainfall",
        forecast: "5-Day Forecast",
    },
    WeatherLabels {
        current: "वर्तमान मौसम",
        location: "स्थान",
        temperature: "तापमान",
        humidity: "आर्द्रता",
        conditions: "स्थितियां",
        wind: "हवा की गति",
        pressure: "दबाव",
        visibility: "दृश्यता",
        rainfall: "वर्षा",
        forecast: "5-दिन का पूर्वानुमान",
    },
    WeatherLabels {
        current: "ಪ್ರಸ್ತುತ ಹವಾಮಾನ",
        location: "ಸ್ಥಳ",
        temperature: "ತಾಪಮಾನ",
        humidity: "ಆರ್ದ್ರತೆ",
        conditions: "ಪರಿಸ್ಥಿತಿಗಳು",
        wind: "ಗಾಳಿಯ ವೇಗ",
        pressure: "ಒತ್ತಡ",
        visibility: "ಗೋಚರತೆ",
        rainfall: "ಮಳೆ",
        forecast: "5-ದಿನಗಳ ಮುನ್ಸೂಚನೆ",
    },
    WeatherLabels {
        current: "നിലവിലെ കാലാവസ്ഥ",
        location: "സ്ഥലം",
        temperature: "താപനില",
        humidity: "ഈർപ്പം",
        conditions: "അവസ്ഥകൾ",
        wind: "കാറ്റിന്റെ വേഗത",
        pressure: "മർദ്ദം",
        visibility: "ദൃശ്യത",
        rainfall: "മഴ",
        forecast: "5-ദിവസത്തെ പ്രവചനം",
    },
);

/// Formats a report as a labelled block in `language`.
#[must_use]
pub fn format_weather(report: &WeatherReport, language: Language) -> String {
    let t = LABELS.resolve(language);
    let mut out = format!("{}:\n", t.current);
    out.push_str(&format!("{}: {}\n", t.location, report.location));
    out.push_str(&format!("{}: {}°C\n", t.temperature, report.temperature_c));
    out.push_str(&format!("{}: {}%\n", t.humidity, report.humidity_pct));
    out.push_str(&format!("{}: {}\n", t.conditions, report.description));
    out.push_str(&format!("{}: {} m/s\n", t.wind, number(report.wind_speed_ms)));
    out.push_str(&format!("{}: {} hPa\n", t.pressure, report.pressure_hpa));
    out.push_str(&format!(
        "{}: {} km\n",
        t.visibility,
        number(report.visibility_km)
    ));
    if let Some(rain) = report.rainfall_mm.filter(|mm| *mm > 0.0) {
        out.push_str(&format!("{}: {} mm\n", t.rainfall, number(rain)));
    }

    if !report.forecast.is_empty() {
        out.push_str(&format!("\n{}:\n", t.forecast));
        for slot in &report.forecast {
            out.push_str(&format!(
                "{}: {}-{}°C, {}, {}: {}%\n",
                slot.time,
                slot.temp_min_c,
                slot.temp_max_c,
                slot.description,
                t.humidity,
                slot.humidity_pct
            ));
        }
    }
    out
}

/// Settings for [`WeatherSource`].
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
        }
    }
}

/// Weather source; needs a location in the query.
#[derive(Debug, Clone)]
pub struct WeatherSource {
    client: Client,
    config: WeatherConfig,
}

impl WeatherSource {
    #[must_use]
    pub fn new(client: Client, config: WeatherConfig) -> Self {
        Self { client, config }
    }

    fn api_key(&self) -> Result<&str, SourceError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(SourceError::NotConfigured {
                source: DataSourceKind::Weather,
            })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        location: &str,
        extra: &[(&str, &str)],
    ) -> Result<T, Report<SourceError>> {
        let api_key = self.api_key()?;
        let url = format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[("q", location), ("appid", api_key), ("units", "metric")])
            .query(extra)
            .send()
            .await
            .map_err(|e| SourceError::RequestFailed {
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(SourceError::UpstreamStatus {
                status: response.status().as_u16(),
            }
            .into());
        }
        Ok(response
            .json()
            .await
            .map_err(|e| SourceError::ResponseParseFailed {
                reason: e.to_string(),
            })?)
    }

    /// Fetches current conditions for `location`.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured or the request fails.
    pub async fn current(&self, location: &str) -> Result<WeatherReport, Report<SourceError>> {
        let raw: CurrentResponse = self.get("weather", location, &[]).await?;
        Ok(raw.into())
    }

    /// Fetches the next forecast slots for `location`.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured or the request fails.
    pub async fn forecast(&self, location: &str) -> Result<Vec<ForecastEntry>, Report<SourceError>> {
        let count = FORECAST_ENTRIES.to_string();
        let raw: ForecastResponse = self
            .get("forecast", location, &[("cnt", count.as_str())])
            .await?;
        Ok(raw.list.into_iter().map(ForecastEntry::from).collect())
    }

    /// Fetches current conditions and the forecast concurrently. A forecast
    /// failure leaves the report without forecast entries.
    ///
    /// # Errors
    ///
    /// Returns an error if current conditions cannot be fetched.
    pub async fn report(&self, location: &str) -> Result<WeatherReport, Report<SourceError>> {
        let (current, forecast) = tokio::join!(self.current(location), self.forecast(location));
        let mut report = current?;
        match forecast {
            Ok(entries) => report.forecast = entries,
            Err(e) => warn!(location, error = %e, "Weather forecast unavailable"),
        }
        debug!(location, forecast = report.forecast.len(), "Fetched weather");
        Ok(report)
    }
}

#[async_trait]
impl AuxiliarySource for WeatherSource {
    fn kind(&self) -> DataSourceKind {
        DataSourceKind::Weather
    }

    async fn fetch_block(&self, query: &SourceQuery) -> Result<String, Report<SourceError>> {
        let location = query
            .location
            .as_deref()
            .ok_or(SourceError::MissingParameter {
                source: DataSourceKind::Weather,
                parameter: "location",
            })?;
        let report = self.report(location).await?;
        Ok(format_weather(&report, query.language))
    }
}
