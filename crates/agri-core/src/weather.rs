//! OpenWeather client. Same best-effort contract as the ML advisor: bounded
//! by a timeout, `None` on any failure. The service layer falls back to the
//! latest stored snapshot.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::ports::WeatherProvider;
use crate::types::WeatherSnapshot;

const WEATHER_TIMEOUT: Duration = Duration::from_secs(5);

pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct OwmResponse {
    name: String,
    main: OwmMain,
    wind: OwmWind,
    #[serde(default)]
    rain: Option<OwmRain>,
}

#[derive(Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
}

#[derive(Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Deserialize)]
struct OwmRain {
    #[serde(rename = "1h", default)]
    one_hour: Option<f64>,
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch(&self, location: &str) -> Option<WeatherSnapshot> {
        let url = format!(
            "https://api.openweathermap.org/data/2.5/weather?q={}&appid={}&units=metric",
            location, self.api_key
        );

        let send = self.client.get(&url).send();
        let response = match tokio::time::timeout(WEATHER_TIMEOUT, send).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                tracing::warn!("weather fetch failed: {}", e);
                return None;
            }
            Err(_) => {
                tracing::warn!("weather fetch timed out after {:?}", WEATHER_TIMEOUT);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!("weather API returned {}", response.status());
            return None;
        }

        match response.json::<OwmResponse>().await {
            Ok(data) => Some(WeatherSnapshot {
                location: data.name,
                temperature_c: data.main.temp,
                humidity_pct: data.main.humidity,
                precipitation_mm: data.rain.and_then(|r| r.one_hour).unwrap_or(0.0),
                wind_speed_ms: data.wind.speed,
                observed_at: Utc::now(),
            }),
            Err(e) => {
                tracing::warn!("weather API returned malformed body: {}", e);
                None
            }
        }
    }
}
