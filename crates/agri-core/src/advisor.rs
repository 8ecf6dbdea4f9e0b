//! HTTP client for the external ML recommendation service.
//!
//! Strictly best-effort: the call is bounded by a timeout and every failure
//! path collapses to `None`. A submission must never fail because the ML
//! service is down.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ports::{MlAdvice, MlAdvisor};
use crate::types::SoilReading;

const ML_TIMEOUT: Duration = Duration::from_secs(3);

pub struct HttpMlAdvisor {
    client: reqwest::Client,
    url: String,
}

impl HttpMlAdvisor {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[derive(Serialize)]
struct MlRequest<'a> {
    #[serde(rename = "soilType")]
    soil_type: &'a str,
    #[serde(rename = "pH")]
    ph: f64,
    moisture: f64,
    nitrogen: f64,
    phosphorus: f64,
    potassium: f64,
}

#[derive(Deserialize)]
struct MlResponse {
    crop: String,
    fertilizer: String,
    #[serde(default)]
    confidence: Option<f64>,
}

#[async_trait]
impl MlAdvisor for HttpMlAdvisor {
    async fn advise(&self, reading: &SoilReading) -> Option<MlAdvice> {
        let body = MlRequest {
            soil_type: reading.soil_type.as_str(),
            ph: reading.ph,
            moisture: reading.moisture,
            nitrogen: reading.nitrogen,
            phosphorus: reading.phosphorus,
            potassium: reading.potassium,
        };

        let send = self.client.post(&self.url).json(&body).send();
        let response = match tokio::time::timeout(ML_TIMEOUT, send).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                tracing::warn!("ML service call failed: {}", e);
                return None;
            }
            Err(_) => {
                tracing::warn!("ML service call timed out after {:?}", ML_TIMEOUT);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!("ML service returned {}", response.status());
            return None;
        }

        match response.json::<MlResponse>().await {
            Ok(parsed) => Some(MlAdvice {
                crop: parsed.crop,
                fertilizer: parsed.fertilizer,
                confidence: parsed.confidence.unwrap_or(0.0),
            }),
            Err(e) => {
                tracing::warn!("ML service returned malformed body: {}", e);
                None
            }
        }
    }
}
