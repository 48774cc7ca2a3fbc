//! ---
//! fao_section: "05-networking-external-interfaces"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "HTTP client for the daemon API."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FactoryClient {
    http: Client,
    base: String,
}

impl FactoryClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Value> {
        debug!(path, "calling daemon");
        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.url(path)))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .with_context(|| format!("invalid JSON from {path}"))?;
        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            bail!("{path} returned {status}: {message}");
        }
        Ok(body)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.send(self.http.get(self.url(path)), path).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<Value> {
        let mut request = self.http.post(self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.send(request, path).await
    }

    pub async fn analyze(&self) -> Result<Value> {
        self.post("/analyze", None).await
    }

    pub async fn digital_twin(&self) -> Result<Value> {
        self.get("/digital-twin").await
    }

    pub async fn photogrammetry(&self, payload: Value) -> Result<Value> {
        self.post("/digital-twin/photogrammetry", Some(payload)).await
    }

    pub async fn inspect(&self, area: &str, drone_id: Option<&str>) -> Result<Value> {
        let mut body = json!({ "area": area });
        if let Some(drone_id) = drone_id {
            body["droneId"] = json!(drone_id);
        }
        self.post("/drone-inspect", Some(body)).await
    }

    pub async fn drones(&self) -> Result<Value> {
        self.get("/drones").await
    }

    pub async fn simulate(&self, hours: f64, speed: f64) -> Result<Value> {
        self.post("/simulate-production", Some(json!({ "hours": hours, "speed": speed })))
            .await
    }

    pub async fn cost_benefit(&self, suggestion_id: &str) -> Result<Value> {
        self.get(&format!("/cost-benefit/{suggestion_id}")).await
    }

    pub async fn config(&self) -> Result<Value> {
        self.get("/config").await
    }

    pub async fn layout(&self) -> Result<Value> {
        self.get("/factory-layout").await
    }

    pub async fn health(&self) -> Result<Value> {
        self.get("/health").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalised() {
        let client = FactoryClient::new("http://127.0.0.1:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/drones"), "http://127.0.0.1:3000/drones");
    }
}
