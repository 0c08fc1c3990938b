//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per admin endpoint. When API routes change,
//! update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Sent as `x-admin-key` when set
    admin_key: Option<String>,
}

impl TestClient {
    /// Client that sends no admin key
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            admin_key: None,
        }
    }

    /// Client that sends the configured admin key
    pub fn admin(base_url: String) -> Self {
        Self::with_key(base_url, TEST_ADMIN_KEY)
    }

    pub fn with_key(base_url: String, key: &str) -> Self {
        Self {
            admin_key: Some(key.to_string()),
            ..Self::new(base_url)
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/api/admin{}", self.base_url, path));
        match &self.admin_key {
            Some(key) => builder.header("x-admin-key", key),
            None => builder,
        }
    }

    // ========================================================================
    // Admin Endpoints
    // ========================================================================

    /// GET /api/admin/status
    pub async fn get_status(&self) -> Response {
        self.request(reqwest::Method::GET, "/status")
            .send()
            .await
            .expect("Status request failed")
    }

    /// GET /api/admin/status?key=...
    #[allow(dead_code)]
    pub async fn get_status_with_query_key(&self, key: &str) -> Response {
        self.client
            .get(format!("{}/api/admin/status", self.base_url))
            .query(&[("key", key)])
            .send()
            .await
            .expect("Status request failed")
    }

    /// POST /api/admin/scrape/{source}
    pub async fn trigger_scrape(&self, source: &str) -> Response {
        self.request(reqwest::Method::POST, &format!("/scrape/{}", source))
            .send()
            .await
            .expect("Scrape request failed")
    }

    /// POST /api/admin/stop
    #[allow(dead_code)]
    pub async fn stop_scrape(&self) -> Response {
        self.request(reqwest::Method::POST, "/stop")
            .send()
            .await
            .expect("Stop request failed")
    }

    /// GET /api/admin/logs with raw query pairs
    pub async fn get_logs(&self, query: &[(&str, &str)]) -> Response {
        self.request(reqwest::Method::GET, "/logs")
            .query(query)
            .send()
            .await
            .expect("Logs request failed")
    }

    /// DELETE /api/admin/data/{source}
    #[allow(dead_code)]
    pub async fn delete_data(&self, source: &str) -> Response {
        self.request(reqwest::Method::DELETE, &format!("/data/{}", source))
            .send()
            .await
            .expect("Delete request failed")
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Audit entries as returned by GET /api/admin/logs
    pub async fn log_entries(&self, query: &[(&str, &str)]) -> Vec<Value> {
        let response = self.get_logs(query).await;
        assert!(response.status().is_success(), "Logs request was refused");
        let body: Value = response.json().await.expect("Invalid logs body");
        body["data"].as_array().cloned().unwrap_or_default()
    }

    /// Polls the audit log until it holds at least `count` entries
    ///
    /// # Panics
    ///
    /// Panics if the entries don't show up within the settle timeout.
    pub async fn wait_for_log_count(&self, count: usize) -> Vec<Value> {
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SCRAPE_SETTLE_TIMEOUT_MS);
        loop {
            let entries = self.log_entries(&[]).await;
            if entries.len() >= count {
                return entries;
            }
            if start.elapsed() > timeout {
                panic!(
                    "Expected {} log entries within {}ms, got {}",
                    count,
                    SCRAPE_SETTLE_TIMEOUT_MS,
                    entries.len()
                );
            }
            tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
        }
    }
}
