//! Remote CSV source for the ingest stage.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::domain::Table;
use crate::error::AppError;
use crate::io::ingest::read_csv_table;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Blocking HTTP client for a single CSV resource.
pub struct CsvSource {
    client: Client,
    url: String,
}

impl CsvSource {
    pub fn new(url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the resource and parse it with the missing-value token set.
    ///
    /// Any transport error, non-success status or parse error aborts the stage.
    pub fn fetch_table(&self) -> Result<Table, AppError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| AppError::new(4, format!("Request to '{}' failed: {e}", self.url)))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("Request to '{}' failed with status {}.", self.url, resp.status()),
            ));
        }

        let body = resp
            .bytes()
            .map_err(|e| AppError::new(4, format!("Failed to read response from '{}': {e}", self.url)))?;

        read_csv_table(body.as_ref())
    }
}
