//! HTTP client for the pricing backend's persistence endpoints.
//!
//! Wraps the JSON key-value endpoints (user settings, automation rules and
//! settings, learning log) using [`reqwest`]. Every response is an envelope
//! of the form `{ "ok": bool, <field>: ... }`.

use std::time::Duration;

use async_trait::async_trait;
use autoprice_core::Adjustment;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::remote::RemoteStore;
use crate::state::SettingsDocument;

pub const USER_SETTINGS_LOAD: &str = "/api/user-settings/load";
pub const USER_SETTINGS_SAVE: &str = "/api/user-settings/save";
pub const RULES_LOAD: &str = "/api/price-automation/rules/load";
pub const RULES_SAVE: &str = "/api/price-automation/rules/save";
pub const AUTOMATION_SETTINGS_LOAD: &str = "/api/price-automation/settings/load";
pub const AUTOMATION_SETTINGS_SAVE: &str = "/api/price-automation/settings/save";
pub const LEARNING_LOAD: &str = "/api/ai/learning/load";
pub const LEARNING_SAVE: &str = "/api/ai/learning/save";

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SettingsEnvelope<T> {
    #[serde(default)]
    ok: bool,
    settings: Option<T>,
}

#[derive(Debug, Deserialize)]
struct RulesEnvelope {
    #[serde(default)]
    ok: bool,
    rules: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AdjustmentsEnvelope {
    #[serde(default)]
    ok: bool,
    adjustments: Option<Vec<Adjustment>>,
}

/// Write acknowledgement. Backends that answer with an empty or non-JSON
/// body are treated as accepting the write.
#[derive(Debug, Deserialize)]
struct Ack {
    ok: Option<bool>,
    error: Option<String>,
}

/// Keep a loaded field only if the envelope reported success.
fn accepted<T>(ok: bool, field: Option<T>) -> Option<T> {
    if ok {
        field
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`RemoteStore`] backed by the pricing backend's REST API.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    api_url: String,
    load_timeout: Duration,
    save_timeout: Duration,
}

impl HttpRemoteStore {
    /// Create a client for `config.api_url` using the configured deadlines.
    pub fn new(config: &SyncConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &SyncConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            load_timeout: config.load_timeout,
            save_timeout: config.save_timeout,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SyncError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .timeout(self.load_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.load_timeout))?;

        Self::parse_response(response, self.load_timeout).await
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<(), SyncError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .timeout(self.save_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.save_timeout))?;

        let response = Self::ensure_success(response).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e, self.save_timeout))?;

        match serde_json::from_slice::<Ack>(&body) {
            Ok(Ack {
                ok: Some(false),
                error,
            }) => Err(SyncError::Rejected(
                error.unwrap_or_else(|| "no reason given".to_string()),
            )),
            _ => Ok(()),
        }
    }

    fn transport_error(&self, err: reqwest::Error, deadline: Duration) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(deadline)
        } else {
            SyncError::Request(err)
        }
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or [`SyncError::HttpStatus`] with the body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected envelope.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
        deadline: Duration,
    ) -> Result<T, SyncError> {
        let response = Self::ensure_success(response).await?;
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                SyncError::Timeout(deadline)
            } else {
                SyncError::Request(e)
            }
        })?;
        serde_json::from_slice(&body).map_err(|e| SyncError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn load_settings(&self, user_key: &str) -> Result<Option<SettingsDocument>, SyncError> {
        let envelope: SettingsEnvelope<SettingsDocument> =
            self.get(USER_SETTINGS_LOAD, &[("user_key", user_key)]).await?;
        Ok(accepted(envelope.ok, envelope.settings))
    }

    async fn save_settings(
        &self,
        user_key: &str,
        settings: &SettingsDocument,
    ) -> Result<(), SyncError> {
        let body = serde_json::json!({
            "user_key": user_key,
            "settings": settings,
        });
        self.post(USER_SETTINGS_SAVE, &body).await
    }

    async fn load_rules(&self) -> Result<Option<serde_json::Value>, SyncError> {
        let envelope: RulesEnvelope = self.get(RULES_LOAD, &[]).await?;
        Ok(accepted(envelope.ok, envelope.rules))
    }

    async fn save_rules(&self, rules: &serde_json::Value) -> Result<(), SyncError> {
        self.post(RULES_SAVE, &serde_json::json!({ "rules": rules })).await
    }

    async fn load_automation_settings(&self) -> Result<Option<serde_json::Value>, SyncError> {
        let envelope: SettingsEnvelope<serde_json::Value> =
            self.get(AUTOMATION_SETTINGS_LOAD, &[]).await?;
        Ok(accepted(envelope.ok, envelope.settings))
    }

    async fn save_automation_settings(
        &self,
        settings: &serde_json::Value,
    ) -> Result<(), SyncError> {
        self.post(AUTOMATION_SETTINGS_SAVE, &serde_json::json!({ "settings": settings }))
            .await
    }

    async fn load_adjustments(&self) -> Result<Option<Vec<Adjustment>>, SyncError> {
        let envelope: AdjustmentsEnvelope = self.get(LEARNING_LOAD, &[]).await?;
        Ok(accepted(envelope.ok, envelope.adjustments))
    }

    async fn append_adjustment(&self, adjustment: &Adjustment) -> Result<(), SyncError> {
        self.post(LEARNING_SAVE, &serde_json::json!({ "adjustment": adjustment }))
            .await
    }
}
