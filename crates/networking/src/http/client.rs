//! Relay HTTP client with bearer-token authentication

use relay_core::{
    ApiErrorBody, CheckInConfig, CheckInStatus, CreditHistory, Error, Profile, Result,
    SpinResponse,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION},
    Client, Response,
};
use tracing::{debug, error, instrument};

/// HTTP client for the relay console API
///
/// All requests carry the session's bearer token. One client instance is
/// bound to one token; a token change means a new client.
#[derive(Clone)]
pub struct ConsoleClient {
    http: Client,
    base_url: String,
    token: String,
}

impl ConsoleClient {
    /// Create a new client for the given backend and bearer token
    pub fn new(base_url: &str, token: &str) -> Self {
        let http = Client::builder()
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Default headers for authenticated requests
    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.token)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    /// Check if response indicates authentication failure
    fn check_auth_error(response: &Response) -> Option<Error> {
        match response.status().as_u16() {
            401 => Some(Error::TokenExpired),
            403 => Some(Error::AuthenticationError("Access forbidden".to_string())),
            _ => None,
        }
    }

    /// Get the current user's profile
    #[instrument(skip(self))]
    pub async fn get_profile(&self) -> Result<Profile> {
        let url = format!("{}/me", self.base_url);

        debug!("Fetching profile from: {}", url);

        let response = self
            .http
            .get(&url)
            .headers(self.auth_headers())
            .send()
            .await?;

        if let Some(err) = Self::check_auth_error(&response) {
            return Err(err);
        }

        let response = response.error_for_status().map_err(|e| {
            error!("Profile request failed: {}", e);
            Error::ApiError(e.to_string())
        })?;

        let profile: Profile = response.json().await.map_err(|e| {
            error!("Failed to parse profile response: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        debug!("Profile fetched for user: {}", profile.username);
        Ok(profile)
    }

    /// Get the check-in wheel configuration
    #[instrument(skip(self))]
    pub async fn get_check_in_config(&self) -> Result<CheckInConfig> {
        let url = format!("{}/me/check_in/config", self.base_url);

        let response = self
            .http
            .get(&url)
            .headers(self.auth_headers())
            .send()
            .await?;

        if let Some(err) = Self::check_auth_error(&response) {
            return Err(err);
        }

        let response = response.error_for_status().map_err(|e| {
            error!("Check-in config request failed: {}", e);
            Error::ApiError(e.to_string())
        })?;

        let config: CheckInConfig = response.json().await.map_err(|e| {
            error!("Failed to parse check-in config: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        debug!(
            "Check-in config fetched: {} reward options, base reward {}",
            config.reward_options.len(),
            config.base_reward
        );
        Ok(config)
    }

    /// Get today's check-in status
    #[instrument(skip(self))]
    pub async fn get_check_in_status(&self) -> Result<CheckInStatus> {
        let url = format!("{}/me/check_in/status", self.base_url);

        let response = self
            .http
            .get(&url)
            .headers(self.auth_headers())
            .send()
            .await?;

        if let Some(err) = Self::check_auth_error(&response) {
            return Err(err);
        }

        let response = response.error_for_status().map_err(|e| {
            error!("Check-in status request failed: {}", e);
            Error::ApiError(e.to_string())
        })?;

        let status: CheckInStatus = response.json().await.map_err(|e| {
            error!("Failed to parse check-in status: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        debug!(
            "Check-in status: checked_in_today={}, streak={}",
            status.checked_in_today, status.streak
        );
        Ok(status)
    }

    /// Perform today's check-in spin
    ///
    /// A concurrent check-in that already consumed today's spin comes back
    /// as [`Error::AlreadyCheckedIn`], which callers treat as benign.
    #[instrument(skip(self))]
    pub async fn spin(&self) -> Result<SpinResponse> {
        let url = format!("{}/me/check_in/spin", self.base_url);

        debug!("Submitting check-in spin");

        let response = self
            .http
            .post(&url)
            .headers(self.auth_headers())
            .json(&serde_json::json!({}))
            .send()
            .await?;

        if let Some(err) = Self::check_auth_error(&response) {
            return Err(err);
        }

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_spin_failure(status.as_u16(), &body));
        }

        let spin: SpinResponse = response.json().await.map_err(|e| {
            error!("Failed to parse spin response: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        debug!(
            "Spin result: index={}, {} credits",
            spin.reward.wheel_index, spin.reward.final_credits
        );
        Ok(spin)
    }

    /// Map a failed spin response body to an error.
    ///
    /// `already_checked_in` is a recognized race, everything else is a plain
    /// API failure.
    fn map_spin_failure(status: u16, body: &str) -> Error {
        if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
            if parsed.error == "already_checked_in" {
                return Error::AlreadyCheckedIn;
            }
        }
        error!("Spin request failed: HTTP {}: {}", status, body);
        Error::ApiError(format!("HTTP {}: {}", status, body))
    }

    /// Get the user's paged credit history
    #[instrument(skip(self))]
    pub async fn get_credit_history(&self, page: u32, page_size: u32) -> Result<CreditHistory> {
        let url = format!(
            "{}/me/credit/history?page={}&page_size={}",
            self.base_url, page, page_size
        );

        let response = self
            .http
            .get(&url)
            .headers(self.auth_headers())
            .send()
            .await?;

        if let Some(err) = Self::check_auth_error(&response) {
            return Err(err);
        }

        let response = response.error_for_status().map_err(|e| {
            error!("Credit history request failed: {}", e);
            Error::ApiError(e.to_string())
        })?;

        let history: CreditHistory = response.json().await.map_err(|e| {
            error!("Failed to parse credit history: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        debug!("Fetched {} credit transactions", history.items.len());
        Ok(history)
    }

    /// Get the bearer token this client was built with
    pub fn token(&self) -> &str {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_checked_in_body_maps_to_benign_error() {
        let err = ConsoleClient::map_spin_failure(400, r#"{"error":"already_checked_in"}"#);
        assert!(matches!(err, Error::AlreadyCheckedIn));
    }

    #[test]
    fn other_error_bodies_stay_api_errors() {
        let err = ConsoleClient::map_spin_failure(500, r#"{"error":"failed to check in"}"#);
        assert!(matches!(err, Error::ApiError(_)));

        let err = ConsoleClient::map_spin_failure(502, "<html>bad gateway</html>");
        assert!(matches!(err, Error::ApiError(_)));
    }
}
