use reqwest::StatusCode;
use std::time::Duration;

use crate::error::ScrapeError;
use crate::serverinfo::{self, ServerInfo};

/// Custom header used for app-password authentication.
const TOKEN_HEADER: &str = "NC-Token";
/// Set by the server on 503 responses while in maintenance mode.
const MAINTENANCE_HEADER: &str = "X-Nextcloud-Maintenance-Mode";

/// HTTP client for the serverinfo endpoint.
///
/// All request parameters are fixed at construction; every [`fetch`] call is
/// one independent GET with no retries and no state shared between calls, so
/// a client can be used from concurrent scrapes freely.
///
/// [`fetch`]: InfoClient::fetch
pub struct InfoClient {
    client: reqwest::Client,
    info_url: String,
    username: String,
    password: String,
    auth_token: Option<String>,
}

impl InfoClient {
    /// Creates a client for the given info URL.
    ///
    /// When `auth_token` is set it takes precedence over the basic-auth
    /// credentials. `tls_skip_verify` disables certificate verification for
    /// self-signed deployments and is explicitly opt-in.
    pub fn new(
        info_url: String,
        username: String,
        password: String,
        auth_token: Option<String>,
        timeout: Duration,
        user_agent: &str,
        tls_skip_verify: bool,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .danger_accept_invalid_certs(tls_skip_verify)
            .build()?;

        Ok(Self {
            client,
            info_url,
            username,
            password,
            auth_token,
        })
    }

    /// Performs one GET against the info URL and classifies the response.
    ///
    /// On 200 the body bytes are returned uninterpreted; every other status
    /// maps to its own [`ScrapeError`] variant. The connection is released
    /// on all paths once the response (or error) is dropped.
    pub async fn fetch(&self) -> Result<Vec<u8>, ScrapeError> {
        let mut request = self.client.get(&self.info_url);
        request = match &self.auth_token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request.basic_auth(&self.username, Some(&self.password)),
        };

        let response = request.send().await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => return Err(ScrapeError::NotAuthorized),
            StatusCode::TOO_MANY_REQUESTS => return Err(ScrapeError::RateLimited),
            StatusCode::SERVICE_UNAVAILABLE => {
                if response.headers().contains_key(MAINTENANCE_HEADER) {
                    return Err(ScrapeError::MaintenanceMode);
                }
                return Err(ScrapeError::Unavailable);
            }
            status => return Err(ScrapeError::UnexpectedStatus(status.as_u16())),
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// One full scrape unit: fetch the body and decode it as JSON.
    pub async fn fetch_info(&self) -> Result<ServerInfo, ScrapeError> {
        let body = self.fetch().await?;
        serverinfo::decode_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_construction() {
        let client = InfoClient::new(
            "https://nextcloud.example.com/ocs/v2.php/apps/serverinfo/api/v1/info".to_string(),
            "exporter".to_string(),
            "secret".to_string(),
            None,
            Duration::from_secs(5),
            "nextcloud-exporter/0.8.0",
            false,
        );
        assert!(client.is_ok());
    }
}
