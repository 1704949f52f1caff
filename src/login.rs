use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const STATUS_PATH: &str = "/status.php";
const LOGIN_PATH: &str = "/index.php/login/v2";
const MINIMUM_MAJOR_VERSION: u64 = 16;
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct LoginInfo {
    login: String,
    poll: PollInfo,
}

#[derive(Debug, Deserialize)]
struct PollInfo {
    token: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordInfo {
    login_name: String,
    app_password: String,
}

/// Credentials obtained at the end of an interactive login session.
#[derive(Debug)]
pub struct Login {
    pub username: String,
    pub password: String,
}

/// Client for the interactive Login flow v2 of a Nextcloud server.
///
/// The end result is an app password for the exporter, to be used instead of
/// the user's own password.
pub struct LoginClient {
    client: reqwest::Client,
    server_url: String,
    poll_interval: Duration,
}

impl LoginClient {
    pub fn new(
        server_url: String,
        user_agent: &str,
        tls_skip_verify: bool,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .danger_accept_invalid_certs(tls_skip_verify)
            .build()?;

        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
            poll_interval: POLL_INTERVAL,
        })
    }

    #[cfg(test)]
    fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs the interactive login session: prints the browser URL, then
    /// polls until the user has confirmed the login there.
    pub async fn start_interactive(&self) -> Result<Login> {
        let version = self
            .major_version()
            .await
            .context("error getting version")?;
        if version < MINIMUM_MAJOR_VERSION {
            bail!(
                "Nextcloud version too old for login: {version} Minimum: {MINIMUM_MAJOR_VERSION}"
            );
        }

        let login_info = self.login_info().await.context("error getting login info")?;
        info!("Please open this URL in a browser: {}", login_info.login);
        info!("Waiting for login ... (Ctrl-C to abort)");

        self.poll_login(login_info.poll)
            .await
            .context("error during poll")
    }

    async fn major_version(&self) -> Result<u64> {
        let status_url = format!("{}{}", self.server_url, STATUS_PATH);
        let response = self
            .client
            .get(&status_url)
            .send()
            .await
            .context("error connecting")?;

        if !response.status().is_success() {
            bail!("non-ok status: {}", response.status().as_u16());
        }

        #[derive(Deserialize)]
        struct Status {
            version: String,
        }

        let status: Status = response.json().await.context("error decoding status")?;
        let major = status.version.split('.').next().unwrap_or_default();
        major
            .parse()
            .with_context(|| format!("can not parse {:?} as version", status.version))
    }

    async fn login_info(&self) -> Result<LoginInfo> {
        let login_url = format!("{}{}", self.server_url, LOGIN_PATH);
        let response = self
            .client
            .post(&login_url)
            .send()
            .await
            .context("error connecting")?;

        if !response.status().is_success() {
            bail!("non-ok status: {}", response.status().as_u16());
        }

        response.json().await.context("error decoding login info")
    }

    /// The poll endpoint answers 404 until the user completes the login in
    /// the browser, then 200 with the app password.
    async fn poll_login(&self, info: PollInfo) -> Result<Login> {
        debug!("poll endpoint: {}", info.endpoint);

        loop {
            tokio::time::sleep(self.poll_interval).await;

            let response = match self
                .client
                .post(&info.endpoint)
                .form(&[("token", info.token.as_str())])
                .send()
                .await
            {
                Ok(response) => response,
                Err(_) => continue,
            };

            if !response.status().is_success() {
                debug!("poll status: {}", response.status().as_u16());
                continue;
            }

            let password: PasswordInfo =
                response.json().await.context("error decoding password info")?;

            return Ok(Login {
                username: password.login_name,
                password: password.app_password,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_client(server: &MockServer) -> LoginClient {
        LoginClient::new(server.base_url(), "nextcloud-exporter/test", false)
            .unwrap()
            .with_poll_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_rejects_old_server() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/status.php");
            then.status(200)
                .json_body(serde_json::json!({"version": "15.0.2.1"}));
        });

        let err = test_client(&server).start_interactive().await.unwrap_err();
        assert!(err.to_string().contains("too old"));
    }

    #[tokio::test]
    async fn test_unparsable_version() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/status.php");
            then.status(200)
                .json_body(serde_json::json!({"version": "unknown"}));
        });

        let err = test_client(&server).start_interactive().await.unwrap_err();
        assert!(err.to_string().contains("error getting version"));
    }

    #[tokio::test]
    async fn test_full_login_flow() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/status.php");
            then.status(200)
                .json_body(serde_json::json!({"version": "29.0.1.1"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/index.php/login/v2");
            then.status(200).json_body(serde_json::json!({
                "login": server.url("/login/flow/abc"),
                "poll": {
                    "token": "poll-token",
                    "endpoint": server.url("/login/v2/poll"),
                }
            }));
        });
        let poll = server.mock(|when, then| {
            when.method(POST)
                .path("/login/v2/poll")
                .body("token=poll-token");
            then.status(200).json_body(serde_json::json!({
                "server": server.base_url(),
                "loginName": "exporter",
                "appPassword": "generated-app-password",
            }));
        });

        let login = test_client(&server).start_interactive().await.unwrap();
        assert_eq!(login.username, "exporter");
        assert_eq!(login.password, "generated-app-password");
        poll.assert();
    }
}
