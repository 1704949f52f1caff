use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::cli::ServeArgs;
use crate::serverinfo;

const ENV_PREFIX: &str = "NEXTCLOUD";

/// What a loaded configuration will be used for. The login flow only needs
/// the server URL, so credential validation is skipped for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunMode {
    Serve,
    Login,
}

/// Exporter configuration, merged from defaults, an optional YAML file,
/// `NEXTCLOUD_*` environment variables and CLI flags (highest precedence).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the Nextcloud server, e.g. "https://cloud.example.com".
    pub server: String,
    pub listen_address: String,
    pub timeout_seconds: u64,
    pub username: String,
    pub password: String,
    pub auth_token: String,
    pub tls_skip_verify: bool,
    pub skip_apps: bool,
    pub skip_update: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: String::new(),
            listen_address: ":9205".to_string(),
            timeout_seconds: 5,
            username: String::new(),
            password: String::new(),
            auth_token: String::new(),
            tls_skip_verify: false,
            skip_apps: false,
            skip_update: false,
        }
    }
}

/// Loads and validates the configuration for the given mode.
pub fn load(args: &ServeArgs, mode: RunMode) -> anyhow::Result<Config> {
    let mut builder = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?);

    if let Some(path) = &args.config_file {
        builder = builder.add_source(config::File::from(path.clone()));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX).try_parsing(true),
    );

    let mut cfg: Config = builder
        .build()
        .context("error reading configuration")?
        .try_deserialize()
        .context("error reading configuration")?;

    apply_flags(&mut cfg, args);
    resolve_password(&mut cfg)?;
    validate(&cfg, mode)?;

    Ok(cfg)
}

fn apply_flags(cfg: &mut Config, args: &ServeArgs) {
    if let Some(server) = &args.server {
        cfg.server = server.clone();
    }
    if let Some(addr) = &args.addr {
        cfg.listen_address = addr.clone();
    }
    if let Some(timeout) = args.timeout_seconds {
        cfg.timeout_seconds = timeout;
    }
    if let Some(username) = &args.username {
        cfg.username = username.clone();
    }
    if let Some(password) = &args.password {
        cfg.password = password.clone();
    }
    if let Some(token) = &args.auth_token {
        cfg.auth_token = token.clone();
    }
    if args.tls_skip_verify {
        cfg.tls_skip_verify = true;
    }
    if args.skip_apps {
        cfg.skip_apps = true;
    }
    if args.skip_update {
        cfg.skip_update = true;
    }
}

/// A password of the form "@/path/to/file" is replaced by the file's content
/// with the trailing newline removed.
fn resolve_password(cfg: &mut Config) -> anyhow::Result<()> {
    if let Some(file_name) = cfg.password.strip_prefix('@') {
        let password = std::fs::read_to_string(file_name)
            .with_context(|| format!("can not read password file {file_name:?}"))?;
        let password = password.trim_end_matches(['\r', '\n']);
        if password.is_empty() {
            bail!("read empty password from file {file_name:?}");
        }
        cfg.password = password.to_string();
    }
    Ok(())
}

fn validate(cfg: &Config, mode: RunMode) -> anyhow::Result<()> {
    if cfg.server.is_empty() {
        bail!("need to set a server URL");
    }

    if mode == RunMode::Serve
        && cfg.auth_token.is_empty()
        && (cfg.username.is_empty() || cfg.password.is_empty())
    {
        bail!("need to provide either an auth token or a username and password");
    }

    Ok(())
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// The full serverinfo endpoint URL for this configuration.
    pub fn info_url(&self) -> String {
        serverinfo::info_url(&self.server, self.skip_apps, self.skip_update)
    }

    /// Listen address as a socket address; a bare ":port" binds all
    /// interfaces.
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        };
        addr.parse()
            .with_context(|| format!("invalid listen address {:?}", self.listen_address))
    }

    pub fn auth_token(&self) -> Option<String> {
        if self.auth_token.is_empty() {
            None
        } else {
            Some(self.auth_token.clone())
        }
    }
}

/// User agent sent with every request to the Nextcloud server.
pub fn user_agent() -> String {
    format!("nextcloud-exporter/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve_args() -> ServeArgs {
        ServeArgs {
            server: Some("https://cloud.example.com".to_string()),
            username: Some("exporter".to_string()),
            password: Some("secret".to_string()),
            ..ServeArgs::default()
        }
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.listen_address, ":9205");
        assert_eq!(cfg.timeout(), Duration::from_secs(5));
        assert!(!cfg.tls_skip_verify);
    }

    #[test]
    fn test_flags_override_defaults() {
        let mut args = serve_args();
        args.addr = Some("127.0.0.1:9300".to_string());
        args.timeout_seconds = Some(10);

        let cfg = load(&args, RunMode::Serve).unwrap();
        assert_eq!(cfg.listen_address, "127.0.0.1:9300");
        assert_eq!(cfg.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.username, "exporter");
    }

    #[test]
    fn test_serve_requires_credentials() {
        let args = ServeArgs {
            server: Some("https://cloud.example.com".to_string()),
            ..ServeArgs::default()
        };
        let err = load(&args, RunMode::Serve).unwrap_err();
        assert!(err.to_string().contains("auth token"));
    }

    #[test]
    fn test_token_alone_is_enough() {
        let args = ServeArgs {
            server: Some("https://cloud.example.com".to_string()),
            auth_token: Some("app-password".to_string()),
            ..ServeArgs::default()
        };
        let cfg = load(&args, RunMode::Serve).unwrap();
        assert_eq!(cfg.auth_token(), Some("app-password".to_string()));
    }

    #[test]
    fn test_login_needs_only_server() {
        let args = ServeArgs {
            server: Some("https://cloud.example.com".to_string()),
            ..ServeArgs::default()
        };
        assert!(load(&args, RunMode::Login).is_ok());
    }

    #[test]
    fn test_missing_server_fails() {
        let err = load(&ServeArgs::default(), RunMode::Serve).unwrap_err();
        assert!(err.to_string().contains("server URL"));
    }

    #[test]
    fn test_password_file() {
        let dir = std::env::temp_dir();
        let path = dir.join("nextcloud-exporter-config-test-password");
        std::fs::write(&path, "from-file\n").unwrap();

        let mut args = serve_args();
        args.password = Some(format!("@{}", path.display()));

        let cfg = load(&args, RunMode::Serve).unwrap();
        assert_eq!(cfg.password, "from-file");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_empty_password_file_fails() {
        let dir = std::env::temp_dir();
        let path = dir.join("nextcloud-exporter-config-test-empty-password");
        std::fs::write(&path, "\n").unwrap();

        let mut args = serve_args();
        args.password = Some(format!("@{}", path.display()));

        assert!(load(&args, RunMode::Serve).is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_listen_addr_default_host() {
        let cfg = Config {
            listen_address: ":9205".to_string(),
            ..Config::default()
        };
        assert_eq!(cfg.listen_addr().unwrap(), "0.0.0.0:9205".parse().unwrap());
    }

    #[test]
    fn test_info_url_from_config() {
        let cfg = Config {
            server: "https://cloud.example.com".to_string(),
            skip_apps: true,
            ..Config::default()
        };
        assert_eq!(
            cfg.info_url(),
            "https://cloud.example.com/ocs/v2.php/apps/serverinfo/api/v1/info?format=json&skipApps=true&skipUpdate=false"
        );
    }
}
