//! Connection settings for the docker daemon.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::*;

/// The default `DOCKER_HOST` address that we will try to connect to.
///
/// This is the unencrypted TCP port of a local engine.
pub static DEFAULT_DOCKER_HOST: &str = "tcp://localhost:2375";

/// Engine API version the container schema is pinned to.
pub static DEFAULT_API_VERSION: &str = "1.41";

/// Deadline for one request/response round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The default directory in which to look for our Docker certificate
/// files.
pub fn default_cert_path() -> Result<PathBuf> {
    let from_env = env::var("DOCKER_CERT_PATH").or_else(|_| env::var("DOCKER_CONFIG"));
    if let Ok(ref path) = from_env {
        Ok(PathBuf::from(path))
    } else {
        let home = dirs::home_dir().ok_or(Error::NoCertPath)?;
        Ok(home.join(".docker"))
    }
}

/// Client certificate material for a TLS-secured daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub key: PathBuf,
    pub cert: PathBuf,
    pub ca: PathBuf,
}

impl TlsConfig {
    /// `key.pem`, `cert.pem` and `ca.pem` inside `dir`
    pub fn from_dir(dir: PathBuf) -> Self {
        Self {
            key: dir.join("key.pem"),
            cert: dir.join("cert.pem"),
            ca: dir.join("ca.pem"),
        }
    }
}

/// Where and how to reach the docker daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerConfig {
    /// `unix://`, `tcp://`, `http://` or `https://` address
    pub host: String,
    /// client certificates; `None` talks plain http
    pub tls: Option<TlsConfig>,
    /// deadline for a request including its body; `None` waits forever
    pub timeout: Option<Duration>,
    /// `None` uses the unversioned API paths
    pub api_version: Option<String>,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DOCKER_HOST.to_owned(),
            tls: None,
            timeout: Some(DEFAULT_TIMEOUT),
            api_version: Some(DEFAULT_API_VERSION.to_owned()),
        }
    }
}

impl DockerConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self::default().host(host)
    }

    /// Read the configuration from the Docker environment.
    ///
    /// # Summary
    /// This includes:
    /// - `DOCKER_HOST`
    /// - `DOCKER_TLS_VERIFY`
    /// - `DOCKER_CERT_PATH`
    /// - `DOCKER_CONFIG`
    /// - `DOCKER_API_VERSION`
    /// - `DUMPSTER_TIMEOUT` (seconds, `0` disables the deadline)
    ///
    /// and we try to interpret these as much like the standard `docker` client as possible.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(host) = env::var("DOCKER_HOST") {
            config.host = host;
        }
        if env::var("DOCKER_TLS_VERIFY").is_ok() {
            config.tls = Some(TlsConfig::from_dir(default_cert_path()?));
        }
        if let Ok(version) = env::var("DOCKER_API_VERSION") {
            config.api_version = Some(version);
        }
        if let Ok(timeout) = env::var("DUMPSTER_TIMEOUT") {
            config.timeout = parse_timeout(&timeout)?;
        }
        Ok(config)
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_version(mut self, version: Option<String>) -> Self {
        self.api_version = version;
        self
    }

    /// Prefix every API path with the pinned version, e.g. `/v1.41`.
    pub(crate) fn api_path(&self, path: &str) -> String {
        match &self.api_version {
            Some(version) => format!("/v{}{}", version.trim_start_matches('v'), path),
            None => path.to_owned(),
        }
    }
}

/// Whole seconds; zero means no deadline.
pub fn parse_timeout(input: &str) -> Result<Option<Duration>> {
    let secs = input
        .trim()
        .parse::<u64>()
        .map_err(|source| Error::InvalidTimeout {
            input: input.to_owned(),
            source,
        })?;
    Ok(match secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    })
}
