use std::error::Error as StdError;
use std::io;
use std::num::ParseIntError;
use std::result;
use std::time::Duration;

use thiserror::Error;

/// Type of general docker error response
#[derive(Debug, serde::Deserialize, Error)]
#[error("{message}")]
pub struct DockerError {
    pub message: String,
}

pub type Result<T> = result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error")]
    Io(#[source] io::Error),
    #[error("hyper error")]
    Hyper(#[source] hyper::Error),
    #[error("connection refused")]
    ConnectionRefused(#[source] Box<dyn StdError + Send + Sync>),
    #[error("connection reset")]
    ConnectionReset(#[source] Box<dyn StdError + Send + Sync>),
    #[error("failed to read response body")]
    Body(#[source] hyper::Error),
    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },
    #[error("failed to encode container filters")]
    Encode(#[source] serde_json::Error),
    #[error("json error")]
    Json(#[from] serde_json::Error),
    #[error("docker error")]
    Docker(#[from] DockerError),
    #[error("http error")]
    Http(#[from] http::Error),
    #[error("invalid uri: {}", var)]
    InvalidUri {
        var: String,
        source: http::uri::InvalidUri,
    },
    #[error("invalid timeout: {}", input)]
    InvalidTimeout {
        input: String,
        source: ParseIntError,
    },
    #[cfg(feature = "native-tls")]
    #[error("ssl error")]
    NativeTls(#[from] native_tls::Error),
    #[cfg(feature = "openssl")]
    #[error("ssl error")]
    OpenSsl(#[from] openssl::error::ErrorStack),
    #[error("could not connect: {}", addr)]
    CouldNotConnect { addr: String, source: Box<Error> },
    #[error("could not find DOCKER_CERT_PATH")]
    NoCertPath,
    #[error("ssl support was disabled at compile time")]
    SslDisabled,
    #[error("https host requires a tls configuration: {}", host)]
    MissingTlsConfig { host: String },
    #[error("tls configured for a plain http host: {}", host)]
    TlsOverHttp { host: String },
    #[error("unsupported scheme: {}", host)]
    UnsupportedScheme { host: String },
}

/// Finds the first `io::Error` in the cause chain of `err`.
fn io_error_kind(err: &(dyn StdError + 'static)) -> Option<io::ErrorKind> {
    let mut cause = err.source();
    while let Some(err) = cause {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        cause = err.source();
    }
    None
}

impl From<hyper::Error> for Error {
    fn from(err: hyper::Error) -> Self {
        if err.is_connect() {
            return match io_error_kind(&err) {
                Some(io::ErrorKind::ConnectionRefused) => Error::ConnectionRefused(Box::new(err)),
                Some(io::ErrorKind::ConnectionReset) => Error::ConnectionReset(Box::new(err)),
                _ => Error::Hyper(err),
            };
        }
        Error::Hyper(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Error::ConnectionRefused(Box::new(err)),
            io::ErrorKind::ConnectionReset => Error::ConnectionReset(Box::new(err)),
            _ => Error::Io(err),
        }
    }
}
