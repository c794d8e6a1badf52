//! Discovery of the containers that opt in to automated backup
//!
//! Containers carrying the `dumpster.enable=true` label are listed through the
//! Docker Engine API; see [`Docker::query_containers`].

pub mod config;
pub mod container;
mod docker;
pub mod errors;
mod http_client;
mod hyper_client;

pub use config::{DockerConfig, TlsConfig};
pub use docker::{Docker, BACKUP_LABEL, BACKUP_LABEL_VALUE};
