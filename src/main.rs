use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dumpster::{Docker, DockerConfig};
use log::{debug, error, info};

/// Find the containers that opted in to backups
#[derive(Debug, Parser)]
#[command(name = "dumpster", version)]
struct Args {
    /// Docker daemon address, e.g. tcp://localhost:2375 or unix:///var/run/docker.sock
    #[arg(long)]
    host: Option<String>,

    /// Request deadline in seconds, 0 waits forever
    #[arg(long)]
    timeout: Option<u64>,

    /// Engine API version to pin requests to
    #[arg(long)]
    api_version: Option<String>,

    /// error, warn, info, debug or trace
    #[arg(long, env = "DUMPSTER_LOG_LEVEL", default_value = "info", value_parser = parse_level)]
    log_level: log::Level,
}

fn parse_level(level: &str) -> Result<log::Level, String> {
    level
        .parse()
        .map_err(|_| format!("unknown log level: {level}"))
}

impl Args {
    /// Flags win over the docker environment.
    fn config(&self) -> Result<DockerConfig> {
        let mut config = DockerConfig::from_env().context("Failed to read docker environment")?;
        if let Some(host) = &self.host {
            config = config.host(host);
        }
        if let Some(secs) = self.timeout {
            config = config.timeout((secs > 0).then(|| Duration::from_secs(secs)));
        }
        if let Some(version) = &self.api_version {
            config = config.api_version(Some(version.clone()));
        }
        Ok(config)
    }
}

async fn run(args: &Args) -> Result<()> {
    let config = args.config()?;
    let docker = Docker::connect(&config)
        .with_context(|| format!("Failed to connect to {}", config.host))?;

    let containers = docker
        .query_containers()
        .await
        .context("Failed to query containers")?;
    info!("{} container(s) opted in to backups", containers.len());

    for container in &containers {
        let id = container.Id.get(..12).unwrap_or(&container.Id);
        info!(
            "{} ({}): {} mount(s)",
            container.name(),
            id,
            container.Mounts.len()
        );
        for mount in &container.Mounts {
            debug!(
                "  {} {} -> {} (rw: {})",
                mount.Type, mount.Source, mount.Destination, mount.RW
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(err) = simple_logger::init_with_level(args.log_level) {
        eprintln!("Failed to initialize logger: {err}");
        std::process::exit(1);
    }

    if let Err(err) = run(&args).await {
        error!("{err:#}");
        std::process::exit(1);
    }
}
