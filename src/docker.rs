use crate::config::DockerConfig;
use crate::container::{Container, ContainerFilters};
use crate::errors::*;
use crate::http_client::{HaveHttpClient, HttpClient};
use crate::hyper_client::HyperClient;
use http::Response;
use log::*;
use serde::de::DeserializeOwned;
use std::result;

/// Label a container carries to opt in to backups.
pub const BACKUP_LABEL: &str = "dumpster.enable";

/// Value of [`BACKUP_LABEL`] that enables backups.
pub const BACKUP_LABEL_VALUE: &str = "true";

/// Handle to connection to the docker daemon
#[derive(Debug)]
pub struct Docker {
    /// http client
    client: HyperClient,
    /// settings the connection was made with
    config: DockerConfig,
}

/// Deserialize from json string
fn api_result<D: DeserializeOwned>(res: Response<Vec<u8>>) -> result::Result<D, Error> {
    if res.status().is_success() {
        Ok(serde_json::from_slice::<D>(res.body())?)
    } else {
        debug!("engine answered {}", res.status());
        // proxies in front of the engine answer with html or plain text
        let err = serde_json::from_slice::<DockerError>(res.body()).unwrap_or_else(|_| {
            DockerError {
                message: format!(
                    "{}: {}",
                    res.status(),
                    String::from_utf8_lossy(res.body()).trim()
                ),
            }
        });
        Err(err.into())
    }
}

impl Docker {
    fn new(client: HyperClient, config: DockerConfig) -> Self {
        Self {
            client: client.with_timeout(config.timeout),
            config,
        }
    }

    /// Connect to the Docker daemon
    ///
    /// # Summary
    /// Connect to the Docker daemon using the standard Docker configuration options.
    /// See [`DockerConfig::from_env`].
    pub fn connect_with_defaults() -> Result<Docker> {
        Docker::connect(&DockerConfig::from_env()?)
    }

    /// Connect to the daemon described by `config`
    ///
    /// No request is sent here; an unreachable daemon shows up on the first query.
    pub fn connect(config: &DockerConfig) -> Result<Docker> {
        let host = config.host.as_str();

        // Dispatch to the correct connection function.
        if host.starts_with("unix://") {
            Docker::connect_with_unix(config)
        } else if host.starts_with("tcp://") {
            match &config.tls {
                Some(_) => Docker::connect_with_ssl(config),
                None => Docker::connect_with_http(config),
            }
        } else if host.starts_with("http://") {
            // client certificates would silently go unused over plain http
            match &config.tls {
                Some(_) => Err(Error::TlsOverHttp {
                    host: host.to_owned(),
                }),
                None => Docker::connect_with_http(config),
            }
        } else if host.starts_with("https://") {
            match &config.tls {
                Some(_) => Docker::connect_with_ssl(config),
                None => Err(Error::MissingTlsConfig {
                    host: host.to_owned(),
                }),
            }
        } else {
            Err(Error::UnsupportedScheme {
                host: host.to_owned(),
            })
        }
    }

    /// This ensures that using a fully-qualified path
    ///
    /// e.g. unix://.... -- works.
    /// The unix socket provider expects a Path, so we don't need scheme.
    #[cfg(unix)]
    fn connect_with_unix(config: &DockerConfig) -> Result<Docker> {
        let addr = config.host.as_str();
        let path = addr.strip_prefix("unix://").unwrap_or(addr);
        let client = HyperClient::connect_with_unix(path);
        Ok(Docker::new(client, config.clone()))
    }

    #[cfg(not(unix))]
    fn connect_with_unix(config: &DockerConfig) -> Result<Docker> {
        Err(Error::UnsupportedScheme {
            host: config.host.clone(),
        })
    }

    #[cfg(feature = "openssl")]
    fn connect_with_ssl(config: &DockerConfig) -> Result<Docker> {
        let addr = config.host.as_str();
        let tls = config.tls.as_ref().ok_or_else(|| Error::MissingTlsConfig {
            host: addr.to_owned(),
        })?;
        let client = HyperClient::connect_with_ssl(addr, &tls.key, &tls.cert, &tls.ca)
            .map_err(|err| Error::CouldNotConnect {
                addr: addr.to_owned(),
                source: err.into(),
            })?;
        Ok(Docker::new(client, config.clone()))
    }

    #[cfg(not(feature = "openssl"))]
    fn connect_with_ssl(_config: &DockerConfig) -> Result<Docker> {
        Err(Error::SslDisabled)
    }

    /// Connect using unsecured HTTP. The engine's local port is the trust
    /// boundary, there is no authentication.
    fn connect_with_http(config: &DockerConfig) -> Result<Docker> {
        let addr = config.host.as_str();
        let client =
            HyperClient::connect_with_http(addr).map_err(|err| Error::CouldNotConnect {
                addr: addr.to_owned(),
                source: err.into(),
            })?;
        Ok(Docker::new(client, config.clone()))
    }

    /// List containers matching `filters`
    ///
    /// `filters` is the only query parameter sent.
    ///
    /// # API
    /// /containers/json
    pub async fn list_containers(&self, filters: &ContainerFilters) -> Result<Vec<Container>> {
        let filters = serde_json::to_string(filters).map_err(Error::Encode)?;
        debug!("filter: {filters}");
        let mut param = url::form_urlencoded::Serializer::new(String::new());
        param.append_pair("filters", &filters);

        let path = self
            .config
            .api_path(&format!("/containers/json?{}", param.finish()));
        let res = self.http_client().get(&path).await?;
        api_result(res)
    }

    /// List the containers that opted in to backups
    ///
    /// Selection happens on the daemon through the `dumpster.enable=true`
    /// label filter; the result is not re-checked here.
    ///
    /// # API
    /// /containers/json
    pub async fn query_containers(&self) -> Result<Vec<Container>> {
        let mut filters = ContainerFilters::new();
        filters.label(&format!("{BACKUP_LABEL}={BACKUP_LABEL_VALUE}"));

        let containers = self.list_containers(&filters).await?;
        debug!("{} container(s) opted in: {:?}", containers.len(), containers);
        Ok(containers)
    }
}

impl HaveHttpClient for Docker {
    type Client = HyperClient;
    fn http_client(&self) -> &Self::Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsConfig;
    use crate::container::MountPoint;
    use crate::test::{engine_fixture, spawn_engine, spawn_raw_engine, Reply};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::net::TcpListener;
    use std::time::Duration;

    fn connect(addr: std::net::SocketAddr) -> Docker {
        Docker::connect(&DockerConfig::new(format!("tcp://{addr}"))).unwrap()
    }

    #[test]
    fn connect_dispatches_on_scheme() {
        assert!(Docker::connect(&DockerConfig::default()).is_ok());
        assert!(Docker::connect(&DockerConfig::new("http://127.0.0.1:2375")).is_ok());

        #[cfg(unix)]
        assert!(Docker::connect(&DockerConfig::new("unix:///var/run/docker.sock")).is_ok());

        assert!(matches!(
            Docker::connect(&DockerConfig::new("npipe:////./pipe/docker_engine")),
            Err(Error::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            Docker::connect(&DockerConfig::new("https://docker.example:2376")),
            Err(Error::MissingTlsConfig { .. })
        ));
    }

    #[test]
    fn client_certificates_are_refused_over_plain_http() {
        let tls = TlsConfig::from_dir("/etc/docker/certs".into());
        let config = DockerConfig::new("http://docker.example:2376").tls(tls.clone());
        assert!(matches!(
            Docker::connect(&config),
            Err(Error::TlsOverHttp { host }) if host == "http://docker.example:2376"
        ));

        // tcp:// is upgraded to https:// when certificates are configured
        let config = DockerConfig::new("tcp://docker.example:2376").tls(tls);
        #[cfg(not(feature = "openssl"))]
        assert!(matches!(Docker::connect(&config), Err(Error::SslDisabled)));
        #[cfg(feature = "openssl")]
        assert!(!matches!(
            Docker::connect(&config),
            Err(Error::TlsOverHttp { .. })
        ));
    }

    #[tokio::test]
    async fn query_returns_only_opted_in_containers() {
        let engine = spawn_engine(Reply::Engine(engine_fixture()), None).await;
        let docker = connect(engine.addr);

        let containers = docker.query_containers().await.unwrap();
        let ids = containers.iter().map(|c| c.Id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["9c1d4e2b7a01"]);
        assert_eq!(containers[0].name(), "postgres");
        assert_eq!(containers[0].Labels[BACKUP_LABEL], BACKUP_LABEL_VALUE);
    }

    #[tokio::test]
    async fn query_sends_single_label_filter() {
        let engine = spawn_engine(Reply::Engine(vec![]), None).await;
        let docker = connect(engine.addr);
        docker.query_containers().await.unwrap();

        let requests = engine.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path(), "/v1.41/containers/json");

        let query = requests[0].query().unwrap_or_default();
        let params = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect::<Vec<_>>();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].0, "filters");
        let filters: Value = serde_json::from_str(&params[0].1).unwrap();
        assert_eq!(filters, json!({ "label": ["dumpster.enable=true"] }));
    }

    #[tokio::test]
    async fn empty_answer_is_not_an_error() {
        let engine = spawn_engine(Reply::Raw("[]"), None).await;
        let containers = connect(engine.addr).query_containers().await.unwrap();
        assert!(containers.is_empty());
    }

    #[tokio::test]
    async fn truncated_answer_is_a_decode_error() {
        let engine = spawn_engine(Reply::Raw(r#"[{"Id":"a""#), None).await;
        let res = connect(engine.addr).query_containers().await;
        assert!(matches!(res, Err(Error::Json(_))), "{res:?}");
    }

    #[tokio::test]
    async fn schema_mismatch_is_a_decode_error() {
        let engine = spawn_engine(Reply::Raw(r#"{"Id":"a"}"#), None).await;
        let res = connect(engine.addr).query_containers().await;
        assert!(matches!(res, Err(Error::Json(_))), "{res:?}");
    }

    #[tokio::test]
    async fn engine_error_message_is_surfaced() {
        let engine = spawn_engine(
            Reply::Status(
                http::StatusCode::BAD_REQUEST,
                r#"{"message":"invalid filter 'lable'"}"#,
            ),
            None,
        )
        .await;
        match connect(engine.addr).query_containers().await {
            Err(Error::Docker(err)) => assert_eq!(err.message, "invalid filter 'lable'"),
            res => panic!("unexpected result: {res:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_page_keeps_the_status() {
        let engine = spawn_engine(
            Reply::Status(http::StatusCode::BAD_GATEWAY, "<html>bad gateway</html>\n"),
            None,
        )
        .await;
        match connect(engine.addr).query_containers().await {
            Err(Error::Docker(err)) => {
                assert_eq!(err.message, "502 Bad Gateway: <html>bad gateway</html>")
            }
            res => panic!("unexpected result: {res:?}"),
        }
    }

    #[tokio::test]
    async fn short_body_is_a_read_error() {
        let addr = spawn_raw_engine(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n[{\"Id\":\"a\"}]",
            None,
        )
        .await;
        let res = connect(addr).query_containers().await;
        assert!(matches!(res, Err(Error::Body(_))), "{res:?}");
    }

    #[tokio::test]
    async fn stalled_body_hits_the_deadline() {
        let addr = spawn_raw_engine(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n[{\"Id\":",
            Some(Duration::from_secs(10)),
        )
        .await;
        let config =
            DockerConfig::new(format!("tcp://{addr}")).timeout(Some(Duration::from_millis(200)));
        let res = Docker::connect(&config).unwrap().query_containers().await;
        assert!(matches!(res, Err(Error::Timeout { .. })), "{res:?}");
    }

    #[tokio::test]
    async fn unreachable_daemon_is_a_transport_error() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let res = connect(addr).query_containers().await;
        assert!(matches!(res, Err(Error::ConnectionRefused(_))), "{res:?}");
    }

    #[tokio::test]
    async fn stalled_daemon_hits_the_deadline() {
        let engine = spawn_engine(Reply::Raw("[]"), Some(Duration::from_secs(10))).await;
        let config = DockerConfig::new(format!("tcp://{}", engine.addr))
            .timeout(Some(Duration::from_millis(200)));
        let res = Docker::connect(&config).unwrap().query_containers().await;
        assert!(
            matches!(res, Err(Error::Timeout { timeout }) if timeout == Duration::from_millis(200)),
            "{res:?}"
        );
    }

    #[tokio::test]
    async fn descriptors_survive_the_wire() {
        let expected = vec![
            Container {
                Id: "4f0c".to_owned(),
                Names: vec!["/gitea".to_owned()],
                Labels: HashMap::from([
                    (BACKUP_LABEL.to_owned(), BACKUP_LABEL_VALUE.to_owned()),
                    ("com.docker.compose.service".to_owned(), "gitea".to_owned()),
                ]),
                Mounts: vec![
                    MountPoint {
                        Type: "volume".to_owned(),
                        Name: "gitea_data".to_owned(),
                        Source: "/var/lib/docker/volumes/gitea_data/_data".to_owned(),
                        Destination: "/data".to_owned(),
                        Driver: "local".to_owned(),
                        Mode: "z".to_owned(),
                        RW: true,
                        Propagation: String::new(),
                    },
                    MountPoint {
                        Type: "bind".to_owned(),
                        Source: "/etc/timezone".to_owned(),
                        Destination: "/etc/timezone".to_owned(),
                        Mode: "ro".to_owned(),
                        RW: false,
                        Propagation: "rprivate".to_owned(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
            Container {
                Id: "77aa".to_owned(),
                Names: vec!["/vaultwarden".to_owned()],
                Labels: HashMap::from([(BACKUP_LABEL.to_owned(), BACKUP_LABEL_VALUE.to_owned())]),
                ..Default::default()
            },
        ];
        let wire = expected
            .iter()
            .map(|c| serde_json::to_value(c).unwrap())
            .collect();
        let engine = spawn_engine(Reply::Engine(wire), None).await;

        let containers = connect(engine.addr).query_containers().await.unwrap();
        assert_eq!(containers, expected);
    }
}
