use crate::errors::Error;
use crate::http_client::HttpClient;
use http::{Request, Response};
use hyper::Uri;
#[cfg(feature = "openssl")]
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[allow(clippy::enum_variant_names)]
#[derive(Clone, Debug)]
enum Client {
    HttpClient(hyper::Client<hyper::client::HttpConnector>),
    #[cfg(feature = "openssl")]
    HttpsClient(hyper::Client<hyper_tls::HttpsConnector<hyper::client::HttpConnector>>),
    #[cfg(unix)]
    UnixClient(hyper::Client<hyperlocal::UnixConnector>),
}

impl Client {
    fn request(&self, req: Request<hyper::Body>) -> hyper::client::ResponseFuture {
        match self {
            Client::HttpClient(http_client) => http_client.request(req),
            #[cfg(feature = "openssl")]
            Client::HttpsClient(https_client) => https_client.request(req),
            #[cfg(unix)]
            Client::UnixClient(unix_client) => unix_client.request(req),
        }
    }
}

/// Http client using hyper
#[derive(Debug, Clone)]
pub struct HyperClient {
    /// http client
    client: Client,
    /// base connection address
    base: Uri,
    /// deadline of a whole exchange
    timeout: Option<Duration>,
}

fn join_uri(uri: &Uri, path: &str) -> Result<Uri, Error> {
    let joined = format!("{}{}", uri.to_string().trim_end_matches('/'), path);
    Uri::from_str(&joined).map_err(|err| Error::InvalidUri {
        var: joined,
        source: err,
    })
}

fn parse_base(addr: &str, scheme: &str) -> Result<Uri, Error> {
    // This ensures that using docker-machine-esque addresses work with Hyper.
    let addr = addr.replacen("tcp://", scheme, 1);
    Uri::from_str(&addr).map_err(|err| Error::InvalidUri {
        var: addr,
        source: err,
    })
}

fn request_builder(method: &http::Method, uri: &Uri) -> http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::ACCEPT, "application/json")
}

async fn fetch_body(resp: Response<hyper::Body>) -> Result<Response<Vec<u8>>, Error> {
    let (p, b) = resp.into_parts();
    let b = hyper::body::to_bytes(b).await.map_err(Error::Body)?.to_vec();
    Ok(Response::from_parts(p, b))
}

impl HyperClient {
    fn new(client: Client, base: Uri) -> Self {
        Self {
            client,
            base,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// path to unix socket
    #[cfg(unix)]
    pub fn connect_with_unix(path: &str) -> Self {
        let url = hyperlocal::Uri::new(path, "").into();
        // Prevent from using connection pooling.
        // See https://github.com/hyperium/hyper/issues/2312.
        let client: hyper::Client<_> = hyper::Client::builder()
            .pool_idle_timeout(Duration::from_millis(0))
            .pool_max_idle_per_host(0)
            .build(hyperlocal::UnixConnector);
        Self::new(Client::UnixClient(client), url)
    }

    #[cfg(feature = "openssl")]
    pub fn connect_with_ssl(addr: &str, key: &Path, cert: &Path, ca: &Path) -> Result<Self, Error> {
        let key_buf = std::fs::read(key)?;
        let cert_buf = std::fs::read(cert)?;
        let ca_buf = std::fs::read(ca)?;

        let pkey =
            openssl::pkey::PKey::from_rsa(openssl::rsa::Rsa::private_key_from_pem(&key_buf)?)?;
        let cert = openssl::x509::X509::from_pem(&cert_buf)?;
        let pkcs12 = openssl::pkcs12::Pkcs12::builder().build("", "", &pkey, &cert)?;
        let der = pkcs12.to_der()?;
        let id = native_tls::Identity::from_pkcs12(&der, "")?;
        let ca = native_tls::Certificate::from_pem(&ca_buf)?;
        let mut builder = native_tls::TlsConnector::builder();
        builder.identity(id);
        builder.add_root_certificate(ca);
        let url = parse_base(addr, "https://")?;
        let mut http = hyper::client::HttpConnector::new();
        http.enforce_http(false);
        let https = hyper_tls::HttpsConnector::from((http, builder.build()?.into()));
        let client = hyper::Client::builder().build::<_, hyper::Body>(https);
        Ok(Self::new(Client::HttpsClient(client), url))
    }

    pub fn connect_with_http(addr: &str) -> Result<Self, Error> {
        let url = parse_base(addr, "http://")?;
        Ok(Self::new(Client::HttpClient(hyper::Client::new()), url))
    }

    async fn exchange(&self, request: Request<hyper::Body>) -> Result<Response<Vec<u8>>, Error> {
        let res = self.client.request(request).await?;
        fetch_body(res).await
    }
}

#[async_trait::async_trait]
impl HttpClient for HyperClient {
    type Err = Error;

    async fn get(&self, path: &str) -> Result<Response<Vec<u8>>, Self::Err> {
        let url = join_uri(&self.base, path)?;
        let request = request_builder(&http::Method::GET, &url).body(hyper::Body::empty())?;

        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.exchange(request))
                .await
                .map_err(|_| Error::Timeout { timeout })?,
            None => self.exchange(request).await,
        }
    }
}
