//! Transport HTTP utilisé pour les descriptions de devices et les actions SOAP.

use crate::errors::IgdError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::trace;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn post(url: Url, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Envoi d'une requête HTTP.
///
/// Les statuts non-2xx ne sont pas des erreurs : une faute SOAP arrive avec
/// un statut 500 et son corps doit rester lisible. Seuls les échecs réseau
/// donnent [`IgdError::Transport`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, IgdError>;
}

#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: default_user_agent(),
        }
    }
}

/// `User-Agent` de la forme `"<os>/<version> UPnP/1.1 igdctl/<version>"`.
pub fn default_user_agent() -> String {
    format!(
        "{} UPnP/1.1 igdctl/{}",
        igdutils::get_os_string(),
        env!("CARGO_PKG_VERSION")
    )
}

/// Transport basé sur `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(options: &TransportOptions) -> Result<Self, IgdError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .build()
            .map_err(|e| IgdError::transport(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, IgdError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let url = request.url.clone();
        let mut builder = self.client.request(method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| IgdError::transport(format!("{}: request failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| IgdError::transport(format!("{}: cannot read body: {}", url, e)))?
            .to_vec();

        trace!(url=%url, status, bytes=body.len(), "HTTP response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
