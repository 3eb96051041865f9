use crate::CrawlerError;
use reqwest::{
    blocking::{Client, ClientBuilder, Response},
    header::LOCATION,
    redirect::Policy,
    Url,
};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body of a 2xx response, or a transient status error.
    pub fn into_body(self, url: &Url) -> Result<String, CrawlerError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(CrawlerError::Status {
                url: url.to_string(),
                status: self.status,
            })
        }
    }
}

/// Blocking HTTP access used by the crawler.
pub trait Transport {
    /// GET following redirects.
    fn fetch(&self, url: &Url) -> Result<HttpResponse, CrawlerError>;

    /// GET without following redirects, so `Location` can be read.
    fn probe(&self, url: &Url) -> Result<HttpResponse, CrawlerError>;
}

#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub user_agent: String,
    pub timeout: Duration,
    /// Charset used when the response does not declare one.
    pub default_charset: String,
    pub accept_invalid_certs: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        TransportOptions {
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            default_charset: "big5".to_string(),
            accept_invalid_certs: false,
        }
    }
}

pub struct HttpTransport {
    client: Client,
    no_redirect: Client,
    default_charset: String,
}

impl HttpTransport {
    pub fn new(options: &TransportOptions) -> Result<Self, CrawlerError> {
        let builder = || {
            ClientBuilder::new()
                .user_agent(options.user_agent.as_str())
                .timeout(options.timeout)
                .danger_accept_invalid_certs(options.accept_invalid_certs)
        };
        Ok(HttpTransport {
            client: builder().build()?,
            no_redirect: builder().redirect(Policy::none()).build()?,
            default_charset: options.default_charset.clone(),
        })
    }

    fn read(&self, response: Response) -> Result<HttpResponse, CrawlerError> {
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.text_with_charset(&self.default_charset)?;
        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &Url) -> Result<HttpResponse, CrawlerError> {
        debug!("Visit {}", url);
        let response = self.client.get(url.clone()).send()?;
        self.read(response)
    }

    fn probe(&self, url: &Url) -> Result<HttpResponse, CrawlerError> {
        debug!("Probe {}", url);
        let response = self.no_redirect.get(url.clone()).send()?;
        self.read(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_body() {
        let url = Url::parse("https://nol.example/search").unwrap();
        let ok = HttpResponse {
            status: 200,
            location: None,
            body: "<html></html>".to_string(),
        };
        assert_eq!(ok.into_body(&url).unwrap(), "<html></html>");

        let err = HttpResponse {
            status: 502,
            location: None,
            body: String::new(),
        }
        .into_body(&url)
        .unwrap_err();
        assert!(matches!(err, CrawlerError::Status { status: 502, .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_default_options() {
        let options = TransportOptions::default();
        assert_eq!(options.default_charset, "big5");
        assert!(options.user_agent.starts_with("nol-crawler/"));
        assert!(HttpTransport::new(&options).is_ok());
    }
}
